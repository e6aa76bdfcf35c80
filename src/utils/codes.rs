use rand::Rng;

const CODE_PREFIX: &str = "ACERTIJO";
const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates the opaque redemption token: campaign prefix, unix millis and
/// a random base36 suffix. Uniqueness is probabilistic only; the code is
/// both the spreadsheet row key and the QR payload.
pub fn generate_redemption_code() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}-{}", CODE_PREFIX, millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn code_has_prefix_timestamp_and_suffix() {
        let code = generate_redemption_code();
        let parts: Vec<&str> = code.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ACERTIJO");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2]
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn codes_are_distinct_across_repeated_generations() {
        let codes: HashSet<String> = (0..100).map(|_| generate_redemption_code()).collect();
        assert_eq!(codes.len(), 100);
    }
}

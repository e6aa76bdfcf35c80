use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::Luma;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrRenderError {
    #[error("failed to encode QR payload: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("failed to write QR image: {0}")]
    Image(#[from] image::ImageError),
}

// Level H so a scuffed phone screenshot still scans at the counter.
fn encode(code: &str) -> Result<QrCode, QrRenderError> {
    Ok(QrCode::with_error_correction_level(code, EcLevel::H)?)
}

/// SVG symbol for the completion screen.
pub fn code_to_svg(code: &str) -> Result<String, QrRenderError> {
    let qr = encode(code)?;
    Ok(qr.render::<svg::Color>().min_dimensions(180, 180).build())
}

/// PNG bytes for the email attachment.
pub fn code_to_png(code: &str) -> Result<Vec<u8>, QrRenderError> {
    let qr = encode(code)?;
    let img = qr.render::<Luma<u8>>().min_dimensions(300, 300).build();
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img).write_to(&mut buf, image::ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

/// Base64 data URL, handy for inlining the symbol in API responses.
pub fn code_to_data_url(code: &str) -> Result<String, QrRenderError> {
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(code_to_png(code)?)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn svg_render_produces_a_symbol() {
        let svg = code_to_svg("ACERTIJO-1756400000000-abc123xyz").unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn png_render_produces_a_png() {
        let png = code_to_png("ACERTIJO-1756400000000-abc123xyz").unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn data_url_is_base64_png() {
        let url = code_to_data_url("ACERTIJO-1756400000000-abc123xyz").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}

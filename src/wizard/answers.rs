use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Selection caps for the multi-select questions.
pub const MENU_PICKS_CAP: usize = 3;
pub const SHOP_VALUES_CAP: usize = 2;

/// Column order of the SheetDB sheet. The header-initialization row maps
/// each of these names to itself.
pub const COLUMNS: [&str; 18] = [
    "code",
    "submitted_at",
    "neighborhood",
    "age_bracket",
    "occupation",
    "visit_frequency",
    "coffee_style",
    "intensity",
    "temperature",
    "milk_type",
    "menu_picks",
    "origin_importance",
    "flavor_profiles",
    "visit_time",
    "shop_values",
    "email",
    "phone",
    "consent",
];

/// Flat in-memory answer set of one respondent. Mutated in place by the
/// active step, frozen once the survey is submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyAnswers {
    // Location step
    pub neighborhood: String,
    pub age_bracket: String,
    pub occupation: String,
    // Habits step
    pub visit_frequency: String,
    pub coffee_style: String,
    pub intensity: String,
    pub temperature: String,
    pub milk_type: String,
    // Preferences step
    pub menu_picks: Vec<String>,
    pub origin_importance: String,
    pub flavor_profiles: Vec<String>,
    // Experience step
    pub visit_time: String,
    pub shop_values: Vec<String>,
    // Contact step (optional)
    pub email: String,
    pub phone: String,
    // Consent step ("yes" / "no")
    pub consent: String,
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("unknown survey field: {0}")]
    UnknownField(String),
    #[error("{0} is a multi-select field, toggle options instead")]
    MultiSelectField(String),
    #[error("{0} is a single-value field, answer it instead")]
    SingleValueField(String),
    #[error("at most {cap} options can be selected for {field}")]
    SelectionCapReached { field: String, cap: usize },
}

impl SurveyAnswers {
    /// Sets one single-choice or free-text field.
    pub fn set_field(&mut self, field: &str, value: String) -> Result<(), AnswerError> {
        let slot = match field {
            "neighborhood" => &mut self.neighborhood,
            "age_bracket" => &mut self.age_bracket,
            "occupation" => &mut self.occupation,
            "visit_frequency" => &mut self.visit_frequency,
            "coffee_style" => &mut self.coffee_style,
            "intensity" => &mut self.intensity,
            "temperature" => &mut self.temperature,
            "milk_type" => &mut self.milk_type,
            "origin_importance" => &mut self.origin_importance,
            "visit_time" => &mut self.visit_time,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "consent" => &mut self.consent,
            "menu_picks" | "flavor_profiles" | "shop_values" => {
                return Err(AnswerError::MultiSelectField(field.to_string()))
            }
            _ => return Err(AnswerError::UnknownField(field.to_string())),
        };
        *slot = value;
        Ok(())
    }

    /// Toggles one option of a multi-select field. Adding past the field's
    /// cap is refused; removing is always allowed.
    pub fn toggle_option(&mut self, field: &str, value: String) -> Result<&[String], AnswerError> {
        let (list, cap) = match field {
            "menu_picks" => (&mut self.menu_picks, Some(MENU_PICKS_CAP)),
            "flavor_profiles" => (&mut self.flavor_profiles, None),
            "shop_values" => (&mut self.shop_values, Some(SHOP_VALUES_CAP)),
            "neighborhood" | "age_bracket" | "occupation" | "visit_frequency" | "coffee_style"
            | "intensity" | "temperature" | "milk_type" | "origin_importance" | "visit_time"
            | "email" | "phone" | "consent" => {
                return Err(AnswerError::SingleValueField(field.to_string()))
            }
            _ => return Err(AnswerError::UnknownField(field.to_string())),
        };
        if let Some(position) = list.iter().position(|selected| *selected == value) {
            list.remove(position);
        } else {
            if let Some(cap) = cap {
                if list.len() >= cap {
                    return Err(AnswerError::SelectionCapReached {
                        field: field.to_string(),
                        cap,
                    });
                }
            }
            list.push(value);
        }
        Ok(list.as_slice())
    }

    /// Flattens the answers into the single spreadsheet row SheetDB
    /// expects: every value a string, multi-selects joined with ", ".
    pub fn to_row(&self, code: &str, submitted_at: &str) -> Value {
        let mut row = Map::new();
        let mut put = |column: &str, value: String| {
            row.insert(column.to_string(), Value::String(value));
        };
        put("code", code.to_string());
        put("submitted_at", submitted_at.to_string());
        put("neighborhood", self.neighborhood.clone());
        put("age_bracket", self.age_bracket.clone());
        put("occupation", self.occupation.clone());
        put("visit_frequency", self.visit_frequency.clone());
        put("coffee_style", self.coffee_style.clone());
        put("intensity", self.intensity.clone());
        put("temperature", self.temperature.clone());
        put("milk_type", self.milk_type.clone());
        put("menu_picks", self.menu_picks.join(", "));
        put("origin_importance", self.origin_importance.clone());
        put("flavor_profiles", self.flavor_profiles.join(", "));
        put("visit_time", self.visit_time.clone());
        put("shop_values", self.shop_values.join(", "));
        put("email", self.email.trim().to_string());
        put("phone", normalize_phone(&self.phone));
        put("consent", self.consent.clone());
        Value::Object(row)
    }
}

/// A leading "+" would make the sheet read the number as a formula, so it
/// is escaped with a leading apostrophe.
fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    if trimmed.starts_with('+') {
        format!("'{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

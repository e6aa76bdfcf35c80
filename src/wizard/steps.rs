use serde::Serialize;

use crate::wizard::answers::SurveyAnswers;

/// Fixed step sequence of the opening-campaign survey. There is no skipping
/// and no branching by answer content; the completion step is only reached
/// through a successful submit, never through `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStep {
    Intro,
    Location,
    Habits,
    Preferences,
    Experience,
    Contact,
    Consent,
    Completion,
}

impl SurveyStep {
    pub const ALL: [SurveyStep; 8] = [
        SurveyStep::Intro,
        SurveyStep::Location,
        SurveyStep::Habits,
        SurveyStep::Preferences,
        SurveyStep::Experience,
        SurveyStep::Contact,
        SurveyStep::Consent,
        SurveyStep::Completion,
    ];

    /// Number of data-collection steps between the intro and the completion
    /// screen, used for progress display.
    pub const DATA_STEPS: usize = 6;

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurveyStep::Intro => "intro",
            SurveyStep::Location => "location",
            SurveyStep::Habits => "habits",
            SurveyStep::Preferences => "preferences",
            SurveyStep::Experience => "experience",
            SurveyStep::Contact => "contact",
            SurveyStep::Consent => "consent",
            SurveyStep::Completion => "completion",
        }
    }

    pub fn next(self) -> Option<SurveyStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(self) -> Option<SurveyStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// 1-based position among the data-collection steps, `None` for the
    /// intro and completion screens.
    pub fn data_position(self) -> Option<usize> {
        match self {
            SurveyStep::Intro | SurveyStep::Completion => None,
            other => Some(other.index()),
        }
    }

    /// Required fields of this step that are still unanswered. `next` stays
    /// blocked until this list is empty.
    pub fn missing_fields(self, answers: &SurveyAnswers) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut require = |name: &'static str, filled: bool| {
            if !filled {
                missing.push(name);
            }
        };
        match self {
            SurveyStep::Location => {
                require("neighborhood", !answers.neighborhood.is_empty());
                require("age_bracket", !answers.age_bracket.is_empty());
                require("occupation", !answers.occupation.is_empty());
            }
            SurveyStep::Habits => {
                require("visit_frequency", !answers.visit_frequency.is_empty());
                require("coffee_style", !answers.coffee_style.is_empty());
                require("intensity", !answers.intensity.is_empty());
                require("temperature", !answers.temperature.is_empty());
                require("milk_type", !answers.milk_type.is_empty());
            }
            SurveyStep::Preferences => {
                require("menu_picks", !answers.menu_picks.is_empty());
                require("origin_importance", !answers.origin_importance.is_empty());
            }
            SurveyStep::Experience => {
                require("visit_time", !answers.visit_time.is_empty());
                require("shop_values", !answers.shop_values.is_empty());
            }
            SurveyStep::Consent => {
                require("consent", !answers.consent.is_empty());
            }
            // The intro is storytelling only and both contact fields are
            // optional.
            SurveyStep::Intro | SurveyStep::Contact | SurveyStep::Completion => {}
        }
        missing
    }

    pub fn is_satisfied(self, answers: &SurveyAnswers) -> bool {
        self.missing_fields(answers).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_ordered_and_indexable() {
        for (i, step) in SurveyStep::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
        }
        assert_eq!(SurveyStep::Intro.next(), Some(SurveyStep::Location));
        assert_eq!(SurveyStep::Consent.next(), Some(SurveyStep::Completion));
        assert_eq!(SurveyStep::Completion.next(), None);
        assert_eq!(SurveyStep::Intro.prev(), None);
        assert_eq!(SurveyStep::Habits.prev(), Some(SurveyStep::Location));
    }

    #[test]
    fn data_positions_cover_the_six_collection_steps() {
        assert_eq!(SurveyStep::Intro.data_position(), None);
        assert_eq!(SurveyStep::Location.data_position(), Some(1));
        assert_eq!(SurveyStep::Consent.data_position(), Some(6));
        assert_eq!(SurveyStep::Completion.data_position(), None);
    }

    #[test]
    fn location_step_requires_all_three_fields() {
        let mut answers = SurveyAnswers::default();
        assert_eq!(
            SurveyStep::Location.missing_fields(&answers),
            vec!["neighborhood", "age_bracket", "occupation"]
        );
        answers.neighborhood = "Palermo".to_string();
        answers.age_bracket = "21-25".to_string();
        assert_eq!(SurveyStep::Location.missing_fields(&answers), vec!["occupation"]);
        answers.occupation = "Student".to_string();
        assert!(SurveyStep::Location.is_satisfied(&answers));
    }

    #[test]
    fn intro_and_contact_have_no_requirements() {
        let answers = SurveyAnswers::default();
        assert!(SurveyStep::Intro.is_satisfied(&answers));
        assert!(SurveyStep::Contact.is_satisfied(&answers));
    }
}

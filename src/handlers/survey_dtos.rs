use serde::{Deserialize, Serialize};

use crate::wizard::answers::SurveyAnswers;
use crate::wizard::session::WizardSession;
use crate::wizard::steps::SurveyStep;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressInfo {
    pub step_index: usize,
    /// 1-based position among the data steps, absent on the intro and
    /// completion screens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_step: Option<usize>,
    pub data_steps: usize,
}

#[derive(Debug, Serialize)]
pub struct SurveyStateResponse {
    pub session_id: String,
    pub step: SurveyStep,
    pub progress: ProgressInfo,
    pub completed: bool,
    pub can_advance: bool,
    pub missing: Vec<&'static str>,
    pub answers: SurveyAnswers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SurveyStateResponse {
    pub fn from_session(session_id: &str, session: &WizardSession) -> Self {
        let step = session.step();
        let missing = session.missing_fields();
        Self {
            session_id: session_id.to_string(),
            step,
            progress: ProgressInfo {
                step_index: step.index(),
                data_step: step.data_position(),
                data_steps: SurveyStep::DATA_STEPS,
            },
            completed: session.is_completed(),
            // The consent step ends with submit, not next.
            can_advance: missing.is_empty()
                && step.next().map_or(false, |next| next != SurveyStep::Completion),
            missing,
            answers: session.answers().clone(),
            code: session.code().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub field: String,
    pub selected: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_svg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_png_data_url: Option<String>,
}

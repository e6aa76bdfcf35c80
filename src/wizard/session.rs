use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::wizard::answers::{AnswerError, SurveyAnswers};
use crate::wizard::steps::SurveyStep;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("required answers are missing: {}", missing.join(", "))]
    RequirementsUnmet { missing: Vec<&'static str> },
    #[error("the completion step is reached by submitting, not by advancing")]
    SubmitRequired,
    #[error("submission is only available from the consent step")]
    NotOnConsentStep,
    #[error("this survey was already submitted")]
    AlreadyCompleted,
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

/// One respondent's walk through the survey. The session exclusively owns
/// its answer set; once `complete` succeeds the answers are frozen and the
/// redemption code is recorded.
#[derive(Debug, Clone)]
pub struct WizardSession {
    step: SurveyStep,
    answers: SurveyAnswers,
    code: Option<String>,
    last_activity: DateTime<Utc>,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            step: SurveyStep::Intro,
            answers: SurveyAnswers::default(),
            code: None,
            last_activity: Utc::now(),
        }
    }

    pub fn step(&self) -> SurveyStep {
        self.step
    }

    pub fn answers(&self) -> &SurveyAnswers {
        &self.answers
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.code.is_some()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.step.missing_fields(&self.answers)
    }

    pub fn set_field(&mut self, field: &str, value: String) -> Result<(), WizardError> {
        self.guard_mutable()?;
        self.answers.set_field(field, value)?;
        self.touch();
        Ok(())
    }

    pub fn toggle_option(&mut self, field: &str, value: String) -> Result<Vec<String>, WizardError> {
        self.guard_mutable()?;
        let selected = self.answers.toggle_option(field, value)?.to_vec();
        self.touch();
        Ok(selected)
    }

    /// `next`: advances one step, but only when every required field of the
    /// current step is populated. Never reaches the completion step.
    pub fn advance(&mut self) -> Result<SurveyStep, WizardError> {
        self.guard_mutable()?;
        let next = match self.step.next() {
            Some(SurveyStep::Completion) => return Err(WizardError::SubmitRequired),
            Some(next) => next,
            None => return Err(WizardError::AlreadyCompleted),
        };
        let missing = self.step.missing_fields(&self.answers);
        if !missing.is_empty() {
            return Err(WizardError::RequirementsUnmet { missing });
        }
        self.step = next;
        self.touch();
        Ok(self.step)
    }

    /// `back`: unconditional one-step retreat. A no-op on the intro screen,
    /// refused after submission.
    pub fn retreat(&mut self) -> Result<SurveyStep, WizardError> {
        self.guard_mutable()?;
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.touch();
        Ok(self.step)
    }

    /// Final submission: only from the consent step, exactly once. Records
    /// the redemption code and moves to the completion screen.
    pub fn complete(&mut self, code: String) -> Result<(), WizardError> {
        self.guard_mutable()?;
        if self.step != SurveyStep::Consent {
            return Err(WizardError::NotOnConsentStep);
        }
        let missing = self.step.missing_fields(&self.answers);
        if !missing.is_empty() {
            return Err(WizardError::RequirementsUnmet { missing });
        }
        self.code = Some(code);
        self.step = SurveyStep::Completion;
        self.touch();
        Ok(())
    }

    fn guard_mutable(&self) -> Result<(), WizardError> {
        if self.is_completed() {
            return Err(WizardError::AlreadyCompleted);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    #[cfg(test)]
    pub fn set_last_activity(&mut self, timestamp: DateTime<Utc>) {
        self.last_activity = timestamp;
    }
}

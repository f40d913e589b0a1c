//! "Create Visitor Code" screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FormStatus, Navigator, Phase, REQUIRED_FIELDS_MESSAGE, Route, Toast};
use crate::models::{CodeData, CreateCodeRequest};
use crate::query::{Mutation, QueryClient};

pub const VISITOR_COUNT_MESSAGE: &str = "Please enter a valid visitor count (minimum 2)";
pub const GENERATE_FAILED_MESSAGE: &str = "Failed to generate code. Please try again.";

const MIN_GROUP_SIZE: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorType {
    #[default]
    Single,
    Multiple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCodeForm {
    pub visitor_name: String,
    pub visit_purpose: String,
    pub notes: String,
    pub visitor_type: VisitorType,
    /// Raw text input; only parsed for multiple visitors.
    pub visitor_count: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for CreateCodeForm {
    fn default() -> Self {
        Self {
            visitor_name: String::new(),
            visit_purpose: String::new(),
            notes: String::new(),
            visitor_type: VisitorType::Single,
            visitor_count: MIN_GROUP_SIZE.to_string(),
            start_time: None,
            end_time: None,
        }
    }
}

impl CreateCodeForm {
    fn is_multiple(&self) -> bool {
        self.visitor_type == VisitorType::Multiple
    }

    fn group_size(&self) -> Option<u32> {
        self.visitor_count
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= MIN_GROUP_SIZE)
    }

    /// Builds the request body, or the message to show instead.
    pub fn validate(&self) -> Result<CreateCodeRequest, &'static str> {
        if self.visitor_name.trim().is_empty() {
            return Err(REQUIRED_FIELDS_MESSAGE);
        }
        let visitor_count = if self.is_multiple() {
            Some(self.group_size().ok_or(VISITOR_COUNT_MESSAGE)?)
        } else {
            None
        };

        Ok(CreateCodeRequest {
            visitor_name: self.visitor_name.clone(),
            visit_purpose: self.visit_purpose.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            notes: self.notes.clone(),
            multiple_persons: self.is_multiple(),
            visitor_count,
        })
    }

    /// Whether the submit button should be enabled.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// What the success screen shows: the server's code plus what the resident
/// entered locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessCodePayload {
    #[serde(flatten)]
    pub code: CodeData,
    pub notes: String,
    pub is_multiple_visitor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_count: Option<u32>,
}

pub struct CreateCodeController {
    form: CreateCodeForm,
    status: FormStatus,
    mutation: Mutation<CreateCodeRequest, CodeData>,
    navigator: Navigator,
}

impl CreateCodeController {
    pub fn new(client: &QueryClient, navigator: Navigator) -> Self {
        let mutation = client
            .use_post("access-codes")
            .invalidates("access-codes")
            .invalidates("stats");
        Self {
            form: CreateCodeForm::default(),
            status: FormStatus::default(),
            mutation,
            navigator,
        }
    }

    pub fn form(&self) -> &CreateCodeForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut CreateCodeForm {
        &mut self.form
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.status.toast()
    }

    pub fn dismiss_toast(&mut self) {
        self.status.dismiss_toast();
    }

    pub fn is_pending(&self) -> bool {
        self.mutation.is_pending()
    }

    /// Validates, creates the code and navigates to the success screen.
    pub async fn submit(&mut self) -> Result<SuccessCodePayload, Toast> {
        self.status.validating();
        let request = match self.form.validate() {
            Ok(request) => request,
            Err(message) => return Err(self.status.rejected(Toast::danger(message))),
        };

        self.status.submitting();
        let code = match self.mutation.mutate_async(&request).await {
            Ok(envelope) => envelope.into_data(),
            Err(e) => {
                tracing::debug!(kind = %e.kind, "code generation failed");
                return Err(self
                    .status
                    .rejected(Toast::from_error(&e, GENERATE_FAILED_MESSAGE)));
            }
        };

        let payload = SuccessCodePayload {
            code,
            notes: self.form.notes.clone(),
            is_multiple_visitor: request.multiple_persons,
            visitor_count: request.visitor_count,
        };
        self.status.succeeded(None);
        self.navigator
            .push(Route::SuccessCode(Box::new(payload.clone())));
        Ok(payload)
    }
}

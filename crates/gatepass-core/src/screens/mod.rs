//! Screen controllers.
//!
//! Each controller owns its form state and walks the same machine:
//! `Idle -> Validating -> Submitting -> Succeeded`, or back to `Idle` with a
//! [`Toast`] when validation or the request fails. Validation is local and
//! never touches the network.

use std::fmt;

pub mod auth;
pub mod create_code;
pub mod dashboard;
mod format;
pub mod manage_codes;
pub mod navigation;
pub mod profile;

use crate::api::{ApiError, ApiErrorKind};

pub use format::{capitalize_first_letter, format_date, format_timestamp};
pub use navigation::{Navigator, Route};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Success,
    Danger,
}

/// Transient notification shown by a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub tone: ToastTone,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: ToastTone::Success,
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: ToastTone::Danger,
        }
    }

    /// Toast for a failed request. Server-side failures use the screen's
    /// `fallback`; everything else uses the error's own user message.
    pub fn from_error(err: &ApiError, fallback: &str) -> Self {
        match err.kind {
            ApiErrorKind::Server | ApiErrorKind::Parse => Self::danger(fallback),
            _ => {
                let message = err.user_message();
                if message.trim().is_empty() {
                    Self::danger(fallback)
                } else {
                    Self::danger(message)
                }
            }
        }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Shared phase/toast bookkeeping for form screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    phase: Phase,
    toast: Option<Toast>,
}

impl FormStatus {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    pub(crate) fn validating(&mut self) {
        self.phase = Phase::Validating;
        self.toast = None;
    }

    pub(crate) fn submitting(&mut self) {
        self.phase = Phase::Submitting;
    }

    pub(crate) fn succeeded(&mut self, toast: Option<Toast>) {
        self.phase = Phase::Succeeded;
        self.toast = toast;
    }

    /// Back to `Idle` with `toast`; returns it for the caller to propagate.
    pub(crate) fn rejected(&mut self, toast: Toast) -> Toast {
        self.phase = Phase::Idle;
        self.toast = Some(toast.clone());
        toast
    }
}

/// True when every field has non-blank text.
pub(crate) fn all_filled<S: AsRef<str>>(fields: &[S]) -> bool {
    fields.iter().all(|f| !f.as_ref().trim().is_empty())
}

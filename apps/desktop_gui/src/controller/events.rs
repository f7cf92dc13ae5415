//! UI/backend events and error modeling for the desktop controller.

use shared::domain::Guest;

pub enum UiEvent {
    Info(String),
    RsvpAccepted { name: String },
    RsvpFailed(UiError),
    AdminLoginOk,
    AdminLoginFailed(UiError),
    GuestListLoaded(Vec<Guest>),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Startup,
    SubmitRsvp,
    AdminLogin,
    GuestList,
    DeleteGuest,
}

pub fn classify_sign_in_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("invalid admin credentials") {
        "Wrong password; try again.".to_string()
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Guest store unreachable; check URL/network and retry sign-in.".to_string()
    } else {
        format!("Sign-in error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid admin credentials")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("401")
            || message_lower.contains("403")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid rsvp")
            || message_lower.contains("party size")
            || message_lower.contains("must not be empty")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("transport")
            || message_lower.contains("connect")
            || message_lower.contains("change feed")
            || message_lower.contains("network")
            || message_lower.contains("unavailable")
            || message_lower.contains("timed out")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

use serde::{Deserialize, Serialize};

/// Error body returned by the store's REST surface on a rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl StoreErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

/// Error body returned by the auth endpoint on a rejected grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl AuthErrorBody {
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: Some(description.into()),
        }
    }

    pub fn describe(&self) -> &str {
        self.error_description.as_deref().unwrap_or(&self.error)
    }
}

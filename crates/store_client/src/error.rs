use thiserror::Error;

/// Failures of the store's insert/select/delete surface and change feed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The submission was rejected locally, before any network round-trip.
    #[error("invalid rsvp: {0}")]
    InvalidRsvp(String),
    #[error("store transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("change feed failure: {0}")]
    ChangeFeed(String),
}

/// Failures of the admin password grant.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid admin credentials")]
    InvalidCredentials,
    #[error("auth transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("auth service rejected the request with status {status}: {message}")]
    Service { status: u16, message: String },
}

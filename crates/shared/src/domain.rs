use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque row identifier assigned by the hosted store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub String);

impl GuestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Party sizes offered by the RSVP form selector.
pub const PARTY_SIZE_CHOICES: [i64; 4] = [1, 2, 3, 4];

pub fn is_valid_party_size(guests: i64) -> bool {
    PARTY_SIZE_CHOICES.contains(&guests)
}

/// One confirmed attendance row from the `guests` table.
///
/// `confirmation_date` and `created_at` are server-assigned; the former is
/// the descending sort key for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    pub email: String,
    pub guests: i64,
    pub confirmation_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a new RSVP; everything else is store-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRsvp {
    pub name: String,
    pub email: String,
    pub guests: i64,
}

/// Bearer session returned by the admin password grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

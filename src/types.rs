use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversation scope that owns a set of place records.
///
/// Messages sent in a group are scoped to the group id, so every participant
/// reads and edits the same list; direct messages are scoped to the user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerId {
    User(String),
    Group(String),
}

impl OwnerId {
    /// Stable storage key, e.g. `user:U1234` or `group:G1234`.
    pub fn as_key(&self) -> String {
        match self {
            OwnerId::User(id) => format!("user:{}", id),
            OwnerId::Group(id) => format!("group:{}", id),
        }
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A verified text message handed over by the webhook boundary.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub owner: OwnerId,
    pub text: String,
    pub reply_token: String,
}

use serde::{Deserialize, Serialize};

/// Path dependents should return to once a session is invalidated.
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    Logout,
    Expired,
}

/// Session lifecycle notifications.
///
/// Subsystems holding state derived from the signed-in user reset it when
/// they receive `Invalidated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Established {
        session_id: String,
    },
    UserUpdated {
        session_id: Option<String>,
    },
    Invalidated {
        reason: InvalidationReason,
        redirect_to: String,
    },
}

impl SessionEvent {
    pub(crate) fn invalidated(reason: InvalidationReason) -> Self {
        SessionEvent::Invalidated {
            reason,
            redirect_to: ROOT_PATH.to_string(),
        }
    }
}

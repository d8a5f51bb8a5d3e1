use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The authenticated identity: whatever the backend put in `employee_data`,
/// plus the fields the session manager stamps in.
pub type UserRecord = Map<String, Value>;

/// Field names the session manager adds to the identity.
pub const LOGIN_TIME_FIELD: &str = "loginTime";
pub const SESSION_ID_FIELD: &str = "sessionId";
pub const LAST_UPDATED_FIELD: &str = "lastUpdated";

/// Response body of the login endpoint, kept unmodified for the session.
///
/// Unknown fields are preserved so the stored copy matches what the server
/// sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(type = "Record<string, unknown> | null"))]
    pub employee_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl LoginResponse {
    /// The identity payload, if this response describes a successful login.
    ///
    /// Requires `success == true` and a non-empty `employee_data` object.
    pub fn identity(&self) -> Option<&UserRecord> {
        if self.success != Some(true) {
            return None;
        }
        match &self.employee_data {
            Some(Value::Object(data)) if !data.is_empty() => Some(data),
            _ => None,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.identity().is_some()
    }
}

//! Data models shared between the session manager and its consumers.
//!
//! - `LoginResponse`: the raw authentication endpoint response
//! - `UserRecord`: the open-ended identity map kept for the session

pub mod login;

pub use login::{LoginResponse, UserRecord};

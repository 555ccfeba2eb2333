//! User Model (collaborator data)
//!
//! The core only reads profile fields and mutates `balance`; everything else
//! belongs to the out-of-scope user directory.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// User ID type
pub type UserId = RecordId;

/// System roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Shipper,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_record_id"
    )]
    pub id: Option<UserId>,
    pub fullname: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub balance: f64,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

/// Seed payload for tests and collaborator bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub fullname: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub balance: f64,
}

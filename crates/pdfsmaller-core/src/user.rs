//! User record as returned by the auth endpoints and kept in the session store

use crate::plan::Plan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric ids come from the demo service and older servers, string ids from newer ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId::Number(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub plan: Plan,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: &str, email: &str, plan: Plan) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            email: email.to_string(),
            plan,
        }
    }

    /// First letter of the display name, upper-cased, for the avatar badge
    pub fn initials(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

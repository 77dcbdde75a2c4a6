//! Employee Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organisational role, used for authorization and notification audiences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "employee_role", rename_all = "snake_case")
)]
pub enum Role {
    Employee,
    Manager,
    Hr,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Hr => "hr",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            "hr" => Ok(Role::Hr),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Employee entity (without credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub position: String,
    pub department_id: Option<i64>,
    /// Direct manager; `None` for the top of a reporting chain
    pub manager_id: Option<i64>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: i64,
}

impl Employee {
    pub fn has_manager(&self) -> bool {
        self.manager_id.is_some()
    }
}

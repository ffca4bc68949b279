//! Operator identity.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::UserId;

/// An operator who records observations and performs regenerations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Actors are validated before every mutating operation.
    pub fn validate(&self) -> Result<()> {
        if !self.id.is_assigned() {
            return Err(Error::Validation(format!("invalid user id: {}", self.id)));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("user name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Read access to the operator directory.
///
/// Implemented by the storage layer; injected where operator names have to
/// be resolved for display.
pub trait UserDirectory {
    /// Fetches a single operator. Unknown ids are a [`Error::NotFound`].
    fn user(&self, id: UserId) -> Result<User>;

    /// Lists all known operators.
    fn users(&self) -> Result<Vec<User>>;
}

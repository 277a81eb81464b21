//! Status codes and error types.
//!
//! Domain refusals (`UNAUTHORIZED`, `ROLES_ALREADY_EXISTS`, `ROLES_NOT_FOUND`,
//! `ROLES_INVALID_INVOCATION`) are ordinary values of [`RolesError`] that
//! callers branch on. They never abort the caller and never leave partial
//! state behind.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{Address, Capability};

/// Offset that keeps role-registry codes apart from other subsystems' codes.
pub const ERROR_SCOPE_ROLES: u32 = 20000;

/// Numeric outcome of a registry or adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum StatusCode {
    Unauthorized = 0,
    Ok = 1,
    RolesAlreadyExists = ERROR_SCOPE_ROLES + 1,
    RolesInvalidInvocation = ERROR_SCOPE_ROLES + 2,
    RolesNotFound = ERROR_SCOPE_ROLES + 3,
}

impl StatusCode {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// The constant name, e.g. `ROLES_NOT_FOUND`.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Unauthorized => "UNAUTHORIZED",
            StatusCode::Ok => "OK",
            StatusCode::RolesAlreadyExists => "ROLES_ALREADY_EXISTS",
            StatusCode::RolesInvalidInvocation => "ROLES_INVALID_INVOCATION",
            StatusCode::RolesNotFound => "ROLES_NOT_FOUND",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown status code: {0}")]
pub struct UnknownStatusCode(pub u32);

impl TryFrom<u32> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StatusCode::Unauthorized),
            1 => Ok(StatusCode::Ok),
            c if c == ERROR_SCOPE_ROLES + 1 => Ok(StatusCode::RolesAlreadyExists),
            c if c == ERROR_SCOPE_ROLES + 2 => Ok(StatusCode::RolesInvalidInvocation),
            c if c == ERROR_SCOPE_ROLES + 3 => Ok(StatusCode::RolesNotFound),
            other => Err(UnknownStatusCode(other)),
        }
    }
}

pub type RolesResult<T> = std::result::Result<T, RolesError>;

/// A refused registry or adapter operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RolesError {
    #[error("Unauthorized: {caller} may not call {capability}")]
    Unauthorized {
        caller: Address,
        capability: Capability,
    },

    #[error("Role already present")]
    AlreadyExists,

    #[error("Role not present")]
    NotFound,

    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),
}

impl RolesError {
    pub fn status(&self) -> StatusCode {
        match self {
            RolesError::Unauthorized { .. } => StatusCode::Unauthorized,
            RolesError::AlreadyExists => StatusCode::RolesAlreadyExists,
            RolesError::NotFound => StatusCode::RolesNotFound,
            RolesError::InvalidInvocation(_) => StatusCode::RolesInvalidInvocation,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RolesError::Unauthorized { .. })
    }
}

/// Status code view of an operation result: `OK` on success.
pub fn status_of<T>(result: &RolesResult<T>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::Ok,
        Err(e) => e.status(),
    }
}

/// Failure to parse an identifier, role or bitset from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Role out of range 0..=255: {0}")]
    RoleOutOfRange(String),

    #[error("Invalid capability, expected target:selector: {0}")]
    InvalidCapability(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),
}

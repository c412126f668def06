//! Unified error types for the ambassador coupon system.
//!
//! Every fallible operation in the crate returns [`Result`]. Store errors are
//! wrapped transparently; everything else carries enough context to produce a
//! human-readable message for an administrator.

use thiserror::Error;

/// All errors the crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database / ORM failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A mutation violated an invariant and was rolled back
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason shown to the administrator
        message: String,
    },

    /// No partner row with this id
    #[error("Partner not found: {id}")]
    PartnerNotFound {
        /// Partner id that was looked up
        id: i64,
    },

    /// No discount code row with this id
    #[error("Discount code not found: {id}")]
    DiscountCodeNotFound {
        /// Discount code id that was looked up
        id: i64,
    },

    /// No usage record row with this id
    #[error("Usage record not found: {id}")]
    UsageRecordNotFound {
        /// Usage record id that was looked up
        id: i64,
    },

    /// The partner exists but is not flagged as an ambassador
    #[error("Partner {id} is not an ambassador")]
    NotAnAmbassador {
        /// Partner id
        id: i64,
    },

    /// A discount code with this name already exists
    #[error("Discount code already exists: {name}")]
    DuplicateDiscountCode {
        /// The conflicting code
        name: String,
    },

    /// Usage record status change not permitted by the lifecycle
    #[error("Invalid usage state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// I/O failure (config file, listener socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a validation failure with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for broker operations.

use broker_core::{OfferStatus, ValidationError};
use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while brokering.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Malformed or out-of-range participant input.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Reference to a request, offer, executor or user that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Offer status change that the lifecycle does not allow.
    #[error("offer {offer_id} cannot move from {from} to {to}")]
    InvalidTransition {
        offer_id: i64,
        from: OfferStatus,
        to: OfferStatus,
    },

    /// Outbound message could not be delivered to one recipient.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Geocoding service failed or answered with garbage.
    #[error("geocoding unavailable: {0}")]
    GeocodeUnavailable(String),

    /// Participant is not allowed to run the operation.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Persistence failure.
    #[error("database error: {0}")]
    Database(DatabaseError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for BrokerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Database(other),
        }
    }
}

//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the dashboard model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An update carried data the reconciler cannot place.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An update was routed to a page that does not hold that kind of state.
    #[error("{update} update does not apply to the {page} page")]
    WrongPage { page: String, update: String },
}

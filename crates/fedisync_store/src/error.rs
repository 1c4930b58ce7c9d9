//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when building or decoding entities.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The value is not a JSON object.
    #[error("entity must be a JSON object, got {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// The object has no usable `id` field.
    #[error("entity has no string or numeric id")]
    MissingId,

    /// The entity could not be decoded into the requested type.
    #[error("cannot decode entity {id}: {message}")]
    Decode {
        /// Id of the entity.
        id: String,
        /// Decoder message.
        message: String,
    },

    /// A typed value could not be encoded as an entity.
    #[error("cannot encode entity: {0}")]
    Encode(String),
}

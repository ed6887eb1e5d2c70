use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::value::ValueType;

/// Errors raised by the collection engine.
///
/// Rejected selection or modification changes are not errors; those are
/// reported through `bool` return values.
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    /// No comparison operators are registered for a value type and no default
    /// set was declared.
    #[error("no comparison operators registered for value type {value_type}")]
    NoOperators { value_type: ValueType },

    /// A filter uses an operator that is not valid for the attribute's type.
    #[error("operator `{operator}` is not applicable to value type {value_type}")]
    OperatorNotApplicable {
        operator: &'static str,
        value_type: ValueType,
    },

    /// A page range reaches past the addressable item-count domain.
    #[error("item index {last_index} exceeds the addressable bound {bound}")]
    CapacityExceeded { last_index: u64, bound: u64 },

    /// The backing strategy does not offer the requested capability.
    #[error("unsupported operation: {capability}")]
    Unsupported { capability: &'static str },

    #[error("page index {0} is below 1")]
    InvalidPageIndex(i64),

    #[error("page size must be greater than zero (got {0})")]
    InvalidPageSize(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure reported by an identifier service, passed through unchanged.
    #[error("service error: {0}")]
    Service(Arc<dyn StdError + Send + Sync>),

    #[error("lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl CollectionError {
    /// Wrap an upstream service failure.
    pub fn service<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CollectionError::Service(Arc::new(err))
    }

    /// Wrap an upstream failure that only carries a message.
    pub fn service_message(message: impl Into<String>) -> Self {
        CollectionError::Service(Arc::new(ServiceMessage(message.into())))
    }

    pub(crate) fn unsupported(capability: &'static str) -> Self {
        CollectionError::Unsupported { capability }
    }

    /// True for the fatal configuration/capacity kinds.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CollectionError::NoOperators { .. }
                | CollectionError::OperatorNotApplicable { .. }
                | CollectionError::CapacityExceeded { .. }
                | CollectionError::Unsupported { .. }
                | CollectionError::Config(_)
        )
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct ServiceMessage(String);

pub type Result<T, E = CollectionError> = std::result::Result<T, E>;

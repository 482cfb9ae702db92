//! # View Errors
//!
//! Most fallible operations in this crate return `eyre::Result` and report
//! malformed input (offsets past the end of a buffer, a value of the wrong
//! shape, an index out of range) with an ad-hoc `eyre!` message.
//!
//! Four conditions are part of the public contract and are raised as a typed
//! [`ViewError`] carried inside the `eyre::Report`, so callers can branch on
//! them:
//!
//! ```ignore
//! match registry.decode(&buf, 0) {
//!     Ok(view) => handle(view),
//!     Err(report) => match report.downcast_ref::<ViewError>() {
//!         Some(ViewError::UnknownTag { tag }) => reject(*tag),
//!         _ => return Err(report),
//!     },
//! }
//! ```
//!
//! | Variant | Raised by | When |
//! |---------|-----------|------|
//! | `InvalidSchema` | `SchemaCompiler` | once, at compile time |
//! | `UnknownTag` | `TagRegistry::decode/encode` | per message |
//! | `InvalidTagDefinition` | `TagRegistry::register*` | at registration |
//! | `CapacityExceeded` | encoders writing into a bounded buffer | per call |

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    InvalidSchema { reason: String },
    UnknownTag { tag: i64 },
    InvalidTagDefinition { tag: Option<i64>, reason: String },
    CapacityExceeded { required: usize, capacity: usize },
}

impl ViewError {
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        ViewError::InvalidSchema {
            reason: reason.into(),
        }
    }

    pub fn invalid_tag(tag: Option<i64>, reason: impl Into<String>) -> Self {
        ViewError::InvalidTagDefinition {
            tag,
            reason: reason.into(),
        }
    }

    pub fn capacity(required: usize, capacity: usize) -> Self {
        ViewError::CapacityExceeded { required, capacity }
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::InvalidSchema { reason } => write!(f, "invalid schema: {}", reason),
            ViewError::UnknownTag { tag } => write!(f, "unknown tag: {}", tag),
            ViewError::InvalidTagDefinition {
                tag: Some(tag),
                reason,
            } => write!(f, "invalid definition for tag {}: {}", tag, reason),
            ViewError::InvalidTagDefinition { tag: None, reason } => {
                write!(f, "invalid tag definition: {}", reason)
            }
            ViewError::CapacityExceeded { required, capacity } => write!(
                f,
                "capacity exceeded: {} bytes required but only {} available",
                required, capacity
            ),
        }
    }
}

impl std::error::Error for ViewError {}

/// Fails with `CapacityExceeded` unless `required` bytes fit in `capacity`.
pub(crate) fn ensure_capacity(required: usize, capacity: usize) -> eyre::Result<()> {
    if required > capacity {
        return Err(ViewError::capacity(required, capacity).into());
    }
    Ok(())
}

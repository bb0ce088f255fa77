use std::fmt;

/// Errors returned by the public [`crate::Index`] surface and the concrete
/// index types underneath it.
///
/// This set is intentionally closed and small: every fallible operation in
/// this crate returns one of these four kinds, never a boxed trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A prefix length exceeded the family maximum, a byte buffer had the
    /// wrong length, a next-hop didn't fit in 30 bits for a DIR-24-8 index,
    /// the algorithm is incompatible with the address family, or a
    /// zero-sized hot cache / result set was requested.
    ValidationError,
    /// Growing an arena (or the tbl8 pool) failed.
    OutOfMemory,
    /// `delete` was called for a `(prefix, length)` that is not bound.
    NotFound,
    /// A multi-answer lookup produced more matches than its result set's
    /// fixed capacity.
    CapacityExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ValidationError => {
                write!(f, "Error: the request failed validation.")
            }
            ErrorKind::OutOfMemory => {
                write!(f, "Error: arena growth failed.")
            }
            ErrorKind::NotFound => {
                write!(f, "Error: the prefix was not found.")
            }
            ErrorKind::CapacityExceeded => {
                write!(
                    f,
                    "Error: the result set's capacity was exceeded."
                )
            }
        }
    }
}

impl std::error::Error for ErrorKind {}

pub type Result<T> = std::result::Result<T, ErrorKind>;

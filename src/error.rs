//! Error types for the Oracle marshaling layer.

use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for driver operations.
///
/// Errors are always surfaced to the caller as data; no path panics.
/// A "success with additional info" native status is not represented here —
/// it travels alongside a successful result (see `Connection::info`).
#[derive(Error, Debug)]
pub enum Error {
    /// Non-success status from a native call, with the native code and text.
    #[error("code {code}, message {message}")]
    Oracle { code: i32, message: String },

    /// Buffer allocation failure.
    #[error("could not allocate {bytes} bytes")]
    Allocation { bytes: usize },

    /// `execute` or `cursor_open` was called while a cursor is open.
    #[error("there is a cursor opened")]
    CursorAlreadyOpen,

    /// `cursor_fetch` or `cursor_close` was called with no open cursor.
    #[error("there is no open cursor")]
    NoOpenCursor,

    /// `cursor_open` was called with a statement that produces no rows.
    #[error("invalid statement type")]
    InvalidStatementType,

    /// The connection was already closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A descriptor reached a state its type tag says is impossible.
    #[error("UNREACHABLE: {message}")]
    Unreachable { message: String },

    /// Host value could not be coerced to the requested bind type.
    #[error("type conversion error: {message}")]
    TypeConversion { message: String },

    /// Value outside the range of the native decimal encoding.
    #[error("numeric value out of range for native encoding")]
    NumericRange,
}

impl Error {
    /// Create a native-status error.
    pub fn oracle(code: i32, message: impl Into<String>) -> Self {
        Self::Oracle {
            code,
            message: message.into(),
        }
    }

    /// Create an allocation error for a buffer of `bytes` bytes.
    pub fn allocation(bytes: usize) -> Self {
        Self::Allocation { bytes }
    }

    /// Create a programming-invariant violation error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }
}

use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Failure while encoding or decoding the binary stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} available")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Variable-length integer overflows {bits} bits")]
    VarIntOverflow { bits: u32 },

    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("Invalid char code point {0:#x}")]
    InvalidChar(u64),

    #[error("Invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    #[error("Property index {index} is not after index {last}")]
    IndexOutOfOrder { index: u32, last: u32 },

    #[error("Record is closed by its remainder")]
    RecordClosed,

    #[error("Record body declares {declared} bytes but only {remaining} remain")]
    TruncatedRecord { declared: u64, remaining: usize },

    #[error("Length {0} does not fit in memory")]
    LengthOverflow(u64),
}

pub type StreamResult<T> = Result<T, StreamError>;

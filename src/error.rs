#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Field widths exceed the supported 4-byte codec ceiling.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("{field} value {value} outside [0, {max}]")]
    OutOfRange {
        field: &'static str,
        value: i128,
        max: u64,
    },

    #[error("negative {field}: {value}")]
    NegativeOperand { field: &'static str, value: i64 },

    #[error("underflow")]
    Underflow,
    #[error("overflow")]
    Overflow,

    #[error("not enough bytes at offset {offset}: need {needed}, have {available}")]
    BufferTooShort {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unparseable time value {value:?}: {reason}")]
    ParseError { value: String, reason: String },

    /// Unsupported static configuration, e.g. a float extractor that is
    /// neither single nor double width. Indicates a setup problem rather
    /// than bad data; fail fast at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No usable correlation table entries for the requested conversion.
    #[error("no SCLK/SCET correlation available")]
    CorrelationUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Non-fatal anomaly met while decoding a frame.
///
/// Decoding always continues past a warning; the caller decides whether to
/// log it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeWarning {
    /// An escape byte was followed by an unknown selector. Both bytes were
    /// kept in the payload as received.
    #[error("unknown escape sequence 91 {selector:02x} at frame offset {offset}")]
    EscapeAnomaly { selector: u8, offset: usize },

    /// The data field was longer than four bytes; only the first four were
    /// used.
    #[error("data field is {len} bytes long, truncated to 4")]
    DataTooLong { len: usize },
}

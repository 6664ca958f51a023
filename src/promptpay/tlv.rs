//! Tag-length-value elements of an EMV merchant-presented QR payload.
//!
//! Every element is a two-digit tag, a two-digit decimal length counting the
//! characters of the value, and the value itself. Values may themselves be a
//! run of nested elements (tag 29 for PromptPay).

use std::fmt;
use thiserror::Error;

/// Largest value a two-digit length field can describe.
pub const MAX_VALUE_LEN: usize = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Leaf { tag: &'static str, value: String },
    Nested { tag: &'static str, children: Vec<Field> },
}

impl Field {
    pub fn leaf(tag: &'static str, value: impl Into<String>) -> Self {
        Field::Leaf {
            tag,
            value: value.into(),
        }
    }

    pub fn nested(tag: &'static str, children: Vec<Field>) -> Self {
        Field::Nested { tag, children }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Field::Leaf { tag, .. } | Field::Nested { tag, .. } => tag,
        }
    }

    /// Serialize this element, children first.
    ///
    /// Fails with [`TlvError::ValueTooLong`] when the value (or the run of
    /// serialized children) does not fit a two-digit length.
    pub fn serialize(&self) -> Result<String, TlvError> {
        let value = match self {
            Field::Leaf { value, .. } => value.clone(),
            Field::Nested { children, .. } => serialize(children)?,
        };
        if value.len() > MAX_VALUE_LEN {
            return Err(TlvError::ValueTooLong {
                tag: self.tag().to_string(),
                len: value.len(),
            });
        }
        Ok(format!("{}{:02}{}", self.tag(), value.len(), value))
    }
}

/// Concatenate serialized elements in order.
pub fn serialize(fields: &[Field]) -> Result<String, TlvError> {
    fields.iter().map(Field::serialize).collect()
}

/// One element read back from a payload string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub tag: String,
    pub value: String,
}

impl RawField {
    /// Parse this element's value as a nested run of elements.
    pub fn children(&self) -> Result<Vec<RawField>, TlvError> {
        parse(&self.value)
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:02}) {}", self.tag, self.value.len(), self.value)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TlvError {
    #[error("payload contains non-ASCII characters")]
    NonAscii,
    #[error("truncated element header at offset {0}")]
    TruncatedHeader(usize),
    #[error("invalid length field {len:?} at offset {offset}")]
    BadLength { offset: usize, len: String },
    #[error("element {tag} at offset {offset} runs past the end of the payload")]
    Overrun { tag: String, offset: usize },
    #[error("element {tag} value is {len} characters, at most 99 fit")]
    ValueTooLong { tag: String, len: usize },
}

/// Split a payload (or a nested value) into its top-level elements.
pub fn parse(input: &str) -> Result<Vec<RawField>, TlvError> {
    if !input.is_ascii() {
        return Err(TlvError::NonAscii);
    }
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < input.len() {
        if input.len() - offset < 4 {
            return Err(TlvError::TruncatedHeader(offset));
        }
        let tag = &input[offset..offset + 2];
        let len_str = &input[offset + 2..offset + 4];
        let len: usize = len_str
            .parse()
            .ok()
            .filter(|_| len_str.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| TlvError::BadLength {
                offset,
                len: len_str.to_string(),
            })?;
        let start = offset + 4;
        let end = start + len;
        if end > input.len() {
            return Err(TlvError::Overrun {
                tag: tag.to_string(),
                offset,
            });
        }
        out.push(RawField {
            tag: tag.to_string(),
            value: input[start..end].to_string(),
        });
        offset = end;
    }
    Ok(out)
}

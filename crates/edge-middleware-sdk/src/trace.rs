//! W3C trace context propagation
//!
//! A `TraceContext` is derived for every request: a child of the caller's
//! `traceparent` header when it is well-formed, a fresh root otherwise. The
//! runtime forwards it to backing services so their work lands in the same
//! trace.

use std::fmt;
use uuid::Uuid;

const SUPPORTED_VERSION: &str = "00";
const INVALID_VERSION: &str = "ff";
const SAMPLED_FLAG: u8 = 0x01;

/// Parsed `traceparent` value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    flags: u8,
}

impl TraceContext {
    /// Start a new sampled trace with random identifiers
    pub fn new_root() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
            flags: SAMPLED_FLAG,
        }
    }

    /// Parse a `traceparent` header value.
    ///
    /// Returns `None` for anything a W3C participant must ignore: wrong field
    /// lengths, uppercase or non-hex digits, all-zero ids, version `ff`, or
    /// trailing fields on a version `00` header.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if !is_lower_hex(version, 2) || version == INVALID_VERSION {
            return None;
        }
        if version == SUPPORTED_VERSION && parts.next().is_some() {
            return None;
        }
        if !is_lower_hex(trace_id, 32) || is_all_zero(trace_id) {
            return None;
        }
        if !is_lower_hex(span_id, 16) || is_all_zero(span_id) {
            return None;
        }
        if !is_lower_hex(flags, 2) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags: u8::from_str_radix(flags, 16).ok()?,
        })
    }

    /// Continue the caller's trace, or start a new one if the header is
    /// missing or unusable.
    pub fn from_header(header: Option<&str>) -> Self {
        header
            .and_then(Self::parse)
            .map(|parent| parent.child())
            .unwrap_or_else(Self::new_root)
    }

    /// Same trace and flags, new span id
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
            flags: self.flags,
        }
    }

    /// 32 hex digit trace identifier
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// 16 hex digit span identifier
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn is_sampled(&self) -> bool {
        self.flags & SAMPLED_FLAG != 0
    }

    /// Header value in version `00` format
    pub fn traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, self.flags
        )
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.traceparent())
    }
}

fn new_span_id() -> String {
    // The v4 version nibble sits inside the first 16 digits, so this is never all zero.
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_all_zero(value: &str) -> bool {
    value.bytes().all(|b| b == b'0')
}

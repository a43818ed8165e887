//! Error codes for the diagnostic system.
//!
//! Error codes are organized by stage:
//! - `E1xx` - Markup scanning
//! - `E2xx` - Layout
//! - `E3xx` - Transport

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Markup Errors (E1xx)
    // =========================================================================
    /// Malformed markup.
    ///
    /// A tag could not be matched into a complete element: a node that is
    /// never closed before the next element starts, a stray closing tag, or a
    /// group nested inside another group.
    E100,

    /// Missing required attribute.
    ///
    /// `node` requires `id`, `row` and `col`; `group` requires `id`; `edge`
    /// requires `from` and `to`.
    E101,

    /// Invalid attribute value.
    ///
    /// An attribute was present but could not be interpreted, for example a
    /// non-integer `row`, or an unknown edge `dir`.
    E102,

    /// Unknown element type.
    ///
    /// A node `type` outside the known categories; the node is kept and
    /// rendered with the fallback category.
    E103,

    /// Duplicate element id.
    ///
    /// An element reused an id that already exists in the session.
    E104,

    // =========================================================================
    // Layout Errors (E2xx)
    // =========================================================================
    /// Out-of-range coordinate.
    ///
    /// A logical row or column exceeded the configured clamp bound and was
    /// clamped.
    E200,

    /// Overlap detected.
    ///
    /// Two stacked elements in one column overlapped and the lower one was
    /// moved down.
    E201,

    /// Unresolved reference.
    ///
    /// An edge referenced an element that was never created in the session.
    E202,

    // =========================================================================
    // Transport Errors (E3xx)
    // =========================================================================
    /// Stream transport failure.
    ///
    /// The upstream text stream failed. This is the only terminal condition.
    E300,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E300 => "E300",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "malformed markup",
            ErrorCode::E101 => "missing required attribute",
            ErrorCode::E102 => "invalid attribute value",
            ErrorCode::E103 => "unknown element type",
            ErrorCode::E104 => "duplicate element id",
            ErrorCode::E200 => "out-of-range coordinate",
            ErrorCode::E201 => "overlap detected",
            ErrorCode::E202 => "unresolved reference",
            ErrorCode::E300 => "stream transport failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Labeled source spans for diagnostic messages.

use crate::span::Span;

/// Role of a label within its diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// The markup that caused the diagnostic.
    Cause,
    /// Context, such as where a group was opened.
    Context,
}

/// A message attached to a byte range of the stream buffer.
#[derive(Debug, Clone)]
pub struct Label {
    span: Span,
    message: String,
    role: Role,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self::with_role(span, message, Role::Cause)
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self::with_role(span, message, Role::Context)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Cause
    }

    pub fn is_secondary(&self) -> bool {
        self.role == Role::Context
    }

    fn with_role(span: Span, message: impl Into<String>, role: Role) -> Self {
        Self {
            span,
            message: message.into(),
            role,
        }
    }
}

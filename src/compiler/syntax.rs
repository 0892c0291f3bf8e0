use std::fmt::{self, Display, Formatter};

use crate::common::span::Span;

/// Represents a static error found while compiling:
/// a lexical error the tokenizer cannot scan past, or the
/// syntax error that aborts a parse. The first one produced
/// ends the compilation; there is no recovery or multi-error
/// collection at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub reason: String,
    pub span: Span,
}

impl Syntax {
    pub fn error(reason: &str, span: Span) -> Syntax {
        Syntax {
            reason: reason.to_string(),
            span,
        }
    }
}

impl Display for Syntax {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.span.is_dummy() {
            write!(f, "Syntax Error: {}", self.reason)
        } else {
            write!(f, "Syntax Error: {}: {}", self.span, self.reason)
        }
    }
}

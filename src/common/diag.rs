use std::{
    cell::RefCell,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

use crate::common::span::Span;

/// One reported problem: a message template, the text being
/// complained about, and where it happened. A `%` in the
/// template stands for the quoted text, so
/// `("%: illegal escape character", "\\x", ..)` renders as
/// `\x: illegal escape character`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub template: String,
    pub quoted: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.template.replace('%', &self.quoted)
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: {}: {}", self.span, self.message())
    }
}

/// The diagnostics sink. Each stage that can complain holds a
/// handle to the session's one `Reporter`; cloning the handle
/// shares the underlying list, so the lexer, parser, and
/// resolver all feed one ordered stream of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    diags: Rc<RefCell<Vec<Diagnostic>>>,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    /// Records one diagnostic. Surfacing is the caller's business;
    /// the compiler core only ever calls this.
    pub fn report(&self, template: &str, quoted: &str, span: Span) {
        self.diags.borrow_mut().push(Diagnostic {
            template: template.to_string(),
            quoted: quoted.to_string(),
            span,
        });
    }

    pub fn count(&self) -> usize {
        self.diags.borrow().len()
    }

    pub fn is_clean(&self) -> bool {
        self.diags.borrow().is_empty()
    }

    /// A copy of everything reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diags.borrow().clone()
    }
}

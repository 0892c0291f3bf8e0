use std::fmt::{self, Display, Formatter};

use crate::common::span::{Span, Spanned};

/// A stable index into the declaration table built by the
/// resolver. Identifier uses carry one of these after
/// decoration instead of a pointer back into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub usize);

/// The static types of the language. `Array` carries its
/// element type and the declared size; `None` is the legal
/// empty-size marker (`int a[]` as a parameter). `Error` is the
/// poisoned type the resolver hands out when it cannot do
/// better.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Void,
    Bool,
    Int,
    Float,
    /// The type of a string literal. Not declarable; it exists
    /// so literals can be decorated and passed to the built-in
    /// output functions.
    Str,
    Array(Box<Ty>, Option<u32>),
    Error,
}

impl Ty {
    pub fn is_array(&self) -> bool {
        matches!(self, Ty::Array(..))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Int | Ty::Float)
    }

    /// The element type of an array, or the type itself for
    /// scalars; keeps promotion and instruction selection from
    /// caring which one they got.
    pub fn element(&self) -> &Ty {
        match self {
            Ty::Array(elem, _) => elem,
            other => other,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Bool => write!(f, "boolean"),
            Ty::Int => write!(f, "int"),
            Ty::Float => write!(f, "float"),
            Ty::Str => write!(f, "string"),
            Ty::Array(elem, Some(n)) => write!(f, "{}[{}]", elem, n),
            Ty::Array(elem, None) => write!(f, "{}[]", elem),
            Ty::Error => write!(f, "<error>"),
        }
    }
}

/// One whole compilation unit: the top-level declarations in
/// source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Spanned<Decl>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    /// A global variable. Locals live inside `Block`s.
    Var(VarDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub ty: Spanned<Ty>,
    pub name: Spanned<String>,
    pub params: Vec<Spanned<ParaDecl>>,
    /// Always a `Stmt::Compound`.
    pub body: Spanned<Stmt>,
    pub id: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParaDecl {
    pub ty: Spanned<Ty>,
    pub name: Spanned<String>,
    pub id: Option<DeclId>,
}

/// A variable declarator: the (possibly array-suffixed) type,
/// the name, and the optional initializer — either a single
/// expression or an `Init` list for aggregates. One source
/// line `int i, j;` produces one `VarDecl` per declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: Spanned<Ty>,
    pub name: Spanned<String>,
    pub init: Option<Spanned<Expr>>,
    pub id: Option<DeclId>,
}

/// A compound statement's contents: local declarations first,
/// then statements, the way the grammar orders them. Each block
/// is one lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub decls: Vec<Spanned<VarDecl>>,
    pub stmts: Vec<Spanned<Stmt>>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty() && self.stmts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Compound(Block),
    If {
        cond: Spanned<Expr>,
        then: Box<Spanned<Stmt>>,
        alt: Option<Box<Spanned<Stmt>>>,
    },
    While {
        cond: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },
    For {
        init: Option<Spanned<Expr>>,
        cond: Option<Spanned<Expr>>,
        step: Option<Spanned<Expr>>,
        body: Box<Spanned<Stmt>>,
    },
    Break,
    Continue,
    Return(Option<Spanned<Expr>>),
    Expr(Spanned<Expr>),
    /// A bare `;`.
    Empty,
}

/// An identifier in use position, plus the declaration the
/// resolver bound it to.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub spelling: String,
    pub span: Span,
    pub decl: Option<DeclId>,
}

impl Name {
    pub fn new(spelling: &str, span: Span) -> Name {
        Name {
            spelling: spelling.to_string(),
            span,
            decl: None,
        }
    }
}

/// An expression: its syntactic shape plus the static type the
/// resolver decorates it with. The parser always leaves `ty`
/// as `None`; code generation requires it to be `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Ty>,
}

impl Expr {
    pub fn untyped(kind: ExprKind) -> Expr {
        Expr { kind, ty: None }
    }

    pub fn typed(kind: ExprKind, ty: Ty) -> Expr {
        Expr { kind, ty: Some(ty) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
    Var(Name),
    Index {
        array: Name,
        index: Box<Spanned<Expr>>,
    },
    Call {
        callee: Name,
        args: Vec<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Assign {
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    /// A brace-delimited aggregate initializer.
    Init(Vec<Spanned<Expr>>),
    /// Explicit numeric promotion, inserted by the resolver
    /// wherever an int value meets a float context. The code
    /// generator lowers it to one conversion instruction and
    /// never widens on its own.
    IntToFloat(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    LtEq,
    Gt,
    GtEq,
    EqEq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    /// Comparisons materialize a 0/1 result instead of keeping
    /// the operand type.
    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(self, Lt | LtEq | Gt | GtEq | EqEq | NotEq)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let spelling = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            EqEq => "==",
            NotEq => "!=",
            And => "&&",
            Or => "||",
        };
        write!(f, "{}", spelling)
    }
}

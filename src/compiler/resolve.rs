//! The semantic decorator. Runs between parsing and code
//! generation and establishes code generation's precondition:
//! every identifier use holds a `DeclId` into the declaration
//! table, every expression carries its static type, and every
//! place an int value meets a float context gets an explicit
//! `IntToFloat` node.
//!
//! This is deliberately not a full checker. It reports only
//! what it cannot proceed past — an undeclared identifier, a
//! call of something that is not a function, indexing a
//! non-array — and otherwise trusts its input.

use crate::common::{
    diag::Reporter,
    span::{Span, Spanned},
};
use crate::compiler::{
    ast::{Block, Decl, DeclId, Expr, ExprKind, FuncDecl, Program, Stmt, Ty, UnaryOp, VarDecl},
    syntax::Syntax,
};

/// What a declaration is, which decides how code generation
/// loads and stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// A built-in I/O function.
    Builtin,
    Func,
    Global,
    Local,
    Param,
}

/// One row of the declaration table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclInfo {
    pub name: String,
    pub kind: DeclKind,
    /// For variables, the variable's type; for functions, the
    /// return type.
    pub ty: Ty,
    /// Parameter types, for functions.
    pub params: Vec<Ty>,
}

/// The declaration table. Populated once by `resolve`, then
/// read-only: identifier uses point into it by `DeclId`, and
/// code generation looks declarations up by index.
#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<DeclInfo>,
}

impl DeclTable {
    fn push(&mut self, info: DeclInfo) -> DeclId {
        self.decls.push(info);
        DeclId(self.decls.len() - 1)
    }

    pub fn get(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.0]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// Decorates the program in place and returns the table.
/// The reporter receives one diagnostic per hard failure before
/// the `Err` aborts the pipeline, the same contract the parser
/// follows.
pub fn resolve(program: &mut Spanned<Program>, reporter: &Reporter) -> Result<DeclTable, Syntax> {
    let mut resolver = Resolver::new(reporter.clone());
    resolver.walk_program(&mut program.item)?;
    Ok(resolver.table)
}

struct Resolver {
    table: DeclTable,
    /// Innermost scope last; each scope lists the `DeclId`s
    /// declared in it, in declaration order.
    scopes: Vec<Vec<DeclId>>,
    /// Return type of the function being walked, for return-
    /// value promotion.
    current_ret: Ty,
    reporter: Reporter,
}

impl Resolver {
    fn new(reporter: Reporter) -> Resolver {
        let mut resolver = Resolver {
            table: DeclTable::default(),
            scopes: vec![vec![]],
            current_ret: Ty::Void,
            reporter,
        };
        resolver.seed_builtins();
        resolver
    }

    /// The built-in I/O functions every program can call.
    fn seed_builtins(&mut self) {
        let builtins: &[(&str, Ty, &[Ty])] = &[
            ("getInt", Ty::Int, &[]),
            ("putInt", Ty::Void, &[Ty::Int]),
            ("putIntLn", Ty::Void, &[Ty::Int]),
            ("getFloat", Ty::Float, &[]),
            ("putFloat", Ty::Void, &[Ty::Float]),
            ("putFloatLn", Ty::Void, &[Ty::Float]),
            ("putBool", Ty::Void, &[Ty::Bool]),
            ("putBoolLn", Ty::Void, &[Ty::Bool]),
            ("putString", Ty::Void, &[Ty::Str]),
            ("putStringLn", Ty::Void, &[Ty::Str]),
            ("putLn", Ty::Void, &[]),
        ];
        for (name, ret, params) in builtins {
            let id = self.table.push(DeclInfo {
                name: name.to_string(),
                kind: DeclKind::Builtin,
                ty: ret.clone(),
                params: params.to_vec(),
            });
            self.scopes[0].push(id);
        }
    }

    fn failure<T>(&self, template: &str, quoted: &str, span: Span) -> Result<T, Syntax> {
        self.reporter.report(template, quoted, span);
        Err(Syntax::error(&template.replace('%', quoted), span))
    }

    fn declare(&mut self, name: &str, kind: DeclKind, ty: Ty, params: Vec<Ty>) -> DeclId {
        let id = self.table.push(DeclInfo {
            name: name.to_string(),
            kind,
            ty,
            params,
        });
        self.scopes
            .last_mut()
            .expect("the global scope never pops")
            .push(id);
        id
    }

    /// Innermost declaration with this name; later declarations
    /// in a scope shadow earlier ones.
    fn lookup(&self, name: &str) -> Option<DeclId> {
        for scope in self.scopes.iter().rev() {
            for id in scope.iter().rev() {
                if self.table.get(*id).name == name {
                    return Some(*id);
                }
            }
        }
        None
    }

    fn walk_program(&mut self, program: &mut Program) -> Result<(), Syntax> {
        for decl in &mut program.decls {
            match &mut decl.item {
                Decl::Var(var) => self.walk_var_decl(var, DeclKind::Global)?,
                Decl::Func(func) => self.walk_func_decl(func)?,
            }
        }
        Ok(())
    }

    fn walk_var_decl(&mut self, var: &mut VarDecl, kind: DeclKind) -> Result<(), Syntax> {
        let id = self.declare(&var.name.item, kind, var.ty.item.clone(), vec![]);
        var.id = Some(id);

        let declared = var.ty.item.clone();
        if let Some(init) = &mut var.init {
            if let ExprKind::Init(elems) = &mut init.item.kind {
                // aggregate elements promote against the
                // element type, one by one
                for elem in elems.iter_mut() {
                    self.walk_expr(elem)?;
                    promote_if_needed(elem, declared.element());
                }
                init.item.ty = Some(declared);
            } else {
                self.walk_expr(init)?;
                promote_if_needed(init, declared.element());
            }
        }
        Ok(())
    }

    fn walk_func_decl(&mut self, func: &mut FuncDecl) -> Result<(), Syntax> {
        let params = func.params.iter().map(|p| p.item.ty.item.clone()).collect();
        let id = self.declare(
            &func.name.item,
            DeclKind::Func,
            func.ty.item.clone(),
            params,
        );
        func.id = Some(id);

        self.scopes.push(vec![]);
        for param in &mut func.params {
            let param = &mut param.item;
            let id = self.declare(
                &param.name.item,
                DeclKind::Param,
                param.ty.item.clone(),
                vec![],
            );
            param.id = Some(id);
        }

        let enclosing_ret = std::mem::replace(&mut self.current_ret, func.ty.item.clone());
        self.walk_stmt(&mut func.body)?;
        self.current_ret = enclosing_ret;

        self.scopes.pop();
        Ok(())
    }

    fn walk_block(&mut self, block: &mut Block) -> Result<(), Syntax> {
        self.scopes.push(vec![]);
        for decl in &mut block.decls {
            self.walk_var_decl(&mut decl.item, DeclKind::Local)?;
        }
        for stmt in &mut block.stmts {
            self.walk_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &mut Spanned<Stmt>) -> Result<(), Syntax> {
        match &mut stmt.item {
            Stmt::Compound(block) => self.walk_block(block)?,
            Stmt::If { cond, then, alt } => {
                self.walk_expr(cond)?;
                self.walk_stmt(then)?;
                if let Some(alt) = alt {
                    self.walk_stmt(alt)?;
                }
            }
            Stmt::While { cond, body } => {
                self.walk_expr(cond)?;
                self.walk_stmt(body)?;
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                for clause in [init, cond, step].into_iter().flatten() {
                    self.walk_expr(clause)?;
                }
                self.walk_stmt(body)?;
            }
            Stmt::Return(Some(value)) => {
                self.walk_expr(value)?;
                let want = self.current_ret.clone();
                promote_if_needed(value, &want);
            }
            Stmt::Expr(expr) => self.walk_expr(expr)?,
            Stmt::Break | Stmt::Continue | Stmt::Return(None) | Stmt::Empty => {}
        }
        Ok(())
    }

    fn walk_expr(&mut self, expr: &mut Spanned<Expr>) -> Result<(), Syntax> {
        let ty = match &mut expr.item.kind {
            ExprKind::Int(_) => Ty::Int,
            ExprKind::Float(_) => Ty::Float,
            ExprKind::Bool(_) => Ty::Bool,
            ExprKind::Str(_) => Ty::Str,

            ExprKind::Var(name) => {
                let id = match self.lookup(&name.spelling) {
                    Some(id) => id,
                    None => {
                        let spelling = name.spelling.clone();
                        return self.failure("\"%\" is not declared", &spelling, name.span);
                    }
                };
                name.decl = Some(id);
                self.table.get(id).ty.clone()
            }

            ExprKind::Index { array, index } => {
                let id = match self.lookup(&array.spelling) {
                    Some(id) => id,
                    None => {
                        let spelling = array.spelling.clone();
                        return self.failure("\"%\" is not declared", &spelling, array.span);
                    }
                };
                array.decl = Some(id);
                let elem = match &self.table.get(id).ty {
                    Ty::Array(elem, _) => (**elem).clone(),
                    _ => {
                        let spelling = array.spelling.clone();
                        return self.failure("\"%\" is not an array", &spelling, array.span);
                    }
                };
                self.walk_expr(index)?;
                elem
            }

            ExprKind::Call { callee, args } => {
                let id = match self.lookup(&callee.spelling) {
                    Some(id) => id,
                    None => {
                        let spelling = callee.spelling.clone();
                        return self.failure("\"%\" is not declared", &spelling, callee.span);
                    }
                };
                let info = self.table.get(id);
                if !matches!(info.kind, DeclKind::Func | DeclKind::Builtin) {
                    let spelling = callee.spelling.clone();
                    return self.failure("\"%\" is not a function", &spelling, callee.span);
                }
                callee.decl = Some(id);
                let ret = info.ty.clone();
                let params = info.params.clone();
                for (arg, param) in args.iter_mut().zip(params.iter()) {
                    self.walk_expr(arg)?;
                    promote_if_needed(arg, param.element());
                }
                // extra arguments still need decorating
                for arg in args.iter_mut().skip(params.len()) {
                    self.walk_expr(arg)?;
                }
                ret
            }

            ExprKind::Unary { op, operand } => {
                self.walk_expr(operand)?;
                match op {
                    UnaryOp::Not => Ty::Bool,
                    UnaryOp::Plus | UnaryOp::Neg => {
                        operand.item.ty.clone().unwrap_or(Ty::Error)
                    }
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                self.walk_expr(lhs)?;
                self.walk_expr(rhs)?;
                if op.is_logical() {
                    Ty::Bool
                } else {
                    // numeric promotion: an int operand beside a
                    // float operand becomes float
                    if lhs.item.ty == Some(Ty::Float) {
                        promote_if_needed(rhs, &Ty::Float);
                    } else if rhs.item.ty == Some(Ty::Float) {
                        promote_if_needed(lhs, &Ty::Float);
                    }
                    if op.is_comparison() {
                        Ty::Bool
                    } else {
                        lhs.item.ty.clone().unwrap_or(Ty::Error)
                    }
                }
            }

            ExprKind::Assign { target, value } => {
                self.walk_expr(target)?;
                self.walk_expr(value)?;
                let ty = target.item.ty.clone().unwrap_or(Ty::Error);
                promote_if_needed(value, &ty);
                ty
            }

            // the grammar only produces init lists inside
            // variable initializers, which walk_var_decl
            // handles with the declared element type
            ExprKind::Init(elems) => {
                for elem in elems {
                    self.walk_expr(elem)?;
                }
                Ty::Error
            }

            // only the resolver makes these, and it never
            // revisits its own output
            ExprKind::IntToFloat(_) => Ty::Float,
        };

        expr.item.ty = Some(ty);
        Ok(())
    }
}

/// Wraps the expression in an explicit promotion node when a
/// float is wanted and an int is on offer.
fn promote_if_needed(expr: &mut Spanned<Expr>, want: &Ty) {
    if *want != Ty::Float || expr.item.ty != Some(Ty::Int) {
        return;
    }
    let span = expr.span;
    let inner = std::mem::replace(
        expr,
        Spanned::new(Expr::typed(ExprKind::Bool(false), Ty::Error), span),
    );
    *expr = Spanned::new(
        Expr::typed(ExprKind::IntToFloat(Box::new(inner)), Ty::Float),
        span,
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;
    use crate::compiler::lex::Lexer;
    use crate::compiler::parse::Parser;

    fn resolved(source: &str) -> (Spanned<Program>, DeclTable) {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet(source), reporter.clone());
        let mut program = Parser::parse(lexer, reporter.clone()).expect("snippet should parse");
        let table = resolve(&mut program, &reporter).expect("snippet should resolve");
        (program, table)
    }

    fn func_body(program: &Spanned<Program>, index: usize) -> &Block {
        match &program.item.decls[index].item {
            Decl::Func(f) => match &f.body.item {
                Stmt::Compound(block) => block,
                _ => panic!("expected a compound body"),
            },
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn variables_bind_to_their_declarations() {
        let (program, table) = resolved("int g; void f() { g = 1; }");
        let block = func_body(&program, 1);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Assign { target, .. } => match &target.item.kind {
                    ExprKind::Var(name) => {
                        let info = table.get(name.decl.expect("decorated"));
                        assert_eq!(info.name, "g");
                        assert_eq!(info.kind, DeclKind::Global);
                        assert_eq!(info.ty, Ty::Int);
                    }
                    other => panic!("expected a variable, got {:?}", other),
                },
                other => panic!("expected an assignment, got {:?}", other),
            },
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn locals_shadow_globals() {
        let (program, table) = resolved("int x; void f() { int x; x = 1; }");
        let block = func_body(&program, 1);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Assign { target, .. } => match &target.item.kind {
                    ExprKind::Var(name) => {
                        assert_eq!(table.get(name.decl.unwrap()).kind, DeclKind::Local);
                    }
                    _ => unreachable!(),
                },
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn mixed_arithmetic_promotes_the_int_side() {
        let (program, _) = resolved("float f; void g() { f = 1 + 2.0; }");
        let block = func_body(&program, 1);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Assign { value, .. } => {
                    assert_eq!(value.item.ty, Some(Ty::Float));
                    match &value.item.kind {
                        ExprKind::Binary { lhs, rhs, .. } => {
                            assert!(matches!(lhs.item.kind, ExprKind::IntToFloat(_)));
                            assert!(matches!(rhs.item.kind, ExprKind::Float(_)));
                        }
                        other => panic!("expected a binary expression, got {:?}", other),
                    }
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn assignment_into_float_promotes_the_value() {
        let (program, _) = resolved("void g() { float f; f = 3; }");
        let block = func_body(&program, 0);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Assign { value, .. } => {
                    assert!(matches!(value.item.kind, ExprKind::IntToFloat(_)));
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn argument_promotion_against_builtin_signature() {
        let (program, _) = resolved("void g() { putFloat(2); }");
        let block = func_body(&program, 0);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Call { args, .. } => {
                    assert!(matches!(args[0].item.kind, ExprKind::IntToFloat(_)));
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn indexing_types_as_the_element() {
        let (program, _) = resolved("float a[4]; void g() { a[0] = a[1]; }");
        let block = func_body(&program, 1);
        match &block.stmts[0].item {
            Stmt::Expr(e) => {
                assert_eq!(e.item.ty, Some(Ty::Float));
                match &e.item.kind {
                    ExprKind::Assign { target, .. } => {
                        assert_eq!(target.item.ty, Some(Ty::Float));
                    }
                    _ => unreachable!(),
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn comparisons_are_boolean() {
        let (program, _) = resolved("void g() { boolean b; b = 1.0 < 2; }");
        let block = func_body(&program, 0);
        match &block.stmts[0].item {
            Stmt::Expr(e) => match &e.item.kind {
                ExprKind::Assign { value, .. } => {
                    assert_eq!(value.item.ty, Some(Ty::Bool));
                    match &value.item.kind {
                        ExprKind::Binary { rhs, .. } => {
                            // the int side of a float comparison promotes too
                            assert!(matches!(rhs.item.kind, ExprKind::IntToFloat(_)));
                        }
                        _ => unreachable!(),
                    }
                }
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn return_value_promotes_to_the_function_type() {
        let (program, _) = resolved("float g() { return 1; }");
        let block = func_body(&program, 0);
        match &block.stmts[0].item {
            Stmt::Return(Some(value)) => {
                assert!(matches!(value.item.kind, ExprKind::IntToFloat(_)));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn undeclared_identifier_fails_fast() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet("void f() { x = 1; }"), reporter.clone());
        let mut program = Parser::parse(lexer, reporter.clone()).unwrap();
        assert!(resolve(&mut program, &reporter).is_err());
        assert_eq!(reporter.diagnostics()[0].message(), "\"x\" is not declared");
    }

    #[test]
    fn calling_a_variable_fails_fast() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet("int x; void f() { x(); }"), reporter.clone());
        let mut program = Parser::parse(lexer, reporter.clone()).unwrap();
        assert!(resolve(&mut program, &reporter).is_err());
        assert_eq!(reporter.diagnostics()[0].message(), "\"x\" is not a function");
    }
}

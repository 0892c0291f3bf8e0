use crate::common::{
    diag::Reporter,
    span::{Loc, Span, Spanned},
};
use crate::compiler::{
    ast::{
        BinaryOp, Block, Decl, Expr, ExprKind, FuncDecl, Name, ParaDecl, Program, Stmt, Ty,
        UnaryOp, VarDecl,
    },
    lex::Lexer,
    syntax::Syntax,
    token::{Token, TokenKind},
};

/// The recursive-descent parser. One token of lookahead, no
/// backtracking; the declaration-vs-function ambiguity is
/// settled by the single token after `type identifier`.
///
/// The first grammar violation is reported to the diagnostics
/// sink and aborts the whole parse — the caller gets `Err`,
/// never a partial tree.
#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    reporter: Reporter,
    current: Token,
    /// Span of the most recently consumed token; a finished
    /// construct's span ends where this ends.
    prev_span: Span,
}

impl Parser {
    /// Parses one compilation unit.
    pub fn parse(mut lexer: Lexer, reporter: Reporter) -> Result<Spanned<Program>, Syntax> {
        let current = lexer.next_token()?;
        let mut parser = Parser {
            lexer,
            reporter,
            current,
            prev_span: Span::dummy(),
        };
        parser.parse_program()
    }

    /// Consumes the current token unconditionally.
    fn advance(&mut self) -> Result<(), Syntax> {
        self.prev_span = self.current.span;
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Consumes the current token if it has the expected kind,
    /// or reports and aborts.
    fn expect(&mut self, kind: TokenKind) -> Result<(), Syntax> {
        if self.current.kind == kind {
            self.advance()
        } else {
            self.failure("\"%\" expected here", kind.spelling())
        }
    }

    /// Reports one diagnostic at the current token and returns
    /// the abort error.
    fn failure<T>(&self, template: &str, quoted: &str) -> Result<T, Syntax> {
        let span = self.current.span;
        self.reporter.report(template, quoted, span);
        let message = template.replace('%', quoted);
        Err(Syntax::error(&message, span))
    }

    /// Start position of the construct about to be parsed.
    fn start(&self) -> Loc {
        self.current.span.start
    }

    /// The span from a recorded start to the end of the last
    /// consumed token.
    fn span_from(&self, start: Loc) -> Span {
        Span::new(start, self.prev_span.end)
    }

    // ===== programs and declarations =====

    fn parse_program(&mut self) -> Result<Spanned<Program>, Syntax> {
        if self.current.kind == TokenKind::End {
            return Ok(Spanned::new(Program { decls: vec![] }, Span::dummy()));
        }

        let start = self.start();
        let mut decls = vec![];
        loop {
            self.parse_declaration_group(&mut decls)?;
            if !self.current.kind.is_type() {
                break;
            }
        }
        if self.current.kind != TokenKind::End {
            let spelling = self.current.spelling.clone();
            return self.failure("\"%\" unknown type", &spelling);
        }

        Ok(Spanned::new(Program { decls }, self.span_from(start)))
    }

    /// One `type identifier ...` group at the top level: either
    /// a whole function declaration or a declarator list of
    /// global variables.
    fn parse_declaration_group(&mut self, decls: &mut Vec<Spanned<Decl>>) -> Result<(), Syntax> {
        let start = self.start();
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;

        if self.current.kind == TokenKind::OpenParen {
            let params = self.parse_para_list()?;
            let body = self.parse_compound_stmt()?;
            let decl = Decl::Func(FuncDecl {
                ty,
                name,
                params,
                body,
                id: None,
            });
            decls.push(Spanned::new(decl, self.span_from(start)));
        } else {
            let vars = self.parse_declarator_list(ty, name)?;
            decls.extend(
                vars.into_iter()
                    .map(|v| Spanned::new(Decl::Var(v.item), v.span)),
            );
        }
        Ok(())
    }

    /// The rest of a variable declaration once the base type and
    /// first identifier are consumed: the first declarator's
    /// array suffix and initializer, any further comma-separated
    /// declarators, and the closing `;`. Every declarator shares
    /// the one base type.
    fn parse_declarator_list(
        &mut self,
        base: Spanned<Ty>,
        first: Spanned<String>,
    ) -> Result<Vec<Spanned<VarDecl>>, Syntax> {
        let mut vars = vec![];
        // the first declarator's span starts at the type
        let decl = self.parse_declarator(&base, first, base.span.start)?;
        vars.push(decl);

        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            let start = self.start();
            let name = self.parse_ident()?;
            let decl = self.parse_declarator(&base, name, start)?;
            vars.push(decl);
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(vars)
    }

    fn parse_declarator(
        &mut self,
        base: &Spanned<Ty>,
        name: Spanned<String>,
        start: Loc,
    ) -> Result<Spanned<VarDecl>, Syntax> {
        let ty = self.parse_array_suffix(base, name.span.start)?;
        let init = if self.current.kind == TokenKind::Eq {
            self.advance()?;
            Some(self.parse_initializer()?)
        } else {
            None
        };
        let decl = VarDecl {
            ty,
            name,
            init,
            id: None,
        };
        Ok(Spanned::new(decl, self.span_from(start)))
    }

    /// `[ INTLITERAL? ]` after a declarator name; absence of a
    /// size is legal and marked with `None`.
    fn parse_array_suffix(
        &mut self,
        base: &Spanned<Ty>,
        name_start: Loc,
    ) -> Result<Spanned<Ty>, Syntax> {
        if self.current.kind != TokenKind::OpenBracket {
            return Ok(base.clone());
        }
        self.advance()?;
        let size = if self.current.kind == TokenKind::IntLit {
            let size = self.int_value()?;
            self.advance()?;
            Some(size as u32)
        } else {
            None
        };
        self.expect(TokenKind::CloseBracket)?;
        let ty = Ty::Array(Box::new(base.item.clone()), size);
        Ok(Spanned::new(ty, self.span_from(name_start)))
    }

    /// `expr` or `{ expr ("," expr)* }`.
    fn parse_initializer(&mut self) -> Result<Spanned<Expr>, Syntax> {
        if self.current.kind != TokenKind::OpenCurly {
            return self.parse_expr();
        }
        let start = self.start();
        self.advance()?;
        let mut elems = vec![self.parse_expr()?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            elems.push(self.parse_expr()?);
        }
        self.expect(TokenKind::CloseCurly)?;
        Ok(Spanned::new(
            Expr::untyped(ExprKind::Init(elems)),
            self.span_from(start),
        ))
    }

    fn parse_type(&mut self) -> Result<Spanned<Ty>, Syntax> {
        let start = self.start();
        let ty = match self.current.kind {
            TokenKind::Void => Ty::Void,
            TokenKind::Boolean => Ty::Bool,
            TokenKind::Int => Ty::Int,
            TokenKind::Float => Ty::Float,
            _ => {
                let spelling = self.current.spelling.clone();
                return self.failure("\"%\" wrong result type for a function", &spelling);
            }
        };
        self.advance()?;
        Ok(Spanned::new(ty, self.span_from(start)))
    }

    fn parse_ident(&mut self) -> Result<Spanned<String>, Syntax> {
        if self.current.kind != TokenKind::Ident {
            return self.failure("identifier expected here", "");
        }
        let name = Spanned::new(self.current.spelling.clone(), self.current.span);
        self.advance()?;
        Ok(name)
    }

    // ===== parameters =====

    fn parse_para_list(&mut self) -> Result<Vec<Spanned<ParaDecl>>, Syntax> {
        self.advance()?; // the '(' that committed us to a function
        let mut params = vec![];
        if self.current.kind != TokenKind::CloseParen {
            loop {
                params.push(self.parse_para_decl()?);
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(params)
    }

    fn parse_para_decl(&mut self) -> Result<Spanned<ParaDecl>, Syntax> {
        let start = self.start();
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let ty = self.parse_array_suffix(&ty, name.span.start)?;
        let decl = ParaDecl { ty, name, id: None };
        Ok(Spanned::new(decl, self.span_from(start)))
    }

    // ===== statements =====

    fn parse_compound_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(TokenKind::OpenCurly)?;

        let mut decls = vec![];
        while self.current.kind.is_type() {
            let ty = self.parse_type()?;
            let name = self.parse_ident()?;
            if self.current.kind == TokenKind::OpenParen {
                return self.failure("function definition here is not allowed", "");
            }
            decls.extend(self.parse_declarator_list(ty, name)?);
        }

        let mut stmts = vec![];
        while self.current.kind != TokenKind::CloseCurly && self.current.kind != TokenKind::End {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::CloseCurly)?;

        let block = Block { decls, stmts };
        Ok(Spanned::new(Stmt::Compound(block), self.span_from(start)))
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        match self.current.kind {
            TokenKind::OpenCurly => self.parse_compound_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Break => self.parse_flat_stmt(TokenKind::Break, Stmt::Break),
            TokenKind::Continue => self.parse_flat_stmt(TokenKind::Continue, Stmt::Continue),
            TokenKind::Return => self.parse_return_stmt(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParen)?;
        let then = Box::new(self.parse_stmt()?);
        let alt = if self.current.kind == TokenKind::Else {
            self.advance()?;
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Spanned::new(
            Stmt::If { cond, then, alt },
            self.span_from(start),
        ))
    }

    fn parse_for_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::OpenParen)?;

        let init = if self.current.kind != TokenKind::Semicolon {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let cond = if self.current.kind != TokenKind::Semicolon {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let step = if self.current.kind != TokenKind::CloseParen {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::CloseParen)?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Spanned::new(
            Stmt::For {
                init,
                cond,
                step,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_while_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Spanned::new(
            Stmt::While { cond, body },
            self.span_from(start),
        ))
    }

    /// `break ;` and `continue ;`.
    fn parse_flat_stmt(&mut self, kind: TokenKind, stmt: Stmt) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(kind)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_return_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        self.expect(TokenKind::Return)?;
        let value = if self.current.kind != TokenKind::Semicolon {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Spanned::new(Stmt::Return(value), self.span_from(start)))
    }

    /// `expr? ;` — the expression is optional, so a bare `;`
    /// is the empty statement.
    fn parse_expr_stmt(&mut self) -> Result<Spanned<Stmt>, Syntax> {
        let start = self.start();
        if self.current.kind == TokenKind::Semicolon {
            self.advance()?;
            return Ok(Spanned::new(Stmt::Empty, self.span_from(start)));
        }
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Spanned::new(Stmt::Expr(expr), self.span_from(start)))
    }

    // ===== expressions =====

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.parse_assign_expr()
    }

    /// Assignment associates to the right: `a = b = 5` parses
    /// as `a = (b = 5)`.
    fn parse_assign_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        let start = self.start();
        let left = self.parse_or_expr()?;
        if self.current.kind != TokenKind::Eq {
            return Ok(left);
        }
        self.advance()?;
        let value = self.parse_assign_expr()?;
        Ok(Spanned::new(
            Expr::untyped(ExprKind::Assign {
                target: Box::new(left),
                value: Box::new(value),
            }),
            self.span_from(start),
        ))
    }

    /// One left-associative binary layer, implemented
    /// iteratively so the tree leans left without the grammar
    /// recursing left.
    fn binary_layer(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        next: fn(&mut Parser) -> Result<Spanned<Expr>, Syntax>,
    ) -> Result<Spanned<Expr>, Syntax> {
        let start = self.start();
        let mut left = next(self)?;
        loop {
            let op = match ops.iter().find(|(kind, _)| *kind == self.current.kind) {
                Some((_, op)) => *op,
                None => return Ok(left),
            };
            self.advance()?;
            let right = next(self)?;
            left = Spanned::new(
                Expr::untyped(ExprKind::Binary {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                }),
                self.span_from(start),
            );
        }
    }

    fn parse_or_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(&[(TokenKind::OrOr, BinaryOp::Or)], Parser::parse_and_expr)
    }

    fn parse_and_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(
            &[(TokenKind::AndAnd, BinaryOp::And)],
            Parser::parse_equality_expr,
        )
    }

    fn parse_equality_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(
            &[
                (TokenKind::EqEq, BinaryOp::EqEq),
                (TokenKind::NotEq, BinaryOp::NotEq),
            ],
            Parser::parse_relational_expr,
        )
    }

    fn parse_relational_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::LtEq, BinaryOp::LtEq),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::GtEq, BinaryOp::GtEq),
            ],
            Parser::parse_additive_expr,
        )
    }

    fn parse_additive_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Parser::parse_multiplicative_expr,
        )
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        self.binary_layer(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
            ],
            Parser::parse_unary_expr,
        )
    }

    fn parse_unary_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        let op = match self.current.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_primary_expr(),
        };
        let start = self.start();
        self.advance()?;
        let operand = Box::new(self.parse_unary_expr()?);
        Ok(Spanned::new(
            Expr::untyped(ExprKind::Unary { op, operand }),
            self.span_from(start),
        ))
    }

    fn parse_primary_expr(&mut self) -> Result<Spanned<Expr>, Syntax> {
        let start = self.start();
        match self.current.kind {
            TokenKind::Ident => {
                let name = self.parse_ident()?;
                let name = Name::new(&name.item, name.span);

                match self.current.kind {
                    TokenKind::OpenParen => {
                        let args = self.parse_arg_list()?;
                        Ok(Spanned::new(
                            Expr::untyped(ExprKind::Call { callee: name, args }),
                            self.span_from(start),
                        ))
                    }
                    TokenKind::OpenBracket => {
                        self.advance()?;
                        let index = Box::new(self.parse_expr()?);
                        self.expect(TokenKind::CloseBracket)?;
                        Ok(Spanned::new(
                            Expr::untyped(ExprKind::Index { array: name, index }),
                            self.span_from(start),
                        ))
                    }
                    _ => Ok(Spanned::new(
                        Expr::untyped(ExprKind::Var(name)),
                        self.span_from(start),
                    )),
                }
            }

            // a parenthesized expression keeps its own span
            TokenKind::OpenParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }

            TokenKind::IntLit => {
                let value = self.int_value()?;
                self.advance()?;
                Ok(Spanned::new(
                    Expr::untyped(ExprKind::Int(value)),
                    self.span_from(start),
                ))
            }
            TokenKind::FloatLit => {
                let value: f32 = self
                    .current
                    .spelling
                    .parse()
                    .expect("lexer only produces well-formed float spellings");
                self.advance()?;
                Ok(Spanned::new(
                    Expr::untyped(ExprKind::Float(value)),
                    self.span_from(start),
                ))
            }
            TokenKind::BoolLit => {
                let value = self.current.spelling == "true";
                self.advance()?;
                Ok(Spanned::new(
                    Expr::untyped(ExprKind::Bool(value)),
                    self.span_from(start),
                ))
            }
            TokenKind::StrLit => {
                let value = self.current.spelling.clone();
                self.advance()?;
                Ok(Spanned::new(
                    Expr::untyped(ExprKind::Str(value)),
                    self.span_from(start),
                ))
            }

            _ => {
                let spelling = self.current.spelling.clone();
                self.failure("illegal primary expression", &spelling)
            }
        }
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Spanned<Expr>>, Syntax> {
        self.advance()?; // '('
        let mut args = vec![];
        if self.current.kind != TokenKind::CloseParen {
            args.push(self.parse_expr()?);
            while self.current.kind == TokenKind::Comma {
                self.advance()?;
                args.push(self.parse_expr()?);
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(args)
    }

    /// The current token's spelling as an `i32`.
    fn int_value(&self) -> Result<i32, Syntax> {
        match self.current.spelling.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                let spelling = self.current.spelling.clone();
                self.failure("\"%\" integer literal out of range", &spelling)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;

    fn parse(source: &str) -> Result<Spanned<Program>, Syntax> {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet(source), reporter.clone());
        Parser::parse(lexer, reporter)
    }

    fn parse_ok(source: &str) -> Program {
        parse(source).expect("snippet should parse").item
    }

    /// The single expression inside `void f() { <expr>; }`.
    fn parse_single_expr(expr: &str) -> Expr {
        let program = parse_ok(&format!("void f() {{ {}; }}", expr));
        let body = match &program.decls[0].item {
            Decl::Func(f) => &f.body,
            _ => panic!("expected a function"),
        };
        let block = match &body.item {
            Stmt::Compound(block) => block,
            _ => panic!("expected a compound body"),
        };
        match &block.stmts[0].item {
            Stmt::Expr(e) => e.item.clone(),
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn empty_program() {
        let program = parse_ok("");
        assert!(program.decls.is_empty());
    }

    #[test]
    fn global_declarator_list_shares_the_base_type() {
        let program = parse_ok("int i, j[2], k = 5;");
        assert_eq!(program.decls.len(), 3);
        match (&program.decls[0].item, &program.decls[1].item, &program.decls[2].item) {
            (Decl::Var(i), Decl::Var(j), Decl::Var(k)) => {
                assert_eq!(i.ty.item, Ty::Int);
                assert_eq!(j.ty.item, Ty::Array(Box::new(Ty::Int), Some(2)));
                assert!(i.init.is_none());
                assert!(matches!(
                    k.init.as_ref().unwrap().item.kind,
                    ExprKind::Int(5)
                ));
            }
            _ => panic!("expected three global variables"),
        }
    }

    #[test]
    fn array_size_may_be_omitted() {
        let program = parse_ok("void f(int a[]) { }");
        match &program.decls[0].item {
            Decl::Func(f) => {
                assert_eq!(f.params.len(), 1);
                assert_eq!(f.params[0].item.ty.item, Ty::Array(Box::new(Ty::Int), None));
            }
            _ => panic!("expected a function"),
        }
    }

    #[test]
    fn aggregate_initializer() {
        let program = parse_ok("int a[3] = {1, 2, 3};");
        match &program.decls[0].item {
            Decl::Var(a) => match &a.init.as_ref().unwrap().item.kind {
                ExprKind::Init(elems) => assert_eq!(elems.len(), 3),
                other => panic!("expected an init list, got {:?}", other),
            },
            _ => panic!("expected a global variable"),
        }
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        // 2 + 3 * 4 must parse as 2 + (3 * 4)
        let expr = parse_single_expr("x = 2 + 3 * 4");
        let value = match expr.kind {
            ExprKind::Assign { value, .. } => value,
            other => panic!("expected an assignment, got {:?}", other),
        };
        match value.item.kind {
            ExprKind::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => {
                assert!(matches!(
                    rhs.item.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected addition at the top, got {:?}", other),
        }
    }

    #[test]
    fn binary_layers_lean_left() {
        // 1 - 2 - 3 must parse as (1 - 2) - 3
        let expr = parse_single_expr("1 - 2 - 3");
        match expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Sub,
                lhs,
                rhs,
            } => {
                assert!(matches!(
                    lhs.item.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Sub,
                        ..
                    }
                ));
                assert!(matches!(rhs.item.kind, ExprKind::Int(3)));
            }
            other => panic!("expected subtraction at the top, got {:?}", other),
        }
    }

    #[test]
    fn assignment_associates_right() {
        let expr = parse_single_expr("a = b = 5");
        match expr.kind {
            ExprKind::Assign { target, value } => {
                assert!(matches!(target.item.kind, ExprKind::Var(_)));
                assert!(matches!(value.item.kind, ExprKind::Assign { .. }));
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn call_and_index_need_one_more_token() {
        assert!(matches!(parse_single_expr("g()").kind, ExprKind::Call { .. }));
        assert!(matches!(
            parse_single_expr("a[i + 1]").kind,
            ExprKind::Index { .. }
        ));
        assert!(matches!(parse_single_expr("a").kind, ExprKind::Var(_)));
    }

    #[test]
    fn statements_parse() {
        let program = parse_ok(
            "void f() {\
               int i;\
               ;\
               if (i > 0) i = 1; else i = 2;\
               while (i < 10) { i = i + 1; }\
               for (i = 0; i < 3; i = i + 1) { break; }\
               for (;;) { continue; }\
               return;\
             }",
        );
        let block = match &program.decls[0].item {
            Decl::Func(f) => match &f.body.item {
                Stmt::Compound(block) => block,
                _ => panic!("expected a compound body"),
            },
            _ => panic!("expected a function"),
        };
        assert_eq!(block.decls.len(), 1);
        assert!(matches!(block.stmts[0].item, Stmt::Empty));
        assert!(matches!(block.stmts[1].item, Stmt::If { alt: Some(_), .. }));
        assert!(matches!(block.stmts[2].item, Stmt::While { .. }));
        assert!(matches!(
            block.stmts[3].item,
            Stmt::For {
                init: Some(_),
                cond: Some(_),
                step: Some(_),
                ..
            }
        ));
        assert!(matches!(
            block.stmts[4].item,
            Stmt::For {
                init: None,
                cond: None,
                step: None,
                ..
            }
        ));
        assert!(matches!(block.stmts[5].item, Stmt::Return(None)));
    }

    #[test]
    fn else_binds_to_the_nearest_if() {
        let program = parse_ok("void f() { if (a) if (b) x = 1; else x = 2; }");
        let block = match &program.decls[0].item {
            Decl::Func(f) => match &f.body.item {
                Stmt::Compound(block) => block,
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };
        match &block.stmts[0].item {
            Stmt::If { then, alt, .. } => {
                assert!(alt.is_none());
                assert!(matches!(then.item, Stmt::If { alt: Some(_), .. }));
            }
            other => panic!("expected an if, got {:?}", other),
        }
    }

    #[test]
    fn spans_bracket_first_to_last_token() {
        let program = parse("int x = 1;").unwrap();
        // the program span reaches the closing semicolon
        assert_eq!(program.span.start, Loc::new(1, 1));
        assert_eq!(program.span.end, Loc::new(1, 10));
        // the declarator's span stops at its initializer
        assert_eq!(program.item.decls[0].span.start, Loc::new(1, 1));
        assert_eq!(program.item.decls[0].span.end, Loc::new(1, 9));
    }

    #[test]
    fn first_error_aborts_with_one_diagnostic() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet("int x = ;"), reporter.clone());
        let result = Parser::parse(lexer, reporter.clone());
        assert!(result.is_err());
        assert_eq!(reporter.count(), 1);
        assert_eq!(
            reporter.diagnostics()[0].message(),
            "illegal primary expression"
        );
    }

    #[test]
    fn missing_semicolon_is_reported_with_the_expected_spelling() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet("void f() { return }"), reporter.clone());
        let result = Parser::parse(lexer, reporter.clone());
        assert!(result.is_err());
        assert_eq!(reporter.diagnostics()[0].message(), "\";\" expected here");
    }

    #[test]
    fn local_function_definitions_are_rejected() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(
            Source::snippet("void f() { int g() { } }"),
            reporter.clone(),
        );
        assert!(Parser::parse(lexer, reporter.clone()).is_err());
        assert_eq!(
            reporter.diagnostics()[0].message(),
            "function definition here is not allowed"
        );
    }

    #[test]
    fn stray_token_after_declarations() {
        let reporter = Reporter::new();
        let lexer = Lexer::new(Source::snippet("int x; @"), reporter.clone());
        assert!(Parser::parse(lexer, reporter.clone()).is_err());
        assert_eq!(reporter.diagnostics()[0].message(), "\"@\" unknown type");
    }
}

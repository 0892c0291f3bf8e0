use crate::common::span::Spanned;
use crate::compiler::{
    ast::{
        BinaryOp, Block, Decl, DeclId, Expr, ExprKind, FuncDecl, Name, Program, Stmt, Ty, UnaryOp,
        VarDecl,
    },
    resolve::{DeclKind, DeclTable},
};

use crate::codegen::{assembly::Assembly, frame::Frame, jvm};

/// The class holding the built-in I/O functions.
const RUNTIME: &str = "kestrel/lang/System";

/// Lowers a decorated program into an assembly listing.
///
/// Precondition: the tree has been through `resolve` — every
/// identifier carries a `DeclId`, every expression a type, and
/// promotions are explicit nodes. The emitter performs no
/// validation; an undecorated or ill-typed tree is a compiler
/// defect and panics rather than producing a malformed listing.
pub fn gen(program: &Spanned<Program>, table: &DeclTable, class: &str) -> Assembly {
    let mut emitter = Emitter::new(table, class);
    emitter.walk_program(&program.item);
    emitter.asm
}

/// The tree-walking emitter. Owns the instruction store for one
/// compilation session and the slot assignments made along the
/// way; per-function state lives in the `Frame` threaded
/// through every method.
struct Emitter<'t> {
    class: String,
    table: &'t DeclTable,
    asm: Assembly,
    /// Slot per declaration, indexed by `DeclId`, assigned in
    /// first-encountered order while each function is walked.
    slots: Vec<Option<u32>>,
}

impl<'t> Emitter<'t> {
    fn new(table: &'t DeclTable, class: &str) -> Emitter<'t> {
        Emitter {
            class: class.to_string(),
            table,
            asm: Assembly::new(),
            slots: vec![None; table.len()],
        }
    }

    // ===== plumbing =====

    fn line(&mut self, record: impl Into<String>) {
        self.asm.emit(record);
    }

    fn label(&mut self, label: &str) {
        self.asm.emit(format!("{}:", label));
    }

    fn slot(&self, id: DeclId) -> u32 {
        self.slots[id.0].expect("variable used before its slot was assigned")
    }

    fn decl_of(&self, name: &Name) -> DeclId {
        name.decl.expect("identifier not resolved to a declaration")
    }

    /// Loads or stores a local slot, using the `_0..=_3` short
    /// forms where they exist.
    fn slot_op(&mut self, op: &str, slot: u32) {
        if slot <= 3 {
            self.line(format!("{}_{}", op, slot));
        } else {
            self.line(format!("{} {}", op, slot));
        }
    }

    /// The shortest instruction that loads this int constant.
    fn iconst(&mut self, value: i32) {
        if value == -1 {
            self.line(jvm::ICONST_M1);
        } else if (0..=5).contains(&value) {
            self.line(format!("{}_{}", jvm::ICONST, value));
        } else if i8::try_from(value).is_ok() {
            self.line(format!("{} {}", jvm::BIPUSH, value));
        } else if i16::try_from(value).is_ok() {
            self.line(format!("{} {}", jvm::SIPUSH, value));
        } else {
            self.line(format!("{} {}", jvm::LDC, value));
        }
    }

    fn fconst(&mut self, value: f32) {
        if value == 0.0 {
            self.line(jvm::FCONST_0);
        } else if value == 1.0 {
            self.line(jvm::FCONST_1);
        } else if value == 2.0 {
            self.line(jvm::FCONST_2);
        } else {
            let mut text = format!("{:?}", value);
            if !text.contains('.') && !text.contains('e') {
                text.push_str(".0");
            }
            self.line(format!("{} {}", jvm::LDC, text));
        }
    }

    // ===== program structure =====

    fn walk_program(&mut self, program: &Program) {
        self.line(format!("{} public {}", jvm::CLASS, self.class));
        self.line(format!("{} java/lang/Object", jvm::SUPER));
        self.asm.blank();

        // (1) field directives come before any method
        for decl in &program.decls {
            if let Decl::Var(var) = &decl.item {
                self.line(format!(
                    "{} {} {}",
                    jvm::STATIC_FIELD,
                    var.name.item,
                    jvm::descriptor(&var.ty.item)
                ));
            }
        }
        self.asm.blank();

        // (2) the static initializer evaluates every global's
        // initializer, or its zero default, in source order
        self.line("; standard class static initializer");
        self.line(format!("{} static <clinit>()V", jvm::METHOD_START));
        self.asm.blank();
        let mut frame = Frame::new(false);
        for decl in &program.decls {
            if let Decl::Var(var) = &decl.item {
                self.global_initializer(var, &mut frame);
            }
        }
        self.asm.blank();
        self.line("; set limits used by this method");
        self.line(format!("{} locals {}", jvm::LIMIT, frame.slot_count()));
        self.line(format!("{} stack {}", jvm::LIMIT, frame.max_stack()));
        self.line(jvm::RETURN);
        self.line(jvm::METHOD_END);
        self.asm.blank();

        // (3) the synthesized no-argument constructor
        self.line("; standard constructor initializer");
        self.line(format!("{} public <init>()V", jvm::METHOD_START));
        self.line(format!("{} stack 1", jvm::LIMIT));
        self.line(format!("{} locals 1", jvm::LIMIT));
        self.line("aload_0");
        self.line(format!("{} java/lang/Object/<init>()V", jvm::INVOKESPECIAL));
        self.line(jvm::RETURN);
        self.line(jvm::METHOD_END);

        // (4) one method per source function, in source order
        for decl in &program.decls {
            if let Decl::Func(func) = &decl.item {
                self.walk_func(func);
            }
        }
    }

    fn global_initializer(&mut self, var: &VarDecl, frame: &mut Frame) {
        match &var.ty.item {
            Ty::Array(elem, size) => {
                let size = size.expect("array declaration without a size reached code generation");
                self.iconst(size as i32);
                frame.push(1);
                self.line(format!("{} {}", jvm::NEWARRAY, jvm::newarray_name(elem)));
                if let Some(init) = &var.init {
                    match &init.item.kind {
                        ExprKind::Init(elems) => self.init_list(elems, elem, frame),
                        _ => panic!("array initializer must be an aggregate"),
                    }
                }
            }
            scalar => match &var.init {
                Some(init) => self.visit_expr(init, frame),
                None => {
                    // the language's default-initialization rule
                    if *scalar == Ty::Float {
                        self.line(jvm::FCONST_0);
                    } else {
                        self.line(format!("{}_0", jvm::ICONST));
                    }
                    frame.push(1);
                }
            },
        }
        self.line(format!(
            "{} {}/{} {}",
            jvm::PUTSTATIC,
            self.class,
            var.name.item,
            jvm::descriptor(&var.ty.item)
        ));
        frame.pop(1);
    }

    /// Lowers a brace initializer against an array reference on
    /// the stack: duplicate the reference, push the index, the
    /// element, store; left to right from index 0.
    fn init_list(&mut self, elems: &[Spanned<Expr>], elem_ty: &Ty, frame: &mut Frame) {
        for (index, elem) in elems.iter().enumerate() {
            self.line(jvm::DUP);
            self.iconst(index as i32);
            frame.push(2);
            self.visit_expr(elem, frame);
            let store = match elem_ty {
                Ty::Int => jvm::IASTORE,
                Ty::Float => jvm::FASTORE,
                Ty::Bool => jvm::BASTORE,
                other => panic!("aggregate initializer for element type {}", other),
            };
            self.line(store);
            frame.pop(3);
        }
    }

    // ===== functions =====

    fn walk_func(&mut self, func: &FuncDecl) {
        let is_entry = func.name.item == "main";
        let mut frame = Frame::new(is_entry);

        if is_entry {
            // slot 0 holds the argument vector, slot 1 the
            // function-set instance created on entry
            frame.new_slot();
            self.line(format!(
                "{} public static main([Ljava/lang/String;)V",
                jvm::METHOD_START
            ));
            frame.new_slot();
        } else {
            // all other functions are instance methods; slot 0
            // is the receiver
            frame.new_slot();
            let params: String = func
                .params
                .iter()
                .map(|p| jvm::descriptor(&p.item.ty.item))
                .collect();
            self.line(format!(
                "{} {}({}){}",
                jvm::METHOD_START,
                func.name.item,
                params,
                jvm::descriptor(&func.ty.item)
            ));
        }

        self.walk_body(func, &mut frame);

        // an explicit return is required in every method; the
        // source function may not end with one
        if func.ty.item == Ty::Void {
            self.asm.blank();
            self.line("; return may not be present in a function returning void");
            self.line("; the following return is inserted by the compiler");
            self.line(jvm::RETURN);
        } else if is_entry {
            self.line(jvm::RETURN);
        } else {
            self.line(jvm::NOP);
        }

        self.asm.blank();
        self.line("; set limits used by this method");
        self.line(format!("{} locals {}", jvm::LIMIT, frame.slot_count()));
        self.line(format!("{} stack {}", jvm::LIMIT, frame.max_stack()));
        self.line(jvm::METHOD_END);
    }

    /// The function body's compound statement, which also emits
    /// the calling-convention preamble: `.var` annotations for
    /// the implicit slots, parameter slots, and for the entry
    /// point the creation of the function-set instance.
    fn walk_body(&mut self, func: &FuncDecl, frame: &mut Frame) {
        let block = match &func.body.item {
            Stmt::Compound(block) => block,
            _ => panic!("function body must be a compound statement"),
        };
        if block.is_empty() {
            return;
        }

        let scope_start = frame.new_label();
        let scope_end = frame.new_label();
        frame.scope_start.push(scope_start.clone());
        frame.scope_end.push(scope_end.clone());
        self.label(&scope_start);

        if frame.is_entry() {
            self.line(format!(
                "{} 0 is argv [Ljava/lang/String; from {} to {}",
                jvm::VAR,
                scope_start,
                scope_end
            ));
            self.line(format!(
                "{} 1 is this$ L{}; from {} to {}",
                jvm::VAR,
                self.class,
                scope_start,
                scope_end
            ));
            // this$ = new <class>();
            self.line(format!("{} {}", jvm::NEW, self.class));
            self.line(jvm::DUP);
            frame.push(2);
            self.line(format!(
                "{} {}/<init>()V",
                jvm::INVOKESPECIAL,
                self.class
            ));
            frame.pop(1);
            self.line("astore_1");
            frame.pop(1);
        } else {
            self.line(format!(
                "{} 0 is this L{}; from {} to {}",
                jvm::VAR,
                self.class,
                scope_start,
                scope_end
            ));
            for param in &func.params {
                let id = param.item.id.expect("parameter not resolved");
                let slot = frame.new_slot();
                self.slots[id.0] = Some(slot);
                self.line(format!(
                    "{} {} is {} {} from {} to {}",
                    jvm::VAR,
                    slot,
                    param.item.name.item,
                    jvm::descriptor(&param.item.ty.item),
                    scope_start,
                    scope_end
                ));
            }
        }

        for decl in &block.decls {
            self.local_var_decl(&decl.item, frame);
        }
        for stmt in &block.stmts {
            self.visit_stmt(stmt, frame);
        }

        self.label(&scope_end);
        frame.scope_start.pop();
        frame.scope_end.pop();
    }

    fn local_var_decl(&mut self, var: &VarDecl, frame: &mut Frame) {
        let id = var.id.expect("local variable not resolved");
        let slot = frame.new_slot();
        self.slots[id.0] = Some(slot);

        let scope_from = frame
            .scope_start
            .last()
            .cloned()
            .expect("locals only occur inside a block");
        let scope_to = frame.scope_end.last().cloned().unwrap();
        self.line(format!(
            "{} {} is {} {} from {} to {}",
            jvm::VAR,
            slot,
            var.name.item,
            jvm::descriptor(&var.ty.item),
            scope_from,
            scope_to
        ));

        match &var.ty.item {
            Ty::Array(elem, size) => {
                let size = size.expect("array declaration without a size reached code generation");
                self.iconst(size as i32);
                frame.push(1);
                self.line(format!("{} {}", jvm::NEWARRAY, jvm::newarray_name(elem)));
                if let Some(init) = &var.init {
                    match &init.item.kind {
                        ExprKind::Init(elems) => self.init_list(elems, elem, frame),
                        _ => panic!("array initializer must be an aggregate"),
                    }
                }
                self.slot_op(jvm::ASTORE, slot);
                frame.pop(1);
            }
            scalar => {
                if let Some(init) = &var.init {
                    self.visit_expr(init, frame);
                    let store = if *scalar == Ty::Float {
                        jvm::FSTORE
                    } else {
                        jvm::ISTORE
                    };
                    self.slot_op(store, slot);
                    frame.pop(1);
                }
            }
        }
    }

    // ===== statements =====

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>, frame: &mut Frame) {
        match &stmt.item {
            Stmt::Compound(block) => self.compound(block, frame),
            Stmt::If { cond, then, alt } => self.if_stmt(cond, then, alt.as_deref(), frame),
            Stmt::While { cond, body } => self.while_stmt(cond, body, frame),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.for_stmt(init.as_ref(), cond.as_ref(), step.as_ref(), body, frame),
            Stmt::Break => {
                let skip = frame
                    .break_labels
                    .last()
                    .cloned()
                    .expect("break outside of a loop reached code generation");
                self.line(format!("{} {}", jvm::GOTO, skip));
            }
            Stmt::Continue => {
                let iterate = frame
                    .continue_labels
                    .last()
                    .cloned()
                    .expect("continue outside of a loop reached code generation");
                self.line(format!("{} {}", jvm::GOTO, iterate));
            }
            Stmt::Return(value) => self.return_stmt(value.as_ref(), frame),
            Stmt::Expr(expr) => self.expr_stmt(expr, frame),
            Stmt::Empty => {}
        }
    }

    fn compound(&mut self, block: &Block, frame: &mut Frame) {
        if block.is_empty() {
            return;
        }
        let scope_start = frame.new_label();
        let scope_end = frame.new_label();
        frame.scope_start.push(scope_start.clone());
        frame.scope_end.push(scope_end.clone());
        self.label(&scope_start);

        for decl in &block.decls {
            self.local_var_decl(&decl.item, frame);
        }
        for stmt in &block.stmts {
            self.visit_stmt(stmt, frame);
        }

        self.label(&scope_end);
        frame.scope_start.pop();
        frame.scope_end.pop();
    }

    fn if_stmt(
        &mut self,
        cond: &Spanned<Expr>,
        then: &Spanned<Stmt>,
        alt: Option<&Spanned<Stmt>>,
        frame: &mut Frame,
    ) {
        // both labels are synthesized up front, whether or not
        // an else branch exists
        let false_label = frame.new_label();
        let next_label = frame.new_label();

        self.visit_expr(cond, frame);
        self.line(format!("{} {}", jvm::IFEQ, false_label));
        frame.pop(1);

        self.visit_stmt(then, frame);
        if alt.is_some() {
            self.line(format!("{} {}", jvm::GOTO, next_label));
        }
        self.label(&false_label);
        if let Some(alt) = alt {
            self.visit_stmt(alt, frame);
            self.label(&next_label);
        }
    }

    fn while_stmt(&mut self, cond: &Spanned<Expr>, body: &Spanned<Stmt>, frame: &mut Frame) {
        let iterate = frame.new_label();
        let skip = frame.new_label();
        frame.continue_labels.push(iterate.clone());
        frame.break_labels.push(skip.clone());

        self.label(&iterate);
        self.visit_expr(cond, frame);
        self.line(format!("{} {}", jvm::IFEQ, skip));
        frame.pop(1);

        self.visit_stmt(body, frame);
        self.line(format!("{} {}", jvm::GOTO, iterate));
        self.label(&skip);

        frame.continue_labels.pop();
        frame.break_labels.pop();
    }

    /// `for` gets a dedicated continue target between the body
    /// and the step clause, so `continue` re-runs the step
    /// before the condition is checked again.
    fn for_stmt(
        &mut self,
        init: Option<&Spanned<Expr>>,
        cond: Option<&Spanned<Expr>>,
        step: Option<&Spanned<Expr>>,
        body: &Spanned<Stmt>,
        frame: &mut Frame,
    ) {
        let iterate = frame.new_label();
        let step_label = frame.new_label();
        let skip = frame.new_label();
        frame.continue_labels.push(step_label.clone());
        frame.break_labels.push(skip.clone());

        if let Some(init) = init {
            self.expr_stmt(init, frame);
        }
        self.label(&iterate);

        match cond {
            Some(cond) => self.visit_expr(cond, frame),
            None => {
                // an absent condition is always true
                self.line(format!("{}_1", jvm::ICONST));
                frame.push(1);
            }
        }
        self.line(format!("{} {}", jvm::IFEQ, skip));
        frame.pop(1);

        self.visit_stmt(body, frame);
        self.line(format!("{} {}", jvm::GOTO, step_label));

        self.label(&step_label);
        if let Some(step) = step {
            self.expr_stmt(step, frame);
        }
        self.line(format!("{} {}", jvm::GOTO, iterate));
        self.label(&skip);

        frame.continue_labels.pop();
        frame.break_labels.pop();
    }

    fn return_stmt(&mut self, value: Option<&Spanned<Expr>>, frame: &mut Frame) {
        // the entry point's return carries no observable value,
        // so its expression is not even evaluated
        if frame.is_entry() {
            self.line(jvm::RETURN);
            return;
        }

        match value {
            Some(value) => {
                self.visit_expr(value, frame);
                let ret = match expr_ty(value) {
                    Ty::Float => jvm::FRETURN,
                    Ty::Int | Ty::Bool => jvm::IRETURN,
                    other => panic!("cannot return a value of type {}", other),
                };
                self.line(ret);
                frame.pop(1);
            }
            None => self.line(jvm::RETURN),
        }
    }

    /// An expression in statement position: evaluate it, then
    /// discard whatever it left on the stack. Assignments leave
    /// nothing, and neither does a call to a void function.
    fn expr_stmt(&mut self, expr: &Spanned<Expr>, frame: &mut Frame) {
        self.visit_expr(expr, frame);
        if self.leaves_value(expr) {
            self.line(jvm::POP);
            frame.pop(1);
        }
    }

    fn leaves_value(&self, expr: &Spanned<Expr>) -> bool {
        match &expr.item.kind {
            ExprKind::Assign { .. } => false,
            ExprKind::Call { callee, .. } => {
                self.table.get(self.decl_of(callee)).ty != Ty::Void
            }
            ExprKind::Init(_) => false,
            _ => true,
        }
    }

    // ===== expressions =====

    fn visit_expr(&mut self, expr: &Spanned<Expr>, frame: &mut Frame) {
        match &expr.item.kind {
            ExprKind::Int(value) => {
                self.iconst(*value);
                frame.push(1);
            }
            ExprKind::Float(value) => {
                self.fconst(*value);
                frame.push(1);
            }
            ExprKind::Bool(value) => {
                self.line(if *value {
                    format!("{}_1", jvm::ICONST)
                } else {
                    format!("{}_0", jvm::ICONST)
                });
                frame.push(1);
            }
            ExprKind::Str(value) => {
                self.line(format!("{} \"{}\"", jvm::LDC, escape(value)));
                frame.push(1);
            }

            ExprKind::Var(name) => self.load_var(name, frame),

            ExprKind::Index { array, index } => {
                self.load_array_ref(array, frame);
                self.visit_expr(index, frame);
                let load = match expr_ty(expr) {
                    Ty::Int => jvm::IALOAD,
                    Ty::Float => jvm::FALOAD,
                    Ty::Bool => jvm::BALOAD,
                    other => panic!("array access of element type {}", other),
                };
                self.line(load);
                frame.pop(1);
            }

            ExprKind::IntToFloat(inner) => {
                self.visit_expr(inner, frame);
                self.line(jvm::I2F);
            }

            ExprKind::Unary { op, operand } => self.unary(*op, operand, frame),
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, expr, frame),
            ExprKind::Assign { target, value } => self.assign(target, value, false, frame),
            ExprKind::Call { callee, args } => self.call(callee, args, frame),

            ExprKind::Init(_) => {
                panic!("aggregate initializer outside of a variable declaration")
            }
        }
    }

    fn load_var(&mut self, name: &Name, frame: &mut Frame) {
        let id = self.decl_of(name);
        let info = self.table.get(id);
        if info.kind == DeclKind::Global {
            self.line(format!(
                "{} {}/{} {}",
                jvm::GETSTATIC,
                self.class,
                info.name,
                jvm::descriptor(&info.ty)
            ));
        } else {
            let slot = self.slot(id);
            let load = match info.ty {
                Ty::Array(..) => jvm::ALOAD,
                Ty::Float => jvm::FLOAD,
                _ => jvm::ILOAD,
            };
            self.slot_op(load, slot);
        }
        frame.push(1);
    }

    /// Pushes the array reference an element access or element
    /// store starts from.
    fn load_array_ref(&mut self, name: &Name, frame: &mut Frame) {
        let id = self.decl_of(name);
        let info = self.table.get(id);
        if info.kind == DeclKind::Global {
            self.line(format!(
                "{} {}/{} {}",
                jvm::GETSTATIC,
                self.class,
                info.name,
                jvm::descriptor(&info.ty)
            ));
        } else {
            let slot = self.slot(id);
            self.slot_op(jvm::ALOAD, slot);
        }
        frame.push(1);
    }

    fn unary(&mut self, op: UnaryOp, operand: &Spanned<Expr>, frame: &mut Frame) {
        match op {
            UnaryOp::Plus => self.visit_expr(operand, frame),
            UnaryOp::Neg => {
                self.visit_expr(operand, frame);
                let neg = if *expr_ty(operand) == Ty::Float {
                    jvm::FNEG
                } else {
                    jvm::INEG
                };
                self.line(neg);
            }
            UnaryOp::Not => {
                let false_label = frame.new_label();
                let next_label = frame.new_label();
                self.visit_expr(operand, frame);
                self.line(format!("{} {}", jvm::IFEQ, false_label));
                frame.pop(1);
                self.line(format!("{}_0", jvm::ICONST));
                self.line(format!("{} {}", jvm::GOTO, next_label));
                self.label(&false_label);
                self.line(format!("{}_1", jvm::ICONST));
                frame.push(1);
                self.label(&next_label);
            }
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        whole: &Spanned<Expr>,
        frame: &mut Frame,
    ) {
        match op {
            // short-circuit forms evaluate the right side only
            // when the left side has not already decided
            BinaryOp::And => {
                let false_label = frame.new_label();
                let next_label = frame.new_label();
                self.visit_expr(lhs, frame);
                self.line(format!("{} {}", jvm::IFEQ, false_label));
                frame.pop(1);
                self.visit_expr(rhs, frame);
                self.line(format!("{} {}", jvm::IFEQ, false_label));
                frame.pop(1);
                self.line(format!("{}_1", jvm::ICONST));
                self.line(format!("{} {}", jvm::GOTO, next_label));
                self.label(&false_label);
                self.line(format!("{}_0", jvm::ICONST));
                frame.push(1);
                self.label(&next_label);
            }
            BinaryOp::Or => {
                let true_label = frame.new_label();
                let next_label = frame.new_label();
                self.visit_expr(lhs, frame);
                self.line(format!("{} {}", jvm::IFNE, true_label));
                frame.pop(1);
                self.visit_expr(rhs, frame);
                self.line(format!("{} {}", jvm::IFNE, true_label));
                frame.pop(1);
                self.line(format!("{}_0", jvm::ICONST));
                self.line(format!("{} {}", jvm::GOTO, next_label));
                self.label(&true_label);
                self.line(format!("{}_1", jvm::ICONST));
                frame.push(1);
                self.label(&next_label);
            }

            op if op.is_comparison() => {
                self.visit_expr(lhs, frame);
                self.visit_expr(rhs, frame);
                if *expr_ty(lhs) == Ty::Float {
                    self.fcmp(op, frame);
                } else {
                    self.icmp(op, frame);
                }
            }

            // arithmetic selects by the decorated result type;
            // booleans share the integer family
            _ => {
                self.visit_expr(lhs, frame);
                self.visit_expr(rhs, frame);
                let float = *expr_ty(whole) == Ty::Float;
                let inst = match op {
                    BinaryOp::Add => {
                        if float {
                            jvm::FADD
                        } else {
                            jvm::IADD
                        }
                    }
                    BinaryOp::Sub => {
                        if float {
                            jvm::FSUB
                        } else {
                            jvm::ISUB
                        }
                    }
                    BinaryOp::Mul => {
                        if float {
                            jvm::FMUL
                        } else {
                            jvm::IMUL
                        }
                    }
                    BinaryOp::Div => {
                        if float {
                            jvm::FDIV
                        } else {
                            jvm::IDIV
                        }
                    }
                    _ => unreachable!("logical and comparison operators are handled above"),
                };
                self.line(inst);
                frame.pop(1);
            }
        }
    }

    /// Integer and boolean comparisons lower to one
    /// compare-and-branch instruction, then materialize 0 or 1.
    fn icmp(&mut self, op: BinaryOp, frame: &mut Frame) {
        let opcode = match op {
            BinaryOp::EqEq => jvm::IF_ICMPEQ,
            BinaryOp::NotEq => jvm::IF_ICMPNE,
            BinaryOp::Lt => jvm::IF_ICMPLT,
            BinaryOp::LtEq => jvm::IF_ICMPLE,
            BinaryOp::Gt => jvm::IF_ICMPGT,
            BinaryOp::GtEq => jvm::IF_ICMPGE,
            _ => unreachable!(),
        };
        let true_label = frame.new_label();
        let next_label = frame.new_label();
        self.line(format!("{} {}", opcode, true_label));
        frame.pop(2);
        self.line(format!("{}_0", jvm::ICONST));
        self.line(format!("{} {}", jvm::GOTO, next_label));
        self.label(&true_label);
        self.line(format!("{}_1", jvm::ICONST));
        frame.push(1);
        self.label(&next_label);
    }

    /// Float comparisons first reduce to the three-way `fcmpg`
    /// and then branch on its sign.
    fn fcmp(&mut self, op: BinaryOp, frame: &mut Frame) {
        let opcode = match op {
            BinaryOp::EqEq => jvm::IFEQ,
            BinaryOp::NotEq => jvm::IFNE,
            BinaryOp::Lt => jvm::IFLT,
            BinaryOp::LtEq => jvm::IFLE,
            BinaryOp::Gt => jvm::IFGT,
            BinaryOp::GtEq => jvm::IFGE,
            _ => unreachable!(),
        };
        let true_label = frame.new_label();
        let next_label = frame.new_label();
        self.line(jvm::FCMPG);
        frame.pop(2);
        frame.push(1);
        self.line(format!("{} {}", opcode, true_label));
        frame.pop(1);
        self.line(format!("{}_0", jvm::ICONST));
        self.line(format!("{} {}", jvm::GOTO, next_label));
        self.label(&true_label);
        self.line(format!("{}_1", jvm::ICONST));
        frame.push(1);
        self.label(&next_label);
    }

    /// Evaluates the right-hand side of an assignment; a nested
    /// assignment is itself chained.
    fn assign_value(&mut self, value: &Spanned<Expr>, frame: &mut Frame) {
        if let ExprKind::Assign {
            target: inner_target,
            value: inner_value,
        } = &value.item.kind
        {
            self.assign(inner_target, inner_value, true, frame);
        } else {
            self.visit_expr(value, frame);
        }
    }

    /// Assignment has two lvalue shapes with deliberately
    /// different chaining behavior. A plain variable duplicates
    /// the computed value when an enclosing assignment consumes
    /// it; an array element store consumes its operands without
    /// leaving a value, so a chained assignment through one
    /// re-evaluates the right-hand side instead.
    fn assign(
        &mut self,
        target: &Spanned<Expr>,
        value: &Spanned<Expr>,
        chained: bool,
        frame: &mut Frame,
    ) {
        match &target.item.kind {
            ExprKind::Var(name) => {
                let id = self.decl_of(name);
                self.assign_value(value, frame);
                if chained {
                    self.line(jvm::DUP);
                    frame.push(1);
                }
                let info = self.table.get(id);
                if info.kind == DeclKind::Global {
                    self.line(format!(
                        "{} {}/{} {}",
                        jvm::PUTSTATIC,
                        self.class,
                        info.name,
                        jvm::descriptor(&info.ty)
                    ));
                } else {
                    let store = match info.ty {
                        Ty::Float => jvm::FSTORE,
                        Ty::Array(..) => jvm::ASTORE,
                        _ => jvm::ISTORE,
                    };
                    let slot = self.slot(id);
                    self.slot_op(store, slot);
                }
                frame.pop(1);
            }

            ExprKind::Index { array, index } => {
                self.load_array_ref(array, frame);
                self.visit_expr(index, frame);
                self.assign_value(value, frame);
                let store = match expr_ty(target) {
                    Ty::Int => jvm::IASTORE,
                    Ty::Float => jvm::FASTORE,
                    Ty::Bool => jvm::BASTORE,
                    other => panic!("array element store of type {}", other),
                };
                self.line(store);
                frame.pop(3);
                if chained {
                    // the store left nothing behind; produce the
                    // chained value by evaluating the right side
                    // again
                    self.assign_value(value, frame);
                }
            }

            _ => panic!("assignment target must be a variable or an array element"),
        }
    }

    fn call(&mut self, callee: &Name, args: &[Spanned<Expr>], frame: &mut Frame) {
        let id = self.decl_of(callee);
        let info = self.table.get(id);

        if info.kind == DeclKind::Builtin {
            for arg in args {
                self.visit_expr(arg, frame);
            }
            let params: String = info.params.iter().map(|p| jvm::descriptor(p)).collect();
            self.line(format!(
                "{} {}/{}({}){}",
                jvm::INVOKESTATIC,
                RUNTIME,
                info.name,
                params,
                jvm::descriptor(&info.ty)
            ));
            frame.pop(info.params.len() as u32);
            if info.ty != Ty::Void {
                frame.push(1);
            }
            return;
        }

        // programmer-defined functions are instance operations:
        // push the receiver, then the arguments
        self.line(if frame.is_entry() {
            "aload_1"
        } else {
            "aload_0"
        });
        frame.push(1);
        for arg in args {
            self.visit_expr(arg, frame);
        }
        let params: String = info.params.iter().map(|p| jvm::descriptor(p)).collect();
        self.line(format!(
            "{} {}/{}({}){}",
            jvm::INVOKEVIRTUAL,
            self.class,
            info.name,
            params,
            jvm::descriptor(&info.ty)
        ));
        frame.pop(args.len() as u32 + 1);
        if info.ty != Ty::Void {
            frame.push(1);
        }
    }
}

fn expr_ty(expr: &Spanned<Expr>) -> &Ty {
    expr.item
        .ty
        .as_ref()
        .expect("expression not decorated with a type")
}

/// Re-escapes a translated string literal for `ldc`.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out
}

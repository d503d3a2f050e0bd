// cprint.rs — C++ printing of IR shared by the driver and kernel emitters
//
// Expressions print as nested C++ expressions. Statements go through the
// `StmtEmitter` trait: every node kind has a default emission in a public
// `walk_*` function, and the hooks that a concrete emitter may intercept
// (let, producer/consumer, allocate, realize, block, evaluate) are trait
// methods whose defaults call those walkers. An override falls back to the
// default by calling the walker explicitly.
//
// Lexical state (buffer sizes, stencil types) flows down as an `Env` value;
// entering a binding construct builds a child env for the nested body.
//
// Preconditions: IR satisfies the front-end grammar (see `ir`).
// Postconditions: output is appended to the emitter's `CWriter`.
// Failure modes: malformed intrinsic calls and non-constant stencil extents
//                return `HlsError::Structural`.
// Side effects: none beyond the writer.

use std::fmt::Write as _;

use crate::diag::HlsError;
use crate::ir::{BinOp, Expr, Range, Stmt, Type, TypeCode};
use crate::naming::NamingConventions;
use crate::scope::Scope;
use crate::simplify;
use crate::size_tracker::SizeTracker;
use crate::stencil::{Representation, StencilType};
use crate::streams;

// ── Names and types ─────────────────────────────────────────────────────────

/// C identifier for an IR name: every character outside `[A-Za-z0-9_]`
/// becomes `_`, and a leading digit gets a `_` prefix.
pub fn print_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

pub fn print_type(ty: Type) -> &'static str {
    match (ty.code, ty.bits) {
        (TypeCode::UInt, 1) => "bool",
        (TypeCode::Int, 8) => "int8_t",
        (TypeCode::Int, 16) => "int16_t",
        (TypeCode::Int, 64) => "int64_t",
        (TypeCode::Int, _) => "int32_t",
        (TypeCode::UInt, 8) => "uint8_t",
        (TypeCode::UInt, 16) => "uint16_t",
        (TypeCode::UInt, 64) => "uint64_t",
        (TypeCode::UInt, _) => "uint32_t",
        (TypeCode::Float, 64) => "double",
        (TypeCode::Float, 16) => "uint16_t",
        (TypeCode::Float, _) => "float",
        (TypeCode::Handle, _) => "void *",
    }
}

// ── Expressions ─────────────────────────────────────────────────────────────

/// Calls that stand for whole statements in the driver.
pub const STREAM_SUBIMAGE: &str = "stream_subimage";
pub const BUFFER_TO_STENCIL: &str = "buffer_to_stencil";
pub const ADDRESS_OF: &str = "address_of";

pub fn print_expr(e: &Expr) -> Result<String, HlsError> {
    let s = match e {
        Expr::IntImm { value, .. } => value.to_string(),
        Expr::FloatImm { value, ty } => {
            if ty.bits == 64 {
                format!("{:?}", value)
            } else {
                format!("{:?}f", *value as f32)
            }
        }
        Expr::StringImm(s) => format!("{:?}", s),
        Expr::Variable { name, .. } => print_name(name),
        Expr::Cast { ty, value } => format!("(({})({}))", print_type(*ty), print_expr(value)?),
        Expr::Binary { op, a, b } => {
            let (a, b) = (print_expr(a)?, print_expr(b)?);
            match (op, op.symbol()) {
                (_, Some(sym)) => format!("({} {} {})", a, sym, b),
                (BinOp::Min, None) => format!("std::min({}, {})", a, b),
                (_, None) => format!("std::max({}, {})", a, b),
            }
        }
        Expr::Not(inner) => format!("!({})", print_expr(inner)?),
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => format!(
            "({} ? {} : {})",
            print_expr(condition)?,
            print_expr(true_value)?,
            print_expr(false_value)?
        ),
        Expr::Load { name, index, .. } => format!("{}[{}]", print_name(name), print_expr(index)?),
        Expr::Call { name, args, .. } => print_call(name, args)?,
    };
    Ok(s)
}

fn print_call(name: &str, args: &[Expr]) -> Result<String, HlsError> {
    match name {
        ADDRESS_OF => match args {
            [Expr::Load { name, ty, index }] => Ok(format!(
                "(({} *){} + {})",
                print_type(*ty),
                print_name(name),
                print_expr(index)?
            )),
            _ => Err(HlsError::structural(
                ADDRESS_OF,
                format!("expected a single load argument, found {} arguments", args.len()),
            )),
        },
        STREAM_SUBIMAGE | BUFFER_TO_STENCIL => Err(HlsError::structural(
            name,
            "only valid as a statement in the host driver",
        )),
        _ => Ok(format!("{}({})", print_name(name), print_args(args)?)),
    }
}

pub fn print_args(args: &[Expr]) -> Result<String, HlsError> {
    Ok(args
        .iter()
        .map(print_expr)
        .collect::<Result<Vec<_>, _>>()?
        .join(", "))
}

// ── Writer ──────────────────────────────────────────────────────────────────

/// Indented C++ text sink.
#[derive(Debug, Default)]
pub struct CWriter {
    out: String,
    indent: usize,
    heap: Vec<String>,
}

impl CWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{:width$}{}", "", text.as_ref(), width = self.indent * 2);
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

// ── Lexical environment ─────────────────────────────────────────────────────

/// Scoped state visible at one point of the traversal.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    pub sizes: &'a SizeTracker<'a>,
    pub stencils: &'a Scope<'a, StencilType>,
}

impl<'a> Env<'a> {
    pub fn new(sizes: &'a SizeTracker<'a>, stencils: &'a Scope<'a, StencilType>) -> Self {
        Env { sizes, stencils }
    }

    pub fn with_sizes<'c>(&self, sizes: &'c SizeTracker<'c>) -> Env<'c>
    where
        'a: 'c,
    {
        Env {
            sizes,
            stencils: self.stencils,
        }
    }

    pub fn with_stencils<'c>(&self, stencils: &'c Scope<'c, StencilType>) -> Env<'c>
    where
        'a: 'c,
    {
        Env {
            sizes: self.sizes,
            stencils,
        }
    }
}

// ── Statement emission ──────────────────────────────────────────────────────

pub trait StmtEmitter {
    fn writer(&mut self) -> &mut CWriter;

    fn naming(&self) -> &NamingConventions;

    /// FIFO depth for streams this emitter declares.
    fn stream_depth(&self) -> usize;

    fn emit_stmt(&mut self, s: &Stmt, env: Env<'_>) -> Result<(), HlsError> {
        walk_stmt(self, s, env)
    }

    fn emit_let_stmt(
        &mut self,
        name: &str,
        value: &Expr,
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        walk_let_stmt(self, name, value, body, env)
    }

    fn emit_producer_consumer(
        &mut self,
        name: &str,
        is_producer: bool,
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        walk_producer_consumer(self, name, is_producer, body, env)
    }

    fn emit_allocate(
        &mut self,
        name: &str,
        ty: Type,
        extents: &[Expr],
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        walk_allocate(self, name, ty, extents, body, env)
    }

    fn emit_realize(
        &mut self,
        name: &str,
        ty: Type,
        bounds: &[Range],
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        walk_realize(self, name, ty, bounds, body, env)
    }

    fn emit_block(&mut self, first: &Stmt, rest: &Stmt, env: Env<'_>) -> Result<(), HlsError> {
        walk_block(self, first, rest, env)
    }

    fn emit_evaluate(&mut self, value: &Expr, env: Env<'_>) -> Result<(), HlsError> {
        walk_evaluate(self, value, env)
    }
}

/// Dispatch on the node kind; non-hook kinds are printed here directly.
pub fn walk_stmt<E: StmtEmitter + ?Sized>(
    em: &mut E,
    s: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    match s {
        Stmt::LetStmt { name, value, body } => em.emit_let_stmt(name, value, body, env),
        Stmt::AssertStmt { condition, message } => {
            let cond = print_expr(condition)?;
            em.writer()
                .line(format!("assert({} && {:?});", cond, message));
            Ok(())
        }
        Stmt::ProducerConsumer {
            name,
            is_producer,
            body,
        } => em.emit_producer_consumer(name, *is_producer, body, env),
        Stmt::For {
            name,
            min,
            extent,
            body,
        } => {
            let var = print_name(name);
            let min = print_expr(min)?;
            let extent = print_expr(extent)?;
            em.writer().line(format!(
                "for (int {v} = {min}; {v} < {min} + {extent}; {v}++) {{",
                v = var,
                min = min,
                extent = extent
            ));
            em.writer().indent();
            em.emit_stmt(body, env)?;
            em.writer().dedent();
            em.writer().line("}");
            Ok(())
        }
        Stmt::Store { name, value, index } => {
            let line = format!(
                "{}[{}] = {};",
                print_name(name),
                print_expr(index)?,
                print_expr(value)?
            );
            em.writer().line(line);
            Ok(())
        }
        Stmt::Provide { name, value, args } => {
            let line = format!(
                "{}({}) = {};",
                print_name(name),
                print_args(args)?,
                print_expr(value)?
            );
            em.writer().line(line);
            Ok(())
        }
        Stmt::Allocate {
            name,
            ty,
            extents,
            body,
        } => em.emit_allocate(name, *ty, extents, body, env),
        Stmt::Free { name } => {
            if em.naming().is_stream_buffer(name) {
                return Ok(());
            }
            let w = em.writer();
            if let Some(pos) = w.heap.iter().rposition(|n| n == name) {
                w.heap.remove(pos);
                w.line(format!("delete[] {};", print_name(name)));
            }
            Ok(())
        }
        Stmt::Realize {
            name,
            ty,
            bounds,
            body,
        } => em.emit_realize(name, *ty, bounds, body, env),
        Stmt::Block { first, rest } => em.emit_block(first, rest, env),
        Stmt::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            let cond = print_expr(condition)?;
            em.writer().line(format!("if ({}) {{", cond));
            em.writer().indent();
            em.emit_stmt(then_case, env)?;
            em.writer().dedent();
            if let Some(else_case) = else_case {
                em.writer().line("} else {");
                em.writer().indent();
                em.emit_stmt(else_case, env)?;
                em.writer().dedent();
            }
            em.writer().line("}");
            Ok(())
        }
        Stmt::Evaluate(value) => em.emit_evaluate(value, env),
    }
}

pub fn walk_let_stmt<E: StmtEmitter + ?Sized>(
    em: &mut E,
    name: &str,
    value: &Expr,
    body: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    let ty = value.ty();
    let decl = if ty.is_handle() {
        format!("{}{} = {};", print_type(ty), print_name(name), print_expr(value)?)
    } else {
        format!(
            "const {} {} = {};",
            print_type(ty),
            print_name(name),
            print_expr(value)?
        )
    };
    em.writer().line(decl);
    em.emit_stmt(body, env)
}

pub fn walk_producer_consumer<E: StmtEmitter + ?Sized>(
    em: &mut E,
    name: &str,
    is_producer: bool,
    body: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    let role = if is_producer { "produce" } else { "consume" };
    em.writer().line(format!("// {} {}", role, name));
    em.emit_stmt(body, env)
}

pub fn walk_allocate<E: StmtEmitter + ?Sized>(
    em: &mut E,
    name: &str,
    ty: Type,
    extents: &[Expr],
    body: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    let size = simplify::product(extents);
    let line = match size.as_int() {
        Some(n) => format!("{} {}[{}];", print_type(ty), print_name(name), n),
        None => {
            em.writer().heap.push(name.to_string());
            format!(
                "{t} *{n} = new {t}[{s}];",
                t = print_type(ty),
                n = print_name(name),
                s = print_expr(&size)?
            )
        }
    };
    em.writer().line(line);
    em.emit_stmt(body, env)
}

/// Stream names go to the stream handler; `.stencil` names become unpacked
/// stencils in scope for the body; anything else is a plain local array.
pub fn walk_realize<E: StmtEmitter + ?Sized>(
    em: &mut E,
    name: &str,
    ty: Type,
    bounds: &[Range],
    body: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    if em.naming().is_stream_buffer(name) {
        return streams::emit_stream_realize(em, name, ty, bounds, body, env);
    }
    if em.naming().is_stencil(name) {
        let stype = StencilType::from_bounds(Representation::Unpacked, ty, bounds, 0)?;
        declare(em.writer(), &stype, name);
        let stencils = env.stencils.push(name, stype);
        return em.emit_stmt(body, env.with_stencils(&stencils));
    }
    let size = simplify::product(bounds.iter().map(|r| &r.extent));
    let n = size.as_int().ok_or_else(|| {
        HlsError::structural(
            "realize",
            format!("`{}` has a non-constant size {}", name, size),
        )
    })?;
    em.writer()
        .line(format!("{} {}[{}];", print_type(ty), print_name(name), n));
    em.emit_stmt(body, env)
}

pub fn walk_block<E: StmtEmitter + ?Sized>(
    em: &mut E,
    first: &Stmt,
    rest: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    em.emit_stmt(first, env)?;
    em.emit_stmt(rest, env)
}

pub fn walk_evaluate<E: StmtEmitter + ?Sized>(
    em: &mut E,
    value: &Expr,
    _env: Env<'_>,
) -> Result<(), HlsError> {
    // A bare constant is the IR's no-op.
    if value.as_int().is_some() {
        return Ok(());
    }
    let line = format!("{};", print_expr(value)?);
    em.writer().line(line);
    Ok(())
}

/// Declaration line plus storage pragmas for a stencil-typed variable.
pub fn declare(w: &mut CWriter, stype: &StencilType, name: &str) {
    let var = print_name(name);
    w.line(format!("{} {};", stype.cpp_type(), var));
    for p in stype.pragmas(&var) {
        w.line(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, Type};

    struct Plain {
        w: CWriter,
        naming: NamingConventions,
    }

    impl StmtEmitter for Plain {
        fn writer(&mut self) -> &mut CWriter {
            &mut self.w
        }

        fn naming(&self) -> &NamingConventions {
            &self.naming
        }

        fn stream_depth(&self) -> usize {
            1
        }
    }

    fn emit(s: &Stmt) -> Result<String, HlsError> {
        let mut em = Plain {
            w: CWriter::new(),
            naming: NamingConventions::default(),
        };
        let sizes = SizeTracker::new();
        let stencils = Scope::root();
        em.emit_stmt(s, Env::new(&sizes, &stencils))?;
        Ok(em.w.into_string())
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(print_name("in.stream"), "in_stream");
        assert_eq!(print_name("hls_target$1"), "hls_target_1");
        assert_eq!(print_name("0tmp"), "_0tmp");
    }

    #[test]
    fn address_of_prints_typed_pointer() {
        let e = Expr::call(
            ADDRESS_OF,
            Type::handle(),
            vec![Expr::load("input", Type::uint(8), Expr::int(10))],
        );
        assert_eq!(print_expr(&e).unwrap(), "((uint8_t *)input + 10)");
    }

    #[test]
    fn address_of_without_load_is_structural() {
        let e = Expr::call(ADDRESS_OF, Type::handle(), vec![Expr::int(1)]);
        assert!(matches!(print_expr(&e), Err(HlsError::Structural { .. })));
    }

    #[test]
    fn stream_intrinsic_inside_expression_is_rejected() {
        let e = Expr::add(
            Expr::int(1),
            Expr::call(STREAM_SUBIMAGE, Type::int(32), vec![]),
        );
        assert!(print_expr(&e).is_err());
    }

    #[test]
    fn loop_and_store() {
        let s = Stmt::for_loop(
            "f.s0.x",
            Expr::int(0),
            Expr::int(4),
            Stmt::store(
                "out",
                Expr::load("in", Type::uint(8), Expr::var("f.s0.x", Type::int(32))),
                Expr::var("f.s0.x", Type::int(32)),
            ),
        );
        assert_eq!(
            emit(&s).unwrap(),
            "for (int f_s0_x = 0; f_s0_x < 0 + 4; f_s0_x++) {\n  out[f_s0_x] = in[f_s0_x];\n}\n"
        );
    }

    #[test]
    fn symbolic_allocation_is_freed() {
        let s = Stmt::allocate(
            "tmp",
            Type::int(16),
            vec![Expr::var("w", Type::int(32)), Expr::int(2)],
            Stmt::Free { name: "tmp".into() },
        );
        assert_eq!(
            emit(&s).unwrap(),
            "int16_t *tmp = new int16_t[(w * 2)];\ndelete[] tmp;\n"
        );
    }

    #[test]
    fn constant_allocation_lives_on_stack() {
        let s = Stmt::allocate(
            "tmp",
            Type::uint(8),
            vec![Expr::int(4), Expr::int(4)],
            Stmt::Free { name: "tmp".into() },
        );
        assert_eq!(emit(&s).unwrap(), "uint8_t tmp[16];\n");
    }

    #[test]
    fn stencil_realize_declares_unpacked_stencil() {
        let s = Stmt::realize(
            "blur.stencil",
            Type::uint(16),
            vec![
                Range::new(Expr::int(0), Expr::int(3)),
                Range::new(Expr::int(0), Expr::int(1)),
            ],
            Stmt::no_op(),
        );
        assert_eq!(
            emit(&s).unwrap(),
            "Stencil<uint16_t, 3, 1> blur_stencil;\n#pragma HLS ARRAY_PARTITION variable=blur_stencil.value complete dim=0\n"
        );
    }

    #[test]
    fn no_op_evaluate_prints_nothing() {
        assert_eq!(emit(&Stmt::no_op()).unwrap(), "");
    }
}

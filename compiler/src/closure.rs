// closure.rs — Free-reference capture for hardware regions
//
// One traversal of a region body collects every name used but not bound
// inside it: memory buffers (from loads and stores, with access flags and
// element type) and free variables (streams, stencils, scalars). The result
// is turned into the ordered argument list of the generated kernel.
//
// Preconditions: region bodies do not contain nested regions.
// Postconditions: buffers come first in first-seen order, then variables in
//                 first-seen order; each free name appears exactly once and
//                 prints as a distinct C++ identifier.
// Failure modes: `UpdateInClosure`, `AmbiguousName`, `UnscopedStream`,
//                `ArgumentCollision`.
// Side effects: emits `tracing` debug events listing the captured names.

use crate::cprint::print_name;
use crate::diag::HlsError;
use crate::ir::{Expr, Stmt, Type};
use crate::naming::{NameClass, NamingConventions};
use crate::scope::Scope;
use crate::size_tracker::SizeTracker;
use crate::stencil::StencilType;

/// A memory buffer touched by a region.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferUse {
    pub name: String,
    pub ty: Type,
    pub read: bool,
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    MemoryBuffer,
    Stream,
    Scalar,
}

/// One parameter of a generated kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureArg {
    pub name: String,
    pub kind: ArgKind,
    /// Element count; memory buffers only, and only when known.
    pub size: Option<Expr>,
    pub ty: Type,
    pub stencil: Option<StencilType>,
    pub read: bool,
    pub write: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closure {
    buffers: Vec<BufferUse>,
    vars: Vec<(String, Type)>,
}

impl Closure {
    pub fn capture(body: &Stmt) -> Closure {
        let mut c = Closure::default();
        c.visit_stmt(body, &Scope::root());
        for b in &c.buffers {
            tracing::debug!(buffer = %b.name, read = b.read, write = b.write, "closure buffer");
        }
        for (name, ty) in &c.vars {
            tracing::debug!(var = %name, ty = %ty, "closure var");
        }
        c
    }

    pub fn buffers(&self) -> &[BufferUse] {
        &self.buffers
    }

    pub fn vars(&self) -> &[(String, Type)] {
        &self.vars
    }

    /// Classify and order the captured names for region `region`.
    ///
    /// Every stencil-class name must have a type in `stencils`; it is the
    /// enclosing stream declarations that put it there.
    pub fn arguments(
        &self,
        stencils: &Scope<'_, StencilType>,
        naming: &NamingConventions,
        region: &str,
    ) -> Result<Vec<ClosureArg>, HlsError> {
        let mut args = Vec::with_capacity(self.buffers.len() + self.vars.len());
        for b in &self.buffers {
            args.push(ClosureArg {
                name: b.name.clone(),
                kind: ArgKind::MemoryBuffer,
                size: None,
                ty: b.ty,
                stencil: Some(StencilType::memory_buffer(b.ty)),
                read: b.read,
                write: b.write,
            });
        }
        for (name, ty) in &self.vars {
            let arg = match naming.classify(name, region)? {
                NameClass::Stencil => {
                    let stype = stencils.get(name).cloned().ok_or_else(|| {
                        HlsError::UnscopedStream {
                            name: name.clone(),
                            region: region.to_string(),
                        }
                    })?;
                    ClosureArg {
                        name: name.clone(),
                        kind: ArgKind::Stream,
                        size: None,
                        ty: stype.elem,
                        stencil: Some(stype),
                        read: false,
                        write: false,
                    }
                }
                NameClass::Scalar => ClosureArg {
                    name: name.clone(),
                    kind: ArgKind::Scalar,
                    size: None,
                    ty: *ty,
                    stencil: None,
                    read: false,
                    write: false,
                },
            };
            args.push(arg);
        }
        check_printed_names(&args, region)?;
        Ok(args)
    }

    fn note_buffer(&mut self, name: &str, ty: Type, read: bool, write: bool) {
        match self.buffers.iter_mut().find(|b| b.name == name) {
            Some(b) => {
                b.read |= read;
                b.write |= write;
            }
            None => self.buffers.push(BufferUse {
                name: name.to_string(),
                ty,
                read,
                write,
            }),
        }
        self.vars.retain(|(v, _)| v != name);
    }

    fn note_var(&mut self, name: &str, ty: Type) {
        let known = self.vars.iter().any(|(v, _)| v == name)
            || self.buffers.iter().any(|b| b.name == name);
        if !known {
            self.vars.push((name.to_string(), ty));
        }
    }

    fn visit_stmt(&mut self, s: &Stmt, bound: &Scope<'_, ()>) {
        match s {
            Stmt::LetStmt { name, value, body } => {
                self.visit_expr(value, bound);
                self.visit_stmt(body, &bound.push(name.as_str(), ()));
            }
            Stmt::AssertStmt { condition, .. } => self.visit_expr(condition, bound),
            Stmt::ProducerConsumer { body, .. } => self.visit_stmt(body, bound),
            Stmt::For {
                name,
                min,
                extent,
                body,
            } => {
                self.visit_expr(min, bound);
                self.visit_expr(extent, bound);
                self.visit_stmt(body, &bound.push(name.as_str(), ()));
            }
            Stmt::Store { name, value, index } => {
                self.visit_expr(value, bound);
                self.visit_expr(index, bound);
                if !bound.contains(name) {
                    self.note_buffer(name, value.ty(), false, true);
                }
            }
            Stmt::Provide { value, args, .. } => {
                self.visit_expr(value, bound);
                for a in args {
                    self.visit_expr(a, bound);
                }
            }
            Stmt::Allocate {
                name,
                extents,
                body,
                ..
            } => {
                for e in extents {
                    self.visit_expr(e, bound);
                }
                self.visit_stmt(body, &bound.push(name.as_str(), ()));
            }
            Stmt::Free { .. } => {}
            Stmt::Realize {
                name, bounds, body, ..
            } => {
                for r in bounds {
                    self.visit_expr(&r.min, bound);
                    self.visit_expr(&r.extent, bound);
                }
                self.visit_stmt(body, &bound.push(name.as_str(), ()));
            }
            Stmt::Block { first, rest } => {
                self.visit_stmt(first, bound);
                self.visit_stmt(rest, bound);
            }
            Stmt::IfThenElse {
                condition,
                then_case,
                else_case,
            } => {
                self.visit_expr(condition, bound);
                self.visit_stmt(then_case, bound);
                if let Some(e) = else_case {
                    self.visit_stmt(e, bound);
                }
            }
            Stmt::Evaluate(e) => self.visit_expr(e, bound),
        }
    }

    fn visit_expr(&mut self, e: &Expr, bound: &Scope<'_, ()>) {
        match e {
            Expr::IntImm { .. } | Expr::FloatImm { .. } | Expr::StringImm(_) => {}
            Expr::Variable { name, ty } => {
                if !bound.contains(name) {
                    self.note_var(name, *ty);
                }
            }
            Expr::Cast { value, .. } => self.visit_expr(value, bound),
            Expr::Binary { a, b, .. } => {
                self.visit_expr(a, bound);
                self.visit_expr(b, bound);
            }
            Expr::Not(inner) => self.visit_expr(inner, bound),
            Expr::Select {
                condition,
                true_value,
                false_value,
            } => {
                self.visit_expr(condition, bound);
                self.visit_expr(true_value, bound);
                self.visit_expr(false_value, bound);
            }
            Expr::Load { name, ty, index } => {
                self.visit_expr(index, bound);
                if !bound.contains(name) {
                    self.note_buffer(name, *ty, true, false);
                }
            }
            Expr::Call { args, .. } => {
                for a in args {
                    self.visit_expr(a, bound);
                }
            }
        }
    }
}

/// Fill memory-buffer sizes from the sizes visible at the region.
/// Buffers with no recorded size keep `None`.
/// Distinct IR names must stay distinct once printed as C++ parameters.
fn check_printed_names(args: &[ClosureArg], region: &str) -> Result<(), HlsError> {
    let mut seen: Vec<(String, &str)> = Vec::with_capacity(args.len());
    for arg in args {
        let printed = print_name(&arg.name);
        if let Some((_, first)) = seen.iter().find(|(p, _)| *p == printed) {
            return Err(HlsError::ArgumentCollision {
                first: first.to_string(),
                second: arg.name.clone(),
                printed,
                region: region.to_string(),
            });
        }
        seen.push((printed, arg.name.as_str()));
    }
    Ok(())
}

pub fn annotate_sizes(args: &mut [ClosureArg], sizes: &SizeTracker<'_>) {
    for arg in args.iter_mut() {
        if arg.kind == ArgKind::MemoryBuffer {
            arg.size = sizes.lookup(&arg.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Range;
    use crate::stencil::Representation;

    fn i32v(name: &str) -> Expr {
        Expr::var(name, Type::int(32))
    }

    fn stream_type() -> StencilType {
        StencilType::from_bounds(
            Representation::StreamingPacked,
            Type::uint(8),
            &[Range::new(Expr::int(0), Expr::int(1))],
            1,
        )
        .unwrap()
    }

    #[test]
    fn bound_names_are_not_captured() {
        let body = Stmt::for_loop(
            "x",
            Expr::int(0),
            i32v("width"),
            Stmt::let_stmt(
                "t",
                Expr::add(i32v("x"), i32v("offset")),
                Stmt::allocate(
                    "scratch",
                    Type::uint(8),
                    vec![Expr::int(4)],
                    Stmt::store("scratch", Expr::load("input", Type::uint(8), i32v("t")), Expr::int(0)),
                ),
            ),
        );
        let c = Closure::capture(&body);
        let vars: Vec<&str> = c.vars().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vars, vec!["width", "offset"]);
        let bufs: Vec<&str> = c.buffers().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(bufs, vec!["input"]);
    }

    #[test]
    fn read_write_flags_merge() {
        let body = Stmt::block(vec![
            Stmt::store("buf", Expr::int(1), Expr::int(0)),
            Stmt::evaluate(Expr::load("buf", Type::int(32), Expr::int(1))),
        ]);
        let c = Closure::capture(&body);
        assert_eq!(
            c.buffers(),
            &[BufferUse {
                name: "buf".into(),
                ty: Type::int(32),
                read: true,
                write: true,
            }]
        );
    }

    #[test]
    fn streams_take_their_type_from_scope() {
        let body = Stmt::evaluate(Expr::call(
            "read_stream",
            Type::int(32),
            vec![
                Expr::var("in.stream", Type::handle()),
                Expr::var("p", Type::int(32)),
            ],
        ));
        let root = Scope::root();
        let scope = root.push("in.stream", stream_type());
        let args = Closure::capture(&body)
            .arguments(&scope, &NamingConventions::default(), "hw")
            .unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].kind, ArgKind::Stream);
        assert_eq!(args[0].stencil, Some(stream_type()));
        assert_eq!(args[1].kind, ArgKind::Scalar);
        assert_eq!(args[1].stencil, None);
    }

    #[test]
    fn unscoped_stream_is_an_error() {
        let body = Stmt::evaluate(Expr::var("in.stream", Type::handle()));
        let err = Closure::capture(&body)
            .arguments(&Scope::root(), &NamingConventions::default(), "hw")
            .unwrap_err();
        assert_eq!(
            err,
            HlsError::UnscopedStream {
                name: "in.stream".into(),
                region: "hw".into(),
            }
        );
    }

    #[test]
    fn names_printing_alike_are_rejected() {
        let body = Stmt::evaluate(Expr::call(
            "use",
            Type::int(32),
            vec![i32v("a.b"), i32v("a_b")],
        ));
        let err = Closure::capture(&body)
            .arguments(&Scope::root(), &NamingConventions::default(), "hw")
            .unwrap_err();
        assert_eq!(
            err,
            HlsError::ArgumentCollision {
                first: "a.b".into(),
                second: "a_b".into(),
                printed: "a_b".into(),
                region: "hw".into(),
            }
        );
        assert_eq!(err.code(), crate::diag::codes::E0304);
    }

    #[test]
    fn buffer_and_scalar_printing_alike_are_rejected() {
        let body = Stmt::block(vec![
            Stmt::evaluate(Expr::load("x.y", Type::uint(8), Expr::int(0))),
            Stmt::evaluate(i32v("x_y")),
        ]);
        let err = Closure::capture(&body)
            .arguments(&Scope::root(), &NamingConventions::default(), "hw")
            .unwrap_err();
        assert!(matches!(err, HlsError::ArgumentCollision { ref printed, .. } if printed == "x_y"));
    }

    #[test]
    fn sizes_apply_to_memory_buffers_only() {
        let body = Stmt::block(vec![
            Stmt::evaluate(Expr::load("a", Type::uint(8), Expr::int(0))),
            Stmt::evaluate(Expr::load("b", Type::uint(8), Expr::int(0))),
            Stmt::evaluate(i32v("a.extent.0")),
        ]);
        let mut args = Closure::capture(&body)
            .arguments(&Scope::root(), &NamingConventions::default(), "hw")
            .unwrap();
        let root = SizeTracker::new();
        let sizes = root.record_allocation("a", &[Expr::int(8), Expr::int(8)]);
        annotate_sizes(&mut args, &sizes);
        assert_eq!(args[0].size, Some(Expr::int(64)));
        assert_eq!(args[1].size, None);
        assert_eq!(args[2].size, None);
    }
}

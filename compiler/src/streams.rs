// streams.rs — Declaration and lifetime of streaming buffers
//
// A `Realize` of a `.stream` name becomes a streaming-packed FIFO: one
// declaration, the depth/resource pragmas, a child stencil scope holding its
// type for the body, and no deallocation afterwards. Leaving the body drops
// the child scope, which unregisters the stream.
//
// Preconditions: the realization carries exactly one element type (the IR
//                `Realize` node has a single `ty`) and constant bounds.
// Postconditions: the stream's `StencilType` is visible to every nested
//                 closure capture.
// Failure modes: symbolic or invalid extents propagate from `StencilType`.
// Side effects: emits a `tracing` debug event per declared stream.

use crate::cprint::{self, Env, StmtEmitter};
use crate::diag::HlsError;
use crate::ir::{Range, Stmt, Type};
use crate::stencil::{Representation, StencilType};

pub fn emit_stream_realize<E: StmtEmitter + ?Sized>(
    em: &mut E,
    name: &str,
    ty: Type,
    bounds: &[Range],
    body: &Stmt,
    env: Env<'_>,
) -> Result<(), HlsError> {
    let stype = StencilType::from_bounds(
        Representation::StreamingPacked,
        ty,
        bounds,
        em.stream_depth(),
    )?;
    tracing::debug!(stream = name, ty = %stype.cpp_type(), "declare stream");
    cprint::declare(em.writer(), &stype, name);

    let stencils = env.stencils.push(name, stype);
    em.emit_stmt(body, env.with_stencils(&stencils))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cprint::CWriter;
    use crate::ir::Expr;
    use crate::naming::NamingConventions;
    use crate::scope::Scope;
    use crate::size_tracker::SizeTracker;

    /// Records the stencil type visible for `probe` when the body is reached.
    struct Probe {
        w: CWriter,
        naming: NamingConventions,
        seen: Option<StencilType>,
    }

    impl StmtEmitter for Probe {
        fn writer(&mut self) -> &mut CWriter {
            &mut self.w
        }

        fn naming(&self) -> &NamingConventions {
            &self.naming
        }

        fn stream_depth(&self) -> usize {
            4
        }

        fn emit_evaluate(&mut self, _value: &Expr, env: Env<'_>) -> Result<(), HlsError> {
            self.seen = env.stencils.get("in.stream").cloned();
            Ok(())
        }
    }

    fn probe() -> Probe {
        Probe {
            w: CWriter::new(),
            naming: NamingConventions::default(),
            seen: None,
        }
    }

    #[test]
    fn stream_is_declared_with_pragmas_and_scoped() {
        let s = Stmt::realize(
            "in.stream",
            Type::uint(8),
            vec![
                Range::new(Expr::int(0), Expr::int(1)),
                Range::new(Expr::int(0), Expr::int(1)),
            ],
            Stmt::evaluate(Expr::var("x", Type::int(32))),
        );
        let mut em = probe();
        let sizes = SizeTracker::new();
        let stencils = Scope::root();
        em.emit_stmt(&s, Env::new(&sizes, &stencils)).unwrap();

        assert_eq!(
            em.w.as_str(),
            "hls::stream<AxiPackedStencil<uint8_t, 1, 1> > in_stream;\n\
             #pragma HLS STREAM variable=in_stream depth=4\n\
             #pragma HLS RESOURCE variable=in_stream core=FIFO_SRL\n"
        );
        let seen = em.seen.expect("stream type visible in body");
        assert!(seen.is_stream());
        assert_eq!(seen.depth, 4);
        assert!(!stencils.contains("in.stream"));
    }

    #[test]
    fn stream_free_is_never_emitted() {
        let s = Stmt::realize(
            "out.stream",
            Type::uint(16),
            vec![Range::new(Expr::int(0), Expr::int(2))],
            Stmt::Free {
                name: "out.stream".into(),
            },
        );
        let mut em = probe();
        let sizes = SizeTracker::new();
        let stencils = Scope::root();
        em.emit_stmt(&s, Env::new(&sizes, &stencils)).unwrap();
        assert!(!em.w.as_str().contains("delete"));
    }

    #[test]
    fn symbolic_stream_extent_fails() {
        let s = Stmt::realize(
            "in.stream",
            Type::uint(8),
            vec![Range::new(Expr::int(0), Expr::var("n", Type::int(32)))],
            Stmt::no_op(),
        );
        let mut em = probe();
        let sizes = SizeTracker::new();
        let stencils = Scope::root();
        let err = em.emit_stmt(&s, Env::new(&sizes, &stencils)).unwrap_err();
        assert!(matches!(err, HlsError::Structural { .. }));
        assert_eq!(em.w.as_str(), "");
    }
}

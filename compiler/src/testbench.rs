// testbench.rs — Host driver emission and hardware-region lowering
//
// Prints the lowered host function as a C++ driver. Producer nodes that start
// a hardware region are replaced by a call to a generated kernel: the region
// body is captured as a closure, the kernel definition is delegated to a
// `KernelGenerator`, and the call site passes the closure arguments by name.
//
// Along the way the driver tracks buffer sizes (allocations and buffer
// descriptors built from a shape), prints the stream/buffer transfer
// intrinsics, and emits a stream drain after the statement that follows it.
//
// Preconditions: hardware regions do not nest.
// Postconditions: one kernel call per region, in traversal order; kernel
//                 identifiers are unique within the run.
// Failure modes: closure classification errors abort before any kernel output
//                for the region; malformed intrinsics are structural errors;
//                back-to-back drains are `Unsupported`.
// Side effects: emits `tracing` debug events on region entry.

use crate::closure::{annotate_sizes, Closure, ClosureArg};
use crate::config::HlsConfig;
use crate::cprint::{
    self, print_args, print_name, print_type, CWriter, Env, StmtEmitter, BUFFER_TO_STENCIL,
    STREAM_SUBIMAGE,
};
use crate::diag::HlsError;
use crate::ir::{Expr, ParamKind, Pipeline, Stmt, Type};
use crate::kernel::{KernelGenerator, NameGenerator};
use crate::naming::NamingConventions;
use crate::scope::Scope;
use crate::size_tracker::SizeTracker;

/// Buffer-descriptor constructor; argument 0 is the memory variable and
/// argument 8 the shape.
pub const BUFFER_INIT: &str = "buffer_init";
pub const MAKE_STRUCT: &str = "make_struct";
const BUFFER_INIT_SHAPE_ARG: usize = 8;

/// Data movement selected by the first argument of `stream_subimage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Fill: host memory into a stream.
    BufferToStream,
    /// Drain: stream into host memory.
    StreamToBuffer,
}

impl Direction {
    pub fn of(args: &[Expr]) -> Result<Direction, HlsError> {
        match args.first().and_then(Expr::as_string) {
            Some("buffer_to_stream") => Ok(Direction::BufferToStream),
            Some("stream_to_buffer") => Ok(Direction::StreamToBuffer),
            Some(other) => Err(HlsError::structural(
                STREAM_SUBIMAGE,
                format!("unknown direction {:?}", other),
            )),
            None => Err(HlsError::structural(
                STREAM_SUBIMAGE,
                "first argument must be a direction string",
            )),
        }
    }

    fn runtime_call(self) -> &'static str {
        match self {
            Direction::BufferToStream => "subimage_to_stream",
            Direction::StreamToBuffer => "stream_to_subimage",
        }
    }
}

/// True if `s` is a `stream_subimage` drain statement.
fn is_drain(s: &Stmt) -> Result<bool, HlsError> {
    match s {
        Stmt::Evaluate(e) => match e.as_call() {
            Some((STREAM_SUBIMAGE, args)) => Ok(Direction::of(args)? == Direction::StreamToBuffer),
            _ => Ok(false),
        },
        _ => Ok(false),
    }
}

/// One lowered hardware region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub target: String,
    pub kernel: String,
    pub args: Vec<ClosureArg>,
}

pub struct Testbench<'c, G: KernelGenerator> {
    w: CWriter,
    config: &'c HlsConfig,
    generator: G,
    names: NameGenerator,
    regions: Vec<RegionRecord>,
}

impl<'c, G: KernelGenerator> Testbench<'c, G> {
    pub fn new(config: &'c HlsConfig, generator: G) -> Self {
        let mut w = CWriter::new();
        for h in &config.driver_headers {
            w.line(format!("#include {}", h));
        }
        w.line(format!("#include \"{}\"", config.kernel_header_name()));
        w.line("");
        Testbench {
            w,
            config,
            generator,
            names: NameGenerator::new(),
            regions: Vec::new(),
        }
    }

    /// Print `pipeline` as the driver function `int name(params)`.
    pub fn emit_pipeline(&mut self, pipeline: &Pipeline) -> Result<(), HlsError> {
        let params = pipeline
            .params
            .iter()
            .map(|p| match p.kind {
                ParamKind::Buffer => format!("{} *{}", print_type(p.ty), print_name(&p.name)),
                ParamKind::Scalar => format!("{} {}", print_type(p.ty), print_name(&p.name)),
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.w
            .line(format!("int {}({}) {{", print_name(&pipeline.name), params));
        self.w.indent();
        let sizes = SizeTracker::new();
        let stencils = Scope::root();
        self.emit_stmt(&pipeline.body, Env::new(&sizes, &stencils))?;
        self.w.line("return 0;");
        self.w.dedent();
        self.w.line("}");
        Ok(())
    }

    /// Driver source, the kernel generator, and the lowered regions in order.
    pub fn finish(self) -> (String, G, Vec<RegionRecord>) {
        (self.w.into_string(), self.generator, self.regions)
    }

    fn lower_region(&mut self, target: &str, body: &Stmt, env: Env<'_>) -> Result<(), HlsError> {
        tracing::debug!(region = target, "compute closure for hardware region");
        let config = self.config;
        let mut args = Closure::capture(body).arguments(env.stencils, &config.naming, target)?;
        annotate_sizes(&mut args, env.sizes);

        // Uniqueness is decided on the printed identifier.
        let kernel = self
            .names
            .unique(&print_name(&format!("{}_{}", config.kernel_prefix, target)));
        self.generator.emit_kernel(body, &kernel, &args)?;

        let call_args = args
            .iter()
            .map(|a| print_name(&a.name))
            .collect::<Vec<_>>()
            .join(", ");
        self.w.line(format!("{}({});", kernel, call_args));
        self.regions.push(RegionRecord {
            target: target.to_string(),
            kernel,
            args,
        });
        Ok(())
    }

    fn stream_subimage(&mut self, args: &[Expr]) -> Result<(), HlsError> {
        if !(6..=12).contains(&args.len()) {
            return Err(HlsError::structural(
                STREAM_SUBIMAGE,
                format!("expected 6 to 12 arguments, found {}", args.len()),
            ));
        }
        let dir = Direction::of(args)?;
        let line = format!("{}({});", dir.runtime_call(), print_args(&args[1..])?);
        self.w.line(line);
        Ok(())
    }

    fn buffer_to_stencil(&mut self, args: &[Expr]) -> Result<(), HlsError> {
        if args.len() != 2 {
            return Err(HlsError::structural(
                BUFFER_TO_STENCIL,
                format!("expected 2 arguments, found {}", args.len()),
            ));
        }
        let line = format!("{}({});", BUFFER_TO_STENCIL, print_args(args)?);
        self.w.line(line);
        Ok(())
    }
}

impl<G: KernelGenerator> StmtEmitter for Testbench<'_, G> {
    fn writer(&mut self) -> &mut CWriter {
        &mut self.w
    }

    fn naming(&self) -> &NamingConventions {
        &self.config.naming
    }

    fn stream_depth(&self) -> usize {
        self.config.stream_depth
    }

    fn emit_producer_consumer(
        &mut self,
        name: &str,
        is_producer: bool,
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        match self.config.naming.region_target(name) {
            Some(target) if is_producer => self.lower_region(target, body, env),
            _ => cprint::walk_producer_consumer(self, name, is_producer, body, env),
        }
    }

    fn emit_allocate(
        &mut self,
        name: &str,
        ty: Type,
        extents: &[Expr],
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        let sizes = env.sizes.record_allocation(name, extents);
        cprint::walk_allocate(self, name, ty, extents, body, env.with_sizes(&sizes))
    }

    fn emit_let_stmt(
        &mut self,
        name: &str,
        value: &Expr,
        body: &Stmt,
        env: Env<'_>,
    ) -> Result<(), HlsError> {
        if let Some((BUFFER_INIT, args)) = value.as_call() {
            let memory = args.first();
            let shape = args.get(BUFFER_INIT_SHAPE_ARG).and_then(Expr::as_call);
            if let (Some(Expr::Variable { name: memory, .. }), Some((MAKE_STRUCT, shape))) =
                (memory, shape)
            {
                let buffer = self.config.naming.buffer_of(memory);
                let sizes = env.sizes.record_shape_construction(buffer, shape)?;
                return cprint::walk_let_stmt(self, name, value, body, env.with_sizes(&sizes));
            }
        }
        cprint::walk_let_stmt(self, name, value, body, env)
    }

    fn emit_evaluate(&mut self, value: &Expr, env: Env<'_>) -> Result<(), HlsError> {
        match value.as_call() {
            Some((STREAM_SUBIMAGE, args)) => self.stream_subimage(args),
            Some((BUFFER_TO_STENCIL, args)) => self.buffer_to_stencil(args),
            _ => cprint::walk_evaluate(self, value, env),
        }
    }

    /// A drain is emitted after the statement that follows it. Only one
    /// pair is looked at; a drain directly followed by another drain has
    /// no single correct order and is rejected.
    fn emit_block(&mut self, first: &Stmt, rest: &Stmt, env: Env<'_>) -> Result<(), HlsError> {
        if !is_drain(first)? {
            return cprint::walk_block(self, first, rest, env);
        }
        if is_drain(rest.leading())? {
            return Err(HlsError::Unsupported {
                construct: STREAM_SUBIMAGE.to_string(),
                message: "a stream drain directly followed by another drain cannot be reordered"
                    .into(),
            });
        }
        self.emit_stmt(rest, env)?;
        self.emit_stmt(first, env)
    }
}

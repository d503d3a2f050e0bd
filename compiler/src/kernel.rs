// kernel.rs — Kernel definitions for hardware regions
//
// `KernelGenerator` is the seam between region lowering and a target's kernel
// syntax: region lowering hands over the region body, a unique identifier, and
// the closure arguments, and the generator appends one kernel definition to
// its own output. `HlsKernelGenerator` is the reference implementation,
// producing an HLS C++ header of prototypes and a source file of definitions.
//
// Preconditions: arguments come from `Closure::arguments` (streams carry a
//                stencil type).
// Postconditions: one prototype and one definition per `emit_kernel` call,
//                 in call order.
// Failure modes: errors from printing the body propagate unchanged; the
//                generator's output is then incomplete and must be discarded.
// Side effects: emits a `tracing` debug event per kernel.

use std::collections::HashSet;

use crate::closure::{ArgKind, ClosureArg};
use crate::config::HlsConfig;
use crate::cprint::{print_name, print_type, CWriter, Env, StmtEmitter};
use crate::diag::HlsError;
use crate::ir::Stmt;
use crate::naming::NamingConventions;
use crate::scope::Scope;
use crate::size_tracker::SizeTracker;
use crate::stencil::StencilType;

pub trait KernelGenerator {
    fn emit_kernel(&mut self, body: &Stmt, name: &str, args: &[ClosureArg]) -> Result<(), HlsError>;
}

// ── Unique identifiers ──────────────────────────────────────────────────────

/// Hands out identifiers that are unique within one generation run.
#[derive(Debug, Default)]
pub struct NameGenerator {
    issued: HashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base` itself the first time, then `base_1`, `base_2`, ...
    pub fn unique(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 0usize;
        while self.issued.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        self.issued.insert(candidate.clone());
        candidate
    }
}

// ── Reference HLS generator ─────────────────────────────────────────────────

/// Statement printer for kernel bodies: the shared defaults, nothing more.
struct KernelBody<'g> {
    w: &'g mut CWriter,
    naming: &'g NamingConventions,
    stream_depth: usize,
}

impl StmtEmitter for KernelBody<'_> {
    fn writer(&mut self) -> &mut CWriter {
        self.w
    }

    fn naming(&self) -> &NamingConventions {
        self.naming
    }

    fn stream_depth(&self) -> usize {
        self.stream_depth
    }
}

#[derive(Debug)]
pub struct HlsKernelGenerator {
    header: CWriter,
    source: CWriter,
    guard: String,
    naming: NamingConventions,
    stream_depth: usize,
    interface_pragmas: bool,
}

impl HlsKernelGenerator {
    pub fn new(config: &HlsConfig) -> Self {
        let guard = format!("{}_H", print_name(&config.kernel_prefix).to_uppercase());
        let mut header = CWriter::new();
        header.line(format!("#ifndef {}", guard));
        header.line(format!("#define {}", guard));
        header.line("");
        for h in &config.kernel_headers {
            header.line(format!("#include {}", h));
        }
        header.line("");

        let mut source = CWriter::new();
        source.line(format!("#include \"{}\"", config.kernel_header_name()));
        source.line("");

        HlsKernelGenerator {
            header,
            source,
            guard,
            naming: config.naming.clone(),
            stream_depth: config.stream_depth,
            interface_pragmas: config.interface_pragmas,
        }
    }

    /// Close the header and return `(header, source)`.
    pub fn finish(mut self) -> (String, String) {
        self.header.line("");
        self.header.line(format!("#endif  // {}", self.guard));
        (self.header.into_string(), self.source.into_string())
    }

    fn interface_pragma(arg: &ClosureArg) -> String {
        let port = print_name(&arg.name);
        match arg.kind {
            ArgKind::Stream => format!("#pragma HLS INTERFACE axis register port={}", port),
            ArgKind::MemoryBuffer => match arg.size.as_ref().and_then(|s| s.as_int()) {
                Some(n) => format!("#pragma HLS INTERFACE m_axi port={} depth={}", port, n),
                None => format!("#pragma HLS INTERFACE m_axi port={}", port),
            },
            ArgKind::Scalar => {
                format!("#pragma HLS INTERFACE s_axilite port={} bundle=config", port)
            }
        }
    }
}

/// One kernel parameter declaration.
pub fn print_param(arg: &ClosureArg) -> String {
    let name = print_name(&arg.name);
    match (arg.kind, &arg.stencil) {
        (ArgKind::Stream, Some(st)) => format!("{} &{}", st.cpp_type(), name),
        (ArgKind::MemoryBuffer, _) => match arg.size.as_ref().and_then(|s| s.as_int()) {
            Some(n) => format!("{} {}[{}]", print_type(arg.ty), name, n),
            None => format!("{} *{}", print_type(arg.ty), name),
        },
        (ArgKind::Stream, None) | (ArgKind::Scalar, _) => {
            format!("{} {}", print_type(arg.ty), name)
        }
    }
}

/// Run `f` with every stream argument's type bound in a child scope.
fn with_arg_scope<R>(
    stencils: &Scope<'_, StencilType>,
    args: &[ClosureArg],
    f: impl FnOnce(&Scope<'_, StencilType>) -> R,
) -> R {
    match args.split_first() {
        Some((arg, rest)) => match (&arg.kind, &arg.stencil) {
            (ArgKind::Stream, Some(st)) => {
                let child = stencils.push(arg.name.as_str(), st.clone());
                with_arg_scope(&child, rest, f)
            }
            _ => with_arg_scope(stencils, rest, f),
        },
        None => f(stencils),
    }
}

impl KernelGenerator for HlsKernelGenerator {
    fn emit_kernel(&mut self, body: &Stmt, name: &str, args: &[ClosureArg]) -> Result<(), HlsError> {
        tracing::debug!(kernel = name, args = args.len(), "emit kernel");
        let params = args.iter().map(print_param).collect::<Vec<_>>().join(", ");
        let signature = format!("void {}({})", print_name(name), params);
        self.header.line(format!("{};", signature));

        self.source.line(format!("{} {{", signature));
        self.source.indent();
        self.source.line("#pragma HLS DATAFLOW");
        if self.interface_pragmas {
            for arg in args {
                self.source.line(Self::interface_pragma(arg));
            }
            self.source
                .line("#pragma HLS INTERFACE s_axilite port=return bundle=config");
        }

        let mut em = KernelBody {
            w: &mut self.source,
            naming: &self.naming,
            stream_depth: self.stream_depth,
        };
        let sizes = SizeTracker::new();
        let root = Scope::root();
        with_arg_scope(&root, args, |stencils| {
            em.emit_stmt(body, Env::new(&sizes, stencils))
        })?;

        self.source.dedent();
        self.source.line("}");
        self.source.line("");
        Ok(())
    }
}

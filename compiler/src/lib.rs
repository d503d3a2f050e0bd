// hlsc — HLS lowering backend
//
// Library root. Reads a lowered imaging pipeline (textual IR), lowers every
// hardware region into an accelerator kernel, and prints the host driver that
// feeds those kernels through streams.

pub mod closure;
pub mod config;
pub mod cprint;
pub mod diag;
pub mod ir;
pub mod kernel;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod pipeline;
pub mod scope;
pub mod simplify;
pub mod size_tracker;
pub mod stencil;
pub mod stencil_value;
pub mod streams;
pub mod testbench;

// pipeline.rs — Phase orchestration, reports and provenance
//
// Runs the two phases of a generation run (parse the textual IR, generate
// driver and kernel sources) and packages the result together with a JSON
// closure report and build provenance.
//
// Preconditions: `config` has passed `HlsConfig::validate`.
// Postconditions: on success every output text is complete; on failure no
//                 output is returned.
// Failure modes: parse errors (all reported), or the first generation error.
// Side effects: with `verbose`, prints per-phase timing to stderr.

use std::time::Instant;

use serde::Serialize;

use crate::closure::ArgKind;
use crate::config::HlsConfig;
use crate::diag::{codes, DiagLevel, Diagnostic, HlsError};
use crate::ir::Pipeline;
use crate::kernel::HlsKernelGenerator;
use crate::testbench::{RegionRecord, Testbench};

// ── Generated output ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub driver_source: String,
    pub kernel_header: String,
    pub kernel_source: String,
    pub regions: Vec<RegionRecord>,
}

/// Lower one pipeline with the reference HLS kernel generator.
pub fn generate(pipeline: &Pipeline, config: &HlsConfig) -> Result<GeneratedCode, HlsError> {
    tracing::debug!(pipeline = %pipeline.name, "generate");
    let mut tb = Testbench::new(config, HlsKernelGenerator::new(config));
    tb.emit_pipeline(pipeline)?;
    let (driver_source, kernels, regions) = tb.finish();
    let (kernel_header, kernel_source) = kernels.finish();
    Ok(GeneratedCode {
        driver_source,
        kernel_header,
        kernel_source,
        regions,
    })
}

// ── Closure report ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ArgReport<'a> {
    name: &'a str,
    kind: ArgKind,
    ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpp_type: Option<String>,
    read: bool,
    write: bool,
}

#[derive(Serialize)]
struct KernelReport<'a> {
    target: &'a str,
    kernel: &'a str,
    args: Vec<ArgReport<'a>>,
}

/// Pretty JSON listing every kernel and its arguments, in emission order.
pub fn closure_report(regions: &[RegionRecord]) -> String {
    let kernels: Vec<KernelReport<'_>> = regions
        .iter()
        .map(|r| KernelReport {
            target: &r.target,
            kernel: &r.kernel,
            args: r
                .args
                .iter()
                .map(|a| ArgReport {
                    name: &a.name,
                    kind: a.kind,
                    ty: a.ty.to_string(),
                    size: a.size.as_ref().map(|s| s.to_string()),
                    cpp_type: a.stencil.as_ref().map(|s| s.cpp_type()),
                    read: a.read,
                    write: a.write,
                })
                .collect(),
        })
        .collect();
    let mut out = serde_json::to_string_pretty(&serde_json::json!({ "kernels": kernels }))
        .unwrap_or_default();
    out.push('\n');
    out
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds.
///
/// `source_hash`: SHA-256 of the raw IR text.
/// `config_fingerprint`: SHA-256 of `HlsConfig::canonical_json()`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub config_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    pub fn config_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.config_fingerprint)
    }

    /// JSON record for `--emit build-info`.
    pub fn to_json(&self) -> String {
        let value = serde_json::json!({
            "source_hash": self.source_hash_hex(),
            "config_fingerprint": self.config_fingerprint_hex(),
            "compiler_version": self.compiler_version,
        });
        let mut out = serde_json::to_string_pretty(&value).unwrap_or_default();
        out.push('\n');
        out
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn compute_provenance(source: &str, config: &HlsConfig) -> Provenance {
    Provenance {
        source_hash: sha256(source.as_bytes()),
        config_fingerprint: sha256(config.canonical_json().as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Phase runner ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Generate,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Parse => "parse",
            Phase::Generate => "generate",
        }
    }
}

/// A failed run: the phase that failed and everything it reported.
#[derive(Debug)]
pub struct PipelineError {
    pub failing_phase: Phase,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct Compilation {
    pub pipeline: Pipeline,
    pub generated: GeneratedCode,
    pub provenance: Provenance,
}

fn finish_phase(phase: Phase, started: Instant, verbose: bool) {
    if verbose {
        eprintln!(
            "hlsc: {} complete, {:.1}ms",
            phase.name(),
            started.elapsed().as_secs_f64() * 1000.0
        );
    }
}

/// Parse `source` and generate all outputs.
pub fn compile(source: &str, config: &HlsConfig, verbose: bool) -> Result<Compilation, PipelineError> {
    let t = Instant::now();
    let parsed = crate::parser::parse(source);
    finish_phase(Phase::Parse, t, verbose);
    let pipeline = match parsed.pipeline {
        Some(p) if parsed.errors.is_empty() => p,
        _ => {
            let mut diagnostics: Vec<Diagnostic> = parsed
                .errors
                .iter()
                .map(|e| {
                    Diagnostic::new(DiagLevel::Error, Some(*e.span()), e.to_string())
                        .with_code(codes::E0001)
                })
                .collect();
            if diagnostics.is_empty() {
                diagnostics.push(
                    Diagnostic::new(DiagLevel::Error, None, "parse failed with no output")
                        .with_code(codes::E0001),
                );
            }
            return Err(PipelineError {
                failing_phase: Phase::Parse,
                diagnostics,
            });
        }
    };

    let t = Instant::now();
    let generated = generate(&pipeline, config).map_err(|e| PipelineError {
        failing_phase: Phase::Generate,
        diagnostics: vec![e.to_diagnostic()],
    })?;
    finish_phase(Phase::Generate, t, verbose);

    Ok(Compilation {
        pipeline,
        generated,
        provenance: compute_provenance(source, config),
    })
}

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hlsc::config::HlsConfig;
use hlsc::stencil_value::{pack, unpack, Extents, Stencil};
use hlsc::*;

// KPI-aligned benchmark scenarios.
// Every scenario lowers cleanly with the default configuration.

const SINGLE_REGION: &str = r#"
func gain(buffer input: uint8, buffer output: uint8, scalar gain: int32) {
  realize input.stream<uint8>([0, 1], [0, 1]) {
    realize output.stream<uint8>([0, 1], [0, 1]) {
      stream_subimage("buffer_to_stream", input, input.stream:handle, 0, 1, 64);
      stream_subimage("stream_to_buffer", output, output.stream:handle, 0, 1, 64);
      produce _hls_target.output {
        for (output.s0.x, 0, 64) {
          write_stream(output.stream:handle, cast<uint8>(read_stream(input.stream:handle) * gain));
        }
      }
    }
  }
}
"#;

const MEMORY_REGION: &str = r#"
func lut(buffer input: uint8, buffer output: uint8, scalar offset: int32) {
  allocate lut<uint8>[256] {
    for (lut.s0.i, 0, 256) {
      lut[lut.s0.i] = cast<uint8>(lut.s0.i + offset);
    }
    realize input.stream<uint8>([0, 1], [0, 1]) {
      realize output.stream<uint8>([0, 1], [0, 1]) {
        stream_subimage("buffer_to_stream", input, input.stream:handle, 0, 1, 64);
        stream_subimage("stream_to_buffer", output, output.stream:handle, 0, 1, 64);
        produce _hls_target.output {
          for (output.s0.x, 0, 64) {
            write_stream(output.stream:handle, load<uint8>(lut, cast<int32>(read_stream(input.stream:handle):uint8)));
          }
        }
      }
    }
    free lut;
  }
}
"#;

fn scenarios() -> [(&'static str, &'static str); 2] {
    [("single_region", SINGLE_REGION), ("memory_region", MEMORY_REGION)]
}

/// A chain of `n` stages, each lowered as its own hardware region and
/// connected to the next through a stream.
fn generate_chain_pipeline(n_stages: usize) -> String {
    let mut ir = String::from("func chain(buffer input: uint8, buffer output: uint8) {\n");
    for s in 0..=n_stages {
        ir.push_str(&format!(
            "realize s{}.stream<uint8>([0, 1], [0, 1]) {{\n",
            s
        ));
    }
    ir.push_str("stream_subimage(\"buffer_to_stream\", input, s0.stream:handle, 0, 1, 64);\n");
    ir.push_str(&format!(
        "stream_subimage(\"stream_to_buffer\", output, s{}.stream:handle, 0, 1, 64);\n",
        n_stages
    ));
    for s in 0..n_stages {
        ir.push_str(&format!(
            "produce _hls_target.stage{s} {{\n\
             for (stage{s}.x, 0, 64) {{\n\
             write_stream(s{next}.stream:handle, read_stream(s{s}.stream:handle) + 1);\n\
             }}\n\
             }}\n",
            s = s,
            next = s + 1
        ));
    }
    for _ in 0..=n_stages {
        ir.push_str("}\n");
    }
    ir.push_str("}\n");
    ir
}

// KPI: parse latency per scenario.
fn bench_kpi_parse_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/parse_latency");

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let r = parser::parse(black_box(source));
                black_box(&r.pipeline);
            });
        });
    }

    group.finish();
}

// KPI: end-to-end generation latency (parse + driver + kernels).
fn bench_kpi_full_compile_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/full_compile_latency");
    let config = HlsConfig::default();

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let out = pipeline::compile(black_box(source), &config, false);
                black_box(out.is_ok());
            });
        });
    }

    group.finish();
}

// KPI: generation scaling vs number of hardware regions.
fn bench_kpi_region_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/region_scaling");
    let config = HlsConfig::default();

    for n_stages in [1_usize, 4, 16, 32] {
        let source = generate_chain_pipeline(n_stages);
        let parsed = parser::parse(&source)
            .pipeline
            .expect("chain pipeline parses");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}regions", n_stages)),
            &parsed,
            |b, parsed| {
                b.iter(|| {
                    let g = pipeline::generate(black_box(parsed), &config).unwrap();
                    black_box(g.regions.len());
                });
            },
        );
    }

    group.finish();
}

// KPI: stencil pack/unpack throughput.
fn bench_kpi_stencil_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/stencil_packing");

    for dims in [[4_usize, 4], [8, 8]] {
        let extents = Extents::new(&dims).unwrap();
        let values: Vec<u16> = (0..extents.count() as u16).collect();
        let stencil = Stencil::from_vec(extents, values).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", dims[0], dims[1])),
            &stencil,
            |b, stencil| {
                b.iter(|| black_box(unpack(&pack(black_box(stencil)))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kpi_parse_latency,
    bench_kpi_full_compile_latency,
    bench_kpi_region_scaling,
    bench_kpi_stencil_packing,
);
criterion_main!(benches);

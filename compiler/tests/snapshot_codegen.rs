// Snapshot tests: lock generated driver and kernel C++ to detect unintended
// output changes.
//
// Uses the library API (parse → generate) on the IR fixtures under
// `compiler/tests/fixtures/`. Kernel text is held as `insta` inline snapshots;
// run `cargo insta review` after intentional output changes.

use std::path::{Path, PathBuf};

use hlsc::config::HlsConfig;
use hlsc::pipeline::{compile, GeneratedCode};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn generate_fixture(name: &str, config: &HlsConfig) -> GeneratedCode {
    let source = std::fs::read_to_string(fixture(name))
        .unwrap_or_else(|e| panic!("failed to read {}: {}", name, e));
    match compile(&source, config, false) {
        Ok(c) => c.generated,
        Err(e) => panic!("{} failed in {:?}: {:#?}", name, e.failing_phase, e.diagnostics),
    }
}

const DRIVER_PRELUDE: &str = "\
#include <assert.h>
#include <stdint.h>
#include <algorithm>
#include <hls_stream.h>
#include \"Stencil.h\"
#include \"hls_target.h\"

";

const STREAM_DECLS: &str = concat!(
    "  hls::stream<AxiPackedStencil<uint8_t, 1, 1> > input_stream;\n",
    "  #pragma HLS STREAM variable=input_stream depth=1\n",
    "  #pragma HLS RESOURCE variable=input_stream core=FIFO_SRL\n",
    "  hls::stream<AxiPackedStencil<uint8_t, 1, 1> > output_stream;\n",
    "  #pragma HLS STREAM variable=output_stream depth=1\n",
    "  #pragma HLS RESOURCE variable=output_stream core=FIFO_SRL\n",
);

#[test]
fn gain_driver() {
    let g = generate_fixture("gain.hir", &HlsConfig::default());
    let expected = format!(
        "{}int gain(uint8_t *input, uint8_t *output, int32_t gain) {{\n{}{}",
        DRIVER_PRELUDE,
        STREAM_DECLS,
        "  subimage_to_stream(input, input_stream, 0, 1, 64);
  hls_target_output(output_stream, input_stream, gain);
  stream_to_subimage(output, output_stream, 0, 1, 64);
  return 0;
}
"
    );
    assert_eq!(g.driver_source, expected);
}

#[test]
fn gain_kernel_header() {
    let g = generate_fixture("gain.hir", &HlsConfig::default());
    insta::assert_snapshot!(g.kernel_header, @r#"
#ifndef HLS_TARGET_H
#define HLS_TARGET_H

#include <stdint.h>
#include <algorithm>
#include <hls_stream.h>
#include "Stencil.h"

void hls_target_output(hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &output_stream, hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &input_stream, int32_t gain);

#endif  // HLS_TARGET_H
"#);
}

#[test]
fn gain_kernel_source() {
    let g = generate_fixture("gain.hir", &HlsConfig::default());
    insta::assert_snapshot!(g.kernel_source, @r#"
#include "hls_target.h"

void hls_target_output(hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &output_stream, hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &input_stream, int32_t gain) {
  #pragma HLS DATAFLOW
  #pragma HLS INTERFACE axis register port=output_stream
  #pragma HLS INTERFACE axis register port=input_stream
  #pragma HLS INTERFACE s_axilite port=gain bundle=config
  #pragma HLS INTERFACE s_axilite port=return bundle=config
  for (int output_s0_x = 0; output_s0_x < 0 + 64; output_s0_x++) {
    write_stream(output_stream, ((uint8_t)((read_stream(input_stream) * gain))));
  }
}
"#);
}

#[test]
fn lut_driver_fills_table_before_region() {
    let g = generate_fixture("lut.hir", &HlsConfig::default());
    let body = g
        .driver_source
        .strip_prefix(DRIVER_PRELUDE)
        .expect("driver prelude");
    let expected_head = "\
int lut(uint8_t *input, uint8_t *output, int32_t offset) {
  uint8_t lut[256];
  for (int lut_s0_i = 0; lut_s0_i < 0 + 256; lut_s0_i++) {
    lut[lut_s0_i] = ((uint8_t)((lut_s0_i + offset)));
  }
";
    assert!(body.starts_with(expected_head), "driver:\n{}", body);
    assert!(body.ends_with(&format!(
        "{}  subimage_to_stream(input, input_stream, 0, 1, 64);
  hls_target_output(lut, output_stream, input_stream);
  stream_to_subimage(output, output_stream, 0, 1, 64);
  return 0;
}}
",
        STREAM_DECLS
    )));
    assert!(!body.contains("delete[]"));
}

#[test]
fn lut_kernel_takes_table_as_memory_buffer() {
    let g = generate_fixture("lut.hir", &HlsConfig::default());
    insta::assert_snapshot!(g.kernel_source, @r#"
#include "hls_target.h"

void hls_target_output(uint8_t lut[256], hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &output_stream, hls::stream<AxiPackedStencil<uint8_t, 1, 1> > &input_stream) {
  #pragma HLS DATAFLOW
  #pragma HLS INTERFACE m_axi port=lut depth=256
  #pragma HLS INTERFACE axis register port=output_stream
  #pragma HLS INTERFACE axis register port=input_stream
  #pragma HLS INTERFACE s_axilite port=return bundle=config
  for (int output_s0_x = 0; output_s0_x < 0 + 64; output_s0_x++) {
    write_stream(output_stream, lut[((int32_t)(read_stream(input_stream)))]);
  }
}
"#);
}

#[test]
fn config_changes_prefix_depth_and_pragmas() {
    let config = HlsConfig {
        kernel_prefix: "accel".into(),
        stream_depth: 4,
        interface_pragmas: false,
        ..HlsConfig::default()
    };
    let g = generate_fixture("gain.hir", &config);
    assert!(g.driver_source.contains("#include \"accel.h\"\n"));
    assert!(g
        .driver_source
        .contains("  #pragma HLS STREAM variable=input_stream depth=4\n"));
    assert!(g.driver_source.contains("  accel_output(output_stream, input_stream, gain);\n"));
    assert!(g.kernel_header.starts_with("#ifndef ACCEL_H\n#define ACCEL_H\n"));
    assert!(g.kernel_source.starts_with("#include \"accel.h\"\n"));
    assert!(!g.kernel_source.contains("INTERFACE"));
    assert!(g.kernel_source.contains("#pragma HLS DATAFLOW"));
}

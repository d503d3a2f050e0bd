// stencil.rs — Stencil types as seen by the code generators
//
// A `StencilType` names the representation of a realized stencil or stream,
// its element type, and its constant extents. It decides the C++ spelling of
// declarations and the storage pragmas a streaming buffer needs.
//
// Preconditions: realization bounds fold to positive integer constants.
// Postconditions: 1..=4 extents, each >= 1.
// Failure modes: symbolic or non-positive extents are structural errors.
// Side effects: none.

use crate::diag::HlsError;
use crate::ir::{Range, Type};
use crate::simplify;
use crate::stencil_value::MAX_DIMS;

/// Physical representation of a stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Element-indexed array (`Stencil<T, ...>`).
    Unpacked,
    /// One bit-packed word (`PackedStencil<T, ...>`).
    Packed,
    /// Packed word plus `last` flag on a FIFO (`hls::stream<AxiPackedStencil<T, ...> >`).
    StreamingPacked,
    /// Plain host memory passed by pointer.
    MemoryBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StencilType {
    pub repr: Representation,
    pub elem: Type,
    pub extents: Vec<usize>,
    /// FIFO depth; meaningful for streams only.
    pub depth: usize,
}

impl StencilType {
    /// Build from realization bounds; every extent must fold to a constant.
    pub fn from_bounds(
        repr: Representation,
        elem: Type,
        bounds: &[Range],
        depth: usize,
    ) -> Result<Self, HlsError> {
        if bounds.is_empty() || bounds.len() > MAX_DIMS {
            return Err(HlsError::InvalidExtents {
                extents: Vec::new(),
                message: format!(
                    "stencils have 1 to {} dimensions, found {}",
                    MAX_DIMS,
                    bounds.len()
                ),
            });
        }
        let mut extents = Vec::with_capacity(bounds.len());
        for (dim, r) in bounds.iter().enumerate() {
            let extent = simplify::const_int(&r.extent).ok_or_else(|| {
                HlsError::structural(
                    "realize",
                    format!("extent of dimension {} is not constant: {}", dim, r.extent),
                )
            })?;
            if extent < 1 {
                return Err(HlsError::InvalidExtents {
                    extents: extents.clone(),
                    message: format!("dimension {} has extent {}", dim, extent),
                });
            }
            extents.push(extent as usize);
        }
        Ok(StencilType {
            repr,
            elem,
            extents,
            depth,
        })
    }

    pub fn memory_buffer(elem: Type) -> Self {
        StencilType {
            repr: Representation::MemoryBuffer,
            elem,
            extents: Vec::new(),
            depth: 0,
        }
    }

    pub fn is_stream(&self) -> bool {
        self.repr == Representation::StreamingPacked
    }

    /// C++ type spelling of a value of this stencil type.
    pub fn cpp_type(&self) -> String {
        let elem = crate::cprint::print_type(self.elem);
        let dims = self
            .extents
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.repr {
            Representation::Unpacked => format!("Stencil<{}, {}>", elem, dims),
            Representation::Packed => format!("PackedStencil<{}, {}>", elem, dims),
            Representation::StreamingPacked => {
                format!("hls::stream<AxiPackedStencil<{}, {}> >", elem, dims)
            }
            Representation::MemoryBuffer => format!("{} *", elem),
        }
    }

    /// Storage pragmas for a declared variable of this type.
    pub fn pragmas(&self, var: &str) -> Vec<String> {
        match self.repr {
            Representation::StreamingPacked => vec![
                format!("#pragma HLS STREAM variable={} depth={}", var, self.depth),
                format!("#pragma HLS RESOURCE variable={} core=FIFO_SRL", var),
            ],
            Representation::Unpacked => {
                vec![format!(
                    "#pragma HLS ARRAY_PARTITION variable={}.value complete dim=0",
                    var
                )]
            }
            Representation::Packed | Representation::MemoryBuffer => Vec::new(),
        }
    }
}

// naming.rs — Name-suffix conventions of the lowered IR
//
// The front end encodes what a name denotes in its suffix: `.stream` and
// `.stencil` for stencil values, `.stencil_update` for update accumulators,
// `.min.N` / `.extent.N` / `.stride.N` / `.elem_size` for buffer metadata
// scalars, `.buffer` for buffer descriptors. Classification of free
// variables in a hardware region is driven entirely by these conventions.

use serde::{Deserialize, Serialize};

use crate::diag::HlsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConventions {
    /// Producer names starting with this mark a hardware region.
    pub region_prefix: String,
    /// Realizations with this suffix are streaming buffers.
    pub stream_suffix: String,
    /// Names denoting a stencil value (stream or stencil).
    pub stencil_suffixes: Vec<String>,
    /// Names denoting a stencil update accumulator.
    pub update_suffixes: Vec<String>,
    /// Metadata fields that make a name a scalar; may be followed by `.N`.
    pub scalar_suffixes: Vec<String>,
    /// Suffix of buffer-descriptor variables.
    pub buffer_suffix: String,
}

impl Default for NamingConventions {
    fn default() -> Self {
        NamingConventions {
            region_prefix: "_hls_target.".into(),
            stream_suffix: ".stream".into(),
            stencil_suffixes: vec![".stream".into(), ".stencil".into()],
            update_suffixes: vec![".stencil_update".into()],
            scalar_suffixes: vec![
                ".min".into(),
                ".extent".into(),
                ".stride".into(),
                ".elem_size".into(),
            ],
            buffer_suffix: ".buffer".into(),
        }
    }
}

/// What a free variable name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameClass {
    Stencil,
    Scalar,
}

impl NamingConventions {
    /// Target name of a hardware region, if `producer` starts one.
    pub fn region_target<'n>(&self, producer: &'n str) -> Option<&'n str> {
        producer.strip_prefix(self.region_prefix.as_str())
    }

    pub fn is_stream_buffer(&self, name: &str) -> bool {
        name.ends_with(self.stream_suffix.as_str())
    }

    pub fn is_stencil(&self, name: &str) -> bool {
        self.stencil_suffixes
            .iter()
            .any(|s| name.ends_with(s.as_str()))
    }

    pub fn is_update(&self, name: &str) -> bool {
        self.update_suffixes
            .iter()
            .any(|s| name.ends_with(s.as_str()))
    }

    /// If `name` is a metadata scalar, the name of the object it describes.
    fn scalar_subject<'n>(&self, name: &'n str) -> Option<&'n str> {
        let without_dim = match name.rsplit_once('.') {
            Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
                head
            }
            _ => name,
        };
        self.scalar_suffixes
            .iter()
            .find_map(|s| without_dim.strip_suffix(s.as_str()))
    }

    /// Buffer name described by a `.buffer` descriptor variable.
    pub fn buffer_of<'n>(&self, descriptor: &'n str) -> &'n str {
        match descriptor.find(self.buffer_suffix.as_str()) {
            Some(pos) => &descriptor[..pos],
            None => descriptor,
        }
    }

    /// Classify a free variable found in hardware region `region`.
    ///
    /// Update accumulators never cross a region boundary, and a name that is
    /// both a stencil and a metadata scalar of a stencil cannot be passed as
    /// either; both are front-end contract violations.
    pub fn classify(&self, name: &str, region: &str) -> Result<NameClass, HlsError> {
        if self.is_update(name) {
            return Err(HlsError::UpdateInClosure {
                name: name.to_string(),
                region: region.to_string(),
            });
        }
        let scalar_of_stencil = self
            .scalar_subject(name)
            .is_some_and(|subject| self.is_stencil(subject));
        if scalar_of_stencil {
            return Err(HlsError::AmbiguousName {
                name: name.to_string(),
                region: region.to_string(),
            });
        }
        if self.is_stencil(name) {
            Ok(NameClass::Stencil)
        } else {
            Ok(NameClass::Scalar)
        }
    }
}

// stencil_value.rs — Bit-exact stencil values and representation conversions
//
// Host-side model of the three stencil representations the generated code
// moves between:
//   - `Stencil<T>`          unpacked, one element per slot
//   - `PackedStencil<T>`    all elements concatenated into one bit vector
//   - `AxiPackedStencil<T>` packed value plus a `last` side-band bit
//
// Element `(i0, i1, i2, i3)` of a packed stencil occupies the `W` bits starting
// at `i0*W + i1*E0*W + i2*E0*E1*W + i3*E0*E1*E2*W`, i.e. dimension 0 varies
// fastest and the packed little-endian bytes equal the unpacked memory layout.
//
// Preconditions: extents are 1..=4 dimensions, each >= 1.
// Postconditions: pack/unpack round-trip exactly; only `last` is lossy.
// Failure modes: out-of-range indices, width mismatches, and extent
//                mismatches return `HlsError`.
// Side effects: none.

use std::fmt;
use std::marker::PhantomData;

use crate::diag::HlsError;

pub const MAX_DIMS: usize = 4;

// ── Extents ──

/// Per-dimension extents, unused trailing dimensions set to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extents([usize; MAX_DIMS]);

impl Extents {
    pub fn new(dims: &[usize]) -> Result<Self, HlsError> {
        if dims.is_empty() || dims.len() > MAX_DIMS {
            return Err(HlsError::InvalidExtents {
                extents: dims.to_vec(),
                message: format!("expected 1 to {} dimensions", MAX_DIMS),
            });
        }
        if dims.contains(&0) {
            return Err(HlsError::InvalidExtents {
                extents: dims.to_vec(),
                message: "every extent must be at least 1".into(),
            });
        }
        let mut e = [1; MAX_DIMS];
        e[..dims.len()].copy_from_slice(dims);
        Ok(Extents(e))
    }

    pub fn dims(&self) -> [usize; MAX_DIMS] {
        self.0
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.0.iter().product()
    }

    /// Linear element index of `index` (dimension 0 fastest), bounds-checked.
    pub fn linear(&self, index: [usize; MAX_DIMS]) -> Result<usize, HlsError> {
        if index.iter().zip(self.0.iter()).any(|(i, e)| i >= e) {
            return Err(HlsError::IndexOutOfBounds {
                index,
                extents: self.0,
            });
        }
        let [e0, e1, e2, _] = self.0;
        Ok(index[0] + index[1] * e0 + index[2] * e0 * e1 + index[3] * e0 * e1 * e2)
    }

    /// Every index in storage order.
    pub fn indices(&self) -> impl Iterator<Item = [usize; MAX_DIMS]> {
        let [e0, e1, e2, e3] = self.0;
        (0..e3).flat_map(move |i3| {
            (0..e2).flat_map(move |i2| {
                (0..e1).flat_map(move |i1| (0..e0).map(move |i0| [i0, i1, i2, i3]))
            })
        })
    }
}

// ── Element bit patterns ──

/// A scalar that can live in a stencil: reinterpreted, never converted, to
/// and from an unsigned bit pattern of exactly `BITS` bits.
pub trait Element: Copy + PartialEq + fmt::Debug {
    const BITS: u32;

    fn to_bits(self) -> u64;

    fn from_bits(bits: u64) -> Self;
}

macro_rules! unsigned_element {
    ($($t:ty),*) => {$(
        impl Element for $t {
            const BITS: u32 = <$t>::BITS;

            fn to_bits(self) -> u64 {
                self as u64
            }

            fn from_bits(bits: u64) -> Self {
                bits as $t
            }
        }

        const _: () = assert!(<$t as Element>::BITS as usize == std::mem::size_of::<$t>() * 8);
    )*};
}

macro_rules! signed_element {
    ($($t:ty => $u:ty),*) => {$(
        impl Element for $t {
            const BITS: u32 = <$t>::BITS;

            fn to_bits(self) -> u64 {
                self as $u as u64
            }

            fn from_bits(bits: u64) -> Self {
                bits as $u as $t
            }
        }

        const _: () = assert!(<$t as Element>::BITS as usize == std::mem::size_of::<$t>() * 8);
    )*};
}

unsigned_element!(u8, u16, u32, u64);
signed_element!(i8 => u8, i16 => u16, i32 => u32, i64 => u64);

impl Element for f32 {
    const BITS: u32 = 32;

    fn to_bits(self) -> u64 {
        f32::to_bits(self) as u64
    }

    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl Element for f64 {
    const BITS: u32 = 64;

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

const _: () = assert!(<f32 as Element>::BITS as usize == std::mem::size_of::<f32>() * 8);
const _: () = assert!(<f64 as Element>::BITS as usize == std::mem::size_of::<f64>() * 8);

// ── Bit vector ──

/// Fixed-length little-endian bit vector (bit 0 is the LSB of word 0).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl BitVec {
    pub fn zeros(len: usize) -> Self {
        BitVec {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read `width <= 64` bits starting at bit `lo`.
    pub fn get_range(&self, lo: usize, width: usize) -> u64 {
        debug_assert!(width <= 64 && lo + width <= self.len);
        let word = lo / 64;
        let off = lo % 64;
        let mut v = self.words[word] >> off;
        if off + width > 64 {
            v |= self.words[word + 1] << (64 - off);
        }
        v & mask(width)
    }

    /// Overwrite `width <= 64` bits starting at bit `lo`.
    pub fn set_range(&mut self, lo: usize, width: usize, value: u64) {
        debug_assert!(width <= 64 && lo + width <= self.len);
        let value = value & mask(width);
        let word = lo / 64;
        let off = lo % 64;
        self.words[word] = (self.words[word] & !(mask(width) << off)) | (value << off);
        if off + width > 64 {
            let spill = off + width - 64;
            let hi = value >> (64 - off);
            self.words[word + 1] = (self.words[word + 1] & !mask(spill)) | hi;
        }
    }

    /// Little-endian bytes; the final byte is zero-padded.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let n = self.len.div_ceil(8);
        self.words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take(n)
            .collect()
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec[{}]0x", self.len)?;
        for w in self.words.iter().rev() {
            write!(f, "{w:016x}")?;
        }
        Ok(())
    }
}

// ── Representations ──

/// Unpacked stencil: one element per slot, dimension 0 fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil<T: Element> {
    extents: Extents,
    values: Vec<T>,
}

impl<T: Element> Stencil<T> {
    pub fn filled(extents: Extents, value: T) -> Self {
        Stencil {
            extents,
            values: vec![value; extents.count()],
        }
    }

    /// Build from values in storage order.
    pub fn from_vec(extents: Extents, values: Vec<T>) -> Result<Self, HlsError> {
        if values.len() != extents.count() {
            return Err(HlsError::InvalidExtents {
                extents: extents.dims().to_vec(),
                message: format!(
                    "{} values supplied for {} elements",
                    values.len(),
                    extents.count()
                ),
            });
        }
        Ok(Stencil { extents, values })
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn get(&self, index: [usize; MAX_DIMS]) -> Result<T, HlsError> {
        Ok(self.values[self.extents.linear(index)?])
    }

    pub fn set(&mut self, index: [usize; MAX_DIMS], value: T) -> Result<(), HlsError> {
        let i = self.extents.linear(index)?;
        self.values[i] = value;
        Ok(())
    }
}

/// Packed stencil: a single `T::BITS * count` bit word.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedStencil<T: Element> {
    extents: Extents,
    bits: BitVec,
    _elem: PhantomData<T>,
}

impl<T: Element> PackedStencil<T> {
    pub fn zeroed(extents: Extents) -> Self {
        PackedStencil {
            extents,
            bits: BitVec::zeros(T::BITS as usize * extents.count()),
            _elem: PhantomData,
        }
    }

    /// Adopt an existing bit word declared as holding `word_bits`-wide elements.
    pub fn from_raw(extents: Extents, word_bits: u32, bits: BitVec) -> Result<Self, HlsError> {
        if word_bits != T::BITS {
            return Err(HlsError::BitWidthMismatch {
                expected: T::BITS,
                found: word_bits,
            });
        }
        let expected = T::BITS as usize * extents.count();
        if bits.len() != expected {
            return Err(HlsError::BitWidthMismatch {
                expected: expected as u32,
                found: bits.len() as u32,
            });
        }
        Ok(PackedStencil {
            extents,
            bits,
            _elem: PhantomData,
        })
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    pub fn total_bits(&self) -> usize {
        self.bits.len()
    }

    /// Bit offset of the element at `index`.
    pub fn bit_offset(&self, index: [usize; MAX_DIMS]) -> Result<usize, HlsError> {
        Ok(self.extents.linear(index)? * T::BITS as usize)
    }

    pub fn get(&self, index: [usize; MAX_DIMS]) -> Result<T, HlsError> {
        let lo = self.bit_offset(index)?;
        Ok(T::from_bits(self.bits.get_range(lo, T::BITS as usize)))
    }

    pub fn set(&mut self, index: [usize; MAX_DIMS], value: T) -> Result<(), HlsError> {
        let lo = self.bit_offset(index)?;
        self.bits.set_range(lo, T::BITS as usize, value.to_bits());
        Ok(())
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.bits.to_le_bytes()
    }
}

/// Packed stencil travelling on a stream, with its end-of-transfer flag.
#[derive(Debug, Clone, PartialEq)]
pub struct AxiPackedStencil<T: Element> {
    pub value: PackedStencil<T>,
    pub last: bool,
}

// ── Conversions ──

pub fn pack<T: Element>(s: &Stencil<T>) -> PackedStencil<T> {
    let mut p = PackedStencil::zeroed(s.extents);
    let w = T::BITS as usize;
    for (i, v) in s.values.iter().enumerate() {
        p.bits.set_range(i * w, w, v.to_bits());
    }
    p
}

pub fn unpack<T: Element>(p: &PackedStencil<T>) -> Stencil<T> {
    let w = T::BITS as usize;
    let values = (0..p.extents.count())
        .map(|i| T::from_bits(p.bits.get_range(i * w, w)))
        .collect();
    Stencil {
        extents: p.extents,
        values,
    }
}

pub fn to_streaming<T: Element>(p: PackedStencil<T>) -> AxiPackedStencil<T> {
    AxiPackedStencil {
        value: p,
        last: false,
    }
}

pub fn from_streaming<T: Element>(a: AxiPackedStencil<T>) -> PackedStencil<T> {
    a.value
}

// ── Host buffers ──

/// A strided view of host memory, shaped like the runtime's `buffer_t`.
///
/// Strides and extents are in elements. Unused dimensions may report an
/// extent of 0.
#[derive(Debug, Clone, Copy)]
pub struct HostBuffer<'a, T> {
    pub data: &'a [T],
    pub extent: [i64; MAX_DIMS],
    pub stride: [i64; MAX_DIMS],
}

/// Copy a host buffer into an unpacked stencil of the given extents.
pub fn buffer_to_stencil<T: Element>(
    buffer: &HostBuffer<'_, T>,
    extents: Extents,
) -> Result<Stencil<T>, HlsError> {
    let dims = extents.dims();
    for (dim, (&want, &have)) in dims.iter().zip(buffer.extent.iter()).enumerate() {
        let unused_dim = dim > 0 && want == 1 && have == 0;
        if want as i64 != have && !unused_dim {
            return Err(HlsError::ExtentMismatch {
                dim,
                stencil: want,
                buffer: have,
            });
        }
    }

    let mut values = Vec::with_capacity(extents.count());
    for idx in extents.indices() {
        let offset: i64 = idx
            .iter()
            .zip(buffer.stride.iter())
            .map(|(&i, &s)| i as i64 * s)
            .sum();
        let value = usize::try_from(offset)
            .ok()
            .and_then(|o| buffer.data.get(o))
            .copied()
            .ok_or_else(|| {
                HlsError::structural(
                    "buffer_to_stencil",
                    format!("element {idx:?} at offset {offset} lies outside the host buffer"),
                )
            })?;
        values.push(value);
    }
    Stencil::from_vec(extents, values)
}

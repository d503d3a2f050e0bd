// size_tracker.rs — Symbolic element counts for buffers in scope
//
// Observes allocations and buffer-descriptor construction during the driver
// traversal and remembers, per buffer name, the total number of elements as a
// symbolic expression. Entries live exactly as long as the construct that
// defined them: recording returns a child tracker for the nested body.
//
// Preconditions: extents and shape components are well-typed integer exprs.
// Postconditions: `lookup` returns the innermost visible size or `None`.
// Failure modes: a shape descriptor whose length is not a multiple of the
//                per-dimension field count is a structural error.
// Side effects: emits `tracing` debug events.

use crate::diag::HlsError;
use crate::ir::Expr;
use crate::scope::Scope;
use crate::simplify;

/// Fields per dimension in a `make_struct` shape: (min, extent, stride, flags).
pub const SHAPE_FIELDS_PER_DIM: usize = 4;

/// Index of the extent component inside one shape group.
const SHAPE_EXTENT_FIELD: usize = 1;

#[derive(Debug, Default)]
pub struct SizeTracker<'p> {
    scope: Scope<'p, Expr>,
}

impl<'p> SizeTracker<'p> {
    pub fn new() -> Self {
        SizeTracker {
            scope: Scope::root(),
        }
    }

    /// Size of an allocation: the product of its extents.
    pub fn record_allocation<'c>(&'c self, name: &str, extents: &[Expr]) -> SizeTracker<'c> {
        let size = simplify::product(extents);
        tracing::debug!(buffer = name, size = %size, "allocation size");
        SizeTracker {
            scope: self.scope.push(name, size),
        }
    }

    /// Size of a buffer built from a flattened shape descriptor.
    pub fn record_shape_construction<'c>(
        &'c self,
        name: &str,
        shape: &[Expr],
    ) -> Result<SizeTracker<'c>, HlsError> {
        if shape.len() % SHAPE_FIELDS_PER_DIM != 0 {
            return Err(HlsError::structural(
                "make_struct",
                format!(
                    "shape of `{}` has {} fields, expected a multiple of {}",
                    name,
                    shape.len(),
                    SHAPE_FIELDS_PER_DIM
                ),
            ));
        }
        let size = simplify::product(
            shape
                .chunks(SHAPE_FIELDS_PER_DIM)
                .map(|dim| &dim[SHAPE_EXTENT_FIELD]),
        );
        tracing::debug!(buffer = name, size = %size, "buffer init size");
        Ok(SizeTracker {
            scope: self.scope.push(name, size),
        })
    }

    /// Innermost size for `name`. `None` means "fall back to declared extents".
    pub fn lookup(&self, name: &str) -> Option<Expr> {
        self.scope.get(name).cloned()
    }
}

//! Flat-index resolution over variable-length sub-collections.
//!
//! Draggable vertices are exposed to renderers as one flattened list that
//! concatenates every editable shape's vertex list (and, within a polygon,
//! every ring). This module maps a single flat index back to the owning
//! sub-collection and the position inside it.

use crate::error::EditError;

/// A flat index resolved into its owning sub-collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatIndex {
    /// Index of the sub-collection that owns the element.
    pub outer: usize,
    /// Position of the element inside that sub-collection.
    pub inner: usize,
}

/// Resolve `flat` against a sequence of sub-collections described by
/// `length_of`.
///
/// `length_of(i)` returns the length of sub-collection `i`, or `None` once
/// `i` is past the last sub-collection. Empty sub-collections are skipped:
/// they are never matched and never cause a failure.
///
/// Returns [`EditError::FlatIndexOutOfRange`] when the accumulated lengths
/// run out before covering `flat`.
pub fn resolve_flat_index(
    flat: usize,
    length_of: impl Fn(usize) -> Option<usize>,
) -> Result<FlatIndex, EditError> {
    let mut cumulative = 0;
    let mut outer = 0;
    while let Some(len) = length_of(outer) {
        if cumulative + len > flat {
            return Ok(FlatIndex {
                outer,
                inner: flat - cumulative,
            });
        }
        cumulative += len;
        outer += 1;
    }
    Err(EditError::FlatIndexOutOfRange {
        index: flat,
        total: cumulative,
    })
}

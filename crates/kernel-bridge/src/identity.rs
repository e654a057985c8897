//! Re-association of kernel responses with the sketch entries they came from.
//!
//! Kernel 2D calls return bare geometry: a solve is aligned
//! position-by-position with the request, a trim describes the one element
//! it touched. These helpers are the only place either shape is
//! interpreted. Ids and construction flags are carried over from the
//! request entries, so selection state and constraints that refer to entry
//! ids stay valid.

use anvil_types::{ElementId, SketchElement, SketchEntry};

use crate::types::{KernelError, TrimResult};

/// Zip a response that must be exactly as long as the request.
pub fn rezip_exact(
    entries: &[SketchEntry],
    response: Vec<SketchElement>,
) -> Result<Vec<SketchEntry>, KernelError> {
    if response.len() != entries.len() {
        return Err(KernelError::MisalignedResponse {
            expected: entries.len(),
            got: response.len(),
        });
    }
    Ok(entries
        .iter()
        .zip(response)
        .map(|(entry, element)| SketchEntry {
            id: entry.id,
            element,
            construction: entry.construction,
        })
        .collect())
}

/// Apply a trim of `entries[index]`.
///
/// Replacement pieces are inserted at `index`. The first piece keeps the
/// trimmed entry's id, the rest get fresh ids from `next_id`; all of them
/// keep its construction flag. Entries before and after `index` keep their
/// ids and their order. Removal, or a replacement with no pieces, drops the
/// entry.
pub fn rezip_trim(
    entries: &[SketchEntry],
    index: usize,
    result: TrimResult,
    next_id: &mut ElementId,
) -> Result<Vec<SketchEntry>, KernelError> {
    let Some(target) = entries.get(index) else {
        return Err(KernelError::MisalignedResponse {
            expected: index + 1,
            got: entries.len(),
        });
    };
    let pieces = match result {
        TrimResult::NoChange => return Ok(entries.to_vec()),
        TrimResult::Removed => Vec::new(),
        TrimResult::Replaced(pieces) => pieces,
    };

    let mut zipped = Vec::with_capacity(entries.len() + pieces.len());
    zipped.extend_from_slice(&entries[..index]);
    for (i, element) in pieces.into_iter().enumerate() {
        let id = if i == 0 {
            target.id
        } else {
            let id = *next_id;
            *next_id += 1;
            id
        };
        zipped.push(SketchEntry {
            id,
            element,
            construction: target.construction,
        });
    }
    zipped.extend_from_slice(&entries[index + 1..]);
    Ok(zipped)
}

//! Finding the instructions that load a given constant, typically a resource id.

use crate::config::LiteralOccurrence;
use crate::error::PatchError;
use crate::types::SmaliMethod;
use log::debug;
use std::ops::Range;

/// Every index in `scope` (the whole method when `None`) whose instruction loads `literal`.
pub fn literal_indices(method: &SmaliMethod, scope: Option<Range<usize>>, literal: i64) -> Vec<usize> {
    let len = method.len();
    let scope = scope.unwrap_or(0..len);
    let end = scope.end.min(len);
    let scope = scope.start.min(end)..end;
    method.instructions()[scope.clone()]
        .iter()
        .enumerate()
        .filter(|(_, i)| i.loads_literal(literal))
        .map(|(i, _)| scope.start + i)
        .collect()
}

/// First load of `literal` anywhere in the method.
pub fn wide_literal_index(method: &SmaliMethod, literal: i64) -> Option<usize> {
    method.instructions().iter().position(|i| i.loads_literal(literal))
}

pub fn has_wide_literal(method: &SmaliMethod, literal: i64) -> bool {
    wide_literal_index(method, literal).is_some()
}

/// Index of the instruction loading `literal`, honouring `occurrence` when there are several.
pub fn locate_literal(
    method: &SmaliMethod,
    scope: Option<Range<usize>>,
    literal: i64,
    occurrence: LiteralOccurrence,
) -> Result<usize, PatchError> {
    let indices = literal_indices(method, scope, literal);
    let index = match (indices.first().copied(), occurrence) {
        (None, _) => {
            return Err(PatchError::LiteralNotFound { literal, method: method.id() });
        }
        (Some(_), LiteralOccurrence::Unique) if indices.len() > 1 => {
            return Err(PatchError::DuplicateLiteral { literal, method: method.id(), indices });
        }
        (Some(first), _) => first,
    };
    debug!("[literal] 0x{:x} at {} in {}", literal, index, method.id());
    Ok(index)
}

/// Locates each literal of `targets` independently and pairs its index with the value.
///
/// The result keeps the order of `targets`; indices are not sorted.
pub fn locate_literals<T: Clone>(
    method: &SmaliMethod,
    scope: Option<Range<usize>>,
    targets: &[(i64, T)],
    occurrence: LiteralOccurrence,
) -> Result<Vec<(usize, T)>, PatchError> {
    targets
        .iter()
        .map(|(literal, value)| {
            let index = locate_literal(method, scope.clone(), *literal, occurrence)?;
            Ok((index, value.clone()))
        })
        .collect()
}

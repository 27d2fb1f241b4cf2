//! Order-preserving list merge.
//!
//! Merges a new ordering into an existing one. Items already present keep
//! their current positions; each missing item is placed next to its nearest
//! neighbor (from the new ordering) that is already placed.

/// Merge `to_merge` into `target`, returning the combined list.
///
/// For every item of `to_merge` that `target` lacks, in `to_merge` order:
/// - after the closest preceding item (in `to_merge`) already in the result,
/// - otherwise before the closest following item already in the result,
/// - otherwise at the end.
pub fn smart_merge<T>(target: &[T], to_merge: &[T]) -> Vec<T>
where
    T: PartialEq + Clone,
{
    let mut result = target.to_vec();

    for (idx, item) in to_merge.iter().enumerate() {
        if target.contains(item) {
            continue;
        }
        let at = insertion_index(to_merge, idx, &result);
        result.insert(at, item.clone());
    }

    result
}

/// Where the item at `ordering[idx]` belongs in `placed`.
fn insertion_index<T: PartialEq>(ordering: &[T], idx: usize, placed: &[T]) -> usize {
    let position = |needle: &T| placed.iter().position(|p| p == needle);

    if let Some(after) = ordering[..idx].iter().rev().find_map(position) {
        return after + 1;
    }
    if let Some(before) = ordering[idx + 1..].iter().find_map(position) {
        return before;
    }
    placed.len()
}

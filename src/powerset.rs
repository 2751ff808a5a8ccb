//! Subset generation.

/// Produce every subset of `items`.
///
/// For `N` distinct items this returns exactly `2^N` subsets, including the empty subset and the
/// full input.  Each subset preserves the relative order of `items`.  The ordering of the subsets
/// themselves is deterministic but not otherwise meaningful: the subsets of the tail come first,
/// followed by the same subsets with the head prepended.
///
/// If `items` contains duplicates, the result will contain subsets that are equal as sets;
/// callers that need set semantics must pass distinct items.
pub fn powerset<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let Some((pivot, rest)) = items.split_first() else {
        return vec![Vec::new()];
    };

    let without_pivot = powerset(rest);
    let with_pivot = without_pivot
        .iter()
        .map(|subset| {
            let mut with = Vec::with_capacity(subset.len() + 1);
            with.push(pivot.clone());
            with.extend(subset.iter().cloned());
            with
        })
        .collect::<Vec<_>>();

    let mut subsets = without_pivot;
    subsets.extend(with_pivot);
    subsets
}

//! Small ownership-friendly list helpers shared by the reducer.

/// Split off the first `n` elements. Returns `(taken, rest)`; takes the
/// whole list when it is shorter than `n`.
pub fn take_first_n<T>(mut items: Vec<T>, n: usize) -> (Vec<T>, Vec<T>) {
    let n = n.min(items.len());
    let rest = items.split_off(n);
    (items, rest)
}

/// Partition by a predicate that also sees each element's original index.
/// Returns `(matching, rest)` with relative order preserved.
pub fn partition_indexed<T, F>(items: Vec<T>, mut pred: F) -> (Vec<T>, Vec<T>)
where
    F: FnMut(&T, usize) -> bool,
{
    let mut matching = Vec::new();
    let mut rest = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if pred(&item, index) {
            matching.push(item);
        } else {
            rest.push(item);
        }
    }
    (matching, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn take_first_n_splits() {
        let (taken, rest) = take_first_n(vec![1, 2, 3, 4], 2);
        assert_eq!(taken, vec![1, 2]);
        assert_eq!(rest, vec![3, 4]);
    }

    #[test]
    fn take_first_n_clamps_to_len() {
        let (taken, rest) = take_first_n(vec![1, 2], 5);
        assert_eq!(taken, vec![1, 2]);
        assert!(rest.is_empty());
    }

    #[test]
    fn partition_indexed_keeps_order() {
        let (evens, odds) = partition_indexed(vec!['a', 'b', 'c', 'd'], |_, i| i % 2 == 0);
        assert_eq!(evens, vec!['a', 'c']);
        assert_eq!(odds, vec!['b', 'd']);
    }
}

//! Longest increasing subsequence, used by the keyed diff to find the
//! children that can stay where they are.

/// Indices of a longest strictly increasing subsequence of `seq`.
///
/// Zero entries mean "no mapping" and are skipped. The returned indices are
/// ascending. Runs in O(n log n).
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut predecessor: Vec<Option<usize>> = vec![None; seq.len()];
    // tails[k] is the index of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();

    for (i, &value) in seq.iter().enumerate() {
        if value == 0 {
            continue;
        }

        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            predecessor[i] = Some(tails[pos - 1]);
        }

        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = predecessor[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(seq: &[usize]) -> Vec<usize> {
        longest_increasing_subsequence(seq)
            .into_iter()
            .map(|i| seq[i])
            .collect()
    }

    #[test]
    fn empty_and_zeros() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[0, 0, 0]).is_empty());
    }

    #[test]
    fn already_sorted() {
        assert_eq!(longest_increasing_subsequence(&[1, 2, 3, 4]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn middle_moved() {
        // E moved before C and D: [E, C, D] maps to old positions [5, 3, 4].
        assert_eq!(longest_increasing_subsequence(&[5, 3, 4]), vec![1, 2]);
    }

    #[test]
    fn skips_unmapped_entries() {
        assert_eq!(values(&[3, 0, 1, 2, 0, 5]), vec![1, 2, 5]);
    }

    #[test]
    fn strictly_increasing() {
        assert_eq!(values(&[2, 2, 2]).len(), 1);
    }

    #[test]
    fn classic_sequence() {
        let seq = [10, 9, 2, 5, 3, 7, 101, 18];
        let lis = values(&seq);
        assert_eq!(lis.len(), 4);
        assert!(lis.windows(2).all(|w| w[0] < w[1]));
    }
}

//! Multi-way branch encoding choice and key ordering.
//!
//! A switch over `nlabels` keys spanning `[lo, hi]` is emitted either as a
//! dense `tableswitch` indexed by `key - lo` or as a sparse `lookupswitch`
//! of sorted `(key, offset)` pairs, whichever is cheaper under a cost model
//! that weighs execution time three times as heavily as table size.

use log::trace;

use super::opcodes::{LOOKUPSWITCH, TABLESWITCH};

/// Weight of time cost relative to space cost.
pub const TIME_WEIGHT: i64 = 3;

/// Fixed words of a `tableswitch` (default, low, high) plus the opcode word.
const TABLE_SPACE_BASE: i64 = 4;
const TABLE_TIME: i64 = 3;
/// Fixed words of a `lookupswitch` (default, pair count) plus the opcode word.
const LOOKUP_SPACE_BASE: i64 = 3;

/// Placeholder stored in every table slot until a target is known.
pub const UNFILLED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// `tableswitch`
    Dense,
    /// `lookupswitch`
    Sparse,
}

impl SwitchKind {
    pub fn opcode(self) -> u8 {
        match self {
            SwitchKind::Dense => TABLESWITCH,
            SwitchKind::Sparse => LOOKUPSWITCH,
        }
    }
}

/// Chooses the encoding for `nlabels` keys in `[lo, hi]`.
pub fn choose(nlabels: usize, lo: i32, hi: i32) -> SwitchKind {
    if nlabels == 0 {
        return SwitchKind::Sparse;
    }
    let table_space = TABLE_SPACE_BASE + (hi as i64 - lo as i64 + 1);
    let lookup_space = LOOKUP_SPACE_BASE + 2 * nlabels as i64;
    let lookup_time = nlabels as i64;
    let dense = table_space + TIME_WEIGHT * TABLE_TIME <= lookup_space + TIME_WEIGHT * lookup_time;
    trace!(
        "switch with {} labels in [{}, {}]: table cost {}, lookup cost {}",
        nlabels,
        lo,
        hi,
        table_space + TIME_WEIGHT * TABLE_TIME,
        lookup_space + TIME_WEIGHT * lookup_time
    );
    if dense {
        SwitchKind::Dense
    } else {
        SwitchKind::Sparse
    }
}

/// Sorts `keys` ascending, applying the same permutation to `targets`.
pub fn sort_pairs(keys: &mut [i32], targets: &mut [i32]) {
    debug_assert_eq!(keys.len(), targets.len());
    if keys.len() > 1 {
        qsort2(keys, targets, 0, keys.len() as isize - 1);
    }
}

fn median_of_three(keys: &[i32], lo: usize, hi: usize) -> i32 {
    let (a, b, c) = (keys[lo], keys[lo + (hi - lo) / 2], keys[hi]);
    if (a <= b) == (b <= c) {
        b
    } else if (b <= a) == (a <= c) {
        a
    } else {
        c
    }
}

fn qsort2(keys: &mut [i32], targets: &mut [i32], lo: isize, hi: isize) {
    let pivot = median_of_three(keys, lo as usize, hi as usize);
    let mut i = lo;
    let mut j = hi;
    loop {
        while keys[i as usize] < pivot {
            i += 1;
        }
        while pivot < keys[j as usize] {
            j -= 1;
        }
        if i <= j {
            keys.swap(i as usize, j as usize);
            targets.swap(i as usize, j as usize);
            i += 1;
            j -= 1;
        }
        if i > j {
            break;
        }
    }
    if lo < j {
        qsort2(keys, targets, lo, j);
    }
    if i < hi {
        qsort2(keys, targets, i, hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_keys_are_dense() {
        assert_eq!(choose(5, 1, 5), SwitchKind::Dense);
        // 4 + 3 + 9 = 16 against 3 + 6 + 9 = 18
        assert_eq!(choose(3, 0, 2), SwitchKind::Dense);
    }

    #[test]
    fn one_or_two_contiguous_keys_are_sparse() {
        // 4 + 1 + 9 = 14 against 3 + 2 + 3 = 8
        assert_eq!(choose(1, 7, 7), SwitchKind::Sparse);
        // 4 + 2 + 9 = 15 against 3 + 4 + 6 = 13
        assert_eq!(choose(2, 0, 1), SwitchKind::Sparse);
    }

    #[test]
    fn scattered_keys_are_sparse() {
        assert_eq!(choose(4, 0, 100), SwitchKind::Sparse);
        assert_eq!(choose(3, 0, 2_000_000), SwitchKind::Sparse);
        assert_eq!(choose(2, i32::MIN, i32::MAX), SwitchKind::Sparse);
    }

    #[test]
    fn no_labels_is_sparse() {
        assert_eq!(choose(0, i32::MAX, i32::MIN), SwitchKind::Sparse);
    }

    #[test]
    fn break_even_point_favors_the_table() {
        // 4 labels: lookup costs 3 + 8 + 12 = 23, table costs 4 + range + 9
        assert_eq!(choose(4, 0, 9), SwitchKind::Dense);
        assert_eq!(choose(4, 0, 10), SwitchKind::Sparse);
    }

    #[test]
    fn sorting_moves_targets_with_keys() {
        let mut keys = vec![100, -3, 42, 0, 7, 7, -50];
        let mut targets = vec![1, 2, 3, 4, 5, 6, 7];
        sort_pairs(&mut keys, &mut targets);
        assert_eq!(keys, vec![-50, -3, 0, 7, 7, 42, 100]);
        assert_eq!(targets[0], 7);
        assert_eq!(targets[1], 2);
        assert_eq!(targets[2], 4);
        assert_eq!(targets[5], 3);
        assert_eq!(targets[6], 1);
        let mut sevens = vec![targets[3], targets[4]];
        sevens.sort();
        assert_eq!(sevens, vec![5, 6]);
    }

    #[test]
    fn sorting_handles_presorted_and_reversed_input() {
        let mut keys: Vec<i32> = (0..50).rev().collect();
        let mut targets: Vec<i32> = (0..50).collect();
        sort_pairs(&mut keys, &mut targets);
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
        assert_eq!(targets, (0..50).rev().collect::<Vec<_>>());
        sort_pairs(&mut keys, &mut targets);
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
    }
}

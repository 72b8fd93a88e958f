// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for list patches.

use proptest::prelude::*;
use understory_tree_sync::patch::{PatchStep, apply, diff_by, diff_unique};

/// Longest common subsequence length, by the textbook table.
fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let mut table = vec![vec![0_usize; b.len() + 1]; a.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            table[i + 1][j + 1] = if a[i] == b[j] {
                table[i][j] + 1
            } else {
                table[i][j + 1].max(table[i + 1][j])
            };
        }
    }
    table[a.len()][b.len()]
}

/// A list of distinct values drawn from a small alphabet.
fn unique_list() -> impl Strategy<Value = Vec<u8>> {
    prop::sample::subsequence((0..24_u8).collect::<Vec<_>>(), 0..16).prop_shuffle()
}

fn removes_precede_adds_per_gap(steps: &[PatchStep]) -> bool {
    // Within a run of steps at the same working index, no remove follows an add.
    steps.windows(2).all(|w| match (w[0], w[1]) {
        (PatchStep::Add { index: a, .. }, PatchStep::Remove { index: r }) => r != a + 1,
        _ => true,
    })
}

proptest! {
    #[test]
    fn unique_patches_are_minimal_and_exact(current in unique_list(), goal in unique_list()) {
        let steps = diff_unique(&current, &goal, |&c| c, |&g| g);
        let expected = current.len() + goal.len() - 2 * lcs_len(&current, &goal);
        prop_assert_eq!(steps.len(), expected);
        prop_assert!(removes_precede_adds_per_gap(&steps), "{:?}", steps);

        let mut list = current.clone();
        apply(&steps, &mut list, &goal);
        prop_assert_eq!(list, goal);
    }
}

proptest! {
    #[test]
    fn general_patches_are_minimal_and_exact(
        current in prop::collection::vec(0..4_u8, 0..12),
        goal in prop::collection::vec(0..4_u8, 0..12),
    ) {
        let steps = diff_by(&current, &goal, |a, b| a == b);
        let expected = current.len() + goal.len() - 2 * lcs_len(&current, &goal);
        prop_assert_eq!(steps.len(), expected);

        let mut list = current.clone();
        apply(&steps, &mut list, &goal);
        prop_assert_eq!(list, goal);
    }
}

proptest! {
    #[test]
    fn both_diffs_agree_on_unique_lists(current in unique_list(), goal in unique_list()) {
        let general = diff_by(&current, &goal, |a, b| a == b);
        let unique = diff_unique(&current, &goal, |&c| c, |&g| g);
        prop_assert_eq!(general.len(), unique.len());
    }
}

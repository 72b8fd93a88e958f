// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! List patches: minimal remove/add edit scripts between two sequences.
//!
//! A patch turns `current` into `goal` while keeping a longest common subsequence in place.
//! Steps are applied in order to a working copy of `current`:
//!
//! - [`PatchStep::Remove`] drops the item at `index`.
//! - [`PatchStep::Add`] inserts `goal[goal_index]` at `index`.
//!
//! Within each gap between kept items, removes come before adds. This is the order a tree
//! mirror wants: stale children leave before new ones are placed.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

/// One edit of a list patch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchStep {
    /// Remove the item at `index` of the working list.
    Remove {
        /// Position in the working list.
        index: usize,
    },
    /// Insert `goal[goal_index]` at `index` of the working list.
    Add {
        /// Position in the working list.
        index: usize,
        /// Position of the inserted item in the goal list.
        goal_index: usize,
    },
}

/// Diff two lists that may contain repeated items, matching with `eq`.
///
/// Uses a quadratic longest-common-subsequence table.
pub fn diff_by<A, B>(current: &[A], goal: &[B], eq: impl Fn(&A, &B) -> bool) -> Vec<PatchStep> {
    let (n, m) = (current.len(), goal.len());
    // lcs[i][j]: LCS length of current[i..] and goal[j..], flattened.
    let width = m + 1;
    let mut lcs = alloc::vec![0_u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if eq(&current[i], &goal[j]) {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }
    let mut kept = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if eq(&current[i], &goal[j]) {
            kept.push((i, j));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    steps_from_kept(&kept, n, m)
}

/// Diff two lists in which no key occurs twice.
///
/// Items are matched by key; the kept items are a longest run of matches that is increasing
/// in both lists. Runs in `O((n + m) log n)`. Repeated keys are not detected; with repeats the
/// patch is still valid but may not be minimal.
pub fn diff_unique<A, B, K>(
    current: &[A],
    goal: &[B],
    key_current: impl Fn(&A) -> K,
    key_goal: impl Fn(&B) -> K,
) -> Vec<PatchStep>
where
    K: Eq + Hash,
{
    let positions: HashMap<K, usize> = goal
        .iter()
        .enumerate()
        .map(|(j, g)| (key_goal(g), j))
        .collect();
    let matches: Vec<(usize, usize)> = current
        .iter()
        .enumerate()
        .filter_map(|(i, c)| positions.get(&key_current(c)).map(|&j| (i, j)))
        .collect();
    let kept = longest_increasing(&matches);
    steps_from_kept(&kept, current.len(), goal.len())
}

/// Replay `steps` on `list`, taking added items from `goal`.
///
/// Steps that do not fit the list are skipped.
pub fn apply<T: Clone>(steps: &[PatchStep], list: &mut Vec<T>, goal: &[T]) {
    for step in steps {
        match *step {
            PatchStep::Remove { index } if index < list.len() => {
                list.remove(index);
            }
            PatchStep::Add { index, goal_index } if index <= list.len() => {
                if let Some(item) = goal.get(goal_index) {
                    list.insert(index, item.clone());
                }
            }
            _ => {}
        }
    }
}

/// Longest subsequence of `matches` (already increasing in `.0`) that also increases in `.1`.
fn longest_increasing(matches: &[(usize, usize)]) -> Vec<(usize, usize)> {
    // tails[k]: index into `matches` of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = Vec::with_capacity(matches.len());
    for (idx, &(_, j)) in matches.iter().enumerate() {
        let k = tails.partition_point(|&t| matches[t].1 < j);
        prev.push(k.checked_sub(1).map(|p| tails[p]));
        if k == tails.len() {
            tails.push(idx);
        } else {
            tails[k] = idx;
        }
    }
    let mut kept = Vec::with_capacity(tails.len());
    let mut cur = tails.last().copied();
    while let Some(idx) = cur {
        kept.push(matches[idx]);
        cur = prev[idx];
    }
    kept.reverse();
    kept
}

fn steps_from_kept(kept: &[(usize, usize)], n: usize, m: usize) -> Vec<PatchStep> {
    let mut steps = Vec::with_capacity(n + m - 2 * kept.len());
    let (mut ci, mut gi, mut working) = (0, 0, 0);
    for &(cm, gm) in kept.iter().chain(core::iter::once(&(n, m))) {
        for _ in ci..cm {
            steps.push(PatchStep::Remove { index: working });
        }
        for goal_index in gi..gm {
            steps.push(PatchStep::Add {
                index: working,
                goal_index,
            });
            working += 1;
        }
        // Step over the kept item.
        working += 1;
        ci = cm + 1;
        gi = gm + 1;
    }
    steps
}

//! Slot diff for reactive collections.
//!
//! `compare` turns "contents before" and "contents after" into the batch of
//! added/removed descriptors an [`ObservableArray`](super::ObservableArray)
//! publishes. It computes a longest-common-subsequence edit script over the
//! part of both sequences that differs, then pairs each removed element with
//! an equal added element as a move.

use super::array::{ArrayChange, ChangeStatus};
use crate::value::Value;

/// Edit script turning `previous` into `current`.
///
/// Removed indexes refer to `previous`, added indexes to `current`.
pub(crate) fn compare(previous: &[Value], current: &[Value]) -> Vec<ArrayChange> {
    let prefix = previous
        .iter()
        .zip(current)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = previous[prefix..]
        .iter()
        .rev()
        .zip(current[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old = &previous[prefix..previous.len() - suffix];
    let new = &current[prefix..current.len() - suffix];
    if old.is_empty() && new.is_empty() {
        return Vec::new();
    }

    let mut changes = edit_script(old, new, prefix);
    pair_moves(&mut changes);
    changes
}

fn edit_script(old: &[Value], new: &[Value], offset: usize) -> Vec<ArrayChange> {
    let (n, m) = (old.len(), new.len());
    let width = m + 1;

    // lcs[i * width + j]: length of the longest common subsequence of old[i..] and new[j..]
    let mut lcs = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            i += 1;
            j += 1;
        } else if j == m || (i < n && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            changes.push(slot(ChangeStatus::Removed, &old[i], offset + i));
            i += 1;
        } else {
            changes.push(slot(ChangeStatus::Added, &new[j], offset + j));
            j += 1;
        }
    }
    changes
}

fn slot(status: ChangeStatus, value: &Value, index: usize) -> ArrayChange {
    ArrayChange {
        status,
        value: value.clone(),
        index,
        moved: None,
    }
}

fn pair_moves(changes: &mut [ArrayChange]) {
    for removed in 0..changes.len() {
        if changes[removed].status != ChangeStatus::Removed {
            continue;
        }
        let partner = changes.iter().position(|candidate| {
            candidate.status == ChangeStatus::Added
                && candidate.moved.is_none()
                && candidate.value == changes[removed].value
        });
        if let Some(added) = partner {
            changes[removed].moved = Some(changes[added].index);
            changes[added].moved = Some(changes[removed].index);
        }
    }
}

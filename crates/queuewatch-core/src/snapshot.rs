use std::collections::HashSet;

use crate::ids::ItemId;

/// Immutable set of item ids captured at one poll instant.
///
/// Keeps the order ids were first observed in so that diffs come out in the
/// same order the queue listed them. Membership checks go through the hash set.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.members.contains(id)
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.order.iter()
    }
}

impl FromIterator<ItemId> for Snapshot {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        let mut snap = Snapshot::default();
        for id in iter {
            if snap.members.insert(id.clone()) {
                snap.order.push(id);
            }
        }
        snap
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for Snapshot {}

/// Membership change between two snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<ItemId>,
    pub removed: Vec<ItemId>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// `added = current - previous`, `removed = previous - current`.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> SnapshotDiff {
    let added = current
        .iter()
        .filter(|id| !previous.contains(id))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect();
    SnapshotDiff { added, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ids: &[u64]) -> Snapshot {
        ids.iter().copied().map(ItemId::from).collect()
    }

    #[test]
    fn diff_reports_additions_and_removals_in_fetch_order() {
        let d = diff(&snap(&[1, 2, 3]), &snap(&[9, 3, 4, 1]));
        assert_eq!(d.added, vec![ItemId::from(9), ItemId::from(4)]);
        assert_eq!(d.removed, vec![ItemId::from(2)]);
    }

    #[test]
    fn empty_to_nonempty_is_all_added() {
        let d = diff(&Snapshot::empty(), &snap(&[5]));
        assert_eq!(d.added, vec![ItemId::from(5)]);
        assert!(d.removed.is_empty());
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        assert!(diff(&snap(&[1, 2]), &snap(&[2, 1])).is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let s = snap(&[1, 1, 2]);
        assert_eq!(s.len(), 2);
        assert_eq!(s, snap(&[2, 1]));
    }

    // Every pair of subsets of a five-element universe.
    #[test]
    fn diff_set_laws_hold_for_all_small_sets() {
        let universe: Vec<u64> = (1..=5).collect();
        let subset = |mask: u32| -> Vec<u64> {
            universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, v)| *v)
                .collect()
        };
        for pm in 0..32u32 {
            for cm in 0..32u32 {
                let prev = snap(&subset(pm));
                let cur = snap(&subset(cm));
                let d = diff(&prev, &cur);
                assert!(d.added.iter().all(|id| !prev.contains(id)));
                assert!(d.removed.iter().all(|id| !cur.contains(id)));
                let rebuilt: Snapshot = prev
                    .iter()
                    .chain(d.added.iter())
                    .filter(|id| !d.removed.contains(id))
                    .cloned()
                    .collect();
                assert_eq!(rebuilt, cur);
            }
        }
    }
}

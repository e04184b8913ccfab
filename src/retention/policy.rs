use crate::models::Revision;

/// Chooses which revisions of a release to evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionEvictionPolicy {
    keep: usize,
}

impl RevisionEvictionPolicy {
    /// `keep` is clamped to at least 1 so the newest revision always survives.
    pub fn new(keep: usize) -> Self {
        Self { keep: keep.max(1) }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// Whether a release with `count` revisions needs any eviction at all.
    pub fn exceeds(&self, count: usize) -> bool {
        count > self.keep
    }

    pub fn evict(&self, revisions: Vec<Revision>) -> Vec<Revision> {
        evict(revisions, self.keep)
    }
}

/// Return every revision beyond the `keep` highest versions, newest first.
///
/// The result does not depend on the input order.
pub fn evict(mut revisions: Vec<Revision>, keep: usize) -> Vec<Revision> {
    let keep = keep.max(1);
    if revisions.len() <= keep {
        return Vec::new();
    }
    revisions.sort_by(|a, b| b.version.cmp(&a.version));
    revisions.split_off(keep)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ReleaseStatus;

    fn revision(version: u64) -> Revision {
        Revision {
            name: "web".into(),
            namespace: "default".into(),
            version,
            status: ReleaseStatus::Superseded,
            created_at: Utc::now(),
            manifest: Some(format!("rev {version}")),
            chart: None,
            app_version: None,
            config: None,
        }
    }

    fn versions(revisions: &[Revision]) -> Vec<u64> {
        revisions.iter().map(|r| r.version).collect()
    }

    #[test]
    fn test_evicts_oldest_beyond_keep() {
        let history: Vec<_> = (1..=105).map(revision).collect();
        let evicted = evict(history, 100);
        assert_eq!(versions(&evicted), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_at_or_below_keep_evicts_nothing() {
        assert!(evict((1..=100).map(revision).collect(), 100).is_empty());
        assert!(evict((1..=3).map(revision).collect(), 100).is_empty());
        assert!(evict(Vec::new(), 1).is_empty());
    }

    #[test]
    fn test_input_order_independent() {
        let shuffled: Vec<_> = [7, 2, 9, 1, 5, 3, 8].into_iter().map(revision).collect();
        let evicted = evict(shuffled, 4);
        assert_eq!(versions(&evicted), vec![3, 2, 1]);
    }

    #[test]
    fn test_sparse_versions_keep_highest() {
        let history: Vec<_> = [40, 3, 17, 100].into_iter().map(revision).collect();
        let evicted = evict(history, 2);
        assert_eq!(versions(&evicted), vec![17, 3]);
    }

    #[test]
    fn test_zero_keep_clamped_to_one() {
        let policy = RevisionEvictionPolicy::new(0);
        assert_eq!(policy.keep(), 1);

        let evicted = policy.evict((1..=3).map(revision).collect());
        assert_eq!(versions(&evicted), vec![2, 1]);
    }

    #[test]
    fn test_exceeds() {
        let policy = RevisionEvictionPolicy::new(10);
        assert!(!policy.exceeds(10));
        assert!(policy.exceeds(11));
    }
}

use levelforge_common::{ChangeKind, FsChange};
use std::collections::HashMap;
use std::path::PathBuf;

/// Merge two successive changes to the same path.
pub fn coalesce(earlier: ChangeKind, later: ChangeKind) -> ChangeKind {
    use ChangeKind::*;
    match (earlier, later) {
        (Created, Modified) => Created,
        (_, Removed) => Removed,
        (Removed, Created) => Modified,
        (_, later) => later,
    }
}

/// Collapse a batch to one change per path, in the order paths first appear.
pub fn merge(changes: impl IntoIterator<Item = FsChange>) -> Vec<FsChange> {
    let mut out: Vec<FsChange> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    for change in changes {
        match index.get(&change.path) {
            Some(&i) => {
                let entry = &mut out[i];
                entry.kind = coalesce(entry.kind, change.kind);
                entry.is_dir |= change.is_dir;
            }
            None => {
                index.insert(change.path.clone(), out.len());
                out.push(change);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalescing_rules() {
        use ChangeKind::*;
        assert_eq!(coalesce(Created, Modified), Created);
        assert_eq!(coalesce(Modified, Removed), Removed);
        assert_eq!(coalesce(Created, Removed), Removed);
        assert_eq!(coalesce(Removed, Created), Modified);
        assert_eq!(coalesce(Modified, Modified), Modified);
        assert_eq!(coalesce(Modified, Created), Created);
    }

    #[test]
    fn burst_of_modifications_yields_one_change() {
        let burst = (0..5).map(|_| FsChange::file("a.module.yaml", ChangeKind::Modified));
        assert_eq!(
            merge(burst),
            vec![FsChange::file("a.module.yaml", ChangeKind::Modified)]
        );
    }

    #[test]
    fn delete_then_recreate_is_a_modification() {
        let out = merge([
            FsChange::file("a", ChangeKind::Removed),
            FsChange::file("a", ChangeKind::Created),
        ]);
        assert_eq!(out, vec![FsChange::file("a", ChangeKind::Modified)]);
    }

    #[test]
    fn keeps_first_seen_order() {
        let out = merge([
            FsChange::dir("dir", ChangeKind::Created),
            FsChange::file("dir/b", ChangeKind::Created),
            FsChange::file("dir/a", ChangeKind::Created),
            FsChange::file("dir/b", ChangeKind::Modified),
        ]);
        let paths: Vec<_> = out.iter().map(|c| c.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("dir"), PathBuf::from("dir/b"), PathBuf::from("dir/a")]
        );
        assert_eq!(out[1].kind, ChangeKind::Created);
        assert!(out[0].is_dir);
    }
}

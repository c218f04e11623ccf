use ahash::AHashSet;

/// Set of UMI sequences that already anchor a group. A UMI is added once, the first time it is
/// seen, and is never removed.
#[derive(Debug, Default)]
pub struct AnchorIndex<'a> {
    seen: AHashSet<&'a [u8]>,
}

impl<'a> AnchorIndex<'a> {
    pub fn new() -> AnchorIndex<'a> {
        AnchorIndex { seen: AHashSet::new() }
    }

    pub fn contains(&self, umi: &[u8]) -> bool {
        self.seen.contains(umi)
    }

    /// Returns `true` when `umi` was not yet an anchor. Inserting a known anchor is a no-op.
    pub fn insert(&mut self, umi: &'a [u8]) -> bool {
        self.seen.insert(umi)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// All anchors in ascending byte order (the order of C `strcmp`).
    pub fn sorted_members(&self) -> Vec<&'a [u8]> {
        let mut members: Vec<_> = self.seen.iter().copied().collect();
        members.sort_unstable();
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_once() {
        let mut index = AnchorIndex::new();
        assert!(index.is_empty());
        assert!(index.insert(b"ACGT"));
        assert!(!index.insert(b"ACGT"));
        assert!(index.contains(b"ACGT"));
        assert!(!index.contains(b"acgt"));
        assert!(!index.contains(b"ACG"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn sorted() {
        let mut index = AnchorIndex::new();
        for umi in [&b"TTTT"[..], b"AAAA", b"CCCC", b"AAAA", b"AAAAC", b"aaaa"] {
            index.insert(umi);
        }
        assert_eq!(
            index.sorted_members(),
            vec![&b"AAAA"[..], b"AAAAC", b"CCCC", b"TTTT", b"aaaa"]
        );
    }
}

use std::collections::HashMap;

use super::FrameId;
use crate::file::{FileHandle, PageId};

/// A key identifying a page in the buffer pool
///
/// Keyed by handle identity, not by path; the file layer guarantees one
/// handle per canonical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PageKey {
    file: FileHandle,
    page_no: PageId,
}

/// Maps buffered pages to the frames that hold them
///
/// The only fast path from a page identity to its frame; a given
/// `(file, page_no)` resides in at most one frame at any time.
pub(crate) struct PageTable {
    map: HashMap<PageKey, FrameId>,
}

impl PageTable {
    /// Sized for `pool_size` entries with headroom so the map never resizes
    pub(crate) fn new(pool_size: usize) -> Self {
        Self {
            map: HashMap::with_capacity(pool_size + pool_size.div_ceil(5)),
        }
    }

    pub(crate) fn lookup(&self, file: FileHandle, page_no: PageId) -> Option<FrameId> {
        self.map.get(&PageKey { file, page_no }).copied()
    }

    /// Insert a mapping; the key must not already be present
    pub(crate) fn insert(&mut self, file: FileHandle, page_no: PageId, frame_no: FrameId) {
        let prev = self.map.insert(PageKey { file, page_no }, frame_no);
        debug_assert!(
            prev.is_none(),
            "page {page_no} already buffered in frame {prev:?}"
        );
    }

    pub(crate) fn remove(&mut self, file: FileHandle, page_no: PageId) -> Option<FrameId> {
        self.map.remove(&PageKey { file, page_no })
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PagedFileManager;

    fn open_handle() -> (tempfile::TempDir, FileHandle) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();
        manager.create_file(&path).unwrap();
        let handle = manager.open_file(&path).unwrap();
        (temp_dir, handle)
    }

    #[test]
    fn test_lookup_insert_remove() {
        let (_temp_dir, handle) = open_handle();
        let mut table = PageTable::new(4);

        assert_eq!(table.lookup(handle, 9), None);

        table.insert(handle, 9, 2);
        assert_eq!(table.lookup(handle, 9), Some(2));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(handle, 9), Some(2));
        assert_eq!(table.lookup(handle, 9), None);
        assert_eq!(table.len(), 0);

        // Removing an absent key reports the miss instead of failing
        assert_eq!(table.remove(handle, 9), None);
    }
}

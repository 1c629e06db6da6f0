use super::FrameId;
use crate::file::{FileHandle, PageId};

/// Descriptor for one buffer pool frame
///
/// The descriptor table is index-aligned with the page pool and never
/// reordered; `frame_no` is the shared index.
#[derive(Debug, Clone)]
pub(crate) struct FrameDesc {
    /// The frame's own index in the pool, stable for its lifetime
    pub(crate) frame_no: FrameId,
    /// File occupying this frame, `None` while the frame is empty
    pub(crate) file: Option<FileHandle>,
    /// Page of `file` held here, meaningful only while `valid`
    pub(crate) page_no: PageId,
    /// Outstanding pins; the frame is immovable while nonzero
    pub(crate) pin_cnt: u32,
    /// In-frame copy differs from the on-disk copy
    pub(crate) dirty: bool,
    /// Frame holds a real page
    pub(crate) valid: bool,
    /// Recency hint consumed and cleared by the clock sweep
    pub(crate) refbit: bool,
}

impl FrameDesc {
    pub(crate) fn new(frame_no: FrameId) -> Self {
        Self {
            frame_no,
            file: None,
            page_no: 0,
            pin_cnt: 0,
            dirty: false,
            valid: false,
            refbit: false,
        }
    }

    /// Transition a cleared descriptor into the occupied state, pinned once
    pub(crate) fn set(&mut self, file: FileHandle, page_no: PageId) {
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_cnt = 1;
        self.dirty = false;
        self.valid = true;
        self.refbit = true;
    }

    /// Reset to the unoccupied state
    ///
    /// Nulls the file so a cleared frame can never match a flush target.
    pub(crate) fn clear(&mut self) {
        self.file = None;
        self.page_no = 0;
        self.pin_cnt = 0;
        self.dirty = false;
        self.valid = false;
        self.refbit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_clear() {
        let mut manager = crate::file::PagedFileManager::new();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.db");
        manager.create_file(&path).unwrap();
        let handle = manager.open_file(&path).unwrap();

        let mut desc = FrameDesc::new(3);
        assert!(!desc.valid);
        assert_eq!(desc.frame_no, 3);

        desc.set(handle, 7);
        assert_eq!(desc.file, Some(handle));
        assert_eq!(desc.page_no, 7);
        assert_eq!(desc.pin_cnt, 1);
        assert!(desc.valid);
        assert!(desc.refbit);
        assert!(!desc.dirty);

        desc.clear();
        assert_eq!(desc.file, None);
        assert_eq!(desc.pin_cnt, 0);
        assert!(!desc.valid);
        assert!(!desc.refbit);
        assert!(!desc.dirty);
        // frame_no survives the occupant
        assert_eq!(desc.frame_no, 3);
    }
}

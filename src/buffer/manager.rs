use std::fmt;

use tracing::{trace, warn};

use super::error::{BufferError, BufferResult};
use super::{DEFAULT_POOL_SIZE, FrameId};
use super::frame::FrameDesc;
use super::page_table::PageTable;
use crate::file::{FileHandle, Page, PageId, PagedFileManager};

/// Monotonic counters, observability only
///
/// `accesses` counts sweep activity: it is bumped each time the clock
/// clears a reference bit, not on every page hit.
#[derive(Debug, Default, Clone, Copy)]
pub struct BufStats {
    pub accesses: u64,
    /// Pages read from disk on the miss path
    pub diskreads: u64,
    /// Dirty victims written back during eviction
    pub diskwrites: u64,
}

/// Fixed-size page cache with clock-sweep replacement
///
/// Owns a pool of page frames and mediates every page read, write,
/// allocation and disposal against the file layer so that disk I/O is
/// amortized across accesses. A frame stays immovable while its pin count
/// is nonzero; every successful `read_page`/`alloc_page` hands the caller
/// one pin, released by a matching `unpin_page`.
pub struct BufMgr {
    /// Underlying file manager
    file_manager: PagedFileManager,
    /// Page storage, index-aligned with `descriptors`
    pool: Vec<Page>,
    descriptors: Vec<FrameDesc>,
    page_table: PageTable,
    /// Next candidate frame for the sweep, always in `[0, pool.len())`
    clock_hand: usize,
    stats: BufStats,
}

impl BufMgr {
    /// Create a buffer pool with the default number of frames
    pub fn new(file_manager: PagedFileManager) -> Self {
        Self::with_capacity(file_manager, DEFAULT_POOL_SIZE)
    }

    /// Create a buffer pool with `pool_size` frames
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is zero.
    pub fn with_capacity(file_manager: PagedFileManager, pool_size: usize) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");

        Self {
            file_manager,
            pool: (0..pool_size).map(|_| Page::new(0)).collect(),
            descriptors: (0..pool_size).map(FrameDesc::new).collect(),
            page_table: PageTable::new(pool_size),
            // One step before frame 0, so the first advance lands there
            clock_hand: pool_size - 1,
            stats: BufStats::default(),
        }
    }

    /// Get a reference to the file manager
    pub fn file_manager(&self) -> &PagedFileManager {
        &self.file_manager
    }

    /// Get a mutable reference to the file manager
    pub fn file_manager_mut(&mut self) -> &mut PagedFileManager {
        &mut self.file_manager
    }

    /// Number of frames in the pool
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Number of pages currently held in frames
    pub fn buffered_page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Check if a page currently occupies a frame
    pub fn contains_page(&self, file: FileHandle, page_no: PageId) -> bool {
        self.page_table.lookup(file, page_no).is_some()
    }

    /// Number of frames holding unwritten modifications
    pub fn dirty_page_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.valid && d.dirty).count()
    }

    pub fn stats(&self) -> BufStats {
        self.stats
    }

    /// Fetch a page, pinning its frame
    ///
    /// The returned reference is backed by the frame and stays meaningful
    /// for exactly as long as the caller's pin; every successful call must
    /// be paired with an `unpin_page`.
    pub fn read_page(&mut self, file: FileHandle, page_no: PageId) -> BufferResult<&mut Page> {
        let frame_no = match self.page_table.lookup(file, page_no) {
            Some(frame_no) => {
                let desc = &mut self.descriptors[frame_no];
                desc.refbit = true;
                desc.pin_cnt += 1;
                frame_no
            }
            None => {
                let frame_no = self.alloc_buf()?;
                let page = self.file_manager.read_page(file, page_no)?;
                self.pool[frame_no] = page;
                self.stats.diskreads += 1;
                self.page_table.insert(file, page_no, frame_no);
                self.descriptors[frame_no].set(file, page_no);
                frame_no
            }
        };
        Ok(&mut self.pool[frame_no])
    }

    /// Allocate a fresh page in `file` and pin it in a frame
    ///
    /// The file layer never hands out a live page number twice, so unlike
    /// `read_page` there is no index probe.
    pub fn alloc_page(&mut self, file: FileHandle) -> BufferResult<(PageId, &mut Page)> {
        let page = self.file_manager.allocate_page(file)?;
        let page_no = page.number();

        let frame_no = self.alloc_buf()?;
        self.pool[frame_no] = page;
        self.page_table.insert(file, page_no, frame_no);
        self.descriptors[frame_no].set(file, page_no);

        Ok((page_no, &mut self.pool[frame_no]))
    }

    /// Release one pin, optionally marking the page dirty
    ///
    /// Unpinning a page that is not buffered is a silent no-op. The dirty
    /// bit is sticky: it is set before the pin check and cleared only by
    /// writeback or `clear`.
    pub fn unpin_page(
        &mut self,
        file: FileHandle,
        page_no: PageId,
        dirty: bool,
    ) -> BufferResult<()> {
        let Some(frame_no) = self.page_table.lookup(file, page_no) else {
            return Ok(());
        };

        if dirty {
            self.descriptors[frame_no].dirty = true;
        }
        if self.descriptors[frame_no].pin_cnt == 0 {
            return Err(BufferError::PageNotPinned {
                file: self.file_label(file),
                page_no,
                frame_no,
            });
        }
        self.descriptors[frame_no].pin_cnt -= 1;
        Ok(())
    }

    /// Write back and drop every page of `file` held in the pool
    ///
    /// Aborts on the first pinned or invalid matching frame; frames already
    /// processed stay flushed and cleared.
    pub fn flush_file(&mut self, file: FileHandle) -> BufferResult<()> {
        for frame_no in 0..self.descriptors.len() {
            if self.descriptors[frame_no].file != Some(file) {
                continue;
            }
            // A cleared descriptor nulls its file, so a file match without
            // the valid bit is a bookkeeping violation
            if !self.descriptors[frame_no].valid {
                let desc = &self.descriptors[frame_no];
                return Err(BufferError::BadBuffer {
                    frame_no: desc.frame_no,
                    dirty: desc.dirty,
                    valid: desc.valid,
                    refbit: desc.refbit,
                });
            }
            if self.descriptors[frame_no].pin_cnt > 0 {
                return Err(BufferError::PagePinned {
                    file: self.file_label(file),
                    page_no: self.descriptors[frame_no].page_no,
                    frame_no,
                });
            }
            if self.descriptors[frame_no].dirty {
                let slot = self.descriptors[frame_no].frame_no;
                self.file_manager.write_page(file, &self.pool[slot])?;
                self.descriptors[frame_no].dirty = false;
            }
            self.page_table.remove(file, self.descriptors[frame_no].page_no);
            self.descriptors[frame_no].clear();
        }
        Ok(())
    }

    /// Drop a page from the pool, if present, and delete it from the file
    ///
    /// Dirty contents are discarded, not written back: the page is about to
    /// cease to exist. The file-level delete happens whether or not the
    /// page was buffered.
    pub fn dispose_page(&mut self, file: FileHandle, page_no: PageId) -> BufferResult<()> {
        if let Some(frame_no) = self.page_table.lookup(file, page_no) {
            self.descriptors[frame_no].clear();
            self.page_table.remove(file, page_no);
        }
        self.file_manager.delete_page(file, page_no)?;
        Ok(())
    }

    /// Dump the descriptor table to stdout
    pub fn print_self(&self) {
        println!("{self}");
    }

    /// Select and empty a frame for reuse, writing back a dirty victim
    ///
    /// A frame whose refbit is set on the first pass may only become
    /// evictable on the second, so the sweep runs up to two full
    /// revolutions before reporting the pool exhausted.
    fn alloc_buf(&mut self) -> BufferResult<FrameId> {
        let mut advances = 0;
        let victim = loop {
            if advances == 2 * self.pool.len() {
                return Err(BufferError::BufferExceeded);
            }
            self.advance_clock();
            advances += 1;

            let desc = &mut self.descriptors[self.clock_hand];
            if !desc.valid {
                break desc.frame_no;
            }
            if desc.refbit {
                // Second chance: consume the recency hint and move on
                desc.refbit = false;
                self.stats.accesses += 1;
                continue;
            }
            if desc.pin_cnt > 0 {
                continue;
            }

            // Victim chosen. Drop its mapping before anything else so no
            // caller can observe the stale entry.
            let frame_no = desc.frame_no;
            let (file, page_no) = (desc.file, desc.page_no);
            if let Some(file) = file {
                self.page_table.remove(file, page_no);
            }
            break frame_no;
        };

        let desc = &self.descriptors[victim];
        if desc.dirty && let Some(file) = desc.file {
            trace!(
                frame_no = victim,
                page_no = desc.page_no,
                "writing back dirty victim"
            );
            self.file_manager.write_page(file, &self.pool[desc.frame_no])?;
            self.stats.diskwrites += 1;
        }
        self.descriptors[victim].clear();
        Ok(victim)
    }

    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.pool.len();
    }

    fn file_label(&self, file: FileHandle) -> String {
        self.file_manager
            .filename(file)
            .unwrap_or_else(|_| format!("file#{}", file.as_usize()))
    }
}

impl fmt::Display for BufMgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut valid_frames = 0;
        for desc in &self.descriptors {
            match desc.file {
                Some(file) => writeln!(
                    f,
                    "frame {}: file#{} page_no={} pin_cnt={} dirty={} valid={} refbit={}",
                    desc.frame_no,
                    file.as_usize(),
                    desc.page_no,
                    desc.pin_cnt,
                    desc.dirty,
                    desc.valid,
                    desc.refbit,
                )?,
                None => writeln!(f, "frame {}: empty", desc.frame_no)?,
            }
            if desc.valid {
                valid_frames += 1;
            }
        }
        write!(f, "total valid frames: {valid_frames}")
    }
}

impl Drop for BufMgr {
    /// Best-effort writeback of dirty frames; a failed write must not stop
    /// the remaining frames from being written or released
    fn drop(&mut self) {
        for desc in &self.descriptors {
            if desc.valid
                && desc.dirty
                && let Some(file) = desc.file
                && let Err(e) = self.file_manager.write_page(file, &self.pool[desc.frame_no])
            {
                warn!(
                    frame_no = desc.frame_no,
                    page_no = desc.page_no,
                    error = %e,
                    "writeback failed during teardown"
                );
            }
        }
    }
}

pub mod buffer;
pub mod file;

pub use buffer::{BufMgr, BufStats, BufferError, BufferResult, DEFAULT_POOL_SIZE, FrameId};
pub use file::{FileError, FileHandle, FileResult, PAGE_SIZE, Page, PageId, PagedFileManager};

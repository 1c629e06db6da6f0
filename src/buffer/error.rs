use thiserror::Error;

use super::FrameId;
use crate::file::{FileError, PageId};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Buffer exceeded: every frame in the pool is pinned")]
    BufferExceeded,

    #[error("Page not pinned: file={file}, page_no={page_no}, frame_no={frame_no}")]
    PageNotPinned {
        file: String,
        page_no: PageId,
        frame_no: FrameId,
    },

    #[error("Page pinned: file={file}, page_no={page_no}, frame_no={frame_no}")]
    PagePinned {
        file: String,
        page_no: PageId,
        frame_no: FrameId,
    },

    #[error("Bad buffer: frame_no={frame_no}, dirty={dirty}, valid={valid}, refbit={refbit}")]
    BadBuffer {
        frame_no: FrameId,
        dirty: bool,
        valid: bool,
        refbit: bool,
    },
}

pub type BufferResult<T> = Result<T, BufferError>;

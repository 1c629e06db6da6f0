use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::page::Page;
use super::{PAGE_SIZE, PageId};

/// Handle to an open file
///
/// Handle equality is file identity: `open_file` returns the same handle
/// for the same canonical path, so one handle maps to one page namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Manages paged file operations
pub struct PagedFileManager {
    /// Map from file handles to open files
    open_files: HashMap<FileHandle, FileEntry>,
    /// Map from file paths to handles (for checking if already open)
    path_to_handle: HashMap<PathBuf, FileHandle>,
    /// Next available file handle
    next_handle: usize,
    /// Maximum number of open files
    max_open_files: usize,
    /// Monotonic I/O counters, observability only
    reads: u64,
    writes: u64,
    deletes: u64,
}

struct FileEntry {
    file: File,
    path: PathBuf,
    /// Page numbers freed by `delete_page`, reused oldest-first. Kept in
    /// memory only; a reopened file restarts allocation from its length.
    free_pages: VecDeque<PageId>,
}

impl PagedFileManager {
    /// Create a new paged file manager
    pub fn new() -> Self {
        Self::with_max_files(128)
    }

    /// Create a new paged file manager with specified max open files
    pub fn with_max_files(max_open_files: usize) -> Self {
        Self {
            open_files: HashMap::new(),
            path_to_handle: HashMap::new(),
            next_handle: 0,
            max_open_files,
            reads: 0,
            writes: 0,
            deletes: 0,
        }
    }

    /// Create a new file
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if path.exists() {
            return Err(FileError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        File::create(path)?;
        Ok(())
    }

    /// Open an existing file
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<FileHandle> {
        let path_ref = path.as_ref();
        let path = path_ref
            .canonicalize()
            .map_err(|_| FileError::FileNotFound(path_ref.display().to_string()))?;

        // Check if file is already open
        if let Some(&handle) = self.path_to_handle.get(&path) {
            return Ok(handle);
        }

        if self.open_files.len() >= self.max_open_files {
            return Err(FileError::TooManyOpenFiles);
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;

        self.open_files.insert(
            handle,
            FileEntry {
                file,
                path: path.clone(),
                free_pages: VecDeque::new(),
            },
        );
        self.path_to_handle.insert(path, handle);

        Ok(handle)
    }

    /// Close a file
    pub fn close_file(&mut self, handle: FileHandle) -> FileResult<()> {
        let entry = self
            .open_files
            .remove(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        self.path_to_handle.remove(&entry.path);
        Ok(())
    }

    /// Remove (delete) a file
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        // If file is open, close it first
        if let Ok(canonical_path) = path.canonicalize()
            && let Some(&handle) = self.path_to_handle.get(&canonical_path)
        {
            self.close_file(handle)?;
        }

        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Read a page from a file
    ///
    /// Reading past the end of the file yields zeros for the missing tail,
    /// so a freshly created file reads as all-zero pages.
    pub fn read_page(&mut self, handle: FileHandle, page_no: PageId) -> FileResult<Page> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        let mut page = Page::new(page_no);
        let offset = (page_no * PAGE_SIZE) as u64;
        entry.file.seek(SeekFrom::Start(offset))?;

        let bytes_read = entry.file.read(page.data_mut())?;
        if bytes_read < PAGE_SIZE {
            page.data_mut()[bytes_read..].fill(0);
        }

        self.reads += 1;
        Ok(page)
    }

    /// Write a page to the slot named by its embedded page number
    pub fn write_page(&mut self, handle: FileHandle, page: &Page) -> FileResult<()> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        let offset = (page.number() * PAGE_SIZE) as u64;
        let required_size = offset + PAGE_SIZE as u64;

        // Extend file if necessary to ensure we can write at this offset
        let current_size = entry.file.metadata()?.len();
        if current_size < required_size {
            entry.file.set_len(required_size)?;
        }

        entry.file.seek(SeekFrom::Start(offset))?;
        entry.file.write_all(page.data())?;
        // Note: Don't sync on every write - let the OS buffer and batch writes

        self.writes += 1;
        Ok(())
    }

    /// Allocate a fresh page in a file
    ///
    /// The returned page is zeroed and already exists on disk. Freed page
    /// numbers are reused oldest-first before the file is extended, so a
    /// live page number is never handed out twice.
    pub fn allocate_page(&mut self, handle: FileHandle) -> FileResult<Page> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        let page_no = match entry.free_pages.pop_front() {
            Some(freed) => freed,
            None => {
                let file_size = entry.file.metadata()?.len();
                file_size.div_ceil(PAGE_SIZE as u64) as PageId
            }
        };

        let page = Page::new(page_no);
        self.write_page(handle, &page)?;
        Ok(page)
    }

    /// Remove a page from a file, making its number available for reuse
    pub fn delete_page(&mut self, handle: FileHandle, page_no: PageId) -> FileResult<()> {
        let page_count = self.page_count(handle)?;
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        if page_no >= page_count {
            return Err(FileError::PageNotFound(page_no));
        }
        if !entry.free_pages.contains(&page_no) {
            entry.free_pages.push_back(page_no);
        }

        self.deletes += 1;
        Ok(())
    }

    /// Path of an open file, for diagnostic messages
    pub fn filename(&self, handle: FileHandle) -> FileResult<String> {
        let entry = self
            .open_files
            .get(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        Ok(entry.path.display().to_string())
    }

    /// Get the number of pages in a file
    pub fn page_count(&mut self, handle: FileHandle) -> FileResult<usize> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        let file_size = entry.file.metadata()?.len();
        Ok(file_size.div_ceil(PAGE_SIZE as u64) as usize)
    }

    /// Sync a file to disk (flush all OS buffers)
    pub fn sync_file(&mut self, handle: FileHandle) -> FileResult<()> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        entry.file.sync_data()?;
        Ok(())
    }

    /// Sync all open files to disk
    pub fn sync_all(&mut self) -> FileResult<()> {
        for entry in self.open_files.values_mut() {
            entry.file.sync_data()?;
        }
        Ok(())
    }

    /// Check if a file is open
    pub fn is_file_open(&self, handle: FileHandle) -> bool {
        self.open_files.contains_key(&handle)
    }

    /// Get the number of currently open files
    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    /// Number of pages read from disk
    pub fn read_count(&self) -> u64 {
        self.reads
    }

    /// Number of pages written to disk
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Number of pages deleted
    pub fn delete_count(&self) -> u64 {
        self.deletes
    }
}

impl Default for PagedFileManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn setup_open_file(temp_dir: &TempDir) -> (PagedFileManager, FileHandle) {
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();
        manager.create_file(&test_file).unwrap();
        let handle = manager.open_file(&test_file).unwrap();
        (manager, handle)
    }

    #[test]
    fn test_create_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        assert!(manager.create_file(&test_file).is_ok());
        assert!(test_file.exists());
    }

    #[test]
    fn test_create_file_already_exists() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let result = manager.create_file(&test_file);
        assert!(matches!(result, Err(FileError::FileAlreadyExists(_))));
    }

    #[test]
    fn test_open_close_file() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        assert!(manager.is_file_open(handle));

        manager.close_file(handle).unwrap();
        assert!(!manager.is_file_open(handle));
    }

    #[test]
    fn test_open_nonexistent_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("nonexistent.db");
        let mut manager = PagedFileManager::new();

        let result = manager.open_file(&test_file);
        assert!(matches!(result, Err(FileError::FileNotFound(_))));
    }

    #[test]
    fn test_open_same_file_twice() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle1 = manager.open_file(&test_file).unwrap();
        let handle2 = manager.open_file(&test_file).unwrap();

        assert_eq!(handle1, handle2);
        assert_eq!(manager.open_file_count(), 1);
    }

    #[test]
    fn test_read_write_page() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        let mut page = Page::new(0);
        page.data_mut()[0] = 42;
        page.data_mut()[100] = 99;
        page.data_mut()[PAGE_SIZE - 1] = 255;

        manager.write_page(handle, &page).unwrap();

        let read_back = manager.read_page(handle, 0).unwrap();
        assert_eq!(read_back.number(), 0);
        assert_eq!(read_back.data(), page.data());
    }

    #[test]
    fn test_write_multiple_pages() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        for page_no in 0..10 {
            let mut page = Page::new(page_no);
            page.data_mut()[0] = page_no as u8;
            manager.write_page(handle, &page).unwrap();
        }

        for page_no in 0..10 {
            let page = manager.read_page(handle, page_no).unwrap();
            assert_eq!(page.data()[0], page_no as u8);
        }
    }

    #[test]
    fn test_read_nonexistent_page() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        // Reading a page that doesn't exist should return zeros
        let page = manager.read_page(handle, 100).unwrap();
        assert!(page.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_allocate_page_extends_file() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        let p0 = manager.allocate_page(handle).unwrap();
        let p1 = manager.allocate_page(handle).unwrap();
        let p2 = manager.allocate_page(handle).unwrap();

        assert_eq!(p0.number(), 0);
        assert_eq!(p1.number(), 1);
        assert_eq!(p2.number(), 2);
        assert_eq!(manager.page_count(handle).unwrap(), 3);
    }

    #[test]
    fn test_delete_page_reuses_number() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        for _ in 0..3 {
            manager.allocate_page(handle).unwrap();
        }

        manager.delete_page(handle, 1).unwrap();
        assert_eq!(manager.allocate_page(handle).unwrap().number(), 1);
        assert_eq!(manager.allocate_page(handle).unwrap().number(), 3);
    }

    #[test]
    fn test_delete_page_out_of_range() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        manager.allocate_page(handle).unwrap();
        let result = manager.delete_page(handle, 5);
        assert!(matches!(result, Err(FileError::PageNotFound(5))));
    }

    #[test]
    fn test_filename() {
        let temp_dir = setup_test_dir();
        let (manager, handle) = setup_open_file(&temp_dir);

        let name = manager.filename(handle).unwrap();
        assert!(name.ends_with("test.db"));
    }

    #[test]
    fn test_page_count() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        assert_eq!(manager.page_count(handle).unwrap(), 0);

        manager.write_page(handle, &Page::new(0)).unwrap();
        assert_eq!(manager.page_count(handle).unwrap(), 1);

        manager.write_page(handle, &Page::new(5)).unwrap();
        assert_eq!(manager.page_count(handle).unwrap(), 6);
    }

    #[test]
    fn test_io_counters() {
        let temp_dir = setup_test_dir();
        let (mut manager, handle) = setup_open_file(&temp_dir);

        manager.write_page(handle, &Page::new(0)).unwrap();
        manager.read_page(handle, 0).unwrap();
        manager.delete_page(handle, 0).unwrap();

        assert_eq!(manager.write_count(), 1);
        assert_eq!(manager.read_count(), 1);
        assert_eq!(manager.delete_count(), 1);
    }

    #[test]
    fn test_remove_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        assert!(test_file.exists());

        manager.remove_file(&test_file).unwrap();
        assert!(!test_file.exists());
    }

    #[test]
    fn test_remove_open_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle = manager.open_file(&test_file).unwrap();
        assert!(manager.is_file_open(handle));

        manager.remove_file(&test_file).unwrap();
        assert!(!test_file.exists());
        assert!(!manager.is_file_open(handle));
    }

    #[test]
    fn test_max_open_files() {
        let temp_dir = setup_test_dir();
        let mut manager = PagedFileManager::with_max_files(2);

        let file1 = temp_dir.path().join("test1.db");
        let file2 = temp_dir.path().join("test2.db");
        let file3 = temp_dir.path().join("test3.db");

        manager.create_file(&file1).unwrap();
        manager.create_file(&file2).unwrap();
        manager.create_file(&file3).unwrap();

        manager.open_file(&file1).unwrap();
        manager.open_file(&file2).unwrap();

        let result = manager.open_file(&file3);
        assert!(matches!(result, Err(FileError::TooManyOpenFiles)));
    }
}

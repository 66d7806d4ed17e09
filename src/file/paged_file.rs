use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{PAGE_SIZE, PageNumber};

/// Stable identifier of a table file, derived from its absolute path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u32);

impl TableId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Hash the absolute path so the same file maps to the same id across runs
    pub fn from_path(path: &Path) -> Self {
        Self(crc32fast::hash(path.as_os_str().as_encoded_bytes()))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file made of fixed-size pages, read and written at page granularity
#[derive(Debug)]
pub struct PagedFile {
    file: File,
    path: PathBuf,
    id: TableId,
    /// Number of whole pages, recomputed whenever the file is opened
    page_count: usize,
}

impl PagedFile {
    /// Create a new, empty paged file opened for reading and writing
    pub fn create<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            return Err(FileError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        let path = path.canonicalize()?;

        Ok(Self {
            file,
            id: TableId::from_path(&path),
            path,
            page_count: 0,
        })
    }

    /// Open an existing paged file for positioned reads
    pub fn open<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let path_ref = path.as_ref();
        let path = path_ref
            .canonicalize()
            .map_err(|_| FileError::FileNotFound(path_ref.display().to_string()))?;

        let file = OpenOptions::new().read(true).open(&path)?;
        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as usize;

        Ok(Self {
            file,
            id: TableId::from_path(&path),
            path,
            page_count,
        })
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    /// Absolute path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of whole pages in the file
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Read exactly one page into `buffer`
    pub fn read_page(&mut self, page: PageNumber, buffer: &mut [u8]) -> FileResult<()> {
        if buffer.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buffer.len(),
            });
        }

        if page >= self.page_count {
            return Err(FileError::PageOutOfRange {
                table: self.id,
                page,
                page_count: self.page_count,
            });
        }

        let offset = (page * PAGE_SIZE) as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buffer)?;

        Ok(())
    }

    /// Write one page, extending the file when writing past its end
    pub fn write_page(&mut self, page: PageNumber, buffer: &[u8]) -> FileResult<()> {
        if buffer.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buffer.len(),
            });
        }

        let offset = (page * PAGE_SIZE) as u64;
        let required_size = offset + PAGE_SIZE as u64;

        let current_size = self.file.metadata()?.len();
        if current_size < required_size {
            self.file.set_len(required_size)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buffer)?;
        self.page_count = self.page_count.max(page + 1);

        Ok(())
    }

    /// Flush OS buffers for this file
    pub fn sync(&mut self) -> FileResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::MediumError;
use crate::offset::{MediumId, Offset};

use super::io_utils::{classify_io_error, read_up_to};
use super::{end_of_medium, Accessor};

/// Accessor over a file on disk.
#[derive(Debug)]
pub struct FileAccessor {
    medium: MediumId,
    path: PathBuf,
    read_only: bool,
    file: Option<File>,
    position: u64,
}

impl FileAccessor {
    /// Creates a closed accessor for the existing file at `path`.
    ///
    /// # Arguments
    /// * `path` - File to access, opened on `open()`
    /// * `read_only` - Open without write permission
    pub fn new(path: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            medium: MediumId::next(),
            path: path.into(),
            read_only,
            file: None,
            position: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Result<&File, MediumError> {
        self.file.as_ref().ok_or(MediumError::MediumClosed)
    }

    fn writable_file(&self) -> Result<&File, MediumError> {
        let file = self.file()?;
        if self.read_only {
            return Err(MediumError::ReadOnlyMedium(self.path.display().to_string()));
        }
        Ok(file)
    }

    fn context(&self, operation: &str) -> String {
        format!("{} {} at {}", operation, self.path.display(), self.position)
    }
}

impl Accessor for FileAccessor {
    fn medium(&self) -> MediumId {
        self.medium
    }

    fn open(&mut self) -> Result<(), MediumError> {
        if self.file.is_some() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .read(true)
            .write(!self.read_only)
            .open(&self.path)
            .map_err(|e| classify_io_error(e, &format!("opening {}", self.path.display())))?;

        tracing::debug!(
            "Opened {} as {} (read_only={})",
            self.path.display(),
            self.medium,
            self.read_only
        );
        self.file = Some(file);
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MediumError> {
        let file = self.file.take().ok_or(MediumError::MediumClosed)?;
        if !self.read_only {
            file.sync_all()
                .map_err(|e| classify_io_error(e, &format!("syncing {}", self.path.display())))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn len(&self) -> Result<u64, MediumError> {
        let metadata = self
            .file()?
            .metadata()
            .map_err(|e| classify_io_error(e, &self.context("querying length of")))?;
        Ok(metadata.len())
    }

    fn set_position(&mut self, offset: Offset) -> Result<(), MediumError> {
        self.file()?;
        offset.ensure_medium(self.medium)?;
        self.position = offset.absolute();
        Ok(())
    }

    fn current_position(&self) -> Result<Offset, MediumError> {
        self.file()?;
        Ok(Offset::new(self.medium, self.position))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, MediumError> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(self.position))
            .map_err(|e| classify_io_error(e, &self.context("seeking in")))?;
        let read = read_up_to(&mut file, buffer)
            .map_err(|e| classify_io_error(e, &self.context("reading")))?;

        let offset = self.position;
        self.position += read as u64;
        if read < buffer.len() {
            return Err(end_of_medium(offset, buffer.len(), &buffer[..read]));
        }
        Ok(read)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<(), MediumError> {
        let mut file = self.writable_file()?;
        file.seek(SeekFrom::Start(self.position))
            .map_err(|e| classify_io_error(e, &self.context("seeking in")))?;
        file.write_all(buffer)
            .map_err(|e| classify_io_error(e, &self.context("writing")))?;
        self.position += buffer.len() as u64;
        Ok(())
    }

    fn truncate(&mut self) -> Result<(), MediumError> {
        self.writable_file()?
            .set_len(self.position)
            .map_err(|e| classify_io_error(e, &self.context("truncating")))
    }
}

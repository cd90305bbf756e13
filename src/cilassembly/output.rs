//! Memory-mapped output file.

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

/// A memory-mapped output file that is removed again unless it is finalized.
pub struct Output {
    /// The memory mapping of the target file
    mmap: MmapMut,

    /// The target path
    target_path: PathBuf,

    /// Whether the file has been finalized
    finalized: bool,
}

impl Output {
    /// Create `target_path` with `size` bytes and map it.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] if the file cannot be created, sized or mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target_path)
            .map_err(|e| Error::WriteError(format!("Failed to create target file: {e}")))?;

        file.set_len(size)
            .map_err(|e| Error::WriteError(format!("Failed to set file size: {e}")))?;

        // SAFETY: the file was just created by us and is not shared with other mappings.
        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|e| Error::WriteError(format!("Failed to create memory mapping: {e}")))?
        };

        Ok(Self {
            mmap,
            target_path,
            finalized: false,
        })
    }

    /// Writes data at a specific offset in the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] if the write would exceed file bounds.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let Some(target) = offset
            .checked_add(data.len())
            .and_then(|end| self.mmap.get_mut(offset..end))
        else {
            return Err(Error::WriteError(format!(
                "Write would exceed file size: offset={}, len={}, file_size={}",
                offset,
                data.len(),
                self.mmap.len()
            )));
        };

        target.copy_from_slice(data);
        Ok(())
    }

    /// Flush the mapping and keep the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] if flushing fails.
    pub fn finalize(mut self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| Error::WriteError(format!("Failed to flush memory mapping: {e}")))?;

        self.finalized = true;
        Ok(())
    }

    /// The target path.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut output = Output::create(&path, 4).unwrap();
        output.write_at(0, &[1, 2]).unwrap();
        output.write_at(2, &[3, 4]).unwrap();
        assert!(output.write_at(3, &[5, 6]).is_err());
        assert!(output.write_at(usize::MAX, &[1]).is_err());
        assert_eq!(output.target_path(), path.as_path());
        output.finalize().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn dropped_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");

        {
            let mut output = Output::create(&path, 2).unwrap();
            output.write_at(0, &[1]).unwrap();
        }

        assert!(!path.exists());
    }
}

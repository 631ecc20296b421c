//! Filesystem operations module.
//!
//! This module provides the low-level pieces of a split:
//! - Resolving and validating input and output paths
//! - Checking free space on the input's volume
//! - Creating the output directory
//! - Copying one part in fixed-size chunks

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::SplitError;
use crate::model::{derive_output_name, CancelToken, OutputTarget, SplitRequest};
use crate::progress::SplitReporter;

/// Resolve the directory the parts will be written to.
pub fn resolve_output_dir(request: &SplitRequest) -> PathBuf {
    match &request.output {
        OutputTarget::ExplicitDir(dir) => dir.clone(),
        OutputTarget::ParentDir(parent) => parent.join(derive_output_name(&request.input)),
        OutputTarget::Sibling => request.input.with_file_name(derive_output_name(&request.input)),
    }
}

/// Check that `path` is a regular file and return its size.
///
/// # Errors
/// Returns `InvalidInput` for missing paths, directories and other non-files.
pub fn check_input_file(path: &Path) -> Result<u64, SplitError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        _ => Err(SplitError::InvalidInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Check that `dir` is absent or an empty directory.
///
/// # Errors
/// Returns `InvalidOutput` if it exists and is not a directory or has entries.
pub fn check_output_dir(dir: &Path) -> Result<(), SplitError> {
    let metadata = match fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(_) => return Err(SplitError::invalid_output(dir, "is not accessible")),
    };

    if !metadata.is_dir() {
        return Err(SplitError::invalid_output(dir, "is not a folder"));
    }

    let mut entries = fs::read_dir(dir).map_err(|_| SplitError::invalid_output(dir, "is not accessible"))?;
    if entries.next().is_some() {
        return Err(SplitError::invalid_output(dir, "is not empty"));
    }
    Ok(())
}

/// Check that the input's volume has room for the original plus all parts.
///
/// # Errors
/// Returns `InsufficientSpace` if fewer than `2 * file_size` bytes are free,
/// or an I/O error if the free space cannot be queried.
pub fn check_free_space(input: &Path, file_size: u64) -> Result<(), SplitError> {
    let volume = existing_volume_path(input);
    let available = fs2::available_space(&volume).map_err(|e| SplitError::ReadError {
        path: volume.clone(),
        source: e,
    })?;
    let required = file_size.saturating_mul(2);
    if available < required {
        return Err(SplitError::InsufficientSpace {
            required,
            available,
        });
    }
    Ok(())
}

/// Directory whose volume holds `input`.
fn existing_volume_path(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Create `dir` and any missing parents.
///
/// # Errors
/// Returns `DirectoryCreationFailed` if creation fails.
pub fn ensure_dir_exists(dir: &Path) -> Result<(), SplitError> {
    fs::create_dir_all(dir).map_err(|e| SplitError::DirectoryCreationFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Forward-only copy cursor over the input, shared by every part.
///
/// `written` counts bytes across all parts and feeds FileProgress.
pub struct PartCopier<'a, R> {
    input: R,
    input_path: &'a Path,
    buffer: Vec<u8>,
    written: u64,
    total: u64,
}

impl<'a, R: Read> PartCopier<'a, R> {
    pub fn new(input: R, input_path: &'a Path, chunk_size: usize, total: u64) -> Self {
        PartCopier {
            input,
            input_path,
            buffer: vec![0; chunk_size],
            written: 0,
            total,
        }
    }

    /// Bytes copied so far across all parts.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Copy the next `part_len` bytes of the input into a new file at `part_path`.
    ///
    /// Reports FileProgress after every chunk. The part file is synced and
    /// closed before this returns, on success and on failure alike.
    ///
    /// # Errors
    /// Returns `ReadError`/`WriteError` on I/O failure (including an input
    /// that ends early) and `Cancelled` if `cancel` fires between chunks.
    pub fn copy_part(
        &mut self,
        part_path: &Path,
        part_len: u64,
        cancel: Option<&CancelToken>,
        reporter: &dyn SplitReporter,
    ) -> Result<(), SplitError> {
        let write_err = |e: io::Error| SplitError::WriteError {
            path: part_path.to_path_buf(),
            source: e,
        };

        let mut out = fs::File::create(part_path).map_err(write_err)?;
        let mut part_written = 0u64;

        while part_written < part_len {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(SplitError::Cancelled {
                    written: self.written,
                });
            }

            let chunk = (part_len - part_written).min(self.buffer.len() as u64) as usize;
            let buf = &mut self.buffer[..chunk];
            self.input.read_exact(buf).map_err(|e| SplitError::ReadError {
                path: self.input_path.to_path_buf(),
                source: e,
            })?;
            out.write_all(buf).map_err(write_err)?;

            part_written += chunk as u64;
            self.written += chunk as u64;
            reporter.on_file_progress(self.written, self.total);
        }

        out.flush().map_err(write_err)?;
        out.sync_all().map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ProgressLog(Mutex<Vec<(u64, u64)>>);

    impl SplitReporter for ProgressLog {
        fn on_file_progress(&self, written_bytes: u64, total_bytes: u64) {
            self.0.lock().unwrap().push((written_bytes, total_bytes));
        }
    }

    #[test]
    fn test_resolve_output_dir_variants() {
        let sibling = SplitRequest::new("/games/zelda.nsp");
        assert_eq!(resolve_output_dir(&sibling), PathBuf::from("/games/zelda_split.nsp"));

        let parent = SplitRequest::new("/games/zelda.nsp").with_output_parent("/mnt/sd");
        assert_eq!(resolve_output_dir(&parent), PathBuf::from("/mnt/sd/zelda_split.nsp"));

        let explicit = SplitRequest::new("/games/zelda.nsp").with_output_dir("/mnt/sd/parts");
        assert_eq!(resolve_output_dir(&explicit), PathBuf::from("/mnt/sd/parts"));
    }

    #[test]
    fn test_check_input_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("game.nsp");
        fs::write(&file, b"12345").expect("Failed to write file");

        assert_eq!(check_input_file(&file).expect("Should accept file"), 5);
        assert!(matches!(
            check_input_file(temp_dir.path()),
            Err(SplitError::InvalidInput { .. })
        ));
        assert!(matches!(
            check_input_file(&temp_dir.path().join("missing")),
            Err(SplitError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_check_output_dir() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        // Absent and empty are both fine
        check_output_dir(&temp_dir.path().join("absent")).expect("Absent dir should pass");
        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).expect("Failed to create dir");
        check_output_dir(&empty).expect("Empty dir should pass");

        let file = temp_dir.path().join("file");
        fs::write(&file, b"x").expect("Failed to write file");
        let err = check_output_dir(&file).unwrap_err();
        assert!(err.to_string().ends_with("is not a folder"));

        fs::write(empty.join("hidden"), b"").expect("Failed to write file");
        let err = check_output_dir(&empty).unwrap_err();
        assert!(err.to_string().ends_with("is not empty"));
    }

    #[test]
    fn test_check_free_space_small_file_passes() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("game.nsp");
        fs::write(&file, b"tiny").expect("Failed to write file");
        check_free_space(&file, 4).expect("A few bytes should always fit");
    }

    #[test]
    fn test_check_free_space_rejects_impossible_size() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("game.nsp");
        let result = check_free_space(&file, u64::MAX / 2);
        assert!(matches!(result, Err(SplitError::InsufficientSpace { .. })));
    }

    #[test]
    fn test_copy_part_chunks_and_reports() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let data: Vec<u8> = (0..250u8).collect();
        let log = ProgressLog(Mutex::new(Vec::new()));

        let mut copier = PartCopier::new(&data[..], Path::new("mem"), 64, 250);
        let first = temp_dir.path().join("00");
        let second = temp_dir.path().join("01");
        copier.copy_part(&first, 200, None, &log).expect("Failed to copy part");
        copier.copy_part(&second, 50, None, &log).expect("Failed to copy part");

        assert_eq!(copier.written(), 250);
        assert_eq!(fs::read(&first).unwrap(), &data[..200]);
        assert_eq!(fs::read(&second).unwrap(), &data[200..]);

        let calls = log.0.lock().unwrap().clone();
        let written: Vec<u64> = calls.iter().map(|&(w, _)| w).collect();
        assert_eq!(written, vec![64, 128, 192, 200, 250]);
        assert!(calls.iter().all(|&(_, total)| total == 250));
    }

    #[test]
    fn test_copy_part_short_input_is_read_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let data = [1u8; 10];
        let mut copier = PartCopier::new(&data[..], Path::new("mem"), 8, 20);
        let result = copier.copy_part(&temp_dir.path().join("00"), 20, None, &crate::NoopReporter);
        assert!(matches!(result, Err(SplitError::ReadError { .. })));
    }

    #[test]
    fn test_copy_part_honours_cancel_token() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let data = [7u8; 32];
        let token = CancelToken::new();
        token.cancel();

        let mut copier = PartCopier::new(&data[..], Path::new("mem"), 8, 32);
        let result = copier.copy_part(&temp_dir.path().join("00"), 32, Some(&token), &crate::NoopReporter);
        assert!(matches!(result, Err(SplitError::Cancelled { written: 0 })));
    }
}

//! Core data model for split jobs.
//!
//! This module defines the structures describing a split operation:
//! - SplitRequest / OutputTarget: what to split and where the parts go
//! - SplitConfig: part and chunk sizes
//! - PartLayout: how the input is carved into parts
//! - SplitSummary: what a successful split produced

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SplitError;

/// Maximum size of one part: 4 GiB minus 64 KiB, which fits FAT32.
pub const PART_SIZE: u64 = 0xFFFF_0000;

/// Bytes moved per read/write call while copying.
pub const CHUNK_SIZE: usize = 0x8000;

/// Where the output directory is placed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Next to the input, named `<stem>_split<suffix>`
    #[default]
    Sibling,
    /// Inside the given directory, named `<stem>_split<suffix>`
    ParentDir(PathBuf),
    /// Exactly the given directory
    ExplicitDir(PathBuf),
}

/// A request to split one file. Immutable for the duration of a split.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    /// File to split
    pub input: PathBuf,

    /// Output directory resolution
    pub output: OutputTarget,

    /// Optional cancellation, checked between chunks
    pub cancel: Option<CancelToken>,
}

impl SplitRequest {
    /// Split `input` into a sibling `<stem>_split<suffix>` directory.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        SplitRequest {
            input: input.into(),
            output: OutputTarget::Sibling,
            cancel: None,
        }
    }

    /// Place the derived output directory inside `parent`.
    pub fn with_output_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.output = OutputTarget::ParentDir(parent.into());
        self
    }

    /// Write parts into exactly `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = OutputTarget::ExplicitDir(dir.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// A cloneable cancellation flag.
///
/// Clones share the same flag, so the caller keeps one and hands another to
/// the request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Part and chunk sizes used by the engine.
///
/// The defaults are the FAT32-safe constants; smaller values are only
/// useful for exercising multi-part layouts on small files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    pub part_size: u64,
    pub chunk_size: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            part_size: PART_SIZE,
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl SplitConfig {
    /// Reject sizes the copy loop cannot work with.
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.part_size == 0 || self.chunk_size == 0 {
            return Err(SplitError::InvalidConfig {
                reason: "part and chunk sizes must be non-zero".to_string(),
            });
        }
        if self.chunk_size as u64 > self.part_size {
            return Err(SplitError::InvalidConfig {
                reason: format!(
                    "chunk size {} exceeds part size {}",
                    self.chunk_size, self.part_size
                ),
            });
        }
        Ok(())
    }
}

/// How an input of a given size is carved into parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLayout {
    pub part_size: u64,
    pub total_parts: u64,
    pub total_bytes: u64,
}

impl PartLayout {
    /// Compute the layout for `file_size` bytes. `part_size` must be non-zero.
    pub fn for_size(file_size: u64, part_size: u64) -> Self {
        PartLayout {
            part_size,
            total_parts: file_size.div_ceil(part_size),
            total_bytes: file_size,
        }
    }

    /// Byte offset in the input where part `index` begins.
    pub fn part_offset(&self, index: u64) -> u64 {
        index.saturating_mul(self.part_size).min(self.total_bytes)
    }

    /// Number of bytes stored in part `index`.
    pub fn part_len(&self, index: u64) -> u64 {
        let start = self.part_offset(index);
        self.part_size.min(self.total_bytes - start)
    }
}

/// File name of part `index`: two-digit zero-padded, wider past 99.
pub fn part_file_name(index: u64) -> String {
    format!("{:02}", index)
}

/// Directory name derived from the input: `<stem>_split<suffix>`.
///
/// `game.nsp` becomes `game_split.nsp`; a name without an extension just
/// gains the `_split` suffix.
pub fn derive_output_name(input: &Path) -> OsString {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push("_split");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Result of a successful split.
#[derive(Debug, Clone)]
pub struct SplitSummary {
    /// Directory holding the parts
    pub output_dir: PathBuf,

    /// Layout that was written
    pub layout: PartLayout,

    /// Message from the archive-bit step, `None` if it succeeded
    pub archive_bit_error: Option<String>,
}

impl SplitSummary {
    /// Paths of every part, in concatenation order.
    pub fn part_paths(&self) -> Vec<PathBuf> {
        (0..self.layout.total_parts)
            .map(|i| self.output_dir.join(part_file_name(i)))
            .collect()
    }
}

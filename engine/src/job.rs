//! Split orchestration module.
//!
//! This module provides the split lifecycle:
//! - Planning a split (validation and part layout, no filesystem changes)
//! - Running a planned split (directory creation, chunked copy, archive bit)
//!
//! `Splitter` bundles the configuration and the archive-bit hook and runs
//! both steps; `split` does the same with defaults.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::archive::{ArchiveMarker, PlatformArchiveMarker};
use crate::error::SplitError;
use crate::fs_ops::{self, PartCopier};
use crate::model::{part_file_name, PartLayout, SplitConfig, SplitRequest, SplitSummary};
use crate::progress::SplitReporter;

/// A validated split, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub layout: PartLayout,
    pub chunk_size: usize,
}

/// Validate a request and compute its layout.
///
/// Checks run in order: input is a regular file, output directory is
/// usable, the volume has room for twice the input, the input is larger
/// than one part. Nothing is created on disk.
///
/// # Errors
/// `InvalidConfig`, `InvalidInput`, `InvalidOutput`, `InsufficientSpace`
/// or `SplitNotNeeded`.
pub fn plan_split(request: &SplitRequest, config: &SplitConfig) -> Result<SplitPlan, SplitError> {
    config.validate()?;

    let file_size = fs_ops::check_input_file(&request.input)?;

    let output_dir = fs_ops::resolve_output_dir(request);
    fs_ops::check_output_dir(&output_dir)?;

    fs_ops::check_free_space(&request.input, file_size)?;

    if file_size <= config.part_size {
        return Err(SplitError::SplitNotNeeded {
            size: file_size,
            part_size: config.part_size,
        });
    }

    Ok(SplitPlan {
        input: request.input.clone(),
        output_dir,
        layout: PartLayout::for_size(file_size, config.part_size),
        chunk_size: config.chunk_size,
    })
}

/// Execute a planned split.
///
/// Creates the output directory, writes every part in order and then
/// attempts to set the archive bit on the directory. Reporter hooks fire in
/// the order InitialInfo, then StartPart/FileProgress*/FinishPart per part,
/// then ArchiveBit.
///
/// # Errors
/// Returns an I/O error or `Cancelled`. Parts written before the failure
/// are left in place. Archive-bit failure is reported, not returned.
pub fn run_split(
    plan: &SplitPlan,
    request: &SplitRequest,
    reporter: &dyn SplitReporter,
    archive: &dyn ArchiveMarker,
) -> Result<SplitSummary, SplitError> {
    let layout = plan.layout;

    fs_ops::ensure_dir_exists(&plan.output_dir)?;

    info!(
        input = %plan.input.display(),
        output = %plan.output_dir.display(),
        total_bytes = layout.total_bytes,
        total_parts = layout.total_parts,
        "splitting file"
    );
    reporter.on_initial_info(layout.total_parts, layout.total_bytes);

    let input = fs::File::open(&plan.input).map_err(|e| SplitError::ReadError {
        path: plan.input.clone(),
        source: e,
    })?;
    let mut copier = PartCopier::new(input, &plan.input, plan.chunk_size, layout.total_bytes);

    for part in 0..layout.total_parts {
        reporter.on_start_part(part, layout.total_parts);

        let part_path = plan.output_dir.join(part_file_name(part));
        let part_len = layout.part_len(part);
        debug!(part, part_len, path = %part_path.display(), "writing part");
        copier.copy_part(&part_path, part_len, request.cancel.as_ref(), reporter)?;

        reporter.on_finish_part(part, layout.total_parts);
    }

    let archive_bit_error = match archive.mark(&plan.output_dir) {
        Ok(()) => None,
        Err(message) => {
            warn!(dir = %plan.output_dir.display(), "could not set archive bit: {}", message);
            Some(message)
        }
    };
    reporter.on_archive_bit(archive_bit_error.as_deref());

    info!(written = copier.written(), "split complete");

    Ok(SplitSummary {
        output_dir: plan.output_dir.clone(),
        layout,
        archive_bit_error,
    })
}

/// Split engine: configuration plus the archive-bit hook.
pub struct Splitter {
    config: SplitConfig,
    archive: Box<dyn ArchiveMarker>,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Splitter {
    /// FAT32 part size, 32 KiB chunks, platform archive-bit marker.
    pub fn new() -> Self {
        Splitter {
            config: SplitConfig::default(),
            archive: Box::new(PlatformArchiveMarker),
        }
    }

    pub fn with_config(mut self, config: SplitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_archive_marker(mut self, marker: impl ArchiveMarker + 'static) -> Self {
        self.archive = Box::new(marker);
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Validate and run a split.
    pub fn split(
        &self,
        request: &SplitRequest,
        reporter: &dyn SplitReporter,
    ) -> Result<SplitSummary, SplitError> {
        let plan = plan_split(request, &self.config)?;
        run_split(&plan, request, reporter, self.archive.as_ref())
    }
}

/// Split `request` with the default `Splitter`.
pub fn split(request: &SplitRequest, reporter: &dyn SplitReporter) -> Result<SplitSummary, SplitError> {
    Splitter::new().split(request, reporter)
}

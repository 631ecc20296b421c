//! # Split Engine - FAT32 File Splitting Library
//!
//! Splits large game images (NSP/XCI) into parts that fit on filesystems
//! with a 4 GiB file-size limit. Designed as the foundation for multiple
//! front ends (CLI, GUI, automation).
//!
//! ## Overview
//!
//! The engine provides:
//! - Up-front validation (input, output directory, free space, size)
//! - A sequential chunked copy into parts named `00`, `01`, ...
//! - Progress reporting via a reporter trait (decoupled from UI technology)
//! - A background worker that delivers ordered events through a queue
//! - A best-effort archive-bit step on the output directory
//!
//! ## Basic Usage
//!
//! ```no_run
//! use splitter_engine::{split, NoopReporter, SplitRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = SplitRequest::new("/games/title.nsp").with_output_parent("/mnt/sd");
//! let summary = split(&request, &NoopReporter)?;
//! println!("Wrote {} parts to {}", summary.layout.total_parts, summary.output_dir.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Polling From a UI Loop
//!
//! ```no_run
//! use splitter_engine::{SplitEvent, SplitRequest, SplitWorker};
//!
//! # fn main() -> std::io::Result<()> {
//! let mut worker = SplitWorker::spawn(SplitRequest::new("/games/title.nsp"))?;
//! while !worker.is_finished() {
//!     for event in worker.poll() {
//!         if let SplitEvent::FileProgress { written_bytes, total_bytes } = event {
//!             println!("{}/{}", written_bytes, total_bytes);
//!         }
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(240));
//! }
//! worker.join();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Requests, configuration, part layout, summary
//! - **error**: Error types and classification
//! - **fs_ops**: Validation checks and the chunked part copy
//! - **job**: Split orchestration (plan, run)
//! - **progress**: Reporter trait and rate limiting
//! - **events**: Event values, queue and queue-backed reporter
//! - **worker**: Background thread bridge
//! - **archive**: Archive-bit hook

pub mod archive;
pub mod error;
pub mod events;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod progress;
pub mod worker;

// Re-export main types and functions
pub use archive::{ArchiveMarker, NoArchiveMarker, PlatformArchiveMarker};
pub use error::{ErrorKind, SplitError};
pub use events::{EventQueue, QueueReporter, SplitEvent};
pub use job::{plan_split, run_split, split, SplitPlan, Splitter};
pub use model::{
    derive_output_name, part_file_name, CancelToken, OutputTarget, PartLayout, SplitConfig,
    SplitRequest, SplitSummary, CHUNK_SIZE, PART_SIZE,
};
pub use progress::{
    NoopReporter, SplitReporter, Throttle, PROGRESS_INTERVAL_CONSOLE, PROGRESS_INTERVAL_QUEUE,
};
pub use worker::SplitWorker;

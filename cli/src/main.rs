//! splitnsp - Command-line interface for the split engine.
//!
//! Splits an NSP/XCI file into FAT32-sized parts. By default progress is
//! rendered to the console; `--json` runs the split on a background worker
//! and prints every event as a JSON line for wrapping front ends.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use clap::Parser;
use splitter_engine::{
    NoArchiveMarker, SplitEvent, SplitReporter, SplitRequest, SplitWorker, Splitter, Throttle,
    PROGRESS_INTERVAL_CONSOLE,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the JSON mode drains the worker's queue.
const POLL_INTERVAL: Duration = Duration::from_millis(240);

/// splitnsp - Split NSP/XCI files into FAT32 compatible sizes
#[derive(Parser, Debug)]
#[command(name = "splitnsp")]
#[command(version = "0.1.0")]
#[command(about = "Split NSP/XCI files into FAT32 compatible sizes")]
struct Args {
    /// Path to NSP or XCI file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// The directory in which to create the _split folder
    #[arg(short = 'o', long, value_name = "PATH")]
    output_parent_dir: Option<PathBuf>,

    /// Write parts directly into this directory
    #[arg(long, value_name = "PATH", conflicts_with = "output_parent_dir")]
    output_dir: Option<PathBuf>,

    /// Emit progress events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Skip setting the archive bit on the output directory
    #[arg(long)]
    no_archive_bit: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn request(&self) -> SplitRequest {
        let request = SplitRequest::new(&self.input);
        match (&self.output_dir, &self.output_parent_dir) {
            (Some(dir), _) => request.with_output_dir(dir),
            (None, Some(parent)) => request.with_output_parent(parent),
            (None, None) => request,
        }
    }

    fn splitter(&self) -> Splitter {
        if self.no_archive_bit {
            Splitter::new().with_archive_marker(NoArchiveMarker)
        } else {
            Splitter::new()
        }
    }
}

struct ConsoleState<W> {
    out: W,
    throttle: Throttle,
    last_line_length: usize,
}

/// CLI implementation of SplitReporter for displaying split progress
struct CliProgress<W: Write + Send> {
    state: Mutex<ConsoleState<W>>,
}

impl<W: Write + Send> CliProgress<W> {
    fn new(out: W) -> Self {
        CliProgress {
            state: Mutex::new(ConsoleState {
                out,
                throttle: Throttle::new(PROGRESS_INTERVAL_CONSOLE),
                last_line_length: 0,
            }),
        }
    }

    fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    /// Print a full line, padded to overwrite the last progress line.
    fn print_line(&self, msg: &str) {
        if let Ok(mut state) = self.state.lock() {
            let width = state.last_line_length;
            let _ = writeln!(state.out, "{:<width$}", msg, width = width);
            let _ = state.out.flush();
        }
    }
}

fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl<W: Write + Send> SplitReporter for CliProgress<W> {
    fn on_initial_info(&self, total_parts: u64, total_bytes: u64) {
        self.print_line(&format!(
            "Splitting file of size {} bytes into {} parts...",
            format_thousands(total_bytes),
            total_parts
        ));
    }

    fn on_start_part(&self, part_number: u64, total_parts: u64) {
        self.print_line(&format!("Starting part {:02} of {:02}", part_number + 1, total_parts));
    }

    fn on_finish_part(&self, part_number: u64, total_parts: u64) {
        self.print_line(&format!("Part {:02} of {:02} complete", part_number + 1, total_parts));
    }

    fn on_file_progress(&self, written_bytes: u64, total_bytes: u64) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !state.throttle.admit() {
            return;
        }

        let total = format_thousands(total_bytes);
        let msg = format!(
            "   {:>width$} / {} bytes",
            format_thousands(written_bytes),
            total,
            width = total.len()
        );
        let width = state.last_line_length;
        let _ = write!(state.out, "{:<width$}\r", msg, width = width);
        let _ = state.out.flush();
        state.last_line_length = msg.len();
    }

    fn on_archive_bit(&self, error: Option<&str>) {
        if let Some(msg) = error {
            self.print_line(&format!("Could not set archive bit ({})", msg));
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Parse command-line arguments, then run the split
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let exit_code = match run_cli(&args, args.splitter(), io::stdout()) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            1
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli<W: Write + Send>(args: &Args, splitter: Splitter, out: W) -> Result<(), String> {
    let config = splitter.config();
    tracing::debug!(
        input = %args.input.display(),
        part_size = config.part_size,
        chunk_size = config.chunk_size,
        "starting split"
    );
    if args.json {
        run_json(args, splitter, out)
    } else {
        run_console(args, splitter, out)
    }
}

/// Split on this thread, rendering progress directly.
fn run_console<W: Write + Send>(args: &Args, splitter: Splitter, mut out: W) -> Result<(), String> {
    let _ = writeln!(out, "\n========== NSP Splitter ==========\n");

    let progress = CliProgress::new(out);
    let result = splitter.split(&args.request(), &progress);
    let mut out = progress.into_inner();

    let summary = result.map_err(|e| e.to_string())?;
    let _ = writeln!(out, "Parts written to {}", summary.output_dir.display());
    let _ = writeln!(out, "\n============== Done ==============\n");
    Ok(())
}

/// Split on a background worker, polling its queue and printing JSON lines.
///
/// If stdout fails the worker is still joined before returning, so no split
/// keeps running after this returns.
fn run_json<W: Write>(args: &Args, splitter: Splitter, mut out: W) -> Result<(), String> {
    let mut worker = SplitWorker::spawn_with(splitter, args.request(), None)
        .map_err(|e| format!("Failed to start worker: {}", e))?;
    tracing::debug!(id = %worker.id(), "worker started");

    let mut failure = None;
    while !worker.is_finished() {
        for event in worker.poll() {
            if let Err(e) = write_event(&mut out, &event) {
                tracing::warn!(id = %worker.id(), "output closed, waiting for worker to finish");
                worker.join();
                return Err(format!("Failed to write event: {}", e));
            }
            if let SplitEvent::ExceptionExit { message, .. } = event {
                failure = Some(message);
            }
        }
        let _ = out.flush();
        if !worker.is_finished() {
            thread::sleep(POLL_INTERVAL);
        }
    }
    worker.join();

    match failure {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

fn write_event<W: Write>(out: &mut W, event: &SplitEvent) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)
}

//! BatchScale - concurrent batch conversion of image trees to scaled JPEGs
//!
//! Walks a source directory for PNG and JPEG files, scales each one by a
//! constant factor and writes it as `<name>.jpg` into a flat destination
//! directory.
//!
//! # Features
//!
//! - **Sequential mode**: files in sorted path order, first failure aborts
//! - **Concurrent mode**: one task per file over a bounded worker pool,
//!   isolated failures, cooperative cancellation
//! - **Pluggable codec**: the `image` crate by default, any [`ImageCodec`]
//!   otherwise
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use batchscale::{BatchProcessor, CancellationToken, ResizeConfig};
//!
//! # async fn run() -> batchscale::Result<()> {
//! let processor = BatchProcessor::new(&ResizeConfig::new());
//! let cancel = CancellationToken::new();
//!
//! let report = processor
//!     .resize_all_concurrently("photos/", "thumbs/", 0.25, &cancel)
//!     .await?;
//!
//! println!("{} of {} written", report.success_count(), report.total_files);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod files;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, ConcurrencyLimit, ResizeConfig};
pub use error::{BatchScaleError, Result};
pub use files::{clean, find_images, prepare};
pub use parallel::{BatchProcessor, BatchReport, TaskResult, TaskState};
pub use processing::{FilterType, ImageCodec, ImageTransformer, StandardCodec};
pub use tokio_util::sync::CancellationToken;

use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `RUST_LOG`.
///
/// Does nothing if a global subscriber is already installed, so calling
/// it more than once is harmless.
pub fn init() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("BatchScale v{} initialized", VERSION);
    }
}

/// Initialize logging from a configuration
pub fn init_with_config(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.logging.level)
        .map_err(|e| BatchScaleError::config(format!("Invalid log level '{}': {}", config.logging.level, e)))?;

    let installed = if config.logging.json_format {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().json().with_env_filter(filter).finish()
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().with_env_filter(filter).finish()
        )
    };

    if installed.is_ok() {
        info!("BatchScale v{} initialized with custom config", VERSION);
    }

    Ok(())
}

/// Sequentially resize every image under `source` with default settings
pub fn resize_all<S, D>(source: S, dest: D, scale: f64) -> Result<Vec<PathBuf>>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    BatchProcessor::default().resize_all(source, dest, scale)
}

/// Concurrently resize every image under `source` with default settings
pub async fn resize_all_concurrently<S, D>(
    source: S,
    dest: D,
    scale: f64,
    cancel: &CancellationToken,
) -> Result<BatchReport>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    BatchProcessor::default()
        .resize_all_concurrently(source, dest, scale, cancel)
        .await
}

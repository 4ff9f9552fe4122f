//! Unpack command implementation.

use crate::utils::{BarProgress, create_progress_bar};
use anchorarc_archive::UnpackOptions;
use anchorarc_archive::ops::unpack_with_progress;
use std::path::Path;
use tracing::debug;

pub fn cmd_unpack(
    input: &Path,
    output: &Path,
    buffer_size: usize,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = UnpackOptions::default().with_buffer_size(buffer_size);
    let bar = BarProgress::new(create_progress_bar(0, progress));
    let summary = unpack_with_progress(input, output, &options, bar)?;
    debug!(
        directories = summary.directories,
        files = summary.files,
        symlinks = summary.symlinks,
        bytes = summary.bytes,
        "unpack finished"
    );
    Ok(())
}

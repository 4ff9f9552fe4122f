//! Pack command implementation.

use crate::utils::{BarProgress, create_progress_bar};
use anchorarc_archive::ops::pack_with_progress;
use anchorarc_archive::{PackOptions, SymlinkPolicy};
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn cmd_pack(
    inputs: &[PathBuf],
    output: &Path,
    buffer_size: usize,
    symlinks: SymlinkPolicy,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = PackOptions::default()
        .with_buffer_size(buffer_size)
        .with_symlinks(symlinks);
    debug!(?options, "packing {} input(s)", inputs.len());

    let bar = BarProgress::new(create_progress_bar(0, progress));
    let summary = pack_with_progress(inputs, output, &options, bar)?;
    debug!(
        directories = summary.directories,
        files = summary.files,
        symlinks = summary.symlinks,
        archive_size = summary.archive_size,
        "pack finished"
    );
    Ok(())
}

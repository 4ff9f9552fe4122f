//! List command implementation.

use crate::utils::matches_filters;
use anchorarc_archive::listing::{self, ListEntry};
use anchorarc_archive::{ReadOptions, list};
use anchorarc_core::Node;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;

/// JSON serializable node data for archive listings.
#[derive(Debug, Serialize, Deserialize)]
struct EntryJson {
    name: String,
    path: String,
    kind: String,
    mode: u32,
    size: u64,
    depth: usize,
    mtime: i64,
    header_offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_offset: Option<u64>,
}

impl EntryJson {
    fn from_entry(entry: &ListEntry<'_>) -> Self {
        let node = entry.node;
        Self {
            name: node.display_name().into_owned(),
            path: node.access_path.display().to_string(),
            kind: node.kind.name().to_string(),
            mode: node.mode(),
            size: node.size,
            depth: entry.depth,
            mtime: node.times.modified.secs,
            header_offset: node.header_offset.map(u64::from).unwrap_or_default(),
            content_offset: node.content_offset.map(u64::from),
        }
    }
}

/// JSON output for archive listing.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveListJson {
    archive: String,
    entries: Vec<EntryJson>,
}

/// Options for listing archive contents.
pub struct ListOptions<'a> {
    pub json: bool,
    pub include: &'a [String],
    pub exclude: &'a [String],
}

pub fn cmd_list(archive: &Path, options: &ListOptions) -> Result<(), Box<dyn std::error::Error>> {
    let tree = list(archive, &ReadOptions::default())?;
    let keep = |node: &Node| {
        matches_filters(
            &node.access_path.to_string_lossy(),
            options.include,
            options.exclude,
        )
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if options.json {
        let listing = ArchiveListJson {
            archive: archive.display().to_string(),
            entries: listing::entries(&tree)
                .filter(|entry| keep(entry.node))
                .map(|entry| EntryJson::from_entry(&entry))
                .collect(),
        };
        serde_json::to_writer_pretty(&mut out, &listing)?;
        writeln!(out)?;
    } else {
        listing::write_listing(&tree, &mut out, keep)?;
    }
    out.flush()?;
    Ok(())
}

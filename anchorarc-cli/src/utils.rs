//! Utility functions for the CLI.

use anchorarc_archive::Progress;
use anchorarc_core::Node;
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("█▓▒░ "));
    pb
}

/// Drives a progress bar from pack and unpack callbacks.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn start(&mut self, total: u64) {
        self.bar.set_length(total);
    }

    fn node(&mut self, node: &Node) {
        self.bar.set_message(node.access_path.display().to_string());
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("done");
    }
}

/// Check if a path matches the filter patterns.
/// - If include patterns are specified, the path must match at least one
/// - If exclude patterns are specified, the path must not match any
pub fn matches_filters(path: &str, include: &[String], exclude: &[String]) -> bool {
    let matches = |pattern: &String| Pattern::new(pattern).is_ok_and(|p| p.matches(path));

    if exclude.iter().any(matches) {
        return false;
    }
    include.is_empty() || include.iter().any(matches)
}

/// Parse a byte size such as `4096`, `64K` or `1M`.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1024),
        Some((i, 'm' | 'M')) => (&s[..i], 1024 * 1024),
        _ => (s, 1),
    };
    let value: usize = digits
        .parse()
        .map_err(|_| format!("invalid size '{s}'"))?;
    let size = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{s}' is too large"))?;
    if size == 0 {
        return Err("size must be greater than zero".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("256K"), Ok(256 * 1024));
        assert_eq!(parse_size("128m"), Ok(128 * 1024 * 1024));
        assert!(parse_size("0").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size("12G").is_err());
        assert!(parse_size(&format!("{}M", usize::MAX)).is_err());
    }

    #[test]
    fn test_matches_filters() {
        let include = vec!["*.txt".to_string()];
        let exclude = vec!["secret*".to_string()];
        assert!(matches_filters("notes.txt", &include, &[]));
        assert!(!matches_filters("notes.md", &include, &[]));
        assert!(!matches_filters("secret.txt", &include, &exclude));
        assert!(matches_filters("anything", &[], &[]));
    }
}

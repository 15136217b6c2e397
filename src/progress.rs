//! Scan progress display

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE: &str = "[{elapsed_precise}] {spinner:.cyan} {pos} lines ({per_sec}) {msg}";

/// Spinner counting consumed lines; hidden when `quiet`
///
/// Corpus size is unknown up front (files are streamed, possibly
/// compressed), so this counts rather than fills a bar.
pub fn scan_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => pb.set_style(style),
        Err(e) => log::debug!("default progress style: {}", e),
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_valid() {
        assert!(ProgressStyle::with_template(TEMPLATE).is_ok());
    }

    #[test]
    fn test_quiet_is_hidden() {
        let pb = scan_progress_bar(true);
        assert!(pb.is_hidden());
        pb.inc(3);
        assert_eq!(pb.position(), 3);
    }
}

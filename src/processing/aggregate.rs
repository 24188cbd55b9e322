//! Merge per-chunk fragments into the final summary.

use super::types::{Fragment, SummarizeError};

/// Separator placed between consecutive chunk summaries.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Join the usable fragments in chunk order.
///
/// Failed fragments and blank summaries are skipped. When nothing usable remains the job fails
/// with [`SummarizeError::NoSummaryGenerated`].
pub fn aggregate(fragments: &[Fragment]) -> Result<String, SummarizeError> {
    let summary = fragments
        .iter()
        .filter_map(Fragment::text)
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR);

    if summary.trim().is_empty() {
        return Err(SummarizeError::NoSummaryGenerated);
    }
    Ok(summary)
}

/// Number of fragments recorded as failed.
pub fn failed_count(fragments: &[Fragment]) -> usize {
    fragments.iter().filter(|fragment| fragment.is_failed()).count()
}

//! Input path expansion.

use std::path::PathBuf;
use tracing::warn;

use crate::error::{PdfMixError, Result};

/// Characters that make an argument a glob pattern rather than a path.
const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Expand command-line inputs into paths, keeping argument order.
///
/// Plain paths are passed through untouched, even if they do not exist, so
/// the merge can report them as skipped. Patterns such as `"scans/*.png"`
/// expand to their matches in sorted order; a pattern matching nothing
/// contributes nothing.
///
/// # Errors
///
/// Returns [`PdfMixError::Other`] for malformed patterns or unreadable
/// directories encountered while matching.
pub fn expand_inputs<T>(inputs: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.contains(GLOB_CHARS) {
            resolved.push(PathBuf::from(input));
            continue;
        }

        let matches = expand_pattern(input)?;
        if matches.is_empty() {
            warn!(pattern = input, "pattern matched no files");
        }
        resolved.extend(matches);
    }

    Ok(resolved)
}

fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|err| PdfMixError::other(err.to_string()))?;

    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| PdfMixError::other(err.to_string()))?;
        if path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

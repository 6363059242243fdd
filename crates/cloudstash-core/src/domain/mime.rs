//! MIME type lookup by file extension

use std::path::Path;

/// MIME type used when the extension is unknown or missing
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Returns the MIME type for `path` based on its extension
///
/// Uses the `mime_guess` database, so matching is case-insensitive.
/// Unknown or missing extensions map to [`DEFAULT_MIME_TYPE`].
pub fn mime_type_for(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
}

//! String cleanup and file system helpers.
//!
//! - Character filtering for text bound for the document store
//! - Whitespace normalization for detail lines
//! - Log-friendly truncation of long headings
//! - Output directory validation

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Whether `c` is a control character the storage encoding rejects.
///
/// Covers U+0000-U+0008, U+000B-U+000C and U+000E-U+001F; tab, line feed and
/// carriage return are kept.
fn is_illegal(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}'..='\u{c}' | '\u{e}'..='\u{1f}')
}

/// Remove characters that cannot be stored.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_illegal_characters("a\u{1}b"), "ab");
/// ```
pub fn strip_illegal_characters(s: &str) -> String {
    s.chars().filter(|&c| !is_illegal(c)).collect()
}

/// Remove every whitespace character.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Truncate a string for logging purposes.
///
/// Keeps at most `max` characters and appends the number of bytes dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("港聞港聞", 2), "港聞…(+6 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

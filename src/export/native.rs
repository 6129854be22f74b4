//! Native attachments exported verbatim.

use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::mapping;
use crate::model::document::DocId;
use crate::source::MailboxSource;

use super::write_new_file;

/// Longest extension carried over from an attachment name.
const MAX_EXTENSION_LEN: usize = 16;

/// Write an attachment's raw bytes to `<doc_id>.<ext>`.
///
/// Returns the file name relative to `output_dir`. Unreadable content is
/// exported as an empty file.
pub fn export_native<S: MailboxSource>(
    source: &S,
    attachment: &S::Attachment,
    original_name: Option<&str>,
    id: DocId,
    output_dir: &Path,
    fallback_extension: &str,
) -> Result<String> {
    let bytes = source.content_bytes(attachment).unwrap_or_else(|e| {
        warn!(doc_id = %id, error = %e, "Unreadable attachment content; exporting empty file");
        Vec::new()
    });

    let file_name = native_file_name(id, original_name, fallback_extension);
    write_new_file(&output_dir.join(&file_name), &bytes)?;
    Ok(file_name)
}

/// `<doc_id>.<ext>` where `ext` keeps only the ASCII alphanumerics of the
/// original extension, or `fallback` when nothing usable remains.
pub fn native_file_name(id: DocId, original_name: Option<&str>, fallback: &str) -> String {
    let ext: String = original_name
        .and_then(mapping::file_extension)
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(MAX_EXTENSION_LEN)
                .collect()
        })
        .unwrap_or_default();

    if ext.is_empty() {
        format!("{id}.{fallback}")
    } else {
        format!("{id}.{ext}")
    }
}

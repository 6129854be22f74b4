//! Content export: message text renderings and native attachment files.
//!
//! Files are written one at a time in document order, then measured from
//! disk (in parallel) and the results attached to their documents.

pub mod native;
pub mod text;
pub mod verify;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::{PstError, Result};
use crate::model::document::{ExportedFile, FileType, Tag};
use crate::source::MailboxSource;
use crate::tree::{DocumentTree, Origin};

use self::verify::DigestRequest;

/// Resolved export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Read-back threads (0 = one per core).
    pub hash_workers: usize,
    /// Extension for native files whose name has none.
    pub fallback_extension: String,
    /// Used for bodies that are neither BOM-marked nor valid UTF-8.
    pub fallback_encoding: &'static Encoding,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            hash_workers: 0,
            fallback_extension: "txt".to_string(),
            fallback_encoding: encoding_rs::WINDOWS_1252,
        }
    }
}

impl ExportOptions {
    /// Resolve the `[export]` config section. Unknown encodings fall back
    /// to windows-1252.
    pub fn from_config(config: &ExportConfig) -> Self {
        let fallback_encoding = Encoding::for_label(config.fallback_encoding.as_bytes())
            .unwrap_or_else(|| {
                warn!(
                    label = %config.fallback_encoding,
                    "Unknown fallback encoding, using windows-1252"
                );
                encoding_rs::WINDOWS_1252
            });
        Self {
            hash_workers: config.hash_workers,
            fallback_extension: config.fallback_extension.clone(),
            fallback_encoding,
        }
    }
}

/// Totals for one export pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub files: usize,
    pub bytes: u64,
}

/// Export every document of `tree` into `output_dir` and fill in its
/// `files` (and `#FileSize` for native files).
///
/// Any filesystem error aborts; files already written are left in place.
/// The progress callback receives `(current, total)`.
pub fn export_documents<S: MailboxSource>(
    source: &S,
    tree: &mut DocumentTree<S::Message, S::Attachment>,
    output_dir: &Path,
    options: &ExportOptions,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<ExportStats> {
    let total = tree.len();
    let mut written: Vec<(FileType, String)> = Vec::with_capacity(total);

    for (i, (document, origin)) in tree.iter_mut().enumerate() {
        if let Some(cb) = progress {
            cb(i, total);
        }
        let entry = match origin {
            Origin::Message(message) => {
                let name = text::export_message_text(
                    source,
                    message,
                    document.id,
                    output_dir,
                    options.fallback_encoding,
                )?;
                (FileType::Text, name)
            }
            Origin::Native {
                attachment,
                file_name,
            } => {
                let name = native::export_native(
                    source,
                    attachment,
                    file_name.as_deref(),
                    document.id,
                    output_dir,
                    &options.fallback_extension,
                )?;
                (FileType::Native, name)
            }
        };
        debug!(doc_id = %document.id, file = %entry.1, "Exported");
        written.push(entry);
    }
    if let Some(cb) = progress {
        cb(total, total);
    }

    let requests: Vec<DigestRequest> = written
        .iter()
        .map(|(file_type, name)| DigestRequest {
            path: output_dir.join(name),
            with_hash: *file_type == FileType::Native,
        })
        .collect();
    let digests = verify::digest_files(&requests, options.hash_workers)?;

    let mut stats = ExportStats::default();
    for ((document, _), ((file_type, file_name), digest)) in
        tree.iter_mut().zip(written.into_iter().zip(digests))
    {
        if file_type == FileType::Native {
            document
                .tags
                .push(Tag::long_integer("#FileSize", digest.size as i64));
        }
        stats.files += 1;
        stats.bytes += digest.size;
        document.files.push(ExportedFile {
            file_type,
            file_name,
            size_bytes: digest.size,
            content_hash: digest.md5,
        });
    }

    info!(files = stats.files, bytes = stats.bytes, "Export complete");
    Ok(stats)
}

/// Create `path` (which must not exist) and write `bytes` to it.
pub(crate) fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| PstError::io(path, e))?;
    file.write_all(bytes).map_err(|e| PstError::io(path, e))?;
    file.flush().map_err(|e| PstError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PropertyMapper;
    use crate::source::snapshot::SnapshotMailbox;
    use crate::tree::build_tree;

    const MAILBOX: &str = r#"{
        "root": {"messages": [{
            "properties": {"0x0037": {"type": "string", "value": "Hi"}},
            "body": "Body text",
            "attachments": [
                {"properties": {"0x3707": {"type": "string", "value": "pic.jpg"}}, "data": "/9j/4AAQ"},
                {"properties": {"0x3707": {"type": "string", "value": "broken.bin"}}, "data": "%%%"},
                {"properties": {"0x3707": {"type": "string", "value": "notes"}}, "text": "n"}
            ]
        }]}
    }"#;

    #[test]
    fn test_export_documents_fills_files() {
        let mb = SnapshotMailbox::from_json(MAILBOX).unwrap();
        let mut tree = build_tree(&mb, &PropertyMapper::default(), None).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let stats = export_documents(&mb, &mut tree, dir.path(), &ExportOptions::default(), None)
            .unwrap();
        assert_eq!(stats.files, 4);

        let msg = &tree.documents[0];
        assert_eq!(msg.files.len(), 1);
        assert_eq!(msg.files[0].file_type, FileType::Text);
        assert_eq!(msg.files[0].file_name, "d0000001.txt");
        assert_eq!(msg.files[0].size_bytes, 9);
        assert!(msg.files[0].content_hash.is_none());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("d0000001.txt")).unwrap(),
            "Body text"
        );

        let pic = &tree.documents[1].files[0];
        let bytes = std::fs::read(dir.path().join("d0000002.jpg")).unwrap();
        assert_eq!(pic.size_bytes, bytes.len() as u64);
        assert_eq!(
            pic.content_hash.as_deref(),
            Some(format!("{:x}", md5::compute(&bytes)).as_str())
        );
        assert_eq!(
            tree.documents[1].tag("#FileSize").unwrap().value,
            bytes.len().to_string()
        );

        // Undecodable content still yields an (empty) file.
        let broken = &tree.documents[2].files[0];
        assert_eq!(broken.file_name, "d0000003.bin");
        assert_eq!(broken.size_bytes, 0);

        assert_eq!(tree.documents[3].files[0].file_name, "d0000004.txt");
        assert_eq!(stats.bytes, 9 + bytes.len() as u64 + 1);
    }

    #[test]
    fn test_export_never_overwrites() {
        let mb = SnapshotMailbox::from_json(MAILBOX).unwrap();
        let mut tree = build_tree(&mb, &PropertyMapper::default(), None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d0000001.txt"), b"old").unwrap();

        let err = export_documents(&mb, &mut tree, dir.path(), &ExportOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, PstError::Io { .. }));
    }

    #[test]
    fn test_options_from_config() {
        let config = ExportConfig {
            hash_workers: 2,
            fallback_extension: "bin".to_string(),
            fallback_encoding: "iso-8859-2".to_string(),
        };
        let opts = ExportOptions::from_config(&config);
        assert_eq!(opts.hash_workers, 2);
        assert_eq!(opts.fallback_extension, "bin");
        assert_eq!(opts.fallback_encoding.name(), "ISO-8859-2");

        let bogus = ExportConfig {
            fallback_encoding: "klingon".to_string(),
            ..config
        };
        assert_eq!(
            ExportOptions::from_config(&bogus).fallback_encoding,
            encoding_rs::WINDOWS_1252
        );
    }
}

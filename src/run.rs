//! End-to-end conversion: mailbox in, output directory with loadfile out.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::error::{PstError, Result};
use crate::export::{self, ExportOptions};
use crate::loadfile;
use crate::mapping::PropertyMapper;
use crate::source::pst::PstMailbox;
use crate::source::snapshot::SnapshotMailbox;
use crate::source::{self, MailboxFormat, MailboxSource};
use crate::tree;

/// Optional progress callbacks for the two long-running stages.
#[derive(Default, Clone, Copy)]
pub struct RunHooks<'a> {
    /// Documents created so far during traversal.
    pub on_document: Option<&'a dyn Fn(u64)>,
    /// `(current, total)` during export.
    pub on_export: Option<&'a dyn Fn(usize, usize)>,
}

/// What a completed conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub documents: usize,
    pub relationships: usize,
    pub files: usize,
    pub bytes: u64,
    pub loadfile: PathBuf,
}

/// Convert the mailbox at `mailbox_path` into `output_dir`.
///
/// `output_dir` must not exist; it is created only once the mailbox has
/// been opened and walked. Failures leave any partial output in place.
pub fn run(mailbox_path: &Path, output_dir: &Path, config: &Config) -> Result<RunSummary> {
    run_with_hooks(mailbox_path, output_dir, config, RunHooks::default())
}

/// [`run`] with progress reporting.
pub fn run_with_hooks(
    mailbox_path: &Path,
    output_dir: &Path,
    config: &Config,
    hooks: RunHooks<'_>,
) -> Result<RunSummary> {
    if output_dir.exists() {
        return Err(PstError::OutputExists(output_dir.to_path_buf()));
    }
    let format = source::detect_format(mailbox_path)?;
    info!(mailbox = %mailbox_path.display(), ?format, "Opening mailbox");
    match format {
        MailboxFormat::Pst => {
            convert(&PstMailbox::open(mailbox_path)?, output_dir, config, hooks)
        }
        MailboxFormat::Snapshot => {
            convert(&SnapshotMailbox::open(mailbox_path)?, output_dir, config, hooks)
        }
    }
}

/// Convert an already opened mailbox into `output_dir`.
pub fn convert<S: MailboxSource>(
    source: &S,
    output_dir: &Path,
    config: &Config,
    hooks: RunHooks<'_>,
) -> Result<RunSummary> {
    if output_dir.exists() {
        return Err(PstError::OutputExists(output_dir.to_path_buf()));
    }
    let start = Instant::now();

    let mapper = PropertyMapper::new(config.mapping.list_separator.clone());
    let mut tree = tree::build_tree(source, &mapper, hooks.on_document)?;

    create_output_dir(output_dir)?;

    let options = ExportOptions::from_config(&config.export);
    let stats = export::export_documents(source, &mut tree, output_dir, &options, hooks.on_export)?;

    let loadfile = loadfile::write_loadfile_to_dir(output_dir, &tree.documents, &tree.relationships)?;

    let summary = RunSummary {
        documents: tree.documents.len(),
        relationships: tree.relationships.len(),
        files: stats.files,
        bytes: stats.bytes,
        loadfile,
    };
    info!(
        documents = summary.documents,
        relationships = summary.relationships,
        files = summary.files,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Conversion complete"
    );
    Ok(summary)
}

/// Create `dir` (and missing parents). `dir` itself must be new.
fn create_output_dir(dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PstError::io(parent, e))?;
    }
    fs::create_dir(dir).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => PstError::OutputExists(dir.to_path_buf()),
        _ => PstError::io(dir, e),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::property::PropertyBag;

    const MAILBOX: &str = r#"{"root": {"messages": [{
        "properties": {"0x0037": {"type": "string", "value": "Hi"}},
        "body": "Hello",
        "attachments": [{"properties": {"0x3707": {"type": "string", "value": "a.txt"}}, "text": "abc"}]
    }]}}"#;

    #[test]
    fn test_convert_writes_everything() {
        let source = SnapshotMailbox::from_json(MAILBOX).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");

        let summary = convert(&source, &out, &Config::default(), RunHooks::default()).unwrap();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.relationships, 1);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.bytes, 8);
        assert_eq!(summary.loadfile, out.join(loadfile::LOADFILE_NAME));
        assert!(out.join("d0000001.txt").is_file());
        assert!(out.join("d0000002.txt").is_file());
    }

    #[test]
    fn test_hooks_are_called() {
        let source = SnapshotMailbox::from_json(MAILBOX).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let docs = Cell::new(0u64);
        let last_export = Cell::new((0usize, 0usize));
        let on_document = |n: u64| docs.set(n);
        let on_export = |c: usize, t: usize| last_export.set((c, t));
        let hooks = RunHooks {
            on_document: Some(&on_document),
            on_export: Some(&on_export),
        };

        convert(&source, &dir.path().join("out"), &Config::default(), hooks).unwrap();
        assert_eq!(docs.get(), 2);
        assert_eq!(last_export.get(), (2, 2));
    }

    #[test]
    fn test_existing_output_rejected() {
        let source = SnapshotMailbox::from_json(MAILBOX).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = convert(&source, dir.path(), &Config::default(), RunHooks::default()).unwrap_err();
        assert!(matches!(err, PstError::OutputExists(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    /// A mailbox whose root folder's message table cannot be read.
    struct UnreadableMessages;

    impl MailboxSource for UnreadableMessages {
        type Folder = ();
        type Message = ();
        type Attachment = ();

        fn root_folder(&self) -> Result<()> {
            Ok(())
        }
        fn folder_name(&self, _: &()) -> Result<String> {
            Ok("Root".to_string())
        }
        fn subfolders(&self, _: &()) -> Result<Vec<()>> {
            Ok(Vec::new())
        }
        fn messages(&self, _: &()) -> Result<Vec<()>> {
            Err(PstError::Decode("contents table is corrupt".to_string()))
        }
        fn attachments(&self, _: &()) -> Result<Vec<()>> {
            Ok(Vec::new())
        }
        fn recipients(&self, _: &()) -> Result<Vec<PropertyBag>> {
            Ok(Vec::new())
        }
        fn is_embedded_message(&self, _: &()) -> Result<bool> {
            Ok(false)
        }
        fn as_message(&self, _: &()) -> Result<()> {
            Err(PstError::decode("not an embedded message"))
        }
        fn message_properties(&self, _: &()) -> Result<PropertyBag> {
            Ok(PropertyBag::new())
        }
        fn attachment_properties(&self, _: &()) -> Result<PropertyBag> {
            Ok(PropertyBag::new())
        }
        fn body_text(&self, _: &()) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn body_html(&self, _: &()) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn content_bytes(&self, _: &()) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_decode_failure_during_traversal_leaves_no_output() {
        let mapper = PropertyMapper::default();
        assert!(matches!(
            tree::build_tree(&UnreadableMessages, &mapper, None),
            Err(PstError::Decode(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = convert(&UnreadableMessages, &out, &Config::default(), RunHooks::default())
            .unwrap_err();
        assert!(matches!(err, PstError::Decode(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_mailbox_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = run(&dir.path().join("nosuch.pst"), &out, &Config::default()).unwrap_err();
        assert!(matches!(err, PstError::MailboxNotFound(_)));
        assert!(!out.exists());
    }
}

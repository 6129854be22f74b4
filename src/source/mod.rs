//! Read-only access to a decoded mailbox.
//!
//! The export engine only talks to [`MailboxSource`]; any decoder that can
//! expose folders, messages, attachments and property bags plugs in here.

pub mod pst;
pub mod snapshot;

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{PstError, Result};
use crate::model::property::PropertyBag;

/// Magic bytes at offset 0 of every PST file.
const PST_MAGIC: &[u8; 4] = b"!BDN";

/// Container format of a mailbox file, picked from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxFormat {
    Pst,
    Snapshot,
}

/// Sniff the mailbox header. Anything that is not a PST is treated as a
/// JSON snapshot and validated when parsed.
pub fn detect_format(path: &Path) -> Result<MailboxFormat> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PstError::MailboxNotFound(path.to_path_buf()),
        _ => PstError::io(path, e),
    })?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == PST_MAGIC => Ok(MailboxFormat::Pst),
        Ok(()) => Ok(MailboxFormat::Snapshot),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(MailboxFormat::Snapshot),
        Err(e) => Err(PstError::io(path, e)),
    }
}

/// A decoded mailbox container.
///
/// Handles (`Folder`, `Message`, `Attachment`) are cheap to clone and stay
/// valid for the lifetime of the source. Every sequence is returned in the
/// container's own order; that order drives document numbering.
pub trait MailboxSource {
    type Folder: Clone;
    type Message: Clone;
    type Attachment: Clone;

    fn root_folder(&self) -> Result<Self::Folder>;

    fn folder_name(&self, folder: &Self::Folder) -> Result<String>;

    fn subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>>;

    fn messages(&self, folder: &Self::Folder) -> Result<Vec<Self::Message>>;

    fn attachments(&self, message: &Self::Message) -> Result<Vec<Self::Attachment>>;

    /// One property bag per recipient row.
    fn recipients(&self, message: &Self::Message) -> Result<Vec<PropertyBag>>;

    fn is_embedded_message(&self, attachment: &Self::Attachment) -> Result<bool>;

    /// Open an embedded message. Fails if the attachment is not one.
    fn as_message(&self, attachment: &Self::Attachment) -> Result<Self::Message>;

    fn message_properties(&self, message: &Self::Message) -> Result<PropertyBag>;

    fn attachment_properties(&self, attachment: &Self::Attachment) -> Result<PropertyBag>;

    /// Plain-text body bytes (empty when the message has none).
    fn body_text(&self, message: &Self::Message) -> Result<Vec<u8>>;

    /// HTML body bytes, if the message carries one.
    fn body_html(&self, message: &Self::Message) -> Result<Option<Vec<u8>>>;

    /// Raw attachment payload (empty when the attachment has none).
    fn content_bytes(&self, attachment: &Self::Attachment) -> Result<Vec<u8>>;
}

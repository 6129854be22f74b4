//! Snapshot decoder: a mailbox that has already been decoded and dumped as
//! JSON.
//!
//! ```text
//! { "root": Folder }
//! Folder     = { "name", "messages": [Message], "folders": [Folder] }
//! Message    = { "properties", "recipients": [{ "properties" }],
//!                "body"?, "body_html"?, "attachments": [Attachment] }
//! Attachment = { "properties", "data"? (base64), "text"?, "message"? }
//! ```
//!
//! Every collection is optional and defaults to empty.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PstError, Result};
use crate::model::property::PropertyBag;
use crate::source::MailboxSource;

/// Top level of a snapshot file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub root: Arc<SnapshotFolder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotFolder {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Arc<SnapshotMessage>>,
    #[serde(default)]
    pub folders: Vec<Arc<SnapshotFolder>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotMessage {
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub recipients: Vec<SnapshotRecipient>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Arc<SnapshotAttachment>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRecipient {
    #[serde(default)]
    pub properties: PropertyBag,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotAttachment {
    #[serde(default)]
    pub properties: PropertyBag,
    /// Base64 payload. Decoded only when the content is read.
    #[serde(default)]
    pub data: Option<String>,
    /// Plain-text payload, used when `data` is absent.
    #[serde(default)]
    pub text: Option<String>,
    /// Present when the attachment is an embedded message.
    #[serde(default)]
    pub message: Option<Arc<SnapshotMessage>>,
}

/// A [`MailboxSource`] over an in-memory snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotMailbox {
    snapshot: Snapshot,
}

impl SnapshotMailbox {
    /// Open and parse a snapshot file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PstError::MailboxNotFound(path.to_path_buf())
            } else {
                PstError::io(path, e)
            }
        })?;
        let snapshot: Snapshot =
            serde_json::from_slice(&data).map_err(|e| PstError::InvalidMailbox {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!(
            path = %path.display(),
            bytes = data.len(),
            "Opened mailbox snapshot"
        );
        Ok(Self { snapshot })
    }

    /// Parse a snapshot held in a string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).map_err(|e| PstError::InvalidMailbox {
            path: "<memory>".into(),
            reason: e.to_string(),
        })?;
        Ok(Self { snapshot })
    }

    /// Wrap an already-built folder tree.
    pub fn from_root(root: SnapshotFolder) -> Self {
        Self {
            snapshot: Snapshot {
                root: Arc::new(root),
            },
        }
    }
}

impl MailboxSource for SnapshotMailbox {
    type Folder = Arc<SnapshotFolder>;
    type Message = Arc<SnapshotMessage>;
    type Attachment = Arc<SnapshotAttachment>;

    fn root_folder(&self) -> Result<Self::Folder> {
        Ok(Arc::clone(&self.snapshot.root))
    }

    fn folder_name(&self, folder: &Self::Folder) -> Result<String> {
        Ok(folder.name.clone())
    }

    fn subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>> {
        Ok(folder.folders.clone())
    }

    fn messages(&self, folder: &Self::Folder) -> Result<Vec<Self::Message>> {
        Ok(folder.messages.clone())
    }

    fn attachments(&self, message: &Self::Message) -> Result<Vec<Self::Attachment>> {
        Ok(message.attachments.clone())
    }

    fn recipients(&self, message: &Self::Message) -> Result<Vec<PropertyBag>> {
        Ok(message
            .recipients
            .iter()
            .map(|r| r.properties.clone())
            .collect())
    }

    fn is_embedded_message(&self, attachment: &Self::Attachment) -> Result<bool> {
        Ok(attachment.message.is_some())
    }

    fn as_message(&self, attachment: &Self::Attachment) -> Result<Self::Message> {
        attachment
            .message
            .clone()
            .ok_or_else(|| PstError::decode("attachment is not an embedded message"))
    }

    fn message_properties(&self, message: &Self::Message) -> Result<PropertyBag> {
        Ok(message.properties.clone())
    }

    fn attachment_properties(&self, attachment: &Self::Attachment) -> Result<PropertyBag> {
        Ok(attachment.properties.clone())
    }

    fn body_text(&self, message: &Self::Message) -> Result<Vec<u8>> {
        Ok(message
            .body
            .as_deref()
            .map(|b| b.as_bytes().to_vec())
            .unwrap_or_default())
    }

    fn body_html(&self, message: &Self::Message) -> Result<Option<Vec<u8>>> {
        Ok(message.body_html.as_ref().map(|h| h.as_bytes().to_vec()))
    }

    fn content_bytes(&self, attachment: &Self::Attachment) -> Result<Vec<u8>> {
        if let Some(encoded) = &attachment.data {
            return base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| PstError::decode(format!("attachment content: {e}")));
        }
        Ok(attachment
            .text
            .as_deref()
            .map(|t| t.as_bytes().to_vec())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
        "root": {
            "name": "Top of Personal Folders",
            "folders": [{
                "name": "Inbox",
                "messages": [{
                    "properties": {"0x0037": {"type": "string", "value": "Outer"}},
                    "body": "outer body",
                    "attachments": [
                        {"message": {"properties": {"0x0037": {"type": "string", "value": "Inner"}}}},
                        {"properties": {"0x3707": {"type": "string", "value": "a.bin"}}, "data": "AAEC"}
                    ]
                }]
            }]
        }
    }"#;

    #[test]
    fn test_walks_snapshot() {
        let mb = SnapshotMailbox::from_json(NESTED).unwrap();
        let root = mb.root_folder().unwrap();
        assert_eq!(mb.folder_name(&root).unwrap(), "Top of Personal Folders");
        assert!(mb.messages(&root).unwrap().is_empty());

        let inbox = &mb.subfolders(&root).unwrap()[0];
        let msgs = mb.messages(inbox).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(mb.body_text(&msgs[0]).unwrap(), b"outer body");
        assert_eq!(mb.body_html(&msgs[0]).unwrap(), None);

        let atts = mb.attachments(&msgs[0]).unwrap();
        assert!(mb.is_embedded_message(&atts[0]).unwrap());
        let inner = mb.as_message(&atts[0]).unwrap();
        assert_eq!(
            mb.message_properties(&inner).unwrap().string(0x0037),
            Some("Inner")
        );
        assert!(!mb.is_embedded_message(&atts[1]).unwrap());
        assert!(mb.as_message(&atts[1]).is_err());
        assert_eq!(mb.content_bytes(&atts[1]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_json_is_invalid_mailbox() {
        let err = SnapshotMailbox::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PstError::InvalidMailbox { .. }));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let mb = SnapshotMailbox::from_json(
            r#"{"root": {"messages": [{"attachments": [{"data": "!!!"}]}]}}"#,
        )
        .unwrap();
        let root = mb.root_folder().unwrap();
        let msg = &mb.messages(&root).unwrap()[0];
        let att = &mb.attachments(msg).unwrap()[0];
        assert!(matches!(
            mb.content_bytes(att),
            Err(PstError::Decode(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = SnapshotMailbox::open("/nonexistent/nosuch.pst").unwrap_err();
        assert!(matches!(err, PstError::MailboxNotFound(_)));
    }
}

//! Binary PST decoder, backed by the `outlook-pst` crate.
//!
//! Folders come from each folder's hierarchy table, messages from its
//! contents table, in table row order. Both Unicode and ANSI stores are
//! supported; the Unicode layout is tried first.

use std::path::Path;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use outlook_pst::ltp::prop_context::PropertyValue as PstValue;
use outlook_pst::ltp::table_context::TableContext;
use outlook_pst::messaging::attachment::{
    AnsiAttachment, Attachment, AttachmentData, UnicodeAttachment,
};
use outlook_pst::messaging::folder::Folder;
use outlook_pst::messaging::message::{AnsiMessage, Message, UnicodeMessage};
use outlook_pst::messaging::store::{AnsiStore, EntryId, Store, UnicodeStore};
use outlook_pst::ndb::node_id::NodeId;
use outlook_pst::{AnsiPstFile, UnicodePstFile};
use tracing::{debug, warn};

use crate::error::{PstError, Result};
use crate::model::property::{PropertyBag, PropertyId, PropertyValue};
use crate::source::MailboxSource;

const PR_BODY: u16 = 0x1000;
const PR_HTML: u16 = 0x1013;
const PR_ATTACH_DATA_BIN: u16 = 0x3701;

/// Seconds between 1601-01-01 and the Unix epoch.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;

#[derive(Clone)]
enum PstStore {
    Unicode(Rc<UnicodeStore>),
    Ansi(Rc<AnsiStore>),
}

impl PstStore {
    fn store(&self) -> &dyn Store {
        match self {
            Self::Unicode(store) => &**store,
            Self::Ansi(store) => &**store,
        }
    }

    fn open_message(&self, entry_id: &EntryId) -> std::io::Result<PstMessage> {
        Ok(match self {
            Self::Unicode(store) => {
                PstMessage::Unicode(UnicodeMessage::read(store.clone(), entry_id, None)?)
            }
            Self::Ansi(store) => {
                PstMessage::Ansi(AnsiMessage::read(store.clone(), entry_id, None)?)
            }
        })
    }
}

/// A message handle.
///
/// Top-level messages keep their concrete type so their attachment table
/// can be opened. Embedded messages are only reachable as trait objects.
#[derive(Clone)]
pub enum PstMessage {
    Unicode(Rc<UnicodeMessage>),
    Ansi(Rc<AnsiMessage>),
    Embedded(Rc<dyn Message>),
}

impl PstMessage {
    fn message(&self) -> &dyn Message {
        match self {
            Self::Unicode(message) => &**message,
            Self::Ansi(message) => &**message,
            Self::Embedded(message) => &**message,
        }
    }
}

/// A [`MailboxSource`] over a PST file.
pub struct PstMailbox {
    store: PstStore,
}

impl PstMailbox {
    /// Open a PST file, Unicode layout first, then ANSI.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PstError::MailboxNotFound(path.to_path_buf()));
        }
        let invalid = |reason: String| PstError::InvalidMailbox {
            path: path.to_path_buf(),
            reason,
        };

        let store = match UnicodePstFile::open(path) {
            Ok(pst) => PstStore::Unicode(
                UnicodeStore::read(Rc::new(pst)).map_err(|e| invalid(e.to_string()))?,
            ),
            Err(unicode_err) => {
                let pst = AnsiPstFile::open(path)
                    .map_err(|e| invalid(format!("{unicode_err}; {e}")))?;
                PstStore::Ansi(
                    AnsiStore::read(Rc::new(pst)).map_err(|e| invalid(e.to_string()))?,
                )
            }
        };
        debug!(
            path = %path.display(),
            unicode = matches!(store, PstStore::Unicode(_)),
            "Opened PST store"
        );
        Ok(Self { store })
    }

    fn open_folder(&self, node: NodeId) -> Result<Rc<dyn Folder>> {
        let store = self.store.store();
        let entry_id = store
            .properties()
            .make_entry_id(node)
            .map_err(PstError::decode)?;
        store.open_folder(&entry_id).map_err(PstError::decode)
    }
}

impl MailboxSource for PstMailbox {
    type Folder = Rc<dyn Folder>;
    type Message = PstMessage;
    type Attachment = Rc<dyn Attachment>;

    fn root_folder(&self) -> Result<Self::Folder> {
        let store = self.store.store();
        let entry_id = store
            .properties()
            .ipm_sub_tree_entry_id()
            .map_err(PstError::decode)?;
        store.open_folder(&entry_id).map_err(PstError::decode)
    }

    fn folder_name(&self, folder: &Self::Folder) -> Result<String> {
        folder.properties().display_name().map_err(PstError::decode)
    }

    fn subfolders(&self, folder: &Self::Folder) -> Result<Vec<Self::Folder>> {
        let Some(table) = folder.hierarchy_table() else {
            return Ok(Vec::new());
        };
        table
            .rows_matrix()
            .map(|row| self.open_folder(NodeId::from(u32::from(row.id()))))
            .collect()
    }

    fn messages(&self, folder: &Self::Folder) -> Result<Vec<Self::Message>> {
        let Some(table) = folder.contents_table() else {
            return Ok(Vec::new());
        };
        let properties = self.store.store().properties();
        table
            .rows_matrix()
            .map(|row| {
                let node = NodeId::from(u32::from(row.id()));
                let entry_id = properties.make_entry_id(node).map_err(PstError::decode)?;
                self.store
                    .open_message(&entry_id)
                    .map_err(PstError::decode)
            })
            .collect()
    }

    fn attachments(&self, message: &Self::Message) -> Result<Vec<Self::Attachment>> {
        let Some(table) = message.message().attachment_table() else {
            return Ok(Vec::new());
        };
        let sub_nodes = table
            .rows_matrix()
            .map(|row| NodeId::from(u32::from(row.id())));

        match message {
            PstMessage::Unicode(message) => sub_nodes
                .map(|node| {
                    UnicodeAttachment::read(message.clone(), node, None)
                        .map(|a| a as Rc<dyn Attachment>)
                        .map_err(PstError::decode)
                })
                .collect(),
            PstMessage::Ansi(message) => sub_nodes
                .map(|node| {
                    AnsiAttachment::read(message.clone(), node, None)
                        .map(|a| a as Rc<dyn Attachment>)
                        .map_err(PstError::decode)
                })
                .collect(),
            PstMessage::Embedded(_) => {
                let skipped = sub_nodes.count();
                if skipped > 0 {
                    warn!(skipped, "Attachments of an embedded message cannot be opened");
                }
                Ok(Vec::new())
            }
        }
    }

    fn recipients(&self, message: &Self::Message) -> Result<Vec<PropertyBag>> {
        match message.message().recipient_table() {
            Some(table) => table_rows(&**table),
            None => Ok(Vec::new()),
        }
    }

    fn is_embedded_message(&self, attachment: &Self::Attachment) -> Result<bool> {
        Ok(matches!(attachment.data(), Some(AttachmentData::Message(_))))
    }

    fn as_message(&self, attachment: &Self::Attachment) -> Result<Self::Message> {
        match attachment.data() {
            Some(AttachmentData::Message(message)) => Ok(PstMessage::Embedded(message.clone())),
            _ => Err(PstError::decode("attachment is not an embedded message")),
        }
    }

    fn message_properties(&self, message: &Self::Message) -> Result<PropertyBag> {
        Ok(property_bag(message.message().properties().iter()))
    }

    fn attachment_properties(&self, attachment: &Self::Attachment) -> Result<PropertyBag> {
        Ok(property_bag(attachment.properties().iter()))
    }

    fn body_text(&self, message: &Self::Message) -> Result<Vec<u8>> {
        Ok(message
            .message()
            .properties()
            .get(PR_BODY)
            .and_then(raw_bytes)
            .unwrap_or_default())
    }

    fn body_html(&self, message: &Self::Message) -> Result<Option<Vec<u8>>> {
        Ok(message.message().properties().get(PR_HTML).and_then(raw_bytes))
    }

    fn content_bytes(&self, attachment: &Self::Attachment) -> Result<Vec<u8>> {
        if let Some(AttachmentData::Binary(data)) = attachment.data() {
            return Ok(data.buffer().to_vec());
        }
        Ok(attachment
            .properties()
            .get(PR_ATTACH_DATA_BIN)
            .and_then(raw_bytes)
            .unwrap_or_default())
    }
}

/// Read every row of a table into property bags.
fn table_rows(table: &dyn TableContext) -> Result<Vec<PropertyBag>> {
    let context = table.context();
    table
        .rows_matrix()
        .map(|row| {
            let values = row.columns(context).map_err(PstError::decode)?;
            let mut bag = PropertyBag::new();
            for (column, value) in context.columns().iter().zip(values) {
                let Some(value) = value else { continue };
                let value = table
                    .read_column(&value, column.prop_type())
                    .map_err(PstError::decode)?;
                if let Some(value) = convert_value(&value) {
                    bag.insert(column.prop_id(), value);
                }
            }
            Ok(bag)
        })
        .collect()
}

fn property_bag<'a>(properties: impl Iterator<Item = (&'a u16, &'a PstValue)>) -> PropertyBag {
    let mut bag = PropertyBag::new();
    for (id, value) in properties {
        match convert_value(value) {
            Some(value) => bag.insert(*id, value),
            None => debug!(id = %PropertyId(*id), "Skipping unsupported property"),
        }
    }
    bag
}

/// Map a decoded PST value onto the crate's property model.
///
/// GUID, object and most multi-valued kinds have no counterpart and are
/// dropped.
fn convert_value(value: &PstValue) -> Option<PropertyValue> {
    Some(match value {
        PstValue::Null => PropertyValue::Null,
        PstValue::Integer16(v) => PropertyValue::Short(*v),
        PstValue::Integer32(v) | PstValue::ErrorCode(v) => PropertyValue::Long(*v),
        PstValue::Integer64(v) | PstValue::Currency(v) => PropertyValue::LongLong(*v),
        PstValue::Floating32(v) => PropertyValue::Float(*v),
        PstValue::Floating64(v) | PstValue::FloatingTime(v) => PropertyValue::Double(*v),
        PstValue::Boolean(v) => PropertyValue::Boolean(*v),
        PstValue::String8(v) => PropertyValue::String(decode_string8(v.buffer())),
        PstValue::Unicode(v) => PropertyValue::String(decode_unicode(v.buffer())),
        PstValue::Time(v) => PropertyValue::Time(filetime_to_utc(*v)?),
        PstValue::Binary(v) => PropertyValue::Binary(v.buffer().to_vec()),
        PstValue::MultipleString8(values) => PropertyValue::MultiString(
            values.iter().map(|v| decode_string8(v.buffer())).collect(),
        ),
        PstValue::MultipleUnicode(values) => PropertyValue::MultiString(
            values.iter().map(|v| decode_unicode(v.buffer())).collect(),
        ),
        _ => return None,
    })
}

/// Body-style properties as raw bytes for the text exporter to decode.
///
/// 8-bit strings and binaries pass through untouched; UTF-16 strings are
/// re-encoded as UTF-8.
fn raw_bytes(value: &PstValue) -> Option<Vec<u8>> {
    match value {
        PstValue::String8(v) => Some(trim_nul(v.buffer()).to_vec()),
        PstValue::Unicode(v) => Some(decode_unicode(v.buffer()).into_bytes()),
        PstValue::Binary(v) => Some(v.buffer().to_vec()),
        _ => None,
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

fn decode_string8(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(trim_nul(bytes));
    text.into_owned()
}

fn decode_unicode(units: &[u16]) -> String {
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
    String::from_utf16_lossy(&units[..end])
}

/// Convert a FILETIME (100 ns ticks since 1601-01-01) to UTC.
fn filetime_to_utc(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(FILETIME_TICKS_PER_SECOND) - FILETIME_EPOCH_OFFSET;
    let nanos = (ticks.rem_euclid(FILETIME_TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_conversion() {
        // 2010-03-04T05:06:07Z
        let ticks = (1_267_679_167 + FILETIME_EPOCH_OFFSET) * FILETIME_TICKS_PER_SECOND;
        let time = filetime_to_utc(ticks).unwrap();
        assert_eq!(time.to_rfc3339(), "2010-03-04T05:06:07+00:00");
        assert_eq!(filetime_to_utc(0).unwrap().to_rfc3339(), "1601-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_string_decoding_trims_terminators() {
        assert_eq!(decode_string8(b"Caf\xe9\0"), "Café");
        let units: Vec<u16> = "Hi\0".encode_utf16().collect();
        assert_eq!(decode_unicode(&units), "Hi");
        assert_eq!(trim_nul(b"\0\0"), b"");
    }

    #[test]
    fn test_open_missing_file() {
        let err = PstMailbox::open("/nonexistent/nosuch.pst").err().unwrap();
        assert!(matches!(err, PstError::MailboxNotFound(_)));
    }

    #[test]
    fn test_open_garbage_is_invalid_mailbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pst");
        let mut data = b"!BDN".to_vec();
        data.resize(1024, 0xAB);
        std::fs::write(&path, data).unwrap();

        let err = PstMailbox::open(&path).err().unwrap();
        assert!(matches!(err, PstError::InvalidMailbox { .. }));
    }
}

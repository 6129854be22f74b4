//! Property mapping: typed property bags → EDRM tags.
//!
//! Only [`PropertyBag`] is consulted, never a decoder type, so any
//! [`MailboxSource`](crate::source::MailboxSource) can feed the mapper.
//! Absent properties produce no tag.

pub mod props;

use crate::error::{PstError, Result};
use crate::model::address::EmailAddress;
use crate::model::document::{format_date_time, Tag, TagDataType};
use crate::model::property::{PropertyBag, PropertyValue};

/// Name used in `#AttachmentNames` when an attachment has none.
pub const NO_NAME: &str = "(no name)";

/// Facts about a message that live outside its own property bag.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    /// One bag per recipient row, in table order.
    pub recipients: Vec<PropertyBag>,
    /// Display name of each attachment, in attachment order.
    pub attachment_names: Vec<String>,
}

/// Translates property bags into ordered tag lists.
#[derive(Debug, Clone)]
pub struct PropertyMapper {
    list_separator: String,
}

impl Default for PropertyMapper {
    fn default() -> Self {
        Self::new("; ")
    }
}

impl PropertyMapper {
    /// `list_separator` joins multi-valued fields (recipients, names).
    pub fn new(list_separator: impl Into<String>) -> Self {
        Self {
            list_separator: list_separator.into(),
        }
    }

    /// Tags for a message document, top-level or embedded.
    ///
    /// Fails only on a recipient row whose type is not To, CC or BCC.
    pub fn message_tags(&self, bag: &PropertyBag, ctx: &MessageContext) -> Result<Vec<Tag>> {
        let mut tags = Vec::new();

        if let Some(name) = bag.string(props::SENDER_NAME) {
            let email = bag
                .string(props::SENDER_SMTP_ADDRESS)
                .or_else(|| bag.string(props::SENDER_EMAIL_ADDRESS))
                .unwrap_or_default();
            tags.push(Tag::text("#From", EmailAddress::new(name, email).display()));
        }

        let mut to = Vec::new();
        let mut cc = Vec::new();
        let mut bcc = Vec::new();
        for recipient in &ctx.recipients {
            let address = recipient_address(recipient).display();
            match recipient.integer(props::RECIPIENT_TYPE).unwrap_or(props::MAPI_TO) {
                props::MAPI_TO => to.push(address),
                props::MAPI_CC => cc.push(address),
                props::MAPI_BCC => bcc.push(address),
                other => {
                    return Err(PstError::UnknownRecipientType(
                        i32::try_from(other).unwrap_or(i32::MAX),
                    ))
                }
            }
        }
        for (name, list) in [("#To", &to), ("#CC", &cc), ("#BCC", &bcc)] {
            if !list.is_empty() {
                tags.push(Tag::text(name, list.join(&self.list_separator)));
            }
        }

        if let Some(value) = bag.get(props::SUBJECT) {
            let mut tag = self.tag_from_value("#Subject", value);
            tag.value = strip_subject_prefix(&tag.value).to_string();
            tags.push(tag);
        }
        if let Some(value) = bag.get(props::TRANSPORT_MESSAGE_HEADERS) {
            tags.push(self.tag_from_value("#Header", value));
        }
        if let Some(value) = bag.get(props::CLIENT_SUBMIT_TIME) {
            tags.push(self.tag_from_value("#DateSent", value));
        }
        if let Some(value) = bag.get(props::MESSAGE_DELIVERY_TIME) {
            tags.push(self.tag_from_value("#DateReceived", value));
        }

        // A message without attachments and without properties has no tags.
        if !ctx.attachment_names.is_empty() {
            tags.push(Tag::boolean("#HasAttachments", true));
            tags.push(Tag::integer(
                "#AttachmentCount",
                ctx.attachment_names.len() as i64,
            ));
            tags.push(Tag::text(
                "#AttachmentNames",
                ctx.attachment_names.join(&self.list_separator),
            ));
        }

        if let Some(flags) = bag.integer(props::MESSAGE_FLAGS) {
            tags.push(Tag::boolean("#ReadFlag", flags & props::MSGFLAG_READ != 0));
        }
        if let Some(importance) = bag.integer(props::IMPORTANCE) {
            tags.push(Tag::boolean("#ImportanceFlag", importance > 1));
        }
        if let Some(value) = bag.get(props::MESSAGE_CLASS) {
            tags.push(self.tag_from_value("#MessageClass", value));
        }
        // Flag status is an enumeration code; it is exported as text.
        if let Some(status) = bag.integer(props::FLAG_STATUS) {
            tags.push(Tag::text("#FlagStatus", status.to_string()));
        }

        Ok(tags)
    }

    /// Tags for a native file attachment.
    pub fn file_tags(&self, bag: &PropertyBag) -> Vec<Tag> {
        let mut tags = Vec::new();
        if let Some(name) = attachment_file_name(bag) {
            tags.push(Tag::text("#FileName", name));
            if let Some(ext) = file_extension(name) {
                tags.push(Tag::text("#FileExtension", ext));
            }
        }
        tags
    }

    /// Build a tag whose data type follows the property's declared kind.
    ///
    /// Kinds without an EDRM equivalent degrade to `Text`.
    pub fn tag_from_value(&self, name: &str, value: &PropertyValue) -> Tag {
        match value {
            PropertyValue::Short(v) => Tag::integer(name, i64::from(*v)),
            PropertyValue::Long(v) => Tag::integer(name, i64::from(*v)),
            PropertyValue::LongLong(v) => Tag::long_integer(name, *v),
            PropertyValue::Float(v) => Tag::decimal(name, f64::from(*v)),
            PropertyValue::Double(v) => Tag::decimal(name, *v),
            PropertyValue::Boolean(v) => Tag::boolean(name, *v),
            PropertyValue::Time(t) => Tag::date_time(name, *t),
            other => Tag {
                name: name.to_string(),
                value: self.value_text(other),
                data_type: TagDataType::Text,
            },
        }
    }

    /// Best-effort text rendering of any property value.
    pub fn value_text(&self, value: &PropertyValue) -> String {
        match value {
            PropertyValue::Null => String::new(),
            PropertyValue::Short(v) => v.to_string(),
            PropertyValue::Long(v) => v.to_string(),
            PropertyValue::LongLong(v) => v.to_string(),
            PropertyValue::Float(v) => v.to_string(),
            PropertyValue::Double(v) => v.to_string(),
            PropertyValue::Boolean(v) => v.to_string(),
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Time(t) => format_date_time(*t),
            PropertyValue::Binary(bytes) => to_hex(bytes),
            PropertyValue::MultiString(items) => items.join(&self.list_separator),
        }
    }
}

/// Display name + SMTP address (or generic address) of a recipient row.
pub fn recipient_address(bag: &PropertyBag) -> EmailAddress {
    let name = bag.string(props::DISPLAY_NAME).unwrap_or_default();
    let email = bag
        .string(props::PRIMARY_SMTP_ADDRESS)
        .or_else(|| bag.string(props::EMAIL_ADDRESS))
        .unwrap_or_default();
    EmailAddress::new(name, email)
}

/// Long filename, then 8.3 filename, then display name.
pub fn attachment_file_name(bag: &PropertyBag) -> Option<&str> {
    [
        props::ATTACH_LONG_FILENAME,
        props::ATTACH_FILENAME,
        props::DISPLAY_NAME,
    ]
    .into_iter()
    .filter_map(|id| bag.string(id))
    .find(|name| !name.trim().is_empty())
}

/// The subject of a message, without the stored normalization prefix.
pub fn message_subject(bag: &PropertyBag) -> Option<&str> {
    bag.string(props::SUBJECT).map(strip_subject_prefix)
}

/// Text after the last `.` of a file name, if non-empty.
pub fn file_extension(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// PST subjects may start with `\u{1}` and a one-character prefix length.
fn strip_subject_prefix(subject: &str) -> &str {
    let mut chars = subject.chars();
    if chars.next() == Some('\u{1}') {
        chars.next();
        chars.as_str()
    } else {
        subject
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

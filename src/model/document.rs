//! Documents, tags, exported files and relationships of an EDRM batch.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Stable document identifier, rendered as `d` + 7 zero-padded digits.
///
/// Numbering starts at 1 and follows traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocId(u32);

impl DocId {
    /// Largest number that still fits the seven-digit rendering.
    pub const MAX_NUMBER: u32 = 9_999_999;

    /// Wrap a 1-based sequence number.
    pub fn new(number: u32) -> Self {
        debug_assert!(number > 0, "document numbers start at 1");
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Position of this document in the arena.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{:07}", self.0)
    }
}

/// What a document was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A top-level message or a message embedded as an attachment.
    Message,
    /// Any other attachment, exported verbatim.
    NativeFile,
}

impl DocumentKind {
    /// EDRM `DocType` attribute value.
    pub fn as_edrm(self) -> &'static str {
        match self {
            Self::Message => "Message",
            Self::NativeFile => "File",
        }
    }
}

/// EDRM `TagDataType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagDataType {
    Text,
    Integer,
    LongInteger,
    Decimal,
    Boolean,
    DateTime,
}

impl TagDataType {
    pub fn as_edrm(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Integer => "Integer",
            Self::LongInteger => "LongInteger",
            Self::Decimal => "Decimal",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
        }
    }
}

/// One named metadata field of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: String,
    pub data_type: TagDataType,
}

impl Tag {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            data_type: TagDataType::Text,
        }
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            data_type: TagDataType::Integer,
        }
    }

    pub fn long_integer(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            data_type: TagDataType::LongInteger,
        }
    }

    pub fn decimal(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            data_type: TagDataType::Decimal,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            data_type: TagDataType::Boolean,
        }
    }

    pub fn date_time(name: &str, value: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            value: format_date_time(value),
            data_type: TagDataType::DateTime,
        }
    }
}

/// RFC 3339, UTC, whole seconds: `2010-03-04T05:06:07Z`.
pub fn format_date_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// EDRM `FileType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// A synthesized rendering, such as a message body dump.
    Text,
    /// Verbatim attachment bytes.
    Native,
}

impl FileType {
    pub fn as_edrm(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Native => "Native",
        }
    }
}

/// A file written into the output directory for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_type: FileType,
    /// Name relative to the output directory.
    pub file_name: String,
    pub size_bytes: u64,
    /// Lowercase hex MD5, only for native files.
    pub content_hash: Option<String>,
}

/// One exported unit of the loadfile.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub kind: DocumentKind,
    pub tags: Vec<Tag>,
    pub files: Vec<ExportedFile>,
}

impl Document {
    pub fn new(id: DocId, kind: DocumentKind) -> Self {
        Self {
            id,
            kind,
            tags: Vec::new(),
            files: Vec::new(),
        }
    }

    /// First tag with the given name, scoped to this document.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

/// EDRM relationship types. Only attachment edges are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipType {
    Attachment,
}

impl RelationshipType {
    pub fn as_edrm(self) -> &'static str {
        match self {
            Self::Attachment => "Attachment",
        }
    }
}

/// A directed containment edge: `child` was attached to `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub parent: DocId,
    pub child: DocId,
    pub kind: RelationshipType,
}

impl Relationship {
    pub fn attachment(parent: DocId, child: DocId) -> Self {
        Self {
            parent,
            child,
            kind: RelationshipType::Attachment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_doc_id_format() {
        assert_eq!(DocId::new(1).to_string(), "d0000001");
        assert_eq!(DocId::new(42).to_string(), "d0000042");
        assert_eq!(DocId::new(9_999_999).to_string(), "d9999999");
        assert_eq!(DocId::new(3).index(), 2);
    }

    #[test]
    fn test_tag_constructors_format_values() {
        assert_eq!(Tag::boolean("#ReadFlag", true).value, "true");
        assert_eq!(Tag::integer("#AttachmentCount", 3).value, "3");
        assert_eq!(
            Tag::long_integer("#FileSize", 5_000_000_000).data_type,
            TagDataType::LongInteger
        );
        assert_eq!(Tag::decimal("#X", 1.5).value, "1.5");
        let t = Utc.with_ymd_and_hms(2010, 3, 4, 5, 6, 7).unwrap();
        let tag = Tag::date_time("#DateSent", t);
        assert_eq!(tag.value, "2010-03-04T05:06:07Z");
        assert_eq!(tag.data_type.as_edrm(), "DateTime");
    }

    #[test]
    fn test_document_tag_lookup_is_local() {
        let mut doc = Document::new(DocId::new(1), DocumentKind::Message);
        doc.tags.push(Tag::text("#Subject", "Hi"));
        assert_eq!(doc.tag("#Subject").map(|t| t.value.as_str()), Some("Hi"));
        assert!(doc.tag("#FileName").is_none());
        assert_eq!(doc.kind.as_edrm(), "Message");
        assert_eq!(DocumentKind::NativeFile.as_edrm(), "File");
    }
}

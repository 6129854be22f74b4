use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use tracing::info;

use crate::error::{PstError, Result};
use crate::model::document::{Document, ExportedFile, Relationship, Tag};

use super::LOADFILE_NAME;

/// Serialize documents and relationships, in the given order, to `out`.
pub fn write_loadfile<W: Write>(
    out: W,
    documents: &[Document],
    relationships: &[Relationship],
) -> Result<W> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("Root");
    root.push_attribute(attr("DataInterchangeType", "Update"));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Batch")))?;

    if documents.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("Documents")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("Documents")))?;
        for document in documents {
            write_document(&mut writer, document)?;
        }
        writer.write_event(Event::End(BytesEnd::new("Documents")))?;
    }

    if relationships.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("Relationships")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("Relationships")))?;
        for relationship in relationships {
            let mut el = BytesStart::new("Relationship");
            el.push_attribute(attr("Type", relationship.kind.as_edrm()));
            el.push_attribute(attr("ParentDocID", &relationship.parent.to_string()));
            el.push_attribute(attr("ChildDocID", &relationship.child.to_string()));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Batch")))?;
    writer.write_event(Event::End(BytesEnd::new("Root")))?;

    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    Ok(out)
}

/// Write the loadfile as `edrm-loadfile.xml` inside `output_dir`.
///
/// The file must not already exist. Returns its path.
pub fn write_loadfile_to_dir(
    output_dir: &Path,
    documents: &[Document],
    relationships: &[Relationship],
) -> Result<PathBuf> {
    let path = output_dir.join(LOADFILE_NAME);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| PstError::io(&path, e))?;

    let mut out = write_loadfile(BufWriter::new(file), documents, relationships)?;
    out.flush().map_err(|e| PstError::io(&path, e))?;

    info!(
        path = %path.display(),
        documents = documents.len(),
        relationships = relationships.len(),
        "Loadfile written"
    );
    Ok(path)
}

fn write_document<W: Write>(writer: &mut Writer<W>, document: &Document) -> Result<()> {
    let mut el = BytesStart::new("Document");
    el.push_attribute(attr("DocID", &document.id.to_string()));
    el.push_attribute(attr("DocType", document.kind.as_edrm()));
    writer.write_event(Event::Start(el))?;

    if document.tags.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("Tags")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("Tags")))?;
        for tag in &document.tags {
            writer.write_event(Event::Empty(tag_element(tag)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Tags")))?;
    }

    if document.files.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("Files")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("Files")))?;
        for file in &document.files {
            writer.write_event(Event::Empty(file_element(file)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Files")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    Ok(())
}

fn tag_element(tag: &Tag) -> BytesStart<'static> {
    let mut el = BytesStart::new("Tag");
    el.push_attribute(attr("TagName", &tag.name));
    el.push_attribute(attr("TagValue", &tag.value));
    el.push_attribute(attr("TagDataType", tag.data_type.as_edrm()));
    el
}

fn file_element(file: &ExportedFile) -> BytesStart<'static> {
    let mut el = BytesStart::new("File");
    el.push_attribute(attr("FileType", file.file_type.as_edrm()));
    el.push_attribute(attr("FileName", &file.file_name));
    el.push_attribute(attr("FileSize", &file.size_bytes.to_string()));
    if let Some(hash) = &file.content_hash {
        el.push_attribute(attr("Hash", hash));
    }
    el
}

/// An attribute whose value is escaped with [`escape_attribute`].
fn attr(name: &'static str, value: &str) -> Attribute<'static> {
    Attribute {
        key: QName(name.as_bytes()),
        value: Cow::Owned(escape_attribute(value).into_owned().into_bytes()),
    }
}

/// Escape a value for a double-quoted XML attribute.
///
/// Markup characters become entities; tab, CR and LF become character
/// references so they survive attribute-value normalization. Characters
/// XML 1.0 cannot carry at all are replaced with U+FFFD.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    let needs_escape = value
        .chars()
        .any(|c| matches!(c, '<' | '>' | '&' | '"' | '\'') || !is_plain_xml_char(c));
    if !needs_escape {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if is_plain_xml_char(c) => out.push(c),
            _ => out.push('\u{FFFD}'),
        }
    }
    Cow::Owned(out)
}

/// XML 1.0 `Char`, excluding whitespace controls.
fn is_plain_xml_char(c: char) -> bool {
    matches!(c,
        '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

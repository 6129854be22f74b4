//! Human-readable dump of a mailbox: folders, messages, recipients,
//! attachments and every raw property.
//!
//! ```text
//! Folder: Inbox
//!   Message: Here is a sample message
//!     To: Jane Doe <jane@example.com>
//!     Attachment: leah_thumper.jpg (4020 bytes)
//!     0x0037 (string): Here is a sample message
//! ```

use std::io::Write;

use crate::error::Result;
use crate::mapping::{self, props, PropertyMapper, NO_NAME};
use crate::model::property::PropertyBag;
use crate::source::MailboxSource;

const INDENT: usize = 2;

enum Item<S: MailboxSource> {
    Folder(S::Folder, usize),
    Message(S::Message, usize),
    Attachment(S::Attachment, usize),
    Properties(PropertyBag, usize),
}

/// Write the dump of `source` to `out`. Embedded messages are expanded in
/// place under their attachment line.
pub fn inspect<S: MailboxSource, W: Write>(source: &S, out: &mut W) -> Result<()> {
    let mapper = PropertyMapper::default();
    let mut stack: Vec<Item<S>> = vec![Item::Folder(source.root_folder()?, 0)];

    while let Some(item) = stack.pop() {
        match item {
            Item::Folder(folder, depth) => {
                let name = source.folder_name(&folder)?;
                writeln!(out, "{:pad$}Folder: {}", "", name, pad = depth * INDENT)?;
                let messages = source.messages(&folder)?;
                let subfolders = source.subfolders(&folder)?;
                stack.extend(
                    subfolders
                        .into_iter()
                        .rev()
                        .map(|f| Item::Folder(f, depth + 1)),
                );
                stack.extend(
                    messages
                        .into_iter()
                        .rev()
                        .map(|m| Item::Message(m, depth + 1)),
                );
            }
            Item::Message(message, depth) => {
                let pad = depth * INDENT;
                let bag = source.message_properties(&message)?;
                let subject = mapping::message_subject(&bag).unwrap_or_default();
                writeln!(out, "{:pad$}Message: {}", "", subject.escape_debug())?;

                for recipient in source.recipients(&message)? {
                    let label = match recipient.integer(props::RECIPIENT_TYPE) {
                        None | Some(props::MAPI_TO) => "To",
                        Some(props::MAPI_CC) => "CC",
                        Some(props::MAPI_BCC) => "BCC",
                        Some(_) => "Recipient",
                    };
                    let address = mapping::recipient_address(&recipient);
                    writeln!(out, "{:w$}{}: {}", "", label, address, w = pad + INDENT)?;
                }

                stack.push(Item::Properties(bag, depth + 1));
                stack.extend(
                    source
                        .attachments(&message)?
                        .into_iter()
                        .rev()
                        .map(|a| Item::Attachment(a, depth + 1)),
                );
            }
            Item::Attachment(attachment, depth) => {
                let bag = source.attachment_properties(&attachment)?;
                let embedded = source.is_embedded_message(&attachment)?;
                let name = mapping::attachment_file_name(&bag).unwrap_or(NO_NAME);
                let size = match bag.integer(props::ATTACH_SIZE) {
                    Some(size) => size.max(0) as u64,
                    None if embedded => 0,
                    None => source.content_bytes(&attachment)?.len() as u64,
                };
                write!(
                    out,
                    "{:pad$}Attachment: {} ({} bytes)",
                    "",
                    name,
                    size,
                    pad = depth * INDENT
                )?;
                if embedded {
                    writeln!(out, " SUBMESSAGE")?;
                    let message = source.as_message(&attachment)?;
                    stack.push(Item::Message(message, depth + 1));
                } else {
                    writeln!(out)?;
                }
            }
            Item::Properties(bag, depth) => {
                for (id, value) in bag.iter() {
                    writeln!(
                        out,
                        "{:pad$}{} ({}): {}",
                        "",
                        id,
                        value.kind_name(),
                        mapper.value_text(value).escape_debug(),
                        pad = depth * INDENT
                    )?;
                }
            }
        }
    }
    Ok(())
}

//! Depth-first construction of the document arena.
//!
//! Order: a folder's messages, then its subfolders; each message is
//! followed by its attachments, and an embedded message's own attachments
//! come before the next sibling attachment. A work stack replaces call
//! recursion so nesting depth is not bounded by the thread stack.

use tracing::{debug, info};

use crate::error::{PstError, Result};
use crate::mapping::{self, MessageContext, PropertyMapper, NO_NAME};
use crate::model::document::{DocId, Document, DocumentKind, Relationship};
use crate::source::MailboxSource;

use super::{DocumentTree, Origin};

/// Pending traversal step.
enum Work<S: MailboxSource> {
    Folder(S::Folder),
    Message(S::Message),
    Attachment { attachment: S::Attachment, parent: DocId },
}

/// Owns the ID counter and the arena for one traversal.
struct BuildSession<'a, S: MailboxSource> {
    source: &'a S,
    mapper: &'a PropertyMapper,
    next_number: u32,
    tree: DocumentTree<S::Message, S::Attachment>,
    stack: Vec<Work<S>>,
    progress: Option<&'a dyn Fn(u64)>,
}

/// Walk `source` and build the document arena and relationship list.
///
/// Any source error aborts the walk; nothing is skipped. `progress` receives
/// the number of documents created so far.
pub fn build_tree<S: MailboxSource>(
    source: &S,
    mapper: &PropertyMapper,
    progress: Option<&dyn Fn(u64)>,
) -> Result<DocumentTree<S::Message, S::Attachment>> {
    let mut session = BuildSession {
        source,
        mapper,
        next_number: 0,
        tree: DocumentTree::default(),
        stack: vec![Work::Folder(source.root_folder()?)],
        progress,
    };

    while let Some(work) = session.stack.pop() {
        match work {
            Work::Folder(folder) => session.visit_folder(folder)?,
            Work::Message(message) => {
                let id = session.allocate()?;
                session.add_message(id, message)?;
            }
            Work::Attachment { attachment, parent } => {
                session.visit_attachment(attachment, parent)?
            }
        }
    }

    info!(
        documents = session.tree.documents.len(),
        relationships = session.tree.relationships.len(),
        "Document tree built"
    );
    Ok(session.tree)
}

impl<S: MailboxSource> BuildSession<'_, S> {
    /// Next document ID. Fails once the seven-digit ID space is used up.
    fn allocate(&mut self) -> Result<DocId> {
        if self.next_number >= DocId::MAX_NUMBER {
            return Err(PstError::decode(format!(
                "mailbox holds more than {} documents",
                DocId::MAX_NUMBER
            )));
        }
        self.next_number += 1;
        Ok(DocId::new(self.next_number))
    }

    fn push_document(&mut self, document: Document, origin: Origin<S::Message, S::Attachment>) {
        debug_assert_eq!(document.id.index(), self.tree.documents.len());
        debug!(doc_id = %document.id, kind = document.kind.as_edrm(), "Document created");
        self.tree.documents.push(document);
        self.tree.origins.push(origin);
        if let Some(cb) = self.progress {
            cb(self.tree.documents.len() as u64);
        }
    }

    fn visit_folder(&mut self, folder: S::Folder) -> Result<()> {
        let messages = self.source.messages(&folder)?;
        let subfolders = self.source.subfolders(&folder)?;
        debug!(
            folder = %self.source.folder_name(&folder)?,
            messages = messages.len(),
            subfolders = subfolders.len(),
            "Visiting folder"
        );
        // Pushed in reverse so messages pop first, in container order.
        self.stack
            .extend(subfolders.into_iter().rev().map(Work::Folder));
        self.stack
            .extend(messages.into_iter().rev().map(Work::Message));
        Ok(())
    }

    fn visit_attachment(&mut self, attachment: S::Attachment, parent: DocId) -> Result<()> {
        let id = self.allocate()?;
        self.tree
            .relationships
            .push(Relationship::attachment(parent, id));

        if self.source.is_embedded_message(&attachment)? {
            let message = self.source.as_message(&attachment)?;
            return self.add_message(id, message);
        }

        let bag = self.source.attachment_properties(&attachment)?;
        let file_name = mapping::attachment_file_name(&bag).map(str::to_string);
        let mut document = Document::new(id, DocumentKind::NativeFile);
        document.tags = self.mapper.file_tags(&bag);
        self.push_document(
            document,
            Origin::Native {
                attachment,
                file_name,
            },
        );
        Ok(())
    }

    /// Create a message document under an already allocated `id` and queue
    /// its attachments.
    fn add_message(&mut self, id: DocId, message: S::Message) -> Result<()> {
        let bag = self.source.message_properties(&message)?;
        let attachments = self.source.attachments(&message)?;
        let ctx = MessageContext {
            recipients: self.source.recipients(&message)?,
            attachment_names: attachments
                .iter()
                .map(|a| self.attachment_name(a))
                .collect::<Result<_>>()?,
        };

        let mut document = Document::new(id, DocumentKind::Message);
        document.tags = self.mapper.message_tags(&bag, &ctx)?;
        self.push_document(document, Origin::Message(message));

        self.stack.extend(
            attachments
                .into_iter()
                .rev()
                .map(|attachment| Work::Attachment {
                    attachment,
                    parent: id,
                }),
        );
        Ok(())
    }

    /// Embedded subject, else file name, else a placeholder.
    fn attachment_name(&self, attachment: &S::Attachment) -> Result<String> {
        let name = if self.source.is_embedded_message(attachment)? {
            let message = self.source.as_message(attachment)?;
            let bag = self.source.message_properties(&message)?;
            mapping::message_subject(&bag).map(str::to_string)
        } else {
            let bag = self.source.attachment_properties(attachment)?;
            mapping::attachment_file_name(&bag).map(str::to_string)
        };
        Ok(name.unwrap_or_else(|| NO_NAME.to_string()))
    }
}

//! The document arena produced by a traversal.

pub mod builder;

pub use builder::build_tree;

use crate::model::document::{Document, Relationship};

/// Where a document's exportable content comes from.
#[derive(Debug, Clone)]
pub enum Origin<M, A> {
    /// Top-level or embedded message; exported as rendered text.
    Message(M),
    /// Terminal attachment; exported verbatim.
    Native {
        attachment: A,
        file_name: Option<String>,
    },
}

/// Documents in creation order plus every attachment edge.
///
/// `documents[i]` has number `i + 1`; `origins` runs parallel to it.
#[derive(Debug, Clone)]
pub struct DocumentTree<M, A> {
    pub documents: Vec<Document>,
    pub relationships: Vec<Relationship>,
    origins: Vec<Origin<M, A>>,
}

impl<M, A> Default for DocumentTree<M, A> {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            relationships: Vec::new(),
            origins: Vec::new(),
        }
    }
}

impl<M, A> DocumentTree<M, A> {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents paired with their origins, in creation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&mut Document, &Origin<M, A>)> {
        self.documents.iter_mut().zip(self.origins.iter())
    }
}

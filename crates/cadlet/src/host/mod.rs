//! Host-side state: the document model and the session that owns it.

pub mod document;

use crate::command::CommandError;
use document::Document;

/// Mutable host state owned by the executor thread.
///
/// Mirrors the host's notion of an "active document": commands operate on
/// whatever is open, and report a domain failure when nothing is.
pub struct HostSession {
    document: Option<Document>,
}

impl HostSession {
    pub fn new(document: Document) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn empty() -> Self {
        Self { document: None }
    }

    /// Open a document, returning the one it replaces.
    pub fn open(&mut self, document: Document) -> Option<Document> {
        self.document.replace(document)
    }

    pub fn close(&mut self) -> Option<Document> {
        self.document.take()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn require_document(&self) -> Result<&Document, CommandError> {
        self.document
            .as_ref()
            .ok_or_else(|| CommandError::failed("No active document found."))
    }

    pub fn require_document_mut(&mut self) -> Result<&mut Document, CommandError> {
        self.document
            .as_mut()
            .ok_or_else(|| CommandError::failed("No active document found."))
    }
}

//! In-memory shard for testing and small deployments.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::shard::reader::{FieldTerm, ShardReader, TermSnapshot};

/// Value of a document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Split into lower-cased words.
    Text(String),

    /// Indexed verbatim as a single term.
    Keyword(String),
}

/// A document to be indexed into a [`MemoryShard`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<(String, FieldValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an analyzed text field.
    pub fn add_text<F: Into<String>, T: Into<String>>(mut self, field: F, text: T) -> Self {
        self.fields
            .push((field.into(), FieldValue::Text(text.into())));
        self
    }

    /// Add a field indexed as one term.
    pub fn add_keyword<F: Into<String>, T: Into<String>>(mut self, field: F, value: T) -> Self {
        self.fields
            .push((field.into(), FieldValue::Keyword(value.into())));
        self
    }

    /// Distinct `(field, term)` pairs of this document in sorted order.
    fn terms(&self) -> Vec<FieldTerm> {
        let mut seen = AHashSet::new();
        for (field, value) in &self.fields {
            match value {
                FieldValue::Text(text) => {
                    for word in text.unicode_words() {
                        seen.insert(FieldTerm::new(field.as_str(), word.to_lowercase()));
                    }
                }
                FieldValue::Keyword(keyword) if !keyword.is_empty() => {
                    seen.insert(FieldTerm::new(field.as_str(), keyword.as_str()));
                }
                FieldValue::Keyword(_) => {}
            }
        }
        let mut terms: Vec<FieldTerm> = seen.into_iter().collect();
        terms.sort();
        terms
    }
}

type DocumentTerms = Arc<Vec<FieldTerm>>;

/// A shard whose documents live in memory.
///
/// Writers replace the document list copy-on-write, so every snapshot keeps
/// seeing the documents that existed when it was acquired.
#[derive(Debug, Default)]
pub struct MemoryShard {
    documents: RwLock<Arc<Vec<DocumentTerms>>>,
    open_snapshots: Arc<AtomicUsize>,
    /// Fault injection: scans fail after yielding this many pairs.
    read_failure_after: RwLock<Option<usize>>,
}

impl MemoryShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents<I: IntoIterator<Item = Document>>(documents: I) -> Self {
        let shard = Self::new();
        for document in documents {
            shard.add_document(&document);
        }
        shard
    }

    /// Index a document.
    pub fn add_document(&self, document: &Document) {
        let terms = Arc::new(document.terms());
        let mut documents = self.documents.write();
        Arc::make_mut(&mut documents).push(terms);
    }

    pub fn doc_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Number of snapshots acquired and not yet released.
    pub fn open_snapshots(&self) -> usize {
        self.open_snapshots.load(Ordering::SeqCst)
    }

    /// Make subsequent scans fail with an I/O error after `after_terms` pairs.
    pub fn inject_read_failure(&self, after_terms: usize) {
        *self.read_failure_after.write() = Some(after_terms);
    }

    pub fn clear_read_failure(&self) {
        *self.read_failure_after.write() = None;
    }
}

impl ShardReader for MemoryShard {
    fn acquire_snapshot(&self) -> Result<Box<dyn TermSnapshot>> {
        let documents = Arc::clone(&self.documents.read());
        self.open_snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySnapshot {
            documents,
            doc: 0,
            pos: 0,
            yielded: 0,
            fail_after: *self.read_failure_after.read(),
            open_snapshots: Arc::clone(&self.open_snapshots),
        }))
    }
}

struct MemorySnapshot {
    documents: Arc<Vec<DocumentTerms>>,
    doc: usize,
    pos: usize,
    yielded: usize,
    fail_after: Option<usize>,
    open_snapshots: Arc<AtomicUsize>,
}

impl TermSnapshot for MemorySnapshot {
    fn next_term(&mut self) -> Result<Option<FieldTerm>> {
        if self.fail_after.is_some_and(|limit| self.yielded >= limit) {
            return Err(io::Error::other("simulated read failure").into());
        }
        while let Some(terms) = self.documents.get(self.doc) {
            if let Some(term) = terms.get(self.pos) {
                self.pos += 1;
                self.yielded += 1;
                return Ok(Some(term.clone()));
            }
            self.doc += 1;
            self.pos = 0;
        }
        Ok(None)
    }
}

impl Drop for MemorySnapshot {
    fn drop(&mut self) {
        self.open_snapshots.fetch_sub(1, Ordering::SeqCst);
    }
}

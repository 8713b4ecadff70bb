use std::sync::Arc;

use crate::types::Document;

/// Read-only access to the user's document store.
pub trait CorpusProvider: Send + Sync {
    /// Documents that may be searched for the current request.
    fn eligible_documents(&self) -> Vec<Arc<Document>>;
    fn document(&self, id: &str) -> Option<Arc<Document>>;
}

/// Maps free text onto one of a fixed set of category labels.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Option<String>;
}

impl<T: CategoryClassifier + ?Sized> CategoryClassifier for Box<T> {
    fn classify(&self, text: &str) -> Option<String> {
        (**self).classify(text)
    }
}

impl<T: CorpusProvider + ?Sized> CorpusProvider for Arc<T> {
    fn eligible_documents(&self) -> Vec<Arc<Document>> {
        (**self).eligible_documents()
    }

    fn document(&self, id: &str) -> Option<Arc<Document>> {
        (**self).document(id)
    }
}

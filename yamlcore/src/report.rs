//! Outcome of saving many documents at once.

use crate::error::{Result, YamlCoreError};

/// A document that could not be saved.
#[derive(Debug)]
pub struct SaveFailure {
    /// Identifier of the document.
    pub id: String,
    /// Why the save failed.
    pub error: YamlCoreError,
}

/// Per-document results of [`Registry::save_all`](crate::Registry::save_all).
///
/// Every document is attempted; one failure does not stop the rest.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Identifiers saved successfully, in index order.
    pub saved: Vec<String>,
    /// Documents that failed, in index order.
    pub failures: Vec<SaveFailure>,
}

impl SaveReport {
    pub(crate) fn record(&mut self, id: &str, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.saved.push(id.to_string()),
            Err(error) => self.failures.push(SaveFailure {
                id: id.to_string(),
                error,
            }),
        }
    }

    /// True when no document failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Identifiers of the documents that failed.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }

    /// Convert into a `Result`, yielding the saved ids or a `SaveFailed` error.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.failures.is_empty() {
            Ok(self.saved)
        } else {
            Err(YamlCoreError::SaveFailed {
                failures: self.failures,
            })
        }
    }
}

//! Per-document outcomes of a batch run.

use std::fmt;

use crate::archive::ArchiveEntry;
use crate::core::{ErrorClass, FinalizedDocument, GendocError};
use crate::epc::EpcPayload;
use crate::export::ExportLine;

/// Pipeline step a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Compute,
    Qr,
    Export,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compute => "compute",
            Self::Qr => "qr",
            Self::Export => "export",
            Self::Archive => "archive",
        })
    }
}

/// A failure in one step of one document.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: GendocError,
}

/// Overall state of one document after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Every requested artifact was produced and the document is archived.
    Completed,
    /// Archived, but the QR payload could not be produced.
    Partial,
    /// Not archived: computation, export or persistence failed.
    Failed,
    /// Not started because the batch was cancelled.
    Skipped,
}

/// Everything produced for one document.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub finalized: Option<FinalizedDocument>,
    /// `None` when no payment account applies or the step failed.
    pub qr: Option<EpcPayload>,
    pub export_lines: Vec<ExportLine>,
    pub archive_entry: Option<ArchiveEntry>,
    pub errors: Vec<StageError>,
    pub skipped: bool,
}

impl DocumentOutcome {
    pub(crate) fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            finalized: None,
            qr: None,
            export_lines: Vec::new(),
            archive_entry: None,
            errors: Vec::new(),
            skipped: false,
        }
    }

    pub(crate) fn fail(&mut self, stage: Stage, error: GendocError) {
        tracing::error!(
            document = %self.document_id,
            %stage,
            error = %error,
            "document step failed"
        );
        self.errors.push(StageError { stage, error });
    }

    pub fn status(&self) -> DocumentStatus {
        if self.skipped {
            DocumentStatus::Skipped
        } else if self.archive_entry.is_none() {
            DocumentStatus::Failed
        } else if self.errors.is_empty() {
            DocumentStatus::Completed
        } else {
            DocumentStatus::Partial
        }
    }

    /// The failure of one step, if any.
    pub fn error(&self, stage: Stage) -> Option<&GendocError> {
        self.errors.iter().find(|e| e.stage == stage).map(|e| &e.error)
    }
}

/// Result of a batch run, one outcome per input document in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn count(&self, status: DocumentStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status() == status).count()
    }

    /// Whether every document completed without any failure.
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status() == DocumentStatus::Completed)
    }

    /// Ledger lines of every exported document, in document order.
    pub fn ledger(&self) -> Vec<ExportLine> {
        self.outcomes
            .iter()
            .flat_map(|o| o.export_lines.iter().cloned())
            .collect()
    }

    /// Archive entries appended by this run, in sequence order.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.outcomes.iter().filter_map(|o| o.archive_entry.as_ref())
    }

    /// Every failure as (document id, step, error).
    pub fn failures(&self) -> impl Iterator<Item = (&str, Stage, &GendocError)> {
        self.outcomes.iter().flat_map(|o| {
            o.errors
                .iter()
                .map(move |e| (o.document_id.as_str(), e.stage, &e.error))
        })
    }

    /// Whether any failure needs manual investigation.
    pub fn has_integrity_failure(&self) -> bool {
        self.failures()
            .any(|(_, _, e)| e.class() == ErrorClass::Integrity)
    }
}

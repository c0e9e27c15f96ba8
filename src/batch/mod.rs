//! Whole-file pipeline: normalize, compute, encode, export, archive.
//!
//! Computation, QR encoding and export run per document on rayon's pool
//! and share only the read-only [`BatchConfig`]. Archiving then happens on
//! the calling thread in document order, so archive sequence numbers follow
//! the source order.
//!
//! Failure handling follows [`ErrorClass`](crate::core::ErrorClass):
//! malformed source rows reject the whole batch, a configuration failure
//! stops one document, and a QR failure leaves the export and archive of
//! that document untouched.

mod report;

pub use report::*;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveStore, LegalArchive};
use crate::core::{DocumentKind, DocumentRecord, GendocError, RateTable, compute};
use crate::epc::{EpcOptions, PayerBankDetails, encode};
use crate::export::{DialectSpec, export};
use crate::normalize::{Normalizer, SourceRow};

/// Read-only configuration of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub rates: RateTable,
    pub dialect: DialectSpec,
    /// Payment account for QR payloads; no QR when absent.
    pub bank: Option<PayerBankDetails>,
    /// Per-document payment accounts (e.g. each employee's account for
    /// payslips), overriding `bank`.
    pub document_banks: BTreeMap<String, PayerBankDetails>,
    /// QR options for invoices.
    pub invoice_epc: EpcOptions,
    /// QR options for payslips.
    pub payslip_epc: EpcOptions,
    /// Verify the stored chain before appending.
    pub verify_archive: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            rates: RateTable::france_2024(),
            dialect: DialectSpec::fec(),
            bank: None,
            document_banks: BTreeMap::new(),
            invoice_epc: EpcOptions::default(),
            payslip_epc: EpcOptions::default().purpose("SALA"),
            verify_archive: true,
        }
    }
}

impl BatchConfig {
    fn bank_for(&self, document_id: &str) -> Option<&PayerBankDetails> {
        self.document_banks.get(document_id).or(self.bank.as_ref())
    }

    fn epc_for(&self, kind: DocumentKind) -> &EpcOptions {
        match kind {
            DocumentKind::Invoice => &self.invoice_epc,
            DocumentKind::Payslip => &self.payslip_epc,
        }
    }
}

/// Builder for [`BatchConfig`].
///
/// # Example
///
/// ```
/// use gendoc::batch::BatchConfigBuilder;
/// use gendoc::epc::PayerBankDetails;
/// use gendoc::export::DialectSpec;
///
/// let config = BatchConfigBuilder::new()
///     .dialect(DialectSpec::sage())
///     .bank(PayerBankDetails::new("Votre Entreprise", "FR7630006000011234567890189"))
///     .build();
/// assert_eq!(config.dialect.name, "sage");
/// ```
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rates(mut self, rates: RateTable) -> Self {
        self.config.rates = rates;
        self
    }

    pub fn dialect(mut self, dialect: DialectSpec) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Default payment account for QR payloads.
    pub fn bank(mut self, bank: PayerBankDetails) -> Self {
        self.config.bank = Some(bank);
        self
    }

    /// Payment account for one document.
    pub fn document_bank(mut self, document_id: impl Into<String>, bank: PayerBankDetails) -> Self {
        self.config.document_banks.insert(document_id.into(), bank);
        self
    }

    pub fn invoice_epc(mut self, options: EpcOptions) -> Self {
        self.config.invoice_epc = options;
        self
    }

    pub fn payslip_epc(mut self, options: EpcOptions) -> Self {
        self.config.payslip_epc = options;
        self
    }

    pub fn verify_archive(mut self, verify: bool) -> Self {
        self.config.verify_archive = verify;
        self
    }

    pub fn build(self) -> BatchConfig {
        self.config
    }
}

/// Cooperative cancellation, checked before each document starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Normalize a source and process every document in it.
///
/// Fails only when the rows themselves are unusable; everything after
/// normalization is reported per document.
pub fn process_rows<S: ArchiveStore>(
    normalizer: &mut Normalizer,
    rows: &[SourceRow],
    kind: DocumentKind,
    config: &BatchConfig,
    archive: &LegalArchive<S>,
    cancel: &CancellationToken,
) -> Result<BatchReport, GendocError> {
    let records = normalizer.normalize_batch(rows, kind)?;
    Ok(process(&records, config, archive, cancel))
}

/// Process already normalized records.
pub fn process<S: ArchiveStore>(
    records: &[DocumentRecord],
    config: &BatchConfig,
    archive: &LegalArchive<S>,
    cancel: &CancellationToken,
) -> BatchReport {
    let mut outcomes: Vec<DocumentOutcome> = records
        .par_iter()
        .map(|record| prepare(record, config, cancel))
        .collect();

    let chain_state = if config.verify_archive {
        archive.verify().err()
    } else {
        None
    };

    for outcome in outcomes.iter_mut() {
        if outcome.skipped {
            continue;
        }
        let Some(doc) = outcome.finalized.as_ref() else {
            continue;
        };
        if outcome.error(Stage::Export).is_some() {
            continue;
        }
        if let Some(GendocError::ChainBroken {
            sequence_number,
            reason,
        }) = &chain_state
        {
            let error = GendocError::ChainBroken {
                sequence_number: *sequence_number,
                reason: reason.clone(),
            };
            outcome.fail(Stage::Archive, error);
            continue;
        }
        match archive.append(doc) {
            Ok(entry) => outcome.archive_entry = Some(entry),
            Err(e) => outcome.fail(Stage::Archive, e),
        }
    }

    let report = BatchReport { outcomes };
    tracing::info!(
        documents = report.len(),
        completed = report.count(DocumentStatus::Completed),
        partial = report.count(DocumentStatus::Partial),
        failed = report.count(DocumentStatus::Failed),
        skipped = report.count(DocumentStatus::Skipped),
        "batch finished"
    );
    report
}

/// Compute, encode and export one document.
fn prepare(record: &DocumentRecord, config: &BatchConfig, cancel: &CancellationToken) -> DocumentOutcome {
    let mut outcome = DocumentOutcome::new(record.id());
    if cancel.is_cancelled() {
        outcome.skipped = true;
        return outcome;
    }

    let doc = match compute(record, &config.rates) {
        Ok(doc) => doc,
        Err(e) => {
            outcome.fail(Stage::Compute, e);
            return outcome;
        }
    };

    if let Some(bank) = config.bank_for(doc.id()) {
        match encode(&doc, bank, config.epc_for(doc.kind())) {
            Ok(payload) => outcome.qr = Some(payload),
            Err(e) => outcome.fail(Stage::Qr, e),
        }
    }

    match export(&doc, &config.dialect) {
        Ok(lines) => outcome.export_lines = lines,
        Err(e) => outcome.fail(Stage::Export, e),
    }

    outcome.finalized = Some(doc);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn document_bank_overrides_default() {
        let default = PayerBankDetails::new("Votre Entreprise", "FR7630006000011234567890189");
        let employee = PayerBankDetails::new("Alice Martin", "DE89370400440532013000");
        let config = BatchConfigBuilder::new()
            .bank(default.clone())
            .document_bank("PAI-2024-00001", employee.clone())
            .build();
        assert_eq!(config.bank_for("PAI-2024-00001"), Some(&employee));
        assert_eq!(config.bank_for("FAC-2024-00001"), Some(&default));
        assert_eq!(config.epc_for(DocumentKind::Payslip).purpose.as_deref(), Some("SALA"));
    }
}

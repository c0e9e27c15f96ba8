//! Read-only lookups over archived entries.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::chain::ArchiveEntry;
use crate::core::{DocumentKind, GendocError, PayPeriod};

/// First entry archived under a document id.
pub fn entry_by_id<'a>(entries: &'a [ArchiveEntry], document_id: &str) -> Option<&'a ArchiveEntry> {
    entries.iter().find(|e| e.document_id == document_id)
}

/// Entries of one document kind, in sequence order.
pub fn entries_by_kind(entries: &[ArchiveEntry], kind: DocumentKind) -> Vec<&ArchiveEntry> {
    entries.iter().filter(|e| e.document.kind() == kind).collect()
}

/// Entries whose accounting date falls in `period`: invoices by issue date,
/// payslips by pay period.
pub fn entries_by_period(entries: &[ArchiveEntry], period: PayPeriod) -> Vec<&ArchiveEntry> {
    entries
        .iter()
        .filter(|e| period.contains(e.document.record().document_date()))
        .collect()
}

/// Count and amounts of one document kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub count: usize,
    /// Sum of amounts due, per currency code.
    pub amount_due: BTreeMap<String, Decimal>,
}

/// Archive summary by document kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub by_kind: BTreeMap<DocumentKind, KindStats>,
    pub total_documents: usize,
}

impl ArchiveStats {
    pub fn kind(&self, kind: DocumentKind) -> Option<&KindStats> {
        self.by_kind.get(&kind)
    }
}

/// Summarize entries by kind.
///
/// Fails with [`GendocError::AmountOverflow`] when the amounts of one kind
/// and currency cannot be summed exactly.
pub fn archive_stats(entries: &[ArchiveEntry]) -> Result<ArchiveStats, GendocError> {
    let mut stats = ArchiveStats::default();
    for entry in entries {
        let doc = &entry.document;
        let kind = stats.by_kind.entry(doc.kind()).or_default();
        kind.count += 1;
        let total = kind
            .amount_due
            .entry(doc.currency_code().to_string())
            .or_insert(Decimal::ZERO);
        *total = total
            .checked_add(doc.amount_due())
            .ok_or_else(|| GendocError::AmountOverflow {
                document: entry.document_id.clone(),
                amount: format!("archived {} total", doc.kind().code()),
            })?;
        stats.total_documents += 1;
    }
    Ok(stats)
}

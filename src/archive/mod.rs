//! Hash-chained legal archive of finalized documents.
//!
//! Each [`ArchiveEntry`] stores a document snapshot, the SHA-256 of its
//! canonical serialization and the hash of the previous entry. Altering any
//! stored document breaks verification at that entry.
//!
//! ```
//! use gendoc::archive::*;
//! use gendoc::core::*;
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let invoice = InvoiceBuilder::new("FAC-2024-00001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
//!     .issuer(PartyBuilder::new("Votre Entreprise").build())
//!     .recipient(PartyBuilder::new("Client SA").build())
//!     .add_line(LineItemBuilder::new("Conseil", dec!(2), dec!(50)).build())
//!     .build()
//!     .unwrap();
//! let doc = compute(&invoice.into(), &RateTable::france_2024()).unwrap();
//!
//! let archive = LegalArchive::new(MemoryStore::new());
//! let entry = archive.append(&doc).unwrap();
//! assert_eq!(entry.sequence_number, 1);
//! assert_eq!(entry.previous_hash, GENESIS_HASH);
//! assert!(archive.verify().is_ok());
//! ```

mod canonical;
mod chain;
mod query;
mod store;

pub use canonical::*;
pub use chain::*;
pub use query::*;
pub use store::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::FairMutex;

use crate::core::{DocumentKind, FinalizedDocument, GendocError, PayPeriod};

/// Timestamp source for new entries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The archive: a store behind a FIFO-fair single-writer gate.
///
/// Appends read the chain head back from the store, link the new entry to
/// it and persist it while holding the gate, so sequence numbers never
/// repeat or skip.
pub struct LegalArchive<S: ArchiveStore> {
    store: FairMutex<S>,
    clock: Clock,
}

impl<S: ArchiveStore> LegalArchive<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: FairMutex::new(store),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the system clock, e.g. with a fixed instant in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Append a document. On a persistence failure nothing is appended.
    pub fn append(&self, doc: &FinalizedDocument) -> Result<ArchiveEntry, GendocError> {
        let mut store = self.store.lock();
        let head = store.last_entry()?;
        let (sequence_number, previous_hash) = match head {
            Some(last) => (last.sequence_number + 1, last.content_hash),
            None => (1, GENESIS_HASH.to_string()),
        };

        let entry = ArchiveEntry {
            sequence_number,
            document_id: doc.id().to_string(),
            content_hash: content_hash(doc),
            previous_hash,
            timestamp: (self.clock)(),
            document: doc.clone(),
        };
        store.persist(&entry)?;

        tracing::info!(
            sequence_number,
            document = %entry.document_id,
            hash = %entry.content_hash,
            "archived document"
        );
        Ok(entry)
    }

    /// The last appended entry.
    pub fn head(&self) -> Result<Option<ArchiveEntry>, GendocError> {
        self.store.lock().last_entry()
    }

    /// All entries in sequence order.
    pub fn entries(&self) -> Result<Vec<ArchiveEntry>, GendocError> {
        self.store.lock().load_all()
    }

    /// First entry archived under a document id.
    pub fn find(&self, document_id: &str) -> Result<Option<ArchiveEntry>, GendocError> {
        Ok(entry_by_id(&self.entries()?, document_id).cloned())
    }

    /// Entries of one kind, in sequence order.
    pub fn entries_of_kind(&self, kind: DocumentKind) -> Result<Vec<ArchiveEntry>, GendocError> {
        Ok(entries_by_kind(&self.entries()?, kind).into_iter().cloned().collect())
    }

    /// Entries dated within a month, in sequence order.
    pub fn entries_in_period(&self, period: PayPeriod) -> Result<Vec<ArchiveEntry>, GendocError> {
        Ok(entries_by_period(&self.entries()?, period).into_iter().cloned().collect())
    }

    pub fn stats(&self) -> Result<ArchiveStats, GendocError> {
        archive_stats(&self.entries()?)
    }

    /// Verify the whole stored chain.
    pub fn verify(&self) -> Result<(), GendocError> {
        let entries = self.entries()?;
        verify_chain(&entries)?;
        tracing::info!(entries = entries.len(), "archive chain verified");
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

impl<S: ArchiveStore> std::fmt::Debug for LegalArchive<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegalArchive").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::core::*;

    fn doc(n: u32) -> FinalizedDocument {
        let invoice = InvoiceBuilder::new(
            format!("FAC-2024-{n:05}"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .issuer(PartyBuilder::new("Votre Entreprise").build())
        .recipient(PartyBuilder::new("Client SA").build())
        .add_line(LineItemBuilder::new("Conseil", dec!(1), dec!(100)).build())
        .build()
        .unwrap();
        compute(&invoice.into(), &RateTable::france_2024()).unwrap()
    }

    fn archive() -> LegalArchive<MemoryStore> {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        LegalArchive::new(MemoryStore::new()).with_clock(move || at)
    }

    #[test]
    fn entries_link_to_each_other() {
        let archive = archive();
        let first = archive.append(&doc(1)).unwrap();
        let second = archive.append(&doc(2)).unwrap();
        assert_eq!(second.sequence_number, 2);
        assert_eq!(second.previous_hash, first.content_hash);
        assert_eq!(second.timestamp, first.timestamp);
        archive.verify().unwrap();
    }

    #[test]
    fn tampered_snapshot_fails_at_its_entry() {
        let archive = archive();
        for n in 1..=4 {
            archive.append(&doc(n)).unwrap();
        }
        let mut entries = archive.entries().unwrap();
        entries[2].document = doc(99);
        match verify_chain(&entries).unwrap_err() {
            GendocError::ChainBroken {
                sequence_number,
                reason,
            } => {
                assert_eq!(sequence_number, 3);
                assert!(matches!(reason, ChainBreak::ContentMismatch { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gaps_and_relinks_are_detected() {
        let archive = archive();
        for n in 1..=3 {
            archive.append(&doc(n)).unwrap();
        }
        let entries = archive.entries().unwrap();

        let mut gap = entries.clone();
        gap.remove(1);
        assert!(matches!(
            verify_chain(&gap),
            Err(GendocError::ChainBroken {
                sequence_number: 3,
                reason: ChainBreak::SequenceGap { expected: 2, found: 3 }
            })
        ));

        let mut relinked = entries.clone();
        relinked[1].previous_hash = GENESIS_HASH.into();
        assert!(!is_intact(&relinked));

        let mut renamed = entries;
        renamed[0].document_id = "FAC-2024-00042".into();
        assert!(matches!(
            verify_chain(&renamed),
            Err(GendocError::ChainBroken {
                reason: ChainBreak::DocumentIdMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn empty_chain_is_intact() {
        assert!(is_intact(&[]));
    }
}

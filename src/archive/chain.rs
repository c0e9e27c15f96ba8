//! Archive entries and chain verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::canonical::{GENESIS_HASH, content_hash};
use crate::core::{ChainBreak, FinalizedDocument, GendocError};

/// One immutable archive record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Position in the chain, starting at 1.
    pub sequence_number: u64,
    pub document_id: String,
    /// SHA-256 of the canonical serialization of `document`.
    pub content_hash: String,
    /// `content_hash` of the previous entry, or [`GENESIS_HASH`].
    pub previous_hash: String,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the archived document.
    pub document: FinalizedDocument,
}

/// Walk the chain from sequence 1 and stop at the first broken link.
///
/// Checks, per entry: sequence continuity, the stored hash against a
/// recomputed one, the document id against the snapshot, and the link to
/// the previous entry. Nothing is repaired.
pub fn verify_chain(entries: &[ArchiveEntry]) -> Result<(), GendocError> {
    let mut expected_sequence = 1u64;
    let mut previous = GENESIS_HASH.to_string();

    for entry in entries {
        if let Err(reason) = check_entry(entry, expected_sequence, &previous) {
            tracing::error!(
                sequence_number = entry.sequence_number,
                document = %entry.document_id,
                %reason,
                "archive chain broken"
            );
            return Err(GendocError::ChainBroken {
                sequence_number: entry.sequence_number,
                reason,
            });
        }
        previous.clone_from(&entry.content_hash);
        expected_sequence += 1;
    }
    Ok(())
}

/// Whether [`verify_chain`] succeeds.
pub fn is_intact(entries: &[ArchiveEntry]) -> bool {
    verify_chain(entries).is_ok()
}

fn check_entry(entry: &ArchiveEntry, expected_sequence: u64, previous: &str) -> Result<(), ChainBreak> {
    if entry.sequence_number != expected_sequence {
        return Err(ChainBreak::SequenceGap {
            expected: expected_sequence,
            found: entry.sequence_number,
        });
    }

    let computed = content_hash(&entry.document);
    if computed != entry.content_hash {
        return Err(ChainBreak::ContentMismatch {
            stored: entry.content_hash.clone(),
            computed,
        });
    }

    if entry.document.id() != entry.document_id {
        return Err(ChainBreak::DocumentIdMismatch {
            entry: entry.document_id.clone(),
            snapshot: entry.document.id().to_string(),
        });
    }

    if entry.previous_hash != previous {
        return Err(ChainBreak::LinkMismatch {
            expected: previous.to_string(),
            found: entry.previous_hash.clone(),
        });
    }
    Ok(())
}

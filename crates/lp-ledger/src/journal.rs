use serde::{Deserialize, Serialize};

use lp_types::{Address, AdminId, AdminKind, Amount, PledgeId, PluginId, Timestamp, TokenId};

use crate::error::{LedgerError, LedgerResult};

/// Why funds moved between two pledges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveReason {
    Transfer,
    Commit,
    Rollback,
    CancelPledge,
    Withdraw,
    CancelPayment,
}

/// A committed state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    AdminAdded {
        admin: AdminId,
        kind: AdminKind,
        controller: Address,
    },
    AdminUpdated {
        admin: AdminId,
    },
    PluginRegistered {
        plugin: PluginId,
        name: String,
    },
    ProjectCanceled {
        project: AdminId,
        by: Address,
    },
    Donated {
        giver: AdminId,
        root: PledgeId,
        token: TokenId,
        amount: Amount,
    },
    Moved {
        from: PledgeId,
        to: PledgeId,
        amount: Amount,
        reason: MoveReason,
    },
    PaymentRequested {
        pledge: PledgeId,
        amount: Amount,
        payee: Address,
    },
    PaymentConfirmed {
        pledge: PledgeId,
        amount: Amount,
    },
    PaymentCanceled {
        pledge: PledgeId,
        restored: PledgeId,
        amount: Amount,
    },
}

/// One link of the journal hash chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 1-based position in the journal.
    pub seq: u64,
    pub at: Timestamp,
    pub event: LedgerEvent,
    /// Hash of the previous entry; `None` for the first.
    pub prev_hash: Option<[u8; 32]>,
    pub hash: [u8; 32],
}

impl JournalEntry {
    /// Hex form of this entry's hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Append-only, hash-chained log of every committed ledger event.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Hash of the latest entry.
    pub fn head(&self) -> Option<[u8; 32]> {
        self.entries.last().map(|e| e.hash)
    }

    /// Append an event, linking it to the current head.
    pub fn append(&mut self, at: Timestamp, event: LedgerEvent) -> LedgerResult<&JournalEntry> {
        let seq = self.entries.len() as u64 + 1;
        let prev_hash = self.head();
        let hash = compute_hash(seq, at, &event, prev_hash)?;
        self.entries.push(JournalEntry {
            seq,
            at,
            event,
            prev_hash,
            hash,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Check sequence numbers, links, and hashes of every entry.
    pub fn verify(&self) -> LedgerResult<()> {
        verify_entries(&self.entries)
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<JournalEntry> {
        &mut self.entries
    }
}

/// Verify a journal exported from a ledger.
pub fn verify_entries(entries: &[JournalEntry]) -> LedgerResult<()> {
    let mut prev: Option<[u8; 32]> = None;
    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq != expected_seq {
            return Err(LedgerError::IntegrityViolation {
                seq: entry.seq,
                reason: format!("expected seq {expected_seq}, found {}", entry.seq),
            });
        }
        if entry.prev_hash != prev {
            return Err(LedgerError::IntegrityViolation {
                seq: entry.seq,
                reason: "previous hash link mismatch".into(),
            });
        }
        let computed = compute_hash(entry.seq, entry.at, &entry.event, entry.prev_hash)?;
        if computed != entry.hash {
            return Err(LedgerError::IntegrityViolation {
                seq: entry.seq,
                reason: "entry hash mismatch".into(),
            });
        }
        prev = Some(entry.hash);
    }
    Ok(())
}

fn compute_hash(
    seq: u64,
    at: Timestamp,
    event: &LedgerEvent,
    prev_hash: Option<[u8; 32]>,
) -> LedgerResult<[u8; 32]> {
    let payload = serde_json::to_vec(event).map_err(|e| LedgerError::IntegrityViolation {
        seq,
        reason: format!("event encoding failed: {e}"),
    })?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"lp-journal-v1:");
    if let Some(prev) = prev_hash {
        hasher.update(&prev);
    }
    hasher.update(&seq.to_le_bytes());
    hasher.update(&at.as_secs().to_le_bytes());
    hasher.update(&payload);
    Ok(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal(n: u64) -> Journal {
        let mut journal = Journal::new();
        for i in 1..=n {
            journal
                .append(
                    Timestamp::from_secs(i * 10),
                    LedgerEvent::Moved {
                        from: PledgeId(i),
                        to: PledgeId(i + 1),
                        amount: u128::from(i) * 1_000,
                        reason: MoveReason::Transfer,
                    },
                )
                .unwrap();
        }
        journal
    }

    #[test]
    fn entries_are_linked() {
        let j = journal(3);
        assert_eq!(j.len(), 3);
        assert_eq!(j.entries()[0].prev_hash, None);
        assert_eq!(j.entries()[1].prev_hash, Some(j.entries()[0].hash));
        assert_eq!(j.head(), Some(j.entries()[2].hash));
        assert_eq!(j.entries()[2].hash_hex().len(), 64);
        assert!(j.verify().is_ok());
    }

    #[test]
    fn empty_journal_verifies() {
        assert!(Journal::new().verify().is_ok());
    }

    #[test]
    fn tampered_event_is_detected() {
        let mut j = journal(3);
        if let LedgerEvent::Moved { amount, .. } = &mut j.entries_mut()[1].event {
            *amount = 999;
        }
        let err = j.verify().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::IntegrityViolation { seq: 2, reason } if reason == "entry hash mismatch"
        ));
    }

    #[test]
    fn broken_link_is_detected() {
        let mut j = journal(3);
        j.entries_mut()[2].prev_hash = Some([7; 32]);
        assert!(matches!(
            j.verify(),
            Err(LedgerError::IntegrityViolation { seq: 3, .. })
        ));
    }

    #[test]
    fn dropped_entry_is_detected() {
        let mut j = journal(3);
        j.entries_mut().remove(1);
        assert!(matches!(
            j.verify(),
            Err(LedgerError::IntegrityViolation { seq: 3, reason }) if reason.starts_with("expected seq 2")
        ));
    }
}

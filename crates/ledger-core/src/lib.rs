use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;
pub mod shared;

pub use chain::Ledger;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use shared::SharedLedger;

use constants::{GENESIS_CREATOR_ID, GENESIS_PARTY, GENESIS_PREV_HASH};

/// A ledger holding only the genesis block, at the default difficulty.
pub fn create_ledger() -> Ledger {
    Ledger::new()
}

/// Build a candidate on the current tip, mine it and append it.
pub fn mine_and_append(ledger: &mut Ledger, record: Record, creator_id: u64) -> Result<Block> {
    ledger.mine_and_append(record, creator_id)
}

pub fn validate(ledger: &Ledger) -> bool {
    ledger.is_valid()
}

pub fn set_difficulty(ledger: &mut Ledger, difficulty: usize) -> Result<()> {
    ledger.set_difficulty(difficulty)
}

/// One transfer of `amount` from `sender` to `receiver`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
}

impl Record {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Build a record from raw user input. Only the amount can fail to parse;
    /// any value `f64` accepts is kept, including zero and negatives.
    pub fn parse(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        raw_amount: &str,
    ) -> Result<Self> {
        let amount = raw_amount
            .trim()
            .parse::<f64>()
            .map_err(|_| LedgerError::MalformedAmount {
                raw: raw_amount.to_string(),
            })?;
        Ok(Self::new(sender, receiver, amount))
    }

    pub fn genesis() -> Self {
        Self::new(GENESIS_PARTY, GENESIS_PARTY, 0.0)
    }
}

/// The hashed text form. Strings are debug-escaped so that no two distinct
/// records render the same.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record(sender={:?}, receiver={:?}, amount={:?})",
            self.sender, self.receiver, self.amount
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub record: Record,
    pub creator_id: u64,
    pub prev_hash: String,
    pub timestamp: String,
    pub nonce: u64,
}

impl Block {
    /// An unmined block on top of `prev_hash`, stamped with the current UTC time.
    pub fn candidate(record: Record, creator_id: u64, prev_hash: impl Into<String>) -> Self {
        Self {
            record,
            creator_id,
            prev_hash: prev_hash.into(),
            timestamp: now_timestamp(),
            nonce: 0,
        }
    }

    pub fn genesis() -> Self {
        Self::candidate(Record::genesis(), GENESIS_CREATOR_ID, GENESIS_PREV_HASH)
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        Self { nonce, ..self }
    }

    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hasher state after absorbing every field that precedes the nonce.
/// Mining clones this once per attempt instead of re-rendering the record.
pub(crate) fn prefix_hasher(block: &Block) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(block.record.to_string().as_bytes());
    hasher.update(block.creator_id.to_string().as_bytes());
    hasher.update(block.timestamp.as_bytes());
    hasher.update(block.prev_hash.as_bytes());
    hasher
}

pub(crate) fn hash_with_nonce(prefix: &Sha256, nonce: u64) -> String {
    let mut hasher = prefix.clone();
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// SHA-256 over record, creator id, timestamp, prev hash and nonce, in that
/// order, as lowercase hex.
pub fn hash_block(block: &Block) -> String {
    hash_with_nonce(&prefix_hasher(block), block.nonce)
}

pub mod pow {
    use super::{hash_with_nonce, prefix_hasher, Block};
    use crate::error::{LedgerError, Result};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use tracing::info;

    /// Limits for a single mining run. The default is an unbounded,
    /// uncancellable search.
    #[derive(Clone, Debug, Default)]
    pub struct MineOptions {
        pub max_attempts: Option<u64>,
        pub cancel: Option<Arc<AtomicBool>>,
    }

    impl MineOptions {
        pub(crate) fn is_cancelled(&self) -> bool {
            self.cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
        }
    }

    pub fn leading_zero_nibbles(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
        leading_zero_nibbles(hash) >= difficulty
    }

    /// Mine the block by incrementing the nonce until its hash starts with
    /// `difficulty` hex zeros. Never gives up.
    pub fn mine_block(block: Block, difficulty: usize) -> Block {
        let prefix = prefix_hasher(&block);
        let mut nonce = block.nonce;
        loop {
            let hash = hash_with_nonce(&prefix, nonce);
            if meets_difficulty(&hash, difficulty) {
                info!(nonce, hash = %hash, "winning hash");
                return block.with_nonce(nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Same search as [`mine_block`], stopping early on the attempt cap or the
    /// cancel flag. A successful result is identical to `mine_block`'s.
    pub fn mine_block_with(block: Block, difficulty: usize, opts: &MineOptions) -> Result<Block> {
        let prefix = prefix_hasher(&block);
        let mut nonce = block.nonce;
        let mut attempts = 0u64;
        loop {
            if opts.is_cancelled() {
                return Err(LedgerError::MiningCancelled { attempts });
            }
            if opts.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(LedgerError::MiningExhausted { attempts });
            }
            let hash = hash_with_nonce(&prefix, nonce);
            attempts += 1;
            if meets_difficulty(&hash, difficulty) {
                info!(nonce, attempts, hash = %hash, "winning hash");
                return Ok(block.with_nonce(nonce));
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("malformed amount {raw:?}: expected a number")]
    MalformedAmount { raw: String },

    #[error("chain has no blocks")]
    EmptyChain,

    #[error("broken link at block {index}: expected prev_hash {expected}, found {found}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("difficulty {requested} is out of range (max {max})")]
    DifficultyOutOfRange { requested: usize, max: usize },

    #[error("no qualifying nonce found within {attempts} attempts")]
    MiningExhausted { attempts: u64 },

    #[error("mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;

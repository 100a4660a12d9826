use crate::{
    config::LedgerConfig,
    constants::MAX_DIFFICULTY,
    error::{LedgerError, Result},
    mine,
    pow::{self, MineOptions},
    Block, Record,
};
use serde::Serialize;
use std::sync::{atomic::AtomicBool, Arc};
use tracing::{debug, info, warn};

/// An in-memory chain of mined blocks plus the difficulty for the next one.
///
/// The chain always holds the genesis block at index 0. Blocks can be read
/// and, through [`Ledger::chain_mut`], edited in place, but the chain can only
/// grow through [`Ledger::add_block`].
#[derive(Clone, Debug, Serialize)]
pub struct Ledger {
    chain: Vec<Block>,
    difficulty: usize,
    #[serde(skip)]
    mine_opts: MineOptions,
    #[serde(skip)]
    parallel: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            difficulty: crate::constants::DEFAULT_DIFFICULTY,
            mine_opts: MineOptions::default(),
            parallel: false,
        }
    }

    pub fn with_config(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let mut ledger = Self::new();
        ledger.difficulty = config.difficulty;
        ledger.mine_opts.max_attempts = config.max_attempts;
        ledger.parallel = config.parallel;
        Ok(ledger)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Mutable view of the stored blocks. Edits here are not re-mined; they
    /// exist so callers can corrupt a chain and watch validation catch it.
    pub fn chain_mut(&mut self) -> &mut [Block] {
        &mut self.chain
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.chain.get(index)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn tip(&self) -> Result<&Block> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    pub fn tip_hash(&self) -> Result<String> {
        Ok(self.tip()?.hash())
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Takes effect on the next mined block; stored blocks are never re-mined.
    pub fn set_difficulty(&mut self, difficulty: usize) -> Result<()> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                requested: difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        debug!(from = self.difficulty, to = difficulty, "difficulty changed");
        self.difficulty = difficulty;
        Ok(())
    }

    pub fn set_max_attempts(&mut self, max_attempts: Option<u64>) {
        self.mine_opts.max_attempts = max_attempts;
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Install a flag that aborts any mining run once it is set to `true`.
    /// The flag stays set until the caller clears it.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.mine_opts.cancel = Some(flag);
    }

    /// A fresh unmined block on top of the current tip.
    pub fn candidate(&self, record: Record, creator_id: u64) -> Result<Block> {
        Ok(Block::candidate(record, creator_id, self.tip_hash()?))
    }

    pub fn proof_of_work(&self, candidate: Block) -> Result<Block> {
        let opts = &self.mine_opts;
        let unbounded = opts.max_attempts.is_none() && opts.cancel.is_none();
        match (self.parallel, unbounded) {
            (false, true) => Ok(pow::mine_block(candidate, self.difficulty)),
            (false, false) => pow::mine_block_with(candidate, self.difficulty, opts),
            (true, true) => Ok(mine::mine_block_parallel(candidate, self.difficulty)),
            (true, false) => mine::mine_block_parallel_with(candidate, self.difficulty, opts),
        }
    }

    /// Mine `candidate` at the current difficulty and append it. On a mining
    /// error the chain is left as it was.
    pub fn add_block(&mut self, candidate: Block) -> Result<&Block> {
        let block = self.proof_of_work(candidate)?;
        debug!(
            index = self.chain.len(),
            nonce = block.nonce,
            difficulty = self.difficulty,
            "block appended"
        );
        self.chain.push(block);
        self.tip()
    }

    pub fn mine_and_append(&mut self, record: Record, creator_id: u64) -> Result<Block> {
        let candidate = self.candidate(record, creator_id)?;
        self.add_block(candidate).cloned()
    }

    /// Walk the chain from genesis and stop at the first block whose
    /// `prev_hash` is not its predecessor's hash. Linkage only: stored blocks
    /// are not re-checked against any difficulty.
    pub fn validate(&self) -> Result<()> {
        let (genesis, rest) = self.chain.split_first().ok_or(LedgerError::EmptyChain)?;
        let mut expected = genesis.hash();
        for (offset, block) in rest.iter().enumerate() {
            if block.prev_hash != expected {
                return Err(LedgerError::BrokenLink {
                    index: offset + 1,
                    expected,
                    found: block.prev_hash.clone(),
                });
            }
            expected = block.hash();
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => {
                info!(blocks = self.chain.len(), "chain is valid");
                true
            }
            Err(e) => {
                warn!(error = %e, "chain is invalid");
                false
            }
        }
    }

    pub fn first_broken_link(&self) -> Option<usize> {
        match self.validate() {
            Err(LedgerError::BrokenLink { index, .. }) => Some(index),
            _ => None,
        }
    }
}

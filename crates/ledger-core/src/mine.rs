use crate::{
    error::{LedgerError, Result},
    hash_with_nonce, prefix_hasher,
    pow::{self, meets_difficulty, MineOptions},
    Block,
};
use rayon::prelude::*;
use sha2::Sha256;
use tracing::info;

/// Nonces are visited as `start + offset`, wrapping past `u64::MAX`, which is
/// the order the sequential miner walks them in.
fn nonce_at(start: u64, offset: u64) -> u64 {
    start.wrapping_add(offset)
}

fn qualifies(prefix: &Sha256, nonce: u64, difficulty: usize) -> bool {
    meets_difficulty(&hash_with_nonce(prefix, nonce), difficulty)
}

/// Mines a block by searching nonces in parallel, starting at the block's
/// current nonce. `find_first` keeps the result equal to the sequential
/// search: the lowest qualifying offset wins.
pub fn mine_block_parallel(block: Block, difficulty: usize) -> Block {
    let prefix = prefix_hasher(&block);
    let start = block.nonce;

    let found = (0..=u64::MAX)
        .into_par_iter()
        .find_first(|offset| qualifies(&prefix, nonce_at(start, *offset), difficulty));

    match found {
        Some(offset) => {
            let nonce = nonce_at(start, offset);
            info!(
                nonce,
                hash = %hash_with_nonce(&prefix, nonce),
                "winning hash (parallel)"
            );
            block.with_nonce(nonce)
        }
        // No nonce in the whole space qualifies; keep searching the way the
        // sequential miner does rather than return a block below target.
        None => pow::mine_block(block, difficulty),
    }
}

/// Parallel variant honoring `opts`. The attempt cap bounds how many nonces
/// are visited; a raised cancel flag stops every worker at its next attempt.
pub fn mine_block_parallel_with(
    block: Block,
    difficulty: usize,
    opts: &MineOptions,
) -> Result<Block> {
    if opts.is_cancelled() {
        return Err(LedgerError::MiningCancelled { attempts: 0 });
    }

    let prefix = prefix_hasher(&block);
    let start = block.nonce;
    let test = |offset: &u64| {
        opts.is_cancelled() || qualifies(&prefix, nonce_at(start, *offset), difficulty)
    };
    let found = match opts.max_attempts {
        Some(max) => (0..max).into_par_iter().find_first(test),
        None => (0..=u64::MAX).into_par_iter().find_first(test),
    };

    // A cancelled worker reports its offset as found; the re-check tells the
    // two cases apart.
    match found {
        Some(offset) => {
            let nonce = nonce_at(start, offset);
            let hash = hash_with_nonce(&prefix, nonce);
            if meets_difficulty(&hash, difficulty) {
                info!(nonce, hash = %hash, "winning hash (parallel)");
                Ok(block.with_nonce(nonce))
            } else {
                Err(LedgerError::MiningCancelled { attempts: offset })
            }
        }
        None => Err(LedgerError::MiningExhausted {
            attempts: opts.max_attempts.unwrap_or(u64::MAX),
        }),
    }
}

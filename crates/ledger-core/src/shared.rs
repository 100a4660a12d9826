use crate::{
    error::{LedgerError, Result},
    Block, Ledger, Record,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to one ledger. Every call, reads included, holds the
/// same exclusive lock, so validation never observes a half-applied append.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>> {
        self.inner.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        Ok(f(&mut *guard))
    }

    /// Mines while holding the lock: other callers wait until the block is
    /// appended.
    pub fn mine_and_append(&self, record: Record, creator_id: u64) -> Result<Block> {
        self.lock()?.mine_and_append(record, creator_id)
    }

    pub fn set_difficulty(&self, difficulty: usize) -> Result<()> {
        self.lock()?.set_difficulty(difficulty)
    }

    pub fn difficulty(&self) -> Result<usize> {
        Ok(self.lock()?.difficulty())
    }

    pub fn validate(&self) -> Result<()> {
        self.lock()?.validate()
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(self.lock()?.is_valid())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn tip(&self) -> Result<Block> {
        self.lock()?.tip().cloned()
    }

    pub fn snapshot(&self) -> Result<Vec<Block>> {
        Ok(self.lock()?.chain().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_one_chain() {
        let shared = SharedLedger::new(Ledger::new());
        shared.set_difficulty(1).unwrap();
        let other = shared.clone();
        other
            .mine_and_append(Record::new("A", "B", 1.0), 1)
            .unwrap();
        assert_eq!(shared.len().unwrap(), 2);
        assert_eq!(shared.tip().unwrap(), other.tip().unwrap());
    }

    #[test]
    fn concurrent_threads_keep_chain_valid() {
        let shared = SharedLedger::new(Ledger::new());
        shared.set_difficulty(1).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        let record = Record::new(format!("t{t}"), format!("r{i}"), i as f64);
                        shared.mine_and_append(record, t).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.len().unwrap(), 21);
        assert!(shared.is_valid().unwrap());
        assert!(shared.validate().is_ok());
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let shared = SharedLedger::new(Ledger::new());
        let clone = shared.clone();
        let _ = thread::spawn(move || {
            let _ = clone.with(|_| panic!("boom"));
        })
        .join();
        assert_eq!(shared.len(), Err(LedgerError::LockPoisoned));
    }

    #[test]
    fn snapshot_is_detached() {
        let shared = SharedLedger::new(Ledger::new());
        let mut snapshot = shared.snapshot().unwrap();
        snapshot[0].prev_hash = "x".into();
        assert!(shared.is_valid().unwrap());
        assert_eq!(shared.snapshot().unwrap()[0].prev_hash, "0");
    }
}

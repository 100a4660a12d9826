pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// A difficulty counts leading hex zeros, so it can never exceed the digest width.
pub const MAX_DIFFICULTY: usize = HASH_HEX_SIZE;
pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_CREATOR_ID: u64 = 42;
pub const GENESIS_PREV_HASH: &str = "0";
pub const GENESIS_CREATOR_ID: u64 = 0;
pub const GENESIS_PARTY: &str = "Genesis";

pub use kvring_proto::id::ID_BITS;

pub const FINGER_TABLE_SIZE: usize = ID_BITS;
pub const SUCCESSOR_LIST_LEN: usize = 3;
pub const DEFAULT_PORT: u16 = 3410;
pub const LOCALHOST: &str = "127.0.0.1";

// Intervals
pub const STABILIZE_INTERVAL_MS: u64 = 333;
pub const CHECK_PREDECESSOR_INTERVAL_MS: u64 = 333;
pub const FIX_FINGERS_INTERVAL_MS: u64 = 333;

// Budgets
pub const RPC_TIMEOUT_MS: u64 = 2000;
pub const MIGRATION_TIMEOUT_MS: u64 = 30_000;

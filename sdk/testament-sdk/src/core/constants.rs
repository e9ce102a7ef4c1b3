// Testament contract deployed on Sepolia
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5b329bBe9b59b53eF2c06E1403178303b72280D8";

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Display text for a field the contract has not configured.
pub const UNDEFINED_SENTINEL: &str = "Non défini";

/// EIP-1193 "user rejected request" provider error code.
pub const USER_REJECTED_CODE: i64 = 4001;

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

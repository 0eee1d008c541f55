#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Período nominal do tick da contagem regressiva local.
pub const DEFAULT_TICK_MS: u64 = 1_000;
/// Expiração usada quando o usuário não informa os segundos.
pub const DEFAULT_EXPIRE_SECS: u64 = 10;
pub const DEFAULT_RESYNC_SECS: u64 = 5;
pub const GENERIC_NETWORK_ERROR: &str = "erro de rede";

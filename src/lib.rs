pub mod config;
pub mod error;
pub mod key;
pub mod memo;
pub mod storage;

pub mod helpers;
pub mod logging;

pub mod cli;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use key::{CacheKey, FnId};
pub use memo::{
    call_memoized, global, memoize, try_call_memoized, CacheStats, Memoizable, Memoized,
    Memoizer, DEFAULT_TTL,
};

//! Holder-count proxy: scans on-chain token accounts for one mint, caches
//! the unique-holder count briefly, and serves it in the same envelope the
//! dashboard's primary source expects.

pub mod cache;
pub mod error;
pub mod routes;
pub mod scanner;
pub mod state;

pub use cache::{CachedCount, HolderCache, Lookup};
pub use error::ProxyError;
pub use routes::router;
pub use scanner::{count_holders, HolderScanner, HolderTally, RpcScanner};
pub use state::AppState;

//! Gas station core: prepares arbitrary Tron addresses to send a USDT
//! transfer at zero cost to the end user, by estimating the transfer's
//! ENERGY/BANDWIDTH, activating the address when needed, and delegating the
//! resources from a pool wallet under a scoped active permission.

pub mod activate;
pub mod config;
pub mod delegate;
pub mod metrics;
pub mod oracle;
pub mod poll;
pub mod rpc;
pub mod signer;
pub mod simulate;
pub mod station;
pub mod types;
pub mod verify;

pub use station::GasStation;

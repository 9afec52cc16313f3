pub mod address;
pub mod api;
pub mod resources;
pub mod trc20;
pub mod wallet;

pub use address::TronAddress;
pub use wallet::TronWallet;

/// 1 TRX in sun.
pub const SUN_PER_TRX: u64 = 1_000_000;

/// Converts whole TRX into sun, saturating on overflow.
pub fn trx_to_sun(trx: u64) -> u64 {
    trx.saturating_mul(SUN_PER_TRX)
}

/// Rounds a sun amount up to the next whole TRX, in sun.
pub fn ceil_sun_to_whole_trx(sun: u64) -> u64 {
    sun.div_ceil(SUN_PER_TRX).saturating_mul(SUN_PER_TRX)
}

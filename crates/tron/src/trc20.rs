//! Calldata for the two TRC20 entry points the gas station drives:
//! `transfer(address,uint256)` when simulating the user's USDT send, and
//! `balanceOf(address)` for pool introspection.

use crate::address::TronAddress;
use anyhow::{Context, Result};

/// `keccak256("transfer(address,uint256)")[..4]`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `keccak256("balanceOf(address)")[..4]`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

fn address_word(addr: TronAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    // The contract sees the EVM form: the 20 bytes behind the 0x41 prefix,
    // right-aligned in the word.
    word[12..].copy_from_slice(&addr.prefixed_bytes()[1..]);
    word
}

fn amount_word(amount: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&amount.to_be_bytes());
    word
}

/// `transfer(to, amount)` calldata. Amounts are USDT base units; u64 covers
/// the token's entire supply.
pub fn transfer_calldata(to: TronAddress, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&address_word(to));
    data.extend_from_slice(&amount_word(amount));
    data
}

/// `balanceOf(owner)` calldata.
pub fn balance_of_calldata(owner: TronAddress) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&address_word(owner));
    data
}

/// Reads the uint256 a constant `balanceOf` call returned. Nodes may hand
/// back fewer than 32 bytes; balances past u64 saturate.
pub fn balance_from_constant_result(hex_word: &str) -> Result<u64> {
    let bytes = hex::decode(hex_word).context("decode constant result")?;
    let mut word = [0u8; 32];
    if bytes.len() >= 32 {
        word.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        word[32 - bytes.len()..].copy_from_slice(&bytes);
    }

    if word[..24].iter().any(|b| *b != 0) {
        return Ok(u64::MAX);
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail))
}

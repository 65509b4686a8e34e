//! Extraction of the burned token amount from a buy-back receipt.

use {
    crate::contracts::TeamToken,
    alloy::{
        primitives::{Address, Log, U256, address},
        sol_types::SolEvent,
    },
};

/// Tokens sent here are gone for good.
pub const DEAD_ADDRESS: Address = address!("0x000000000000000000000000000000000000dEaD");

/// Raw value of the first `Transfer` of `token` to `sink` found in `logs`.
/// Logs of other contracts and logs that aren't transfers are skipped.
pub fn find_burn(logs: &[Log], token: Address, sink: Address) -> Option<U256> {
    logs.iter()
        .filter(|log| log.address == token)
        .filter_map(|log| TeamToken::Transfer::decode_log_data(&log.data).ok())
        .find(|transfer| transfer.to == sink)
        .map(|transfer| transfer.value)
}

/// Converts a raw token amount into whole tokens, rounding half up.
pub fn to_whole_units(value: U256, decimals: u8) -> U256 {
    let Some(unit) = U256::from(10).checked_pow(U256::from(decimals)) else {
        // No U256 value reaches half of a unit this large.
        return U256::ZERO;
    };
    let half = unit / U256::from(2);
    value.saturating_add(half) / unit
}

/// Whole tokens burned according to `logs`, zero if nothing was burned.
pub fn burned_quantity(logs: &[Log], token: Address, sink: Address, decimals: u8) -> U256 {
    find_burn(logs, token, sink)
        .map(|value| to_whole_units(value, decimals))
        .unwrap_or_default()
}

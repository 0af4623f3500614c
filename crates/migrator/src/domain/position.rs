//! Decoding of the packed position info word returned by the Uniswap V4
//! position manager, and the canonical pool key hash used to address pool
//! state on-chain.

use {
    crate::domain::eth::{H160, H256, U256},
    ethabi::Token,
    tiny_keccak::{Hasher, Keccak},
};

/// The five fields that identify a Uniswap V4 pool. Hashing them yields the
/// pool id the singleton contract keys its state by.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PoolKey {
    pub currency0: H160,
    pub currency1: H160,
    /// Swap fee in hundredths of a bip (`uint24` on-chain).
    pub fee: u32,
    /// Tick granularity of the pool (`int24` on-chain).
    pub tick_spacing: i32,
    pub hooks: H160,
}

/// The unpacked fields of the position manager's `uint256` position info.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PositionInfo {
    pub has_subscriber: u8,
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// The upper 25 bytes of the position's pool id.
    pub pool_id: U256,
}

const TICK_LOWER_OFFSET: usize = 8;
const TICK_UPPER_OFFSET: usize = 32;
const POOL_ID_OFFSET: usize = 56;

/// Unpacks a position info word. Total over every 256-bit input: a malformed
/// word simply decodes to nonsensical ticks, which is fine because the input
/// comes from a trusted contract read.
pub fn decode_position_info(info: U256) -> PositionInfo {
    PositionInfo {
        has_subscriber: (info.low_u32() & 0xff) as u8,
        tick_lower: decode_int24(info >> TICK_LOWER_OFFSET),
        tick_upper: decode_int24(info >> TICK_UPPER_OFFSET),
        pool_id: info >> POOL_ID_OFFSET,
    }
}

/// Recovers a signed 24-bit two's complement value from the low bits of a
/// word.
fn decode_int24(value: U256) -> i32 {
    let raw = i64::from(value.low_u32() & 0xff_ffff);
    let signed = if raw >= 0x80_0000 { raw - 0x100_0000 } else { raw };
    i32::try_from(signed).expect("24-bit two's complement fits an i32")
}

/// Computes a pool's id: the keccak-256 hash of the ABI encoding of its key,
/// `(address, address, uint24, int24, address)`. Matches the on-chain scheme
/// byte for byte, so the result can be used verbatim to address pool state.
pub fn pool_id_from_key(key: &PoolKey) -> H256 {
    keccak256(&abi_encode_key(key))
}

fn abi_encode_key(key: &PoolKey) -> Vec<u8> {
    ethabi::encode(&[
        Token::Address(key.currency0),
        Token::Address(key.currency1),
        Token::Uint(U256::from(key.fee)),
        Token::Int(int24_word(key.tick_spacing)),
        Token::Address(key.hooks),
    ])
}

/// Sign-extends an `int24` into the 256-bit two's complement word the ABI
/// encoding uses.
fn int24_word(value: i32) -> U256 {
    if value >= 0 {
        U256::from(value.unsigned_abs())
    } else {
        U256::MAX - U256::from(value.unsigned_abs() - 1)
    }
}

fn keccak256(bytes: &[u8]) -> H256 {
    let mut output = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    hasher.finalize(&mut output);
    H256(output)
}

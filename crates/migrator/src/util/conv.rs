//! Exact conversions between subgraph decimal strings and raw on-chain
//! integer amounts. Everything that feeds a transaction goes through here;
//! floating point never does.

use {
    bigdecimal::BigDecimal,
    ethereum_types::U256,
    num::{BigInt, BigUint, One, Zero},
};

/// Scales a base-10 decimal string by `10^decimals` into an exact integer
/// amount. Returns `None` when the input is malformed, negative, carries
/// more fractional digits than `decimals`, or overflows a `U256`.
pub fn decimal_to_scaled(amount: &str, decimals: u8) -> Option<U256> {
    let decimal: BigDecimal = amount.parse().ok()?;
    big_decimal_to_scaled(&decimal, decimals)
}

/// Same scaling for amounts that are already decoded into a [`BigDecimal`].
pub fn big_decimal_to_scaled(decimal: &BigDecimal, decimals: u8) -> Option<U256> {
    let scaled = decimal * BigDecimal::new(BigInt::one(), -i64::from(decimals));

    let (int, exp) = scaled.as_bigint_and_exponent();
    let uint = int.to_biguint()?;
    if exp > 0 {
        // A positive exponent after scaling means fractional digits remain;
        // they must divide out exactly or the amount is not representable.
        let factor = BigUint::from(10_u8).pow(u32::try_from(exp).ok()?);
        let remainder = uint.clone() % &factor;
        if !remainder.is_zero() {
            return None;
        }
        biguint_to_u256(&(uint / &factor))
    } else {
        let factor = BigUint::from(10_u8).pow(u32::try_from(exp.unsigned_abs()).ok()?);
        biguint_to_u256(&(uint * factor))
    }
}

pub fn biguint_to_u256(i: &BigUint) -> Option<U256> {
    let bytes = i.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(&bytes))
}

pub fn u256_to_biguint(i: &U256) -> BigUint {
    let mut bytes = [0_u8; 32];
    i.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

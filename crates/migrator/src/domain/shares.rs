//! Proportional accounting of a user's claim on a pool's underlying tokens.
//!
//! Two flavours exist on purpose: a floating-point one for display and an
//! exact big-integer one for constructing transaction amounts. The float
//! results must never cross the transaction boundary.

use {
    crate::{
        domain::eth::{H160, TokenAmount},
        util::conv,
    },
    bigdecimal::BigDecimal,
    num::{ToPrimitive, Zero},
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::collections::HashMap,
};

/// A user's claim in one pool.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolShare {
    pub id: String,
    /// LP token balance, decoded from the subgraph's base-10 decimal string.
    #[serde_as(as = "DisplayFromStr")]
    pub balance: BigDecimal,
    pub pool: Pool,
}

impl PoolShare {
    /// A balance of zero means the position is closed and must not be
    /// displayed.
    pub fn is_open(&self) -> bool {
        !self.balance.is_zero()
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub address: H160,
    /// Total LP supply. Nonzero for any pool that still has shares
    /// outstanding.
    #[serde_as(as = "DisplayFromStr")]
    pub total_shares: BigDecimal,
    pub tokens: Vec<PoolToken>,
}

/// A token inside a pool. `balance` is the pool's whole reserve of the
/// token, not the user's share of it.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    pub address: H160,
    pub symbol: String,
    pub decimals: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub balance: BigDecimal,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("total shares cannot be zero")]
    ZeroTotalShares,
    #[error("duplicate token symbol in pool: {0}")]
    DuplicateSymbol(String),
    #[error("malformed token balance: {0:?}")]
    InvalidBalance(String),
    #[error("share amount does not fit a uint256")]
    AmountOverflow,
}

/// Computes the user's proportional claim on every token in a pool, keyed by
/// token symbol: `(user_balance / total_shares) * token_pool_balance`.
///
/// A pool carrying two tokens with the same symbol is rejected rather than
/// silently collapsing entries. The result is for display only.
pub fn user_token_shares(
    user_balance: f64,
    total_shares: f64,
    tokens: &[PoolToken],
) -> Result<HashMap<String, f64>, Error> {
    if total_shares == 0.0 {
        return Err(Error::ZeroTotalShares);
    }

    let ratio = user_balance / total_shares;
    let mut shares = HashMap::with_capacity(tokens.len());
    for token in tokens {
        let balance = token
            .balance
            .to_f64()
            .ok_or_else(|| Error::InvalidBalance(token.balance.to_string()))?;
        if shares.insert(token.symbol.clone(), balance * ratio).is_some() {
            return Err(Error::DuplicateSymbol(token.symbol.clone()));
        }
    }
    Ok(shares)
}

/// Exact-integer counterpart of [`user_token_shares`] used at the transaction
/// boundary: `floor(user_raw * token_raw / total_raw)` per token, with every
/// decimal string scaled to raw units first and no floating point involved.
pub fn proportional_amounts(
    user_balance: &str,
    total_shares: &str,
    lp_decimals: u8,
    tokens: &[PoolToken],
) -> Result<Vec<TokenAmount>, Error> {
    let user = conv::decimal_to_scaled(user_balance, lp_decimals)
        .ok_or_else(|| Error::InvalidBalance(user_balance.to_string()))?;
    let total = conv::decimal_to_scaled(total_shares, lp_decimals)
        .ok_or_else(|| Error::InvalidBalance(total_shares.to_string()))?;
    if total.is_zero() {
        return Err(Error::ZeroTotalShares);
    }

    let user = conv::u256_to_biguint(&user);
    let total = conv::u256_to_biguint(&total);
    tokens
        .iter()
        .map(|token| {
            let reserve = conv::big_decimal_to_scaled(&token.balance, token.decimals)
                .ok_or_else(|| Error::InvalidBalance(token.balance.to_string()))?;
            let amount = user.clone() * conv::u256_to_biguint(&reserve) / total.clone();
            Ok(TokenAmount {
                token: token.address,
                amount: conv::biguint_to_u256(&amount).ok_or(Error::AmountOverflow)?,
            })
        })
        .collect()
}

/// Formats a token amount for display. One-way and lossy; precision scales
/// with magnitude the way the dashboard renders balances.
pub fn format_token_amount(amount: &str, decimals: u8) -> String {
    if amount.is_empty() || decimals == 0 {
        return "0".to_string();
    }
    let value: f64 = match amount.parse() {
        Ok(value) => value,
        Err(_) => return "0".to_string(),
    };
    if value == 0.0 {
        return "0".to_string();
    }
    if value < 0.001 {
        return "<0.001".to_string();
    }
    if value < 1. {
        return format!("{value:.4}");
    }
    if value < 1000. {
        return format!("{value:.2}");
    }
    group_thousands(value)
}

/// en-US style grouping with at most 2 fraction digits, trailing zeros
/// trimmed: `1500 -> "1,500"`, `1234567.891 -> "1,234,567.89"`.
fn group_thousands(value: f64) -> String {
    let rounded = format!("{value:.2}");
    let (integer, fraction) = match rounded.split_once('.') {
        Some((integer, fraction)) => (integer, fraction.trim_end_matches('0')),
        None => (rounded.as_str(), ""),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3 + 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        grouped
    } else {
        format!("{grouped}.{fraction}")
    }
}

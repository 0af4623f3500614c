//! Ethereum primitives shared across the domain.

pub use ethereum_types::{H160, H256, U256};

/// A transaction hash returned by the wallet after broadcasting.
///
/// Wallet backends report a failed broadcast as an all-zero hash, which is
/// why [`TxId::is_zero`] exists as a first-class check.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TxId(pub H256);

impl TxId {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// An exact raw token amount attached to the token it denominates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenAmount {
    pub token: H160,
    pub amount: U256,
}

/// Renders an address the way subgraphs index it: `0x`-prefixed, lower-case.
pub fn lowercase_address(address: &H160) -> String {
    format!("{address:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_render_lowercase() {
        let address = H160([0xAB; 20]);
        assert_eq!(
            lowercase_address(&address),
            "0xabababababababababababababababababababab"
        );
    }

    #[test]
    fn zero_tx_id() {
        assert!(TxId::default().is_zero());
        assert!(!TxId(H256::repeat_byte(1)).is_zero());
    }
}

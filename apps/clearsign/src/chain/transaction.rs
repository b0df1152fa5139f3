//! # Legacy Transactions
//!
//! EIP-155 replay-protected legacy transactions. The signing payload is
//! `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`; the signed
//! form replaces the last three items with `v = recid + 2 * chainId + 35`,
//! `r` and `s`.

use super::rlp::{encode_bytes, encode_list, encode_uint, trim_leading_zeros};
use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use sha3::{Digest, Keccak256};

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// 20-byte recipient.
    pub to: Vec<u8>,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            encode_uint(u128::from(self.nonce)),
            encode_uint(self.gas_price),
            encode_uint(u128::from(self.gas_limit)),
            encode_bytes(&self.to),
            encode_uint(self.value),
            encode_bytes(&self.data),
        ]
    }

    /// RLP payload that gets hashed and signed.
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.base_fields();
        fields.push(encode_uint(u128::from(self.chain_id)));
        fields.push(encode_uint(0));
        fields.push(encode_uint(0));
        encode_list(&fields)
    }

    /// Keccak-256 of [`Self::signing_payload`].
    #[must_use]
    pub fn signing_hash(&self) -> [u8; 32] {
        Keccak256::digest(self.signing_payload()).into()
    }

    fn signature(&self, key: &SigningKey) -> Result<(Signature, RecoveryId), k256::ecdsa::Error> {
        key.sign_prehash_recoverable(&self.signing_hash())
    }

    /// Sign with `key` and return the raw transaction bytes.
    pub fn sign(&self, key: &SigningKey) -> Result<Vec<u8>, k256::ecdsa::Error> {
        let (signature, recovery_id) = self.signature(key)?;
        let v = u128::from(recovery_id.to_byte()) + u128::from(self.chain_id) * 2 + 35;
        let rs = signature.to_bytes();
        let (r, s) = rs.split_at(32);

        let mut fields = self.base_fields();
        fields.push(encode_uint(v));
        fields.push(encode_bytes(trim_leading_zeros(r)));
        fields.push(encode_bytes(trim_leading_zeros(s)));
        Ok(encode_list(&fields))
    }
}

/// `0x` Keccak-256 hash of raw transaction bytes.
#[must_use]
pub fn transaction_hash(raw: &[u8]) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::VerifyingKey;

    /// The worked example of EIP-155.
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: vec![0x35; 20],
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
            chain_id: 1,
        }
    }

    #[test]
    fn signing_payload_matches_eip155_example() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn signature_recovers_signer() {
        let key = SigningKey::from_slice(&[0x46; 32]).expect("key");
        let tx = eip155_example();
        let (signature, recovery_id) = tx.signature(&key).expect("sign");
        let recovered =
            VerifyingKey::recover_from_prehash(&tx.signing_hash(), &signature, recovery_id)
                .expect("recover");
        assert_eq!(&recovered, key.verifying_key());
    }

    #[test]
    fn signed_transaction_is_an_rlp_list_with_eip155_v() {
        let key = SigningKey::from_slice(&[0x46; 32]).expect("key");
        let raw = eip155_example().sign(&key).expect("sign");
        // long list prefix
        assert_eq!(raw[0], 0xf8);
        assert_eq!(raw[1] as usize, raw.len() - 2);
        // v follows the empty data item (0x80)
        let data_pos = raw
            .windows(2)
            .position(|w| w == [0x80, 37] || w == [0x80, 38]);
        assert!(data_pos.is_some());
    }

    #[test]
    fn hash_is_prefixed_hex() {
        let hash = transaction_hash(&[0x01]);
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
    }
}

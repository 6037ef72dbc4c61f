//! Legacy (pre EIP-2718) Ethereum transactions with EIP-155 replay
//! protection.
//!
//! The transaction is built and RLP-encoded here while the signature comes
//! from a [`DigestSigner`], so the private key never has to be local.
//!
//! Signing process:
//! 1. RLP-encode `[nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0]`.
//! 2. Keccak-256 hash the encoding.
//! 3. Have the signer sign the hash.
//! 4. RLP-encode `[nonce, gas_price, gas_limit, to, value, data, v, r, s]`
//!    with `v = recovery_id + chain_id * 2 + 35`.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use thiserror::Error;

use crate::abi::{AbiError, FunctionAbi};
use crate::signing::{DigestSigner, RecoverableSignature, SignError};

#[derive(Debug, Error)]
pub enum TxError {
    #[error("calldata encoding failed: {0}")]
    Abi(#[from] AbiError),

    #[error("signing failed: {0}")]
    Signing(#[from] SignError),
}

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    /// Price per gas unit in wei.
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    /// Transfer value in wei.
    pub value: U256,
    /// Calldata (empty for plain Ether transfers).
    pub data: Bytes,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: LegacyTransaction,
    pub signature: RecoverableSignature,
    /// RLP encoding of the signed transaction.
    pub raw: Bytes,
    /// Keccak-256 of `raw`.
    pub hash: B256,
}

impl SignedTransaction {
    /// `0x`-prefixed hex of the raw transaction.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl LegacyTransaction {
    /// A plain Ether transfer.
    pub fn ether_transfer(
        chain_id: u64,
        nonce: u64,
        to: Address,
        value: U256,
        gas_price: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data: Bytes::new(),
        }
    }

    /// A call of `function` on `contract` with no Ether attached.
    pub fn contract_call(
        chain_id: u64,
        nonce: u64,
        contract: Address,
        function: &FunctionAbi,
        params: &[serde_json::Value],
        gas_price: U256,
        gas_limit: u64,
    ) -> Result<Self, TxError> {
        let data = function.encode_call(params)?;
        Ok(Self {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: contract,
            value: U256::ZERO,
            data: data.into(),
        })
    }

    /// RLP payload whose hash gets signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        let fields = UnsignedFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            chain_id: self.chain_id,
            empty_r: 0,
            empty_s: 0,
        };
        let mut out = Vec::with_capacity(fields.length());
        fields.encode(&mut out);
        out
    }

    /// Keccak-256 of [`signing_payload`](Self::signing_payload).
    pub fn signing_hash(&self) -> B256 {
        keccak256(self.signing_payload())
    }

    /// EIP-155 `v` for the given recovery id.
    pub fn eip155_v(&self, recovery_id: u8) -> U256 {
        U256::from(self.chain_id) * U256::from(2u8) + U256::from(35u8) + U256::from(recovery_id)
    }

    /// Attach a signature produced over [`signing_hash`](Self::signing_hash).
    pub fn into_signed(self, signature: RecoverableSignature) -> SignedTransaction {
        let fields = SignedFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            v: self.eip155_v(signature.recovery_id),
            r: signature.r,
            s: signature.s,
        };
        let mut raw = Vec::with_capacity(fields.length());
        fields.encode(&mut raw);
        let hash = keccak256(&raw);
        SignedTransaction {
            transaction: self,
            signature,
            raw: raw.into(),
            hash,
        }
    }

    /// Sign with `signer` and assemble the raw transaction.
    pub async fn sign_with<S>(self, signer: &S) -> Result<SignedTransaction, TxError>
    where
        S: DigestSigner + ?Sized,
    {
        let digest = self.signing_hash();
        tracing::debug!(%digest, nonce = self.nonce, chain_id = self.chain_id, "Signing transaction");
        let signature = signer.sign_digest(digest).await?;
        Ok(self.into_signed(signature))
    }
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedFields {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable)]
struct SignedFields {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    v: U256,
    r: U256,
    s: U256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // Example transaction from the EIP-155 specification.
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction::ether_transfer(
            1,
            9,
            "0x3535353535353535353535353535353535353535".parse().unwrap(),
            U256::from(1_000_000_000_000_000_000u128),
            U256::from(20_000_000_000u64),
            21_000,
        )
    }

    fn eip155_signature() -> RecoverableSignature {
        RecoverableSignature::from_hex_parts(
            "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
            "67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83",
            0,
        )
        .unwrap()
    }

    struct FixedSigner {
        signature: RecoverableSignature,
        seen: Mutex<Vec<B256>>,
    }

    #[async_trait]
    impl DigestSigner for FixedSigner {
        async fn sign_digest(&self, digest: B256) -> Result<RecoverableSignature, SignError> {
            self.seen.lock().unwrap().push(digest);
            Ok(self.signature)
        }
    }

    struct RefusingSigner;

    #[async_trait]
    impl DigestSigner for RefusingSigner {
        async fn sign_digest(&self, _digest: B256) -> Result<RecoverableSignature, SignError> {
            Err(SignError::InvalidSignature("wallet locked".into()))
        }
    }

    #[test]
    fn test_eip155_signing_payload() {
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
    fn test_eip155_v() {
        let tx = eip155_example();
        assert_eq!(tx.eip155_v(0), U256::from(37u8));
        assert_eq!(tx.eip155_v(1), U256::from(38u8));
    }

    #[test]
    fn test_eip155_signed_encoding() {
        let signed = eip155_example().into_signed(eip155_signature());
        assert_eq!(
            signed.raw_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[tokio::test]
    async fn test_sign_with_uses_signing_hash() {
        let signer = FixedSigner {
            signature: eip155_signature(),
            seen: Mutex::new(Vec::new()),
        };
        let tx = eip155_example();
        let expected_digest = tx.signing_hash();

        let signed = tx.clone().sign_with(&signer).await.unwrap();

        assert_eq!(*signer.seen.lock().unwrap(), vec![expected_digest]);
        assert_eq!(signed, tx.into_signed(eip155_signature()));
    }

    #[tokio::test]
    async fn test_signer_failure_is_reported() {
        let err = eip155_example().sign_with(&RefusingSigner).await.unwrap_err();
        assert!(matches!(err, TxError::Signing(SignError::InvalidSignature(_))));
    }

    #[test]
    fn test_contract_call_carries_calldata() {
        let abi = FunctionAbi::from_json(&serde_json::json!({
            "name": "transfer",
            "inputs": [{"name": "_to", "type": "address"}, {"name": "_value", "type": "uint256"}],
            "type": "function"
        }))
        .unwrap();
        let tx = LegacyTransaction::contract_call(
            3,
            0,
            "0x123456789abcdef0123456789abcdef012345678".parse().unwrap(),
            &abi,
            &[
                serde_json::json!("0x23456789abcdef0123456789abcdef0123456789"),
                serde_json::json!("1"),
            ],
            U256::from(3_500_000_000u64),
            60_000,
        )
        .unwrap();
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.data.len(), 4 + 64);
        assert_eq!(&tx.data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }
}

//! Ed25519 wallets backed by Solana keypairs.
//!
//! A wallet is restored either from a base58-encoded 64-byte secret key or
//! from a BIP-39 seed phrase via the standard Solana path `m/44'/501'/0'/0'`.

use crate::credentials::Credential;
use crate::error::{OdysseyError, OdysseyResult};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use bip39::Mnemonic;
use solana_sdk::derivation_path::DerivationPath;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::signer::keypair::keypair_from_seed_and_derivation_path;

/// A reward-program wallet.
pub struct Wallet {
    keypair: Keypair,
    address: String,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    fn from_keypair(keypair: Keypair) -> Self {
        let address = keypair.pubkey().to_string();
        Self { keypair, address }
    }

    /// Generate a new random wallet.
    pub fn generate() -> Self {
        Self::from_keypair(Keypair::new())
    }

    /// Restore from a base58-encoded 64-byte secret key.
    pub fn from_private_key_base58(encoded: &str) -> OdysseyResult<Self> {
        let mut bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| OdysseyError::InvalidCredential(format!("bad base58 key: {e}")))?;
        if bytes.len() != 64 {
            let len = bytes.len();
            bytes.fill(0);
            return Err(OdysseyError::InvalidCredential(format!(
                "Expected 64-byte secret key, got {len}"
            )));
        }
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| OdysseyError::InvalidCredential(e.to_string()));
        bytes.fill(0);
        Ok(Self::from_keypair(keypair?))
    }

    /// Restore from a BIP-39 mnemonic (no passphrase), first account.
    pub fn from_seed_phrase(phrase: &str) -> OdysseyResult<Self> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let mnemonic = Mnemonic::parse(&normalized)
            .map_err(|e| OdysseyError::InvalidCredential(format!("bad seed phrase: {e}")))?;
        let seed = mnemonic.to_seed("");
        let path = DerivationPath::new_bip44(Some(0), Some(0));
        let keypair = keypair_from_seed_and_derivation_path(&seed, Some(path))
            .map_err(|e| OdysseyError::Crypto(format!("key derivation failed: {e}")))?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_credential(credential: &Credential) -> OdysseyResult<Self> {
        match credential {
            Credential::PrivateKey(key) => Self::from_private_key_base58(key),
            Credential::SeedPhrase(phrase) => Self::from_seed_phrase(phrase),
        }
    }

    /// Base58 wallet address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Base64 of the raw 32 public key bytes.
    pub fn public_key_base64(&self) -> String {
        B64.encode(self.keypair.pubkey().to_bytes())
    }

    /// Base58 of the 64-byte secret key. Handle with care.
    pub fn private_key_base58(&self) -> String {
        self.keypair.to_base58_string()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Detached Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }

    /// Detached signature over `message`, base64-encoded.
    pub fn sign_base64(&self, message: &[u8]) -> String {
        B64.encode(self.sign(message).as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_wallet_generate() {
        let w = Wallet::generate();
        assert!(w.address().len() >= 32 && w.address().len() <= 44);
        assert_eq!(B64.decode(w.public_key_base64()).unwrap().len(), 32);
    }

    #[test]
    fn test_private_key_roundtrip() {
        let w1 = Wallet::generate();
        let w2 = Wallet::from_private_key_base58(&w1.private_key_base58()).unwrap();
        assert_eq!(w1.address(), w2.address());
        assert_eq!(w1.public_key_base64(), w2.public_key_base64());
    }

    #[test]
    fn test_private_key_derivation_is_stable() {
        let encoded = Wallet::generate().private_key_base58();
        let first = Wallet::from_private_key_base58(&encoded).unwrap().pubkey();
        for _ in 0..5 {
            assert_eq!(Wallet::from_private_key_base58(&encoded).unwrap().pubkey(), first);
        }
    }

    #[test]
    fn test_seed_phrase_is_deterministic() {
        let a = Wallet::from_seed_phrase(PHRASE).unwrap();
        let b = Wallet::from_seed_phrase(&format!("  {}  ", PHRASE.replace(' ', "   "))).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            Wallet::from_private_key_base58("0OIl"),
            Err(OdysseyError::InvalidCredential(_))
        ));
        assert!(matches!(
            Wallet::from_private_key_base58("3yZe7d"),
            Err(OdysseyError::InvalidCredential(_))
        ));
        assert!(Wallet::from_seed_phrase("not a real mnemonic").is_err());
    }

    #[test]
    fn test_signature_verifies() {
        let w = Wallet::generate();
        let sig = w.sign(b"odyssey challenge");
        assert!(sig.verify(w.pubkey().as_ref(), b"odyssey challenge"));
        assert_eq!(B64.decode(w.sign_base64(b"x")).unwrap().len(), 64);
    }
}

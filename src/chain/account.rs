//! Ed25519 accounts and Algorand address encoding.

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha512_256};

use crate::error::ViewerError;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const CHECKSUM_LEN: usize = 4;
pub const ADDRESS_LEN: usize = 58;

/// Capability to sign bytes on behalf of an address.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> &str;

    async fn sign(&self, data: &[u8]) -> Result<[u8; 64], ViewerError>;
}

/// A locally held Ed25519 key.
pub struct Account {
    key: SigningKey,
    address: String,
}

impl Account {
    /// Fresh random account. Nothing is persisted.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = encode_address(&key.verifying_key().to_bytes());
        Self { key, address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Signs with a key held in process memory.
#[derive(Debug)]
pub struct LocalSigner {
    account: Account,
}

impl LocalSigner {
    pub fn new(account: Account) -> Self {
        Self { account }
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> &str {
        self.account.address()
    }

    async fn sign(&self, data: &[u8]) -> Result<[u8; 64], ViewerError> {
        Ok(self.account.key.sign(data).to_bytes())
    }
}

/// Sender identity handed to the read-only contract client.
///
/// Reads never sign anything, so a throwaway account is enough.
#[derive(Debug)]
pub struct ReadSender {
    pub signer: LocalSigner,
}

impl ReadSender {
    pub fn ephemeral() -> Self {
        Self {
            signer: LocalSigner::new(Account::generate()),
        }
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }
}

/// Encode a public key as a 58-character Algorand address.
pub fn encode_address(public_key: &[u8; 32]) -> String {
    let checksum = Sha512_256::digest(public_key);
    let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
    raw.extend_from_slice(public_key);
    raw.extend_from_slice(&checksum[checksum.len() - CHECKSUM_LEN..]);
    base32_encode(&raw)
}

/// Decode an Algorand address back to its public key, verifying the checksum.
pub fn decode_address(address: &str) -> Result<[u8; 32], ViewerError> {
    if address.len() != ADDRESS_LEN {
        return Err(ViewerError::Decode(format!(
            "address must be {ADDRESS_LEN} characters, got {}",
            address.len()
        )));
    }
    let raw = base32_decode(address)
        .ok_or_else(|| ViewerError::Decode(format!("invalid base32 in address {address}")))?;
    if raw.len() < 32 + CHECKSUM_LEN {
        return Err(ViewerError::Decode("address too short".into()));
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&raw[..32]);
    let checksum = Sha512_256::digest(public_key);
    if raw[32..32 + CHECKSUM_LEN] != checksum[checksum.len() - CHECKSUM_LEN..] {
        return Err(ViewerError::Decode(format!("address checksum mismatch: {address}")));
    }
    Ok(public_key)
}

/// Shorten an address for display: first 6 and last 4 characters.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 13 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// RFC 4648 base32, no padding.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in text.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    #[test]
    fn zero_key_encodes_to_known_address() {
        // The all-zero public key is Algorand's well-known zero address.
        assert_eq!(
            encode_address(&[0u8; 32]),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn generated_address_round_trips() {
        let account = Account::generate();
        assert_eq!(account.address().len(), ADDRESS_LEN);
        let pk = decode_address(account.address()).unwrap();
        assert_eq!(pk, account.public_key());
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let account = Account::from_seed(&[7u8; 32]);
        let mut addr = account.address().to_string();
        let last = addr.pop().unwrap();
        addr.push(if last == 'A' { 'B' } else { 'A' });
        assert!(matches!(decode_address(&addr), Err(ViewerError::Decode(_))));
    }

    #[test]
    fn ephemeral_senders_are_distinct() {
        let a = ReadSender::ephemeral();
        let b = ReadSender::ephemeral();
        assert_ne!(a.address(), b.address());
    }

    #[tokio::test]
    async fn local_signer_produces_verifiable_signature() {
        let account = Account::from_seed(&[3u8; 32]);
        let pk = account.public_key();
        let signer = LocalSigner::new(account);

        let sig = signer.sign(b"ticket").await.unwrap();
        let vk = VerifyingKey::from_bytes(&pk).unwrap();
        assert!(vk.verify(b"ticket", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn truncate_address_keeps_head_and_tail() {
        let addr = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
        assert_eq!(truncate_address(addr), "AAAAAA...HFKQ");
        assert_eq!(truncate_address("SHORT"), "SHORT");
    }
}

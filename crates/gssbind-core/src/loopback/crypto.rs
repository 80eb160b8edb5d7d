//! Encrypt-then-MAC sealing for loopback tokens.
//!
//! ```text
//! sealed = [IV: 16 bytes] || AES-256-CBC(PKCS7(plaintext)) || HMAC-SHA256(aad || IV || ciphertext)
//! ```
//!
//! Encryption and MAC keys are derived together from a 256-bit secret with
//! HKDF-SHA256, using a label per purpose.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub(super) const TICKET_LABEL: &[u8] = b"gssbind loopback ticket";
pub(super) const AP_REP_LABEL: &[u8] = b"gssbind loopback ap-rep";
pub(super) const INITIATOR_LABEL: &[u8] = b"gssbind loopback initiator";
pub(super) const ACCEPTOR_LABEL: &[u8] = b"gssbind loopback acceptor";

pub(super) const IV_LEN: usize = 16;
pub(super) const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CryptoError {
    Truncated,
    BadMac,
    BadPadding,
}

pub(super) fn random_key() -> [u8; 32] {
    let mut key = [0; 32];
    OsRng.fill_bytes(&mut key);
    key
}

pub(super) fn random_u64() -> u64 {
    OsRng.next_u64()
}

pub(super) struct Keys {
    encryption: [u8; 32],
    signing: [u8; 32],
}
impl Keys {
    pub(super) fn derive(secret: &[u8; 32], label: &[u8]) -> Self {
        let mut okm = [0u8; 64];
        Hkdf::<Sha256>::new(None, secret)
            .expand(label, &mut okm)
            .expect("64 bytes is a valid HKDF-SHA256 output length");
        let mut encryption = [0u8; 32];
        let mut signing = [0u8; 32];
        encryption.copy_from_slice(&okm[..32]);
        signing.copy_from_slice(&okm[32..]);
        Self { encryption, signing }
    }

    pub(super) fn seal(&self, aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = Aes256CbcEnc::new(&self.encryption.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let mut sealed = Vec::with_capacity(IV_LEN + ciphertext.len() + MAC_LEN);
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(&ciphertext);
        let tag = self.mac(&[aad, sealed.as_slice()]);
        sealed.extend_from_slice(&tag);
        sealed
    }

    pub(super) fn open(&self, aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < IV_LEN + BLOCK_LEN + MAC_LEN || (sealed.len() - IV_LEN - MAC_LEN) % BLOCK_LEN != 0 {
            return Err(CryptoError::Truncated);
        }
        let (signed, tag) = sealed.split_at(sealed.len() - MAC_LEN);
        self.verify(&[aad, signed], tag)?;
        let (iv, ciphertext) = signed.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CryptoError::Truncated)?;
        Aes256CbcDec::new(&self.encryption.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::BadPadding)
    }

    pub(super) fn mac(&self, parts: &[&[u8]]) -> [u8; MAC_LEN] {
        let mut mac = self.hmac();
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().into()
    }

    pub(super) fn verify(&self, parts: &[&[u8]], tag: &[u8]) -> Result<(), CryptoError> {
        let mut mac = self.hmac();
        for part in parts {
            mac.update(part);
        }
        mac.verify_slice(tag).map_err(|_| CryptoError::BadMac)
    }

    fn hmac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.signing).expect("HMAC-SHA256 accepts keys of any length")
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AES-CBC with HMAC record protection
//!
//! Supports both orderings: classic MAC-then-encrypt (RFC 5246 Section
//! 6.2.3.2) and encrypt-then-MAC (RFC 7366), selected per connection by the
//! `encrypt_then_mac` security parameter. A fresh random explicit IV is
//! prepended to every record; padding is PKCS#7 over the AES block size.
//!
//! # Record layout
//!
//! ```text
//! MtE:  explicit_iv(16) | encrypt(plaintext | mac | padding)
//! EtM:  explicit_iv(16) | encrypt(plaintext | padding) | mac
//! ```

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use crate::error::{RecordError, RecordResult};
use crate::record::cipher::mac::MacSuite;
use crate::record::constants::{CBC_BLOCK_LEN, CBC_EXPLICIT_IV_LEN};
use crate::record::security_params::MacAlgorithm;
use crate::record::text::{mac_input, CipherText, CompressedText};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES-CBC + HMAC context for one direction of one epoch.
pub struct CbcHmacSuite {
    key: Vec<u8>,
    mac: MacSuite,
    encrypt_then_mac: bool,
    rng: SystemRandom,
}

impl CbcHmacSuite {
    pub fn new(
        key: &[u8],
        mac_algorithm: MacAlgorithm,
        mac_key: &[u8],
        encrypt_then_mac: bool,
    ) -> RecordResult<Self> {
        if key.len() != 16 && key.len() != 32 {
            return Err(RecordError::CryptoAdapterFailure(
                "unsupported AES-CBC key length",
            ));
        }
        Ok(Self {
            key: key.to_vec(),
            mac: MacSuite::new(mac_algorithm, mac_key)?,
            encrypt_then_mac,
            rng: SystemRandom::new(),
        })
    }

    /// Fresh random explicit IV. A predictable IV would reopen BEAST, so RNG
    /// failure refuses to encrypt.
    fn random_iv(&self) -> RecordResult<[u8; CBC_EXPLICIT_IV_LEN]> {
        let mut iv = [0u8; CBC_EXPLICIT_IV_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| RecordError::CryptoAdapterFailure("system RNG failed"))?;
        Ok(iv)
    }

    fn encrypt_blocks(&self, iv: &[u8], data: &[u8]) -> RecordResult<Vec<u8>> {
        match self.key.len() {
            16 => Aes128CbcEnc::new_from_slices(&self.key, iv)
                .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(data))
                .map_err(|_| RecordError::CryptoAdapterFailure("AES-CBC key/IV rejected")),
            _ => Aes256CbcEnc::new_from_slices(&self.key, iv)
                .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(data))
                .map_err(|_| RecordError::CryptoAdapterFailure("AES-CBC key/IV rejected")),
        }
    }

    fn decrypt_blocks(&self, iv: &[u8], data: &[u8]) -> RecordResult<Vec<u8>> {
        if data.is_empty() || data.len() % CBC_BLOCK_LEN != 0 {
            return Err(RecordError::BadRecordMac);
        }
        match self.key.len() {
            16 => Aes128CbcDec::new_from_slices(&self.key, iv)
                .map_err(|_| RecordError::CryptoAdapterFailure("AES-CBC key/IV rejected"))?
                .decrypt_padded_vec_mut::<Pkcs7>(data)
                .map_err(|_| RecordError::BadRecordMac),
            _ => Aes256CbcDec::new_from_slices(&self.key, iv)
                .map_err(|_| RecordError::CryptoAdapterFailure("AES-CBC key/IV rejected"))?
                .decrypt_padded_vec_mut::<Pkcs7>(data)
                .map_err(|_| RecordError::BadRecordMac),
        }
    }

    pub fn encrypt(&self, mut comp: CompressedText) -> RecordResult<CipherText> {
        let iv = self.random_iv()?;

        let payload = if self.encrypt_then_mac {
            let ciphertext = self.encrypt_blocks(&iv, &comp.payload)?;
            let mut composite = Vec::with_capacity(
                CBC_EXPLICIT_IV_LEN + ciphertext.len() + self.mac.tag_len(),
            );
            composite.extend_from_slice(&iv);
            composite.extend_from_slice(&ciphertext);
            // EtM authenticates the IV together with the ciphertext.
            let tag = self.mac.sign(&mac_input(
                comp.number,
                comp.content_type,
                comp.version,
                &composite,
            ));
            composite.extend_from_slice(&tag);
            composite
        } else {
            let mut buf = std::mem::take(&mut comp.payload);
            let tag = self
                .mac
                .sign(&mac_input(comp.number, comp.content_type, comp.version, &buf));
            buf.extend_from_slice(&tag);
            let ciphertext = self.encrypt_blocks(&iv, &buf)?;
            buf.zeroize();

            let mut out = Vec::with_capacity(CBC_EXPLICIT_IV_LEN + ciphertext.len());
            out.extend_from_slice(&iv);
            out.extend_from_slice(&ciphertext);
            out
        };

        Ok(CipherText::sealed(&comp, payload))
    }

    pub fn decrypt(&self, mut cipher: CipherText) -> RecordResult<CompressedText> {
        let data = std::mem::take(&mut cipher.payload);

        let plaintext = if self.encrypt_then_mac {
            let tag_len = self.mac.tag_len();
            if data.len() < CBC_EXPLICIT_IV_LEN + CBC_BLOCK_LEN + tag_len {
                return Err(RecordError::BadRecordMac);
            }
            let (composite, tag) = data.split_at(data.len() - tag_len);
            self.mac.verify(
                &mac_input(cipher.number, cipher.content_type, cipher.version, composite),
                tag,
            )?;
            let (iv, ciphertext) = composite.split_at(CBC_EXPLICIT_IV_LEN);
            self.decrypt_blocks(iv, ciphertext)?
        } else {
            if data.len() < CBC_EXPLICIT_IV_LEN + CBC_BLOCK_LEN {
                return Err(RecordError::BadRecordMac);
            }
            let (iv, ciphertext) = data.split_at(CBC_EXPLICIT_IV_LEN);
            let mut buf = self.decrypt_blocks(iv, ciphertext)?;
            if buf.len() < self.mac.tag_len() {
                return Err(RecordError::BadRecordMac);
            }
            let tag_at = buf.len() - self.mac.tag_len();
            let verdict = self.mac.verify(
                &mac_input(
                    cipher.number,
                    cipher.content_type,
                    cipher.version,
                    &buf[..tag_at],
                ),
                &buf[tag_at..],
            );
            verdict?;
            buf.truncate(tag_at);
            buf
        };

        Ok(CompressedText::new(
            cipher.content_type,
            cipher.version,
            cipher.number,
            plaintext,
        ))
    }

    /// Per-record growth: explicit IV + tag + worst-case PKCS#7 padding.
    pub fn expansion(&self) -> usize {
        CBC_EXPLICIT_IV_LEN + self.mac.tag_len() + CBC_BLOCK_LEN
    }
}

impl Drop for CbcHmacSuite {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

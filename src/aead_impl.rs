//! One-shot [`aead`] trait surface layered over the streaming session,
//! using the 96-bit nonce and 128-bit tag of the RFC 7253 test vectors.

pub use aead::{self, AeadCore, AeadInPlace, Key, KeyInit, KeySizeUser};

use cipher::{
    consts::{U0, U12, U16},
    generic_array::GenericArray,
    AlgorithmName, BlockDecrypt, BlockEncrypt, BlockSizeUser,
};
use core::fmt;

use crate::session::{Direction, OcbSession};

pub type Tag = GenericArray<u8, U16>;

/// OCB over the block cipher `C` as a one-shot AEAD.
///
/// Each call spins up a short-lived [`OcbSession`] from the held cipher
/// pair, so `&self` methods stay shareable.
#[derive(Clone)]
pub struct Ocb<C> {
    hash_cipher: C,
    main_cipher: C,
}

/// `AES-128/OCB`.
pub type Aes128Ocb = Ocb<aes::Aes128>;

impl<C: KeySizeUser> KeySizeUser for Ocb<C> {
    type KeySize = C::KeySize;
}

impl<C> AeadCore for Ocb<C> {
    type NonceSize = U12;
    type TagSize = U16;
    type CiphertextOverhead = U0;
}

impl<C: KeyInit> KeyInit for Ocb<C> {
    fn new(key: &Key<Self>) -> Self {
        Self {
            hash_cipher: C::new(key),
            main_cipher: C::new(key),
        }
    }
}

impl<C> AeadInPlace for Ocb<C>
where
    C: BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt + Clone,
{
    fn encrypt_in_place_detached(
        &self,
        nonce: &aead::Nonce<Self>,
        associated_data: &[u8],
        buffer: &mut [u8],
    ) -> aead::Result<aead::Tag<Self>> {
        let mut session = OcbSession::new(
            self.hash_cipher.clone(),
            self.main_cipher.clone(),
            Direction::Encrypt,
            nonce.as_slice(),
            128,
            associated_data,
        )
        .map_err(|_| aead::Error)?;

        let mut out = vec![0u8; buffer.len() + 16];
        let mut n = session.update(buffer, &mut out).map_err(|_| aead::Error)?;
        n += session.finalize(&mut out[n..]).map_err(|_| aead::Error)?;
        debug_assert_eq!(n, out.len());

        buffer.copy_from_slice(&out[..buffer.len()]);
        Ok(*Tag::from_slice(&out[buffer.len()..]))
    }

    fn decrypt_in_place_detached(
        &self,
        nonce: &aead::Nonce<Self>,
        associated_data: &[u8],
        buffer: &mut [u8],
        tag: &aead::Tag<Self>,
    ) -> aead::Result<()> {
        let mut session = OcbSession::new(
            self.hash_cipher.clone(),
            self.main_cipher.clone(),
            Direction::Decrypt,
            nonce.as_slice(),
            128,
            associated_data,
        )
        .map_err(|_| aead::Error)?;

        let mut out = vec![0u8; buffer.len()];
        let mut n = session.update(buffer, &mut out).map_err(|_| aead::Error)?;
        n += session
            .update(tag.as_slice(), &mut out[n..])
            .map_err(|_| aead::Error)?;
        n += session.finalize(&mut out[n..]).map_err(|_| aead::Error)?;
        debug_assert_eq!(n, buffer.len());

        buffer.copy_from_slice(&out);
        Ok(())
    }
}

impl<C: AlgorithmName> AlgorithmName for Ocb<C> {
    fn write_alg_name(f: &mut fmt::Formatter<'_>) -> fmt::Result {
        C::write_alg_name(f)?;
        f.write_str("/OCB")
    }
}

impl<C: AlgorithmName> fmt::Debug for Ocb<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as AlgorithmName>::write_alg_name(f)?;
        f.write_str(" { .. }")
    }
}

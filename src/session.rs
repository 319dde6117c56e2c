//! The streaming OCB core.
//!
//! A session holds two independently keyed instances of the same block
//! cipher: the hash instance only ever runs forward (associated data, the
//! final-block pad, and the tag), while the main instance runs forward when
//! encrypting and inverted when decrypting. Message and associated-data
//! bytes flow through two independent lanes, each with its own running
//! offset, block counter, and partial-block buffer, exactly as laid out in
//! [RFC 7253][1] sections 4.1-4.3.
//!
//! [1]: https://www.rfc-editor.org/rfc/rfc7253.html

use core::fmt;

use cipher::{consts::U16, AlgorithmName, BlockDecrypt, BlockEncrypt, BlockSizeUser};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::util::{double, inplace_xor, ntz, Block};
use crate::{Error, Result};

/// Block size in bytes. Only 128-bit block ciphers are supported.
pub const BLOCK_SIZE: usize = 16;

/// Smallest permitted tag length in bits.
pub const MIN_TAG_BITS: usize = 32;
/// Largest permitted tag length in bits: an OCB tag is a truncation of one
/// cipher block, so it cannot exceed the block size.
pub const MAX_TAG_BITS: usize = 128;

/// Whether a session turns plaintext into ciphertext or back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Key-dependent offset ladder: `L*`, `L$`, and the doubling chain `L[i]`
/// defined in https://www.rfc-editor.org/rfc/rfc7253.html#section-4.1
///
/// Entries are materialized on demand and only ever appended. The ladder is
/// a function of the key alone; it survives re-initialization and reset.
struct LTable {
    star: Block,
    dollar: Block,
    sub: Vec<Block>,
}

impl LTable {
    fn new<C>(hash_cipher: &C) -> Self
    where
        C: BlockSizeUser<BlockSize = U16> + BlockEncrypt,
    {
        let mut star = Block::default();
        hash_cipher.encrypt_block(&mut star);
        let dollar = double(&star);
        let sub = vec![double(&dollar)];
        Self { star, dollar, sub }
    }

    /// `L[n]`, extending the chain by repeated doubling as needed.
    fn l_sub(&mut self, n: usize) -> Block {
        while self.sub.len() <= n {
            let next = double(&self.sub[self.sub.len() - 1]);
            self.sub.push(next);
        }
        self.sub[n]
    }
}

impl Zeroize for LTable {
    fn zeroize(&mut self) {
        self.star.zeroize();
        self.dollar.zeroize();
        for entry in self.sub.iter_mut() {
            entry.zeroize();
        }
        self.sub.clear();
    }
}

/// Sets the 0x80 end marker at `pos` and zero-fills the rest of the block.
fn pad_block(block: &mut [u8], pos: usize) {
    block[pos] = 0x80;
    block[pos + 1..BLOCK_SIZE].fill(0);
}

/// A streaming OCB encryption or decryption in progress.
///
/// Associated data and message bytes may be fed in any chunking and freely
/// interleaved; the two lanes are independent. Output blocks are written as
/// they complete. When decrypting, the trailing `tag_len` bytes of whatever
/// has been fed are always held back as the candidate tag, so the message
/// buffer is one tag wider than a block.
pub struct OcbSession<C> {
    hash_cipher: C,
    main_cipher: C,
    direction: Direction,
    mac_size: usize,
    l: LTable,

    /// Masked formatted nonce whose `Ktop` is cached in `stretch`.
    ktop_input: Option<[u8; BLOCK_SIZE]>,
    stretch: [u8; 24],
    offset_main_0: Block,

    offset_main: Block,
    offset_hash: Block,
    checksum: Block,
    sum: Block,

    hash_block: Block,
    hash_block_pos: usize,
    hash_block_count: u64,

    main_block: Vec<u8>,
    main_block_pos: usize,
    main_block_count: u64,

    mac_block: Option<Vec<u8>>,
    initial_aad: Vec<u8>,
}

impl<C> OcbSession<C>
where
    C: BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    /// Creates a session around a keyed permutation pair and establishes the
    /// first message's parameters.
    ///
    /// Both instances must carry the same key; sharing one type parameter
    /// already guarantees they agree on algorithm and block size.
    pub fn new(
        hash_cipher: C,
        main_cipher: C,
        direction: Direction,
        nonce: &[u8],
        tag_bits: usize,
        initial_aad: &[u8],
    ) -> Result<Self> {
        let l = LTable::new(&hash_cipher);
        let mut session = Self {
            hash_cipher,
            main_cipher,
            direction,
            mac_size: 0,
            l,
            ktop_input: None,
            stretch: [0; 24],
            offset_main_0: Block::default(),
            offset_main: Block::default(),
            offset_hash: Block::default(),
            checksum: Block::default(),
            sum: Block::default(),
            hash_block: Block::default(),
            hash_block_pos: 0,
            hash_block_count: 0,
            main_block: Vec::new(),
            main_block_pos: 0,
            main_block_count: 0,
            mac_block: None,
            initial_aad: Vec::new(),
        };
        session.init(direction, nonce, tag_bits, initial_aad)?;
        Ok(session)
    }

    /// Re-establishes direction, nonce, tag length, and initial associated
    /// data for the next message.
    ///
    /// The key-dependent ladder is kept, and so is the cached `Ktop`:
    /// nonces that differ only in their low 6 bits skip one block-cipher
    /// call here.
    pub fn init(
        &mut self,
        direction: Direction,
        nonce: &[u8],
        tag_bits: usize,
        initial_aad: &[u8],
    ) -> Result<()> {
        if !(MIN_TAG_BITS..=MAX_TAG_BITS).contains(&tag_bits) || tag_bits % 8 != 0 {
            return Err(Error::InvalidTagLength);
        }
        if nonce.is_empty() || nonce.len() >= BLOCK_SIZE {
            return Err(Error::InvalidNonce);
        }

        self.direction = direction;
        self.mac_size = tag_bits / 8;
        self.mac_block = None;

        let main_len = match direction {
            Direction::Encrypt => BLOCK_SIZE,
            Direction::Decrypt => BLOCK_SIZE + self.mac_size,
        };
        self.main_block.zeroize();
        self.main_block = vec![0; main_len];

        self.initial_aad.clear();
        self.initial_aad.extend_from_slice(initial_aad);

        self.process_nonce(nonce);
        self.reset_state(false);
        Ok(())
    }

    /// Formats the nonce and expands it into the initial main-lane offset,
    /// per https://www.rfc-editor.org/rfc/rfc7253.html#section-4.2
    fn process_nonce(&mut self, nonce: &[u8]) {
        let mut n = [0u8; BLOCK_SIZE];
        n[BLOCK_SIZE - nonce.len()..].copy_from_slice(nonce);
        n[0] = (self.mac_size << 4) as u8;
        n[BLOCK_SIZE - 1 - nonce.len()] |= 0x01;

        // Separate the low 6 bits into `bottom`; everything above selects
        // the cached Ktop.
        let bottom = usize::from(n[15] & 0x3F);
        n[15] &= 0xC0;

        if self.ktop_input != Some(n) {
            let mut ktop = Block::from(n);
            self.hash_cipher.encrypt_block(&mut ktop);
            // Stretch = Ktop || (Ktop[1..64] xor Ktop[9..72])
            self.stretch[..BLOCK_SIZE].copy_from_slice(&ktop);
            for i in 0..8 {
                self.stretch[BLOCK_SIZE + i] = ktop[i] ^ ktop[i + 1];
            }
            self.ktop_input = Some(n);
        }

        // Offset_0 = Stretch[1+bottom..128+bottom]
        let bytes = bottom / 8;
        let bits = bottom % 8;
        if bits == 0 {
            self.offset_main_0
                .copy_from_slice(&self.stretch[bytes..bytes + BLOCK_SIZE]);
        } else {
            for i in 0..BLOCK_SIZE {
                let b1 = u16::from(self.stretch[bytes + i]);
                let b2 = u16::from(self.stretch[bytes + i + 1]);
                self.offset_main_0[i] = ((b1 << bits) | (b2 >> (8 - bits))) as u8;
            }
        }
    }

    /// Returns the session to the start of the current message: same nonce,
    /// same tag length, initial associated data replayed into the hash lane.
    /// Any previously computed tag is forgotten.
    pub fn reset(&mut self) {
        self.reset_state(false);
    }

    fn reset_state(&mut self, preserve_mac: bool) {
        self.hash_block.zeroize();
        self.hash_block_pos = 0;
        self.hash_block_count = 0;
        self.main_block.as_mut_slice().zeroize();
        self.main_block_pos = 0;
        self.main_block_count = 0;
        self.offset_hash = Block::default();
        self.checksum = Block::default();
        self.sum = Block::default();
        self.offset_main = self.offset_main_0;
        if !preserve_mac {
            self.mac_block = None;
        }
        if !self.initial_aad.is_empty() {
            let aad = core::mem::take(&mut self.initial_aad);
            self.update_aad(&aad);
            self.initial_aad = aad;
        }
    }

    /// Absorbs associated data. May be called any number of times, in any
    /// chunking, interleaved with [`update`](Self::update).
    pub fn update_aad(&mut self, mut aad: &[u8]) {
        while !aad.is_empty() {
            let take = usize::min(BLOCK_SIZE - self.hash_block_pos, aad.len());
            self.hash_block[self.hash_block_pos..self.hash_block_pos + take]
                .copy_from_slice(&aad[..take]);
            self.hash_block_pos += take;
            aad = &aad[take..];
            if self.hash_block_pos == BLOCK_SIZE {
                self.process_hash_block();
            }
        }
    }

    fn process_hash_block(&mut self) {
        self.hash_block_count += 1;
        let l_i = self.l.l_sub(ntz(self.hash_block_count));
        inplace_xor(&mut self.offset_hash, &l_i);
        inplace_xor(&mut self.hash_block, &self.offset_hash);
        self.hash_cipher.encrypt_block(&mut self.hash_block);
        inplace_xor(&mut self.sum, &self.hash_block);
        self.hash_block_pos = 0;
    }

    /// Folds a trailing partial associated-data block into `sum`. The offset
    /// update uses `L*` rather than a ladder entry.
    fn process_hash_block_final(&mut self) {
        pad_block(&mut self.hash_block, self.hash_block_pos);
        inplace_xor(&mut self.offset_hash, &self.l.star);
        inplace_xor(&mut self.hash_block, &self.offset_hash);
        self.hash_cipher.encrypt_block(&mut self.hash_block);
        inplace_xor(&mut self.sum, &self.hash_block);
    }

    /// Absorbs message bytes, writing completed output blocks into `output`
    /// and returning the number of bytes written.
    ///
    /// `output` must have room for
    /// [`update_output_size(input.len())`](Self::update_output_size) bytes.
    pub fn update(&mut self, mut input: &[u8], output: &mut [u8]) -> Result<usize> {
        if output.len() < self.update_output_size(input.len()) {
            return Err(Error::BufferTooSmall);
        }
        let mut written = 0;
        while !input.is_empty() {
            let take = usize::min(self.main_block.len() - self.main_block_pos, input.len());
            self.main_block[self.main_block_pos..self.main_block_pos + take]
                .copy_from_slice(&input[..take]);
            self.main_block_pos += take;
            input = &input[take..];
            if self.main_block_pos == self.main_block.len() {
                self.process_main_block(&mut output[written..written + BLOCK_SIZE]);
                written += BLOCK_SIZE;
            }
        }
        Ok(written)
    }

    fn process_main_block(&mut self, output: &mut [u8]) {
        self.main_block_count += 1;
        let l_i = self.l.l_sub(ntz(self.main_block_count));
        inplace_xor(&mut self.offset_main, &l_i);

        let block = Block::from_mut_slice(&mut self.main_block[..BLOCK_SIZE]);
        if self.direction == Direction::Encrypt {
            inplace_xor(&mut self.checksum, block);
        }
        inplace_xor(block, &self.offset_main);
        match self.direction {
            Direction::Encrypt => self.main_cipher.encrypt_block(block),
            Direction::Decrypt => self.main_cipher.decrypt_block(block),
        }
        inplace_xor(block, &self.offset_main);
        output.copy_from_slice(&block[..]);

        if self.direction == Direction::Decrypt {
            // the recovered plaintext feeds the checksum, then the retained
            // candidate-tag window slides down to the buffer head
            inplace_xor(&mut self.checksum, block);
            let mac_size = self.mac_size;
            self.main_block.copy_within(BLOCK_SIZE..BLOCK_SIZE + mac_size, 0);
            self.main_block_pos = mac_size;
        } else {
            self.main_block_pos = 0;
        }
    }

    /// Bytes [`update`](Self::update) would write for `len` more input bytes.
    pub fn update_output_size(&self, len: usize) -> usize {
        let mut total = self.main_block_pos + len;
        if self.direction == Direction::Decrypt {
            if total < self.mac_size {
                return 0;
            }
            total -= self.mac_size;
        }
        total - total % BLOCK_SIZE
    }

    /// Bytes [`finalize`](Self::finalize) would write after `len` more input
    /// bytes: tag included when encrypting, removed when decrypting.
    pub fn final_output_size(&self, len: usize) -> usize {
        let total = self.main_block_pos + len;
        match self.direction {
            Direction::Encrypt => total + self.mac_size,
            Direction::Decrypt => total.saturating_sub(self.mac_size),
        }
    }

    /// Consumes the buffered tail of the message, then computes the tag.
    ///
    /// Encrypting, the tag is appended to `output` after any final partial
    /// block. Decrypting, the retained trailing bytes are verified against
    /// the computed tag in constant time and only the partial plaintext is
    /// written. On success the session resets itself for reuse with the same
    /// parameters, keeping the tag readable through [`mac`](Self::mac).
    pub fn finalize(&mut self, output: &mut [u8]) -> Result<usize> {
        let mut expected_tag = [0u8; MAX_TAG_BITS / 8];
        if self.direction == Direction::Decrypt {
            if self.main_block_pos < self.mac_size {
                return Err(Error::DataTooShort);
            }
            self.main_block_pos -= self.mac_size;
            expected_tag[..self.mac_size]
                .copy_from_slice(&self.main_block[self.main_block_pos..][..self.mac_size]);
        }
        // the tag has already been split off here, so the remaining buffered
        // bytes are exactly what gets written (plus the tag when encrypting)
        let needed = match self.direction {
            Direction::Encrypt => self.main_block_pos + self.mac_size,
            Direction::Decrypt => self.main_block_pos,
        };
        if output.len() < needed {
            return Err(Error::BufferTooSmall);
        }

        if self.hash_block_pos > 0 {
            self.process_hash_block_final();
        }

        let partial = self.main_block_pos;
        if partial > 0 {
            if self.direction == Direction::Encrypt {
                pad_block(&mut self.main_block, partial);
                let block = Block::from_slice(&self.main_block[..BLOCK_SIZE]);
                inplace_xor(&mut self.checksum, block);
            }

            inplace_xor(&mut self.offset_main, &self.l.star);
            let mut pad = self.offset_main;
            self.hash_cipher.encrypt_block(&mut pad);
            for (b, p) in self.main_block[..BLOCK_SIZE].iter_mut().zip(pad.iter()) {
                *b ^= p;
            }
            output[..partial].copy_from_slice(&self.main_block[..partial]);

            if self.direction == Direction::Decrypt {
                pad_block(&mut self.main_block, partial);
                let block = Block::from_slice(&self.main_block[..BLOCK_SIZE]);
                inplace_xor(&mut self.checksum, block);
            }
        }

        // Tag = ENCIPHER(K, Checksum xor Offset xor L_$) xor Sum
        inplace_xor(&mut self.checksum, &self.offset_main);
        inplace_xor(&mut self.checksum, &self.l.dollar);
        self.hash_cipher.encrypt_block(&mut self.checksum);
        inplace_xor(&mut self.checksum, &self.sum);

        let mac = self.checksum[..self.mac_size].to_vec();

        let written = match self.direction {
            Direction::Encrypt => {
                output[partial..partial + self.mac_size].copy_from_slice(&mac);
                partial + self.mac_size
            }
            Direction::Decrypt => {
                if !bool::from(mac.as_slice().ct_eq(&expected_tag[..self.mac_size])) {
                    // never surface a tag computed for rejected input
                    self.mac_block = None;
                    return Err(Error::AuthenticationFailed);
                }
                partial
            }
        };

        self.mac_block = Some(mac);
        self.reset_state(true);
        Ok(written)
    }

    /// The tag computed by the last [`finalize`](Self::finalize), or `None`
    /// if none has completed since the last parameter change or reset.
    pub fn mac(&self) -> Option<&[u8]> {
        self.mac_block.as_deref()
    }

    /// Tag length in bytes.
    pub fn tag_len(&self) -> usize {
        self.mac_size
    }

    /// The direction this session is currently initialized for.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl<C: AlgorithmName> AlgorithmName for OcbSession<C> {
    fn write_alg_name(f: &mut fmt::Formatter<'_>) -> fmt::Result {
        C::write_alg_name(f)?;
        f.write_str("/OCB")
    }
}

impl<C: AlgorithmName> fmt::Debug for OcbSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as AlgorithmName>::write_alg_name(f)?;
        f.write_str(" { .. }")
    }
}

impl<C> Drop for OcbSession<C> {
    fn drop(&mut self) {
        self.l.zeroize();
        self.stretch.zeroize();
        if let Some(ktop_input) = self.ktop_input.as_mut() {
            ktop_input.zeroize();
        }
        self.offset_main_0.zeroize();
        self.offset_main.zeroize();
        self.offset_hash.zeroize();
        self.checksum.zeroize();
        self.sum.zeroize();
        self.hash_block.zeroize();
        self.main_block.zeroize();
        self.mac_block.zeroize();
        self.initial_aad.zeroize();
    }
}

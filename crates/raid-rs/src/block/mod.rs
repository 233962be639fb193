//! Fixed-width, runtime-sized byte buffers with bitwise helpers for RAID layouts.
//!
//! `BLOCK_SIZE` is a startup configuration value rather than a compile-time
//! constant (unlike the const-generic `Bits<N>` buffers elsewhere in the
//! stripe-layout ecosystem this crate grew out of), so `Block` wraps a
//! `Vec<u8>` instead of `[u8; N]`.


/// Block is a fixed-length (for its lifetime) byte buffer: the atomic unit of
/// storage exchanged between the RAID-5 client and a block server.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Block(Vec<u8>);

impl Block {
    /// `zero` returns a zero-initialized block of the given length.
    #[must_use]
    pub fn zero(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    /// `from_bytes` builds a block by zero-padding `data` on the right to `len`.
    ///
    /// # Panics
    /// Panics if `data` is longer than `len`.
    #[must_use]
    pub fn from_padded(data: &[u8], len: usize) -> Self {
        assert!(
            data.len() <= len,
            "payload of {} bytes exceeds block size {len}",
            data.len()
        );
        let mut buf = vec![0u8; len];
        buf[..data.len()].copy_from_slice(data);
        Self(buf)
    }

    /// `from_vec` wraps an already-sized byte buffer without copying.
    #[must_use]
    pub const fn from_vec(data: Vec<u8>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// `xor_in_place` XORs `rhs` into `self`, byte for byte.
    ///
    /// # Panics
    /// Panics if the two blocks differ in length.
    pub fn xor_in_place(&mut self, rhs: &Self) {
        assert_eq!(
            self.0.len(),
            rhs.0.len(),
            "cannot xor blocks of different length"
        );
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a ^= *b;
        }
    }
}

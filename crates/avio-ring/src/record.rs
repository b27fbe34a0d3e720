/// A fixed-size record stored in a ring slot.
pub trait Record: Sized {
    /// Size of one record in device words.
    const WORDS: usize;

    /// Decodes a record from exactly [`Record::WORDS`] words.
    fn decode(words: &[u32]) -> Self;

    /// Encodes the record into exactly [`Record::WORDS`] words.
    fn encode(&self, words: &mut [u32]);
}

/// Undecoded record contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<const N: usize>(pub [u32; N]);

impl<const N: usize> Default for RawRecord<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> Record for RawRecord<N> {
    const WORDS: usize = N;

    fn decode(words: &[u32]) -> Self {
        let mut out = [0u32; N];
        out.copy_from_slice(&words[..N]);
        Self(out)
    }

    fn encode(&self, words: &mut [u32]) {
        words[..N].copy_from_slice(&self.0);
    }
}

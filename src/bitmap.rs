//! Fixed-size 256-bit bitmap with rank and select queries.
//!
//! A node stores only its present children, compacted, and uses this bitmap
//! to map a sparse branch byte to a dense index (`count_less`). Keeping the
//! bitmap inline (no slice, no heap) means a rank query touches a single
//! cache line.

use std::fmt;

/// A bitmap of 256 elements, stored as four 64-bit words.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitmap256([u64; 4]);

impl Bitmap256 {
    /// Returned by the `find_*` operations when no matching bit exists.
    pub const NOT_FOUND: usize = 256;

    pub const fn new() -> Self {
        Self([0; 4])
    }

    pub const fn from_words(words: [u64; 4]) -> Self {
        Self(words)
    }

    /// The underlying words, bit `i` living in `words[i / 64]` at `i % 64`.
    #[inline]
    pub const fn words(&self) -> [u64; 4] {
        self.0
    }

    /// Set the bit at `pos`.
    #[inline]
    pub fn set(&mut self, pos: u8) {
        self.0[usize::from(pos >> 6)] |= 1u64 << (pos & 63);
    }

    /// Clear the bit at `pos`.
    #[inline]
    pub fn clear(&mut self, pos: u8) {
        self.0[usize::from(pos >> 6)] &= !(1u64 << (pos & 63));
    }

    #[inline]
    pub fn get(&self, pos: u8) -> bool {
        (self.0[usize::from(pos >> 6)] >> (pos & 63)) & 1 == 1
    }

    /// Whether all bits are clear.
    #[inline]
    pub fn is_empty(&self) -> bool {
        (self.0[0] | self.0[1] | self.0[2] | self.0[3]) == 0
    }

    /// Whether all bits are set.
    #[inline]
    pub fn is_full(&self) -> bool {
        (self.0[0] & self.0[1] & self.0[2] & self.0[3]) == u64::MAX
    }

    /// Number of set bits ("population count").
    #[inline]
    pub fn count(&self) -> usize {
        (self.0[0].count_ones()
            + self.0[1].count_ones()
            + self.0[2].count_ones()
            + self.0[3].count_ones()) as usize
    }

    /// Number of set bits strictly before `pos`.
    ///
    /// This is the rank query every tree operation performs once per level,
    /// so it avoids loops: the partial word is masked and the full words
    /// below it are summed by a fixed dispatch on the word index.
    #[cfg(not(target_arch = "aarch64"))]
    #[inline]
    pub fn count_less(&self, pos: u8) -> usize {
        let w = &self.0;
        let index = usize::from(pos >> 6);
        let mask = (1u64 << (pos & 63)) - 1;
        let partial = (w[index] & mask).count_ones();
        let full = match index {
            0 => 0,
            1 => w[0].count_ones(),
            2 => w[0].count_ones() + w[1].count_ones(),
            _ => w[0].count_ones() + w[1].count_ones() + w[2].count_ones(),
        };
        (partial + full) as usize
    }

    /// Number of set bits strictly before `pos`.
    ///
    /// On aarch64 a branch-free prefix table beats the dispatch: the popcount
    /// of every word is computed anyway and indexing the table avoids a
    /// mispredicted jump.
    #[cfg(target_arch = "aarch64")]
    #[inline]
    pub fn count_less(&self, pos: u8) -> usize {
        let w = &self.0;
        let index = usize::from(pos >> 6);
        let mask = (1u64 << (pos & 63)) - 1;
        let partial = (w[index] & mask).count_ones();
        let mut full = [0u32; 4];
        full[1] = w[0].count_ones();
        full[2] = full[1] + w[1].count_ones();
        full[3] = full[2] + w[2].count_ones();
        (partial + full[index]) as usize
    }

    /// Position of the first set bit, or [`Self::NOT_FOUND`].
    #[inline]
    pub fn find_first_set(&self) -> usize {
        self.find_next_set(0)
    }

    /// Position of the first set bit at or after `pos`, or [`Self::NOT_FOUND`].
    pub fn find_next_set(&self, pos: u8) -> usize {
        let start = usize::from(pos >> 6);
        let masked = self.0[start] & !((1u64 << (pos & 63)) - 1);
        if masked != 0 {
            return (start << 6) + masked.trailing_zeros() as usize;
        }
        for i in start + 1..4 {
            if self.0[i] != 0 {
                return (i << 6) + self.0[i].trailing_zeros() as usize;
            }
        }
        Self::NOT_FOUND
    }

    /// Position of the first clear bit, or [`Self::NOT_FOUND`].
    #[inline]
    pub fn find_first_clear(&self) -> usize {
        self.find_next_clear(0)
    }

    /// Position of the first clear bit at or after `pos`, or [`Self::NOT_FOUND`].
    pub fn find_next_clear(&self, pos: u8) -> usize {
        let start = usize::from(pos >> 6);
        let masked = self.0[start] | ((1u64 << (pos & 63)) - 1);
        if masked != u64::MAX {
            return (start << 6) + (!masked).trailing_zeros() as usize;
        }
        for i in start + 1..4 {
            if self.0[i] != u64::MAX {
                return (i << 6) + (!self.0[i]).trailing_zeros() as usize;
            }
        }
        Self::NOT_FOUND
    }

    /// Position of the `n`-th (zero-indexed) set bit, or [`Self::NOT_FOUND`]
    /// if fewer than `n + 1` bits are set.
    ///
    /// Whole words are skipped by population count; inside the word holding
    /// the answer the search halves the window (32, 16, 8, 4, 2, 1 bits),
    /// consuming the popcount of the lower half whenever the answer lies
    /// above it.
    pub fn find_nth_set(&self, n: u8) -> usize {
        let mut n = u32::from(n);
        let mut pos = 0usize;
        for &word in &self.0 {
            let set = word.count_ones();
            if set <= n {
                pos += 64;
                n -= set;
                continue;
            }

            let mut temp = word;
            for width in [32u32, 16, 8, 4, 2, 1] {
                let low = (temp & ((1u64 << width) - 1)).count_ones();
                if low <= n {
                    pos += width as usize;
                    n -= low;
                    temp >>= width;
                }
            }
            return pos;
        }
        pos
    }

    /// Positions of the set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> {
        let bits = *self;
        let first = bits.find_first_set();
        std::iter::successors((first < Self::NOT_FOUND).then_some(first as u8), move |&pos| {
            if pos == u8::MAX {
                return None;
            }
            let next = bits.find_next_set(pos + 1);
            (next < Self::NOT_FOUND).then_some(next as u8)
        })
    }
}

impl fmt::Debug for Bitmap256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

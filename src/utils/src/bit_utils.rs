use {HalfWord, Word, HALF_WORD_BITS, HALF_WORD_MASK};

// half words
//
// several object model encodings pack two half-word quantities into one
// word. The lower half holds the first field, the upper half the second.

#[inline(always)]
pub fn lower_half(value: Word) -> HalfWord {
    (value & HALF_WORD_MASK) as HalfWord
}

#[inline(always)]
pub fn upper_half(value: Word) -> HalfWord {
    (value >> HALF_WORD_BITS) as HalfWord
}

#[inline(always)]
pub fn pack_halves(lo: HalfWord, hi: HalfWord) -> Word {
    ((hi as Word) << HALF_WORD_BITS) | (lo as Word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_halves() {
        let w = pack_halves(3, 16);

        assert_eq!(lower_half(w), 3);
        assert_eq!(upper_half(w), 16);
    }

    #[test]
    pub fn test_halves_roundtrip() {
        let w = pack_halves(0, 1);
        assert_eq!(lower_half(w), 0);
        assert_eq!(upper_half(w), 1);

        use std::u16;
        let max = u16::MAX as HalfWord;
        let w = pack_halves(max, max);
        assert_eq!(lower_half(w), max);
        assert_eq!(upper_half(w), max);
    }
}

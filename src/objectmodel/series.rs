// Copyright 2017 The Australian National University
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use utils::*;
use utils::bit_utils;

use std::fmt;

/// byte size of one normal series in the encoded block
pub const SERIES_BYTES: ByteSize = 2 * WORD_SIZE;
/// byte size of one additional series item in the encoded block
pub const ITEM_BYTES: ByteSize = WORD_SIZE;

/// SeriesItem: one step of the per-element pattern for arrays whose
/// elements mix references and scalar data. Two halves packed into one
/// word:
///
/// |  skip  | nptrs  |
///  (upper)   (lower)
///
/// * nptrs - number of consecutive pointer slots
/// * skip  - bytes of non-pointer data following them
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct SeriesItem {
    w: Word
}

impl SeriesItem {
    pub fn new(nptrs: HalfWord, skip: HalfWord) -> SeriesItem {
        SeriesItem {
            w: bit_utils::pack_halves(nptrs, skip)
        }
    }

    #[inline(always)]
    pub fn from_word(w: Word) -> SeriesItem {
        SeriesItem { w: w }
    }

    #[inline(always)]
    pub fn as_word(self) -> Word {
        self.w
    }

    /// number of consecutive pointer slots in this step
    #[inline(always)]
    pub fn nptrs(self) -> HalfWord {
        bit_utils::lower_half(self.w)
    }

    /// bytes of non-pointer data after the pointer slots
    #[inline(always)]
    pub fn skip(self) -> HalfWord {
        bit_utils::upper_half(self.w)
    }
}

impl fmt::Debug for SeriesItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SeriesItem{{nptrs={}, skip={}}}", self.nptrs(), self.skip())
    }
}

/// GCSeries: one run of consecutive reference slots. Two words in the
/// encoded block, the size word below the offset word.
///
/// The size word is *adjusted*: it stores
/// `run_bytes_at_base_size - base_size`, so the run length of the series
/// for a concrete instance is `size + object_size`. Fixed-size types get
/// their plain run length back; a reference array (whose one series grows
/// with the instance) stores a negative size and every instance recovers
/// `object_size - data_offset` bytes of references.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GCSeries {
    size: ByteOffset,
    offset: ByteSize
}

impl GCSeries {
    pub fn new(size: ByteOffset, offset: ByteSize) -> GCSeries {
        GCSeries {
            size: size,
            offset: offset
        }
    }

    /// the adjusted size of the run (add the instance size to get bytes)
    #[inline(always)]
    pub fn size(&self) -> ByteOffset {
        self.size
    }

    /// offset of the first reference slot from the object base
    #[inline(always)]
    pub fn offset(&self) -> ByteSize {
        self.offset
    }

    /// number of reference slots of this series in an instance of the
    /// given total size
    #[inline(always)]
    pub fn slot_count(&self, object_size: ByteSize) -> usize {
        let run = self.size + object_size as ByteOffset;
        debug_assert!(
            run >= 0,
            "negative run length ({}) : {:?} in object of {} bytes",
            run,
            self,
            object_size
        );
        (run as ByteSize) >> LOG_POINTER_SIZE
    }
}

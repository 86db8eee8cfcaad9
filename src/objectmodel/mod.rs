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

//! # Pointer-Series Encoding
//!
//! Terminology
//!
//! * Series
//!   one maximal run of consecutive reference slots inside an object,
//!   described by a start offset and a length
//! * Series item
//!   for arrays whose elements mix references and scalar data: one
//!   (pointer count, skip bytes) step of the per-element pattern, packed
//!   into a single word
//! * Descriptor
//!   the per-type block of words that lists every series of a type, so
//!   a tracer can find all references in an object without knowing the
//!   object kind
//! * Type ID
//!   a type ID that allows us to indirectly find type information
//!
//! Design Goal
//!
//! One descriptor per pointer-containing type, built once when the type
//! is loaded, then read concurrently by tracer threads with no locking
//! and no allocation. A single signed count word selects between the two
//! payload layouts, so the common fixed-object case costs one comparison.
//!
//! Block Layout
//!
//! The descriptor owns a word array. The signed series count is the last
//! word; the payload fills the words below it, mirroring the layout where
//! GC data grows downwards from the type descriptor. With n > 0 normal
//! series (each two words, start offset above adjusted size)
//!
//! |series_0.size|series_0.offset| ... |series_n-1.size|series_n-1.offset|count = n|
//!
//! series 0 is the *lowest* series, series n-1 the *highest* (the one
//! next to the count word).
//!
//! With a count of -k (array of mixed-content elements), the single
//! series slot holds item 0 and the start offset, and items 1..k-1
//! continue at lower indices
//!
//! |item_k-1| ... |item_1|item_0|start_offset|count = -k|
//!
//! Item declaration order is the reverse of index order: walking the
//! per-element pattern means walking the block downwards.
//!
//! Size Adjustment
//!
//! A normal series does not store its run length directly. It stores
//! `run_bytes_at_base_size - base_size`, so that
//! `stored + object_size` recovers the run length for any instance of
//! the type. For fixed-size types the two sizes coincide; for arrays of
//! references the single series grows with the instance without the
//! descriptor ever being touched.

use utils::*;

pub const MINIMAL_ALIGNMENT: ByteSize = POINTER_SIZE;

/// Type ID of the type descriptor owning a GC descriptor
pub type TypeID = usize;
pub const N_TYPES: usize = 1 << 20;

/// checks alignment (only power-of-two, pointer-size or larger alignments
/// are meaningful for heap types)
pub fn check_alignment(align: ByteSize) -> ByteSize {
    use utils::math;
    assert!(
        align >= MINIMAL_ALIGNMENT && math::is_power_of_two(align).is_some(),
        "invalid alignment: {}",
        align
    );
    align
}

mod series;
mod desc;
mod desc_table;

pub use objectmodel::series::*;
pub use objectmodel::desc::*;
pub use objectmodel::desc_table::*;

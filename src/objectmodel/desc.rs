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

use objectmodel::series::*;
use objectmodel::TypeID;
use utils::*;

use std::fmt;

/// one run of reference slots used to build a plain descriptor. The slot
/// count is measured at the type's base size: a reference array's element
/// run has zero slots in the base instance, and grows with the instance
/// through the size adjustment.
#[derive(Copy, Clone, Debug)]
pub struct PtrRun {
    pub offset: ByteSize,
    pub nslots: usize
}

/// GCDesc: the per-type pointer-series descriptor. It owns the encoded
/// word block (see the module documentation for the layout) and a
/// back-reference to the type descriptor it belongs to. Built once at
/// type-load time, immutable afterwards.
pub struct GCDesc {
    owner: TypeID,
    block: Box<[Word]>
}

/// the payload of a descriptor, tagged by mode. Accessors that only make
/// sense in one mode live on the mode's view, so a caller cannot walk a
/// repeating descriptor as if it held normal series.
#[derive(Copy, Clone)]
pub enum SeriesBlock<'a> {
    Plain(PlainSeries<'a>),
    Repeating(RepeatSeries<'a>)
}

impl GCDesc {
    /// byte size of a plain descriptor with the given number of series
    pub fn compute_size(num_series: usize) -> ByteSize {
        assert!(num_series > 0, "a descriptor encodes at least one series");
        WORD_SIZE + num_series * SERIES_BYTES
    }

    /// byte size of a repeating descriptor with the given number of items
    /// (the first item shares the single series slot, every further item
    /// adds one word)
    pub fn compute_size_repeating(num_items: usize) -> ByteSize {
        assert!(num_items > 0, "a descriptor encodes at least one series");
        WORD_SIZE + SERIES_BYTES + (num_items - 1) * ITEM_BYTES
    }

    /// builds a plain descriptor from runs of reference slots, lowest
    /// offset first. `base_size` is the byte size of a base instance of
    /// the type; each run stores `nslots * POINTER_SIZE - base_size` as
    /// its adjusted size.
    pub fn new_plain(owner: TypeID, base_size: ByteSize, runs: &[PtrRun]) -> GCDesc {
        assert!(!runs.is_empty(), "a descriptor encodes at least one series");
        assert!(
            base_size % POINTER_SIZE == 0,
            "unaligned base size: {}",
            base_size
        );

        let mut block = Vec::with_capacity(2 * runs.len() + 1);
        let mut last_end = 0;
        for run in runs {
            assert!(
                run.offset % POINTER_SIZE == 0,
                "unaligned series offset: {}",
                run.offset
            );
            assert!(
                run.offset >= last_end,
                "series out of order or overlapping at offset {}",
                run.offset
            );
            last_end = run.offset + run.nslots * POINTER_SIZE;

            let adjusted = (run.nslots * POINTER_SIZE) as ByteOffset - base_size as ByteOffset;
            block.push(adjusted as Word);
            block.push(run.offset as Word);
        }
        block.push(runs.len() as Word);

        GCDesc {
            owner: owner,
            block: block.into_boxed_slice()
        }
    }

    /// builds a repeating descriptor for an array whose elements follow
    /// the given item pattern, starting at `start_offset` in the first
    /// element. Item 0 is written into the series slot, later items below
    /// it.
    pub fn new_repeating(owner: TypeID, start_offset: ByteSize, items: &[SeriesItem]) -> GCDesc {
        let k = items.len();
        assert!(k > 0, "a descriptor encodes at least one series");
        assert!(
            start_offset % POINTER_SIZE == 0,
            "unaligned series offset: {}",
            start_offset
        );
        for item in items {
            assert!(item.nptrs() > 0, "series item without pointer slots: {:?}", item);
        }

        let mut block = Vec::with_capacity(k + 2);
        for j in (1..k).rev() {
            block.push(items[j].as_word());
        }
        block.push(items[0].as_word());
        block.push(start_offset as Word);
        block.push((-(k as isize)) as Word);

        GCDesc {
            owner: owner,
            block: block.into_boxed_slice()
        }
    }

    /// the signed series count: positive counts normal series, negative
    /// counts the items of a repeating descriptor
    #[inline(always)]
    pub fn num_series(&self) -> isize {
        let n = self.block[self.block.len() - 1] as isize;
        debug_assert!(n != 0, "descriptor with a zero series count");
        n
    }

    /// is this the descriptor of an array of mixed-content elements?
    #[inline(always)]
    pub fn is_repeating(&self) -> bool {
        self.num_series() < 0
    }

    /// byte size of the encoded block, derived from the count word alone
    pub fn size(&self) -> ByteSize {
        let n = self.num_series();
        let size = if n > 0 {
            GCDesc::compute_size(n as usize)
        } else {
            GCDesc::compute_size_repeating((-n) as usize)
        };
        debug_assert_eq!(size, self.block.len() * WORD_SIZE);
        size
    }

    /// the type descriptor this GC descriptor belongs to
    #[inline(always)]
    pub fn owner(&self) -> TypeID {
        self.owner
    }

    /// lowest address of the encoded block (the block top, where the
    /// count word ends, is `gc_data_start() + size()`)
    pub fn gc_data_start(&self) -> Address {
        Address::from_ptr(self.block.as_ptr())
    }

    /// the raw encoded words, lowest address first
    pub fn encoded_words(&self) -> &[Word] {
        &self.block
    }

    /// the mode-tagged payload view
    #[inline(always)]
    pub fn series(&self) -> SeriesBlock {
        let n = self.num_series();
        if n > 0 {
            SeriesBlock::Plain(PlainSeries {
                words: &self.block[..2 * (n as usize)]
            })
        } else {
            SeriesBlock::Repeating(RepeatSeries {
                words: &self.block[..self.block.len() - 1]
            })
        }
    }

    /// the plain-mode view; panics on a repeating descriptor
    pub fn plain(&self) -> PlainSeries {
        match self.series() {
            SeriesBlock::Plain(s) => s,
            SeriesBlock::Repeating(_) => panic!("plain() on a repeating descriptor")
        }
    }

    /// the repeating-mode view; panics on a plain descriptor
    pub fn repeating(&self) -> RepeatSeries {
        match self.series() {
            SeriesBlock::Repeating(r) => r,
            SeriesBlock::Plain(_) => panic!("repeating() on a plain descriptor")
        }
    }

    /// total number of reference slots in an instance. `object_size` is
    /// the instance's total byte size; `num_components` is its element
    /// count (irrelevant for plain descriptors, pass 1). Lock-free and
    /// allocation-free: tracers call this concurrently.
    #[inline(always)]
    pub fn num_pointers(&self, object_size: ByteSize, num_components: usize) -> usize {
        match self.series() {
            SeriesBlock::Plain(s) => {
                let mut n = 0;
                // highest series first, down to the lowest
                let mut i = s.len();
                while i > 0 {
                    i -= 1;
                    n += s.at(i).slot_count(object_size);
                }
                n
            }
            SeriesBlock::Repeating(r) => {
                let mut n = 0;
                for j in 0..r.len() {
                    n += r.item(j).nptrs() as usize;
                }
                n * num_components
            }
        }
    }

    /// iterates the byte offsets (from the object base) of every
    /// reference slot in an instance, without allocating. Plain
    /// descriptors walk series highest to lowest; repeating descriptors
    /// walk the item pattern per component, in declaration order.
    pub fn slot_offsets(&self, object_size: ByteSize, num_components: usize) -> SlotOffsets {
        let walk = match self.series() {
            SeriesBlock::Plain(s) => Walk::Plain {
                series: s,
                object_size: object_size,
                next_series: s.len(),
                ptrs_left: 0,
                cursor: 0
            },
            SeriesBlock::Repeating(r) => Walk::Repeating {
                items: r,
                components_left: num_components,
                item: 0,
                ptrs_left: r.item(0).nptrs() as usize,
                cursor: r.start_offset()
            }
        };
        SlotOffsets { walk: walk }
    }
}

impl fmt::Debug for GCDesc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.series() {
            SeriesBlock::Plain(s) => {
                write!(f, "GCDesc(type {}, {} series:", self.owner, s.len())?;
                for series in s.iter() {
                    write!(f, " {:?}", series)?;
                }
                write!(f, ")")
            }
            SeriesBlock::Repeating(r) => {
                write!(
                    f,
                    "GCDesc(type {}, repeating at offset {}:",
                    self.owner,
                    r.start_offset()
                )?;
                for j in 0..r.len() {
                    write!(f, " {:?}", r.item(j))?;
                }
                write!(f, ")")
            }
        }
    }
}

/// the series of a plain descriptor. Position 0 is the lowest series;
/// the highest series sits next to the count word.
#[derive(Copy, Clone)]
pub struct PlainSeries<'a> {
    words: &'a [Word]
}

impl<'a> PlainSeries<'a> {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len() >> 1
    }

    /// series at the given position, counting up from the lowest
    #[inline(always)]
    pub fn at(&self, i: usize) -> GCSeries {
        GCSeries::new(self.words[2 * i] as ByteOffset, self.words[2 * i + 1])
    }

    pub fn lowest(&self) -> GCSeries {
        self.at(0)
    }

    pub fn highest(&self) -> GCSeries {
        self.at(self.len() - 1)
    }

    /// iterates series from the highest to the lowest
    pub fn iter(&self) -> PlainSeriesIter<'a> {
        PlainSeriesIter {
            series: *self,
            next: self.len()
        }
    }
}

pub struct PlainSeriesIter<'a> {
    series: PlainSeries<'a>,
    next: usize
}

impl<'a> Iterator for PlainSeriesIter<'a> {
    type Item = GCSeries;

    fn next(&mut self) -> Option<GCSeries> {
        if self.next == 0 {
            None
        } else {
            self.next -= 1;
            Some(self.series.at(self.next))
        }
    }
}

/// the item pattern of a repeating descriptor
#[derive(Copy, Clone)]
pub struct RepeatSeries<'a> {
    words: &'a [Word]
}

impl<'a> RepeatSeries<'a> {
    /// number of items in the pattern
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len() - 1
    }

    /// item j of the pattern. Item 0 occupies the series slot itself (the
    /// highest item address); later items sit at lower addresses, so the
    /// declaration order walks the block downwards.
    #[inline(always)]
    pub fn item(&self, j: usize) -> SeriesItem {
        SeriesItem::from_word(self.words[self.len() - 1 - j])
    }

    /// offset of the first reference slot of the first element
    #[inline(always)]
    pub fn start_offset(&self) -> ByteSize {
        self.words[self.words.len() - 1]
    }

    /// iterates items in declaration order (item 0 first)
    pub fn iter(&self) -> RepeatItemIter<'a> {
        RepeatItemIter {
            series: *self,
            next: 0
        }
    }
}

pub struct RepeatItemIter<'a> {
    series: RepeatSeries<'a>,
    next: usize
}

impl<'a> Iterator for RepeatItemIter<'a> {
    type Item = SeriesItem;

    fn next(&mut self) -> Option<SeriesItem> {
        if self.next == self.series.len() {
            None
        } else {
            let item = self.series.item(self.next);
            self.next += 1;
            Some(item)
        }
    }
}

enum Walk<'a> {
    Plain {
        series: PlainSeries<'a>,
        object_size: ByteSize,
        next_series: usize,
        ptrs_left: usize,
        cursor: ByteSize
    },
    Repeating {
        items: RepeatSeries<'a>,
        components_left: usize,
        item: usize,
        ptrs_left: usize,
        cursor: ByteSize
    }
}

/// iterator over the reference-slot offsets of one instance
/// (see GCDesc::slot_offsets)
pub struct SlotOffsets<'a> {
    walk: Walk<'a>
}

impl<'a> Iterator for SlotOffsets<'a> {
    type Item = ByteSize;

    fn next(&mut self) -> Option<ByteSize> {
        match self.walk {
            Walk::Plain {
                series,
                object_size,
                ref mut next_series,
                ref mut ptrs_left,
                ref mut cursor
            } => {
                loop {
                    if *ptrs_left > 0 {
                        let ret = *cursor;
                        *cursor += POINTER_SIZE;
                        *ptrs_left -= 1;
                        return Some(ret);
                    }
                    if *next_series == 0 {
                        return None;
                    }
                    *next_series -= 1;
                    let s = series.at(*next_series);
                    *ptrs_left = s.slot_count(object_size);
                    *cursor = s.offset();
                }
            }
            Walk::Repeating {
                items,
                ref mut components_left,
                ref mut item,
                ref mut ptrs_left,
                ref mut cursor
            } => {
                loop {
                    if *components_left == 0 {
                        return None;
                    }
                    if *ptrs_left > 0 {
                        let ret = *cursor;
                        *cursor += POINTER_SIZE;
                        *ptrs_left -= 1;
                        return Some(ret);
                    }
                    // current item exhausted: skip its scalar bytes, then
                    // move on to the next item, wrapping to the next
                    // component after the last one
                    *cursor += items.item(*item).skip() as ByteSize;
                    *item += 1;
                    if *item == items.len() {
                        *item = 0;
                        *components_left -= 1;
                    }
                    *ptrs_left = items.item(*item).nptrs() as usize;
                }
            }
        }
    }
}

#[cfg(test)]
mod descriptor_layout {
    use super::*;
    use utils::{Address, WORD_SIZE};

    const NO_TYPE: TypeID = 0;

    #[test]
    fn test_compute_size() {
        assert_eq!(GCDesc::compute_size(1), WORD_SIZE + SERIES_BYTES);
        assert_eq!(GCDesc::compute_size(4), WORD_SIZE + 4 * SERIES_BYTES);
    }

    #[test]
    fn test_compute_size_repeating() {
        assert_eq!(GCDesc::compute_size_repeating(1), WORD_SIZE + SERIES_BYTES);
        assert_eq!(
            GCDesc::compute_size_repeating(3),
            WORD_SIZE + SERIES_BYTES + 2 * ITEM_BYTES
        );
    }

    #[test]
    #[should_panic]
    fn test_compute_size_zero() {
        GCDesc::compute_size(0);
    }

    #[test]
    #[should_panic]
    fn test_compute_size_repeating_zero() {
        GCDesc::compute_size_repeating(0);
    }

    #[test]
    fn test_plain_layout() {
        let desc = GCDesc::new_plain(
            NO_TYPE,
            40,
            &[
                PtrRun { offset: 8, nslots: 1 },
                PtrRun { offset: 24, nslots: 2 }
            ]
        );

        assert_eq!(desc.num_series(), 2);
        assert!(!desc.is_repeating());
        assert_eq!(desc.size(), GCDesc::compute_size(2));

        let words = desc.encoded_words();
        assert_eq!(words.len(), 5);
        // count word last, lowest series first
        assert_eq!(words[4] as isize, 2);
        assert_eq!(words[1], 8);
        assert_eq!(words[3], 24);

        let plain = desc.plain();
        assert_eq!(plain.lowest().offset(), 8);
        assert_eq!(plain.highest().offset(), 24);
        assert_eq!(plain.highest().slot_count(40), 2);
    }

    #[test]
    fn test_repeating_layout() {
        let desc = GCDesc::new_repeating(
            NO_TYPE,
            16,
            &[
                SeriesItem::new(1, 0),
                SeriesItem::new(2, 4),
                SeriesItem::new(3, 8)
            ]
        );

        assert_eq!(desc.num_series(), -3);
        assert!(desc.is_repeating());
        assert_eq!(desc.size(), GCDesc::compute_size_repeating(3));

        // items are laid out in reverse: item 2 at the lowest address,
        // item 0 in the series slot next to the start offset
        let words = desc.encoded_words();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SeriesItem::new(3, 8).as_word());
        assert_eq!(words[1], SeriesItem::new(2, 4).as_word());
        assert_eq!(words[2], SeriesItem::new(1, 0).as_word());
        assert_eq!(words[3], 16);
        assert_eq!(words[4] as isize, -3);

        let rep = desc.repeating();
        assert_eq!(rep.len(), 3);
        assert_eq!(rep.start_offset(), 16);
        assert_eq!(rep.item(0), SeriesItem::new(1, 0));
        assert_eq!(rep.item(2), SeriesItem::new(3, 8));
    }

    #[test]
    fn test_gc_data_start() {
        let desc = GCDesc::new_plain(NO_TYPE, 24, &[PtrRun { offset: 8, nslots: 1 }]);
        let words = desc.encoded_words();

        assert_eq!(desc.gc_data_start(), Address::from_ptr(words.as_ptr()));
        assert_eq!(
            desc.gc_data_start() + desc.size(),
            Address::from_ptr(words.as_ptr()) + words.len() * WORD_SIZE
        );
    }

    #[test]
    fn test_series_iter_order() {
        let desc = GCDesc::new_plain(
            NO_TYPE,
            40,
            &[
                PtrRun { offset: 8, nslots: 1 },
                PtrRun { offset: 24, nslots: 2 }
            ]
        );

        let offsets: Vec<ByteSize> = desc.plain().iter().map(|s| s.offset()).collect();
        assert_eq!(offsets, vec![24, 8]);
    }

    #[test]
    #[should_panic]
    fn test_plain_view_on_repeating() {
        let desc = GCDesc::new_repeating(NO_TYPE, 16, &[SeriesItem::new(2, 4)]);
        desc.plain();
    }

    #[test]
    #[should_panic]
    fn test_no_series() {
        GCDesc::new_plain(NO_TYPE, 24, &[]);
    }

    #[test]
    #[should_panic]
    fn test_no_series_repeating() {
        GCDesc::new_repeating(NO_TYPE, 16, &[]);
    }

    #[test]
    fn test_descriptor_is_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GCDesc>();
    }
}

#[cfg(test)]
mod pointer_counting {
    use super::*;
    use utils::POINTER_SIZE;

    const NO_TYPE: TypeID = 0;

    #[test]
    fn test_fixed_type() {
        // 24-byte type with one reference at offset 8
        let desc = GCDesc::new_plain(NO_TYPE, 24, &[PtrRun { offset: 8, nslots: 1 }]);

        assert_eq!(desc.num_pointers(24, 1), 1);
    }

    #[test]
    fn test_ref_array() {
        // reference array: 16-byte base, one series covering the elements
        let desc = GCDesc::new_plain(NO_TYPE, 16, &[PtrRun { offset: 16, nslots: 0 }]);

        assert_eq!(desc.num_pointers(16, 0), 0);
        assert_eq!(desc.num_pointers(16 + 5 * POINTER_SIZE, 5), 5);
        // the component count does not enter the plain-mode walk
        assert_eq!(desc.num_pointers(16 + 5 * POINTER_SIZE, 1), 5);
    }

    #[test]
    fn test_repeating_array() {
        // elements of two pointer slots followed by 4 scalar bytes
        let desc = GCDesc::new_repeating(NO_TYPE, 16, &[SeriesItem::new(2, 4)]);

        assert_eq!(desc.num_pointers(0, 10), 20);
        assert_eq!(desc.num_pointers(0, 0), 0);
    }

    #[test]
    fn test_multi_series() {
        let desc = GCDesc::new_plain(
            NO_TYPE,
            40,
            &[
                PtrRun { offset: 8, nslots: 1 },
                PtrRun { offset: 24, nslots: 2 }
            ]
        );

        assert_eq!(desc.num_pointers(40, 1), 3);
    }

    #[test]
    fn test_idempotent() {
        let desc = GCDesc::new_repeating(NO_TYPE, 16, &[SeriesItem::new(2, 4)]);

        let first = desc.num_pointers(0, 10);
        for _ in 0..100 {
            assert_eq!(desc.num_pointers(0, 10), first);
        }
    }
}

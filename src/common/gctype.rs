#![allow(dead_code)]

use std::sync::Arc;
use utils::POINTER_SIZE;
use utils::{ByteSize, HalfWord, Word, HALF_WORD_MASK};
use objectmodel;
use objectmodel::{GCDesc, PtrRun, SeriesItem, TypeID};

use std::usize;
pub const GCTYPE_INIT_ID: TypeID = usize::MAX;

/// GCType: the type loader's symbolic view of where references live in a
/// type. `encode()` compiles it into the packed per-type descriptor that
/// tracers consume.
#[derive(Clone, Debug)]
pub struct GCType {
    pub id: TypeID,
    pub alignment: ByteSize,

    /// size of the non-repeating part (for arrays: the base, header
    /// included; for everything else: the whole object)
    pub base_size: ByteSize,
    pub base_refs: Option<RefPattern>,

    /// per-element layout for arrays
    pub elem_size: Option<ByteSize>,
    pub elem_refs: Option<RefPattern>
}

impl GCType {
    pub fn new_fix(
        id: TypeID,
        size: ByteSize,
        alignment: ByteSize,
        base_refs: Option<RefPattern>
    ) -> GCType {
        GCType {
            id: id,
            alignment: objectmodel::check_alignment(alignment),

            base_size: size,
            base_refs: base_refs,

            elem_size: None,
            elem_refs: None
        }
    }

    pub fn new_array(
        id: TypeID,
        base_size: ByteSize,
        alignment: ByteSize,
        elem_size: ByteSize,
        elem_refs: Option<RefPattern>
    ) -> GCType {
        GCType {
            id: id,
            alignment: objectmodel::check_alignment(alignment),

            base_size: base_size,
            base_refs: None,

            elem_size: Some(elem_size),
            elem_refs: elem_refs
        }
    }

    pub fn new_noreftype(size: ByteSize, align: ByteSize) -> GCType {
        GCType {
            id: GCTYPE_INIT_ID,
            alignment: align,

            base_size: size,
            base_refs: None,

            elem_size: None,
            elem_refs: None
        }
    }

    pub fn new_reftype() -> GCType {
        GCType {
            id: GCTYPE_INIT_ID,
            alignment: POINTER_SIZE,

            base_size: POINTER_SIZE,
            base_refs: Some(RefPattern::Map {
                offsets: vec![0],
                size: POINTER_SIZE
            }),

            elem_size: None,
            elem_refs: None
        }
    }

    #[inline(always)]
    pub fn is_array(&self) -> bool {
        self.elem_size.is_some()
    }

    pub fn size(&self) -> ByteSize {
        self.base_size
    }

    /// total size of an instance with the given element count
    pub fn instance_size(&self, length: usize) -> ByteSize {
        match self.elem_size {
            Some(elem) => self.base_size + elem * length,
            None => {
                debug_assert_eq!(length, 0);
                self.base_size
            }
        }
    }

    /// reference-slot offsets of the base part
    pub fn ref_offsets(&self) -> Vec<ByteSize> {
        let mut ret = vec![];

        match self.base_refs {
            Some(ref pattern) => {
                pattern.append_offsets(0, &mut ret);
            }
            None => {}
        }

        ret
    }

    /// reference-slot offsets inside one element (relative to the
    /// element's own start)
    pub fn elem_ref_offsets(&self) -> Vec<ByteSize> {
        let mut ret = vec![];

        match self.elem_refs {
            Some(ref pattern) => {
                pattern.append_offsets(0, &mut ret);
            }
            None => {}
        }

        ret
    }

    /// reference-slot offsets of a whole instance with the given element
    /// count (base part, then every element in order)
    pub fn instance_ref_offsets(&self, length: usize) -> Vec<ByteSize> {
        let mut ret = self.ref_offsets();

        if self.elem_refs.is_some() {
            let elem_size = self.elem_size.unwrap();
            let elem_offsets = self.elem_ref_offsets();
            for i in 0..length {
                let elem_base = self.base_size + i * elem_size;
                for off in elem_offsets.iter() {
                    ret.push(elem_base + off);
                }
            }
        }

        ret
    }

    /// compiles the symbolic layout into the packed descriptor. Returns
    /// None for types without reference slots (they own no descriptor).
    pub fn encode(&self) -> Option<GCDesc> {
        let base_offsets = self.ref_offsets();
        let elem_offsets = self.elem_ref_offsets();

        if base_offsets.is_empty() && elem_offsets.is_empty() {
            debug!("type {:?} has no reference slots, no descriptor", self);
            return None;
        }

        assert!(
            self.id != GCTYPE_INIT_ID,
            "encoding a descriptor for a type without an assigned id"
        );

        if elem_offsets.is_empty() {
            // a plain series recovers its run length from the instance
            // size, so a fixed run in the base part only encodes for types
            // whose instances never grow
            assert!(
                !self.is_array(),
                "type {} is an array with reference slots only in the base part",
                self.id
            );

            // plain descriptor: one series per maximal run in the base part
            let runs = coalesce_runs(&base_offsets);
            return Some(GCDesc::new_plain(self.id, self.base_size, &runs));
        }

        // the encoding describes either the base part or the elements,
        // never both (the loader never produces arrays with references in
        // the array header)
        assert!(
            base_offsets.is_empty(),
            "type {} has references in both the base part and the elements",
            self.id
        );

        let elem_size = self.elem_size.unwrap();
        let runs = coalesce_runs(&elem_offsets);

        // elements that are nothing but references collapse into a single
        // series that grows with the instance
        if runs.len() == 1 && runs[0].offset == 0 && runs[0].nslots * POINTER_SIZE == elem_size {
            return Some(GCDesc::new_plain(
                self.id,
                self.base_size,
                &[
                    PtrRun {
                        offset: self.base_size,
                        nslots: 0
                    }
                ]
            ));
        }

        // mixed elements: one item per run; an item's skip reaches the
        // next run, and the last item wraps around to the first run of
        // the next element
        let first = runs[0].offset;
        let mut items = vec![];
        for i in 0..runs.len() {
            let run_end = runs[i].offset + runs[i].nslots * POINTER_SIZE;
            let next = if i + 1 < runs.len() {
                runs[i + 1].offset
            } else {
                elem_size + first
            };
            assert!((runs[i].nslots as Word) <= HALF_WORD_MASK);
            assert!(((next - run_end) as Word) <= HALF_WORD_MASK);
            items.push(SeriesItem::new(
                runs[i].nslots as HalfWord,
                (next - run_end) as HalfWord
            ));
        }
        debug_assert_eq!(
            items
                .iter()
                .map(|item| item.nptrs() as usize * POINTER_SIZE + item.skip() as usize)
                .sum::<usize>(),
            elem_size,
            "item pattern of type {} does not cover the element",
            self.id
        );

        Some(GCDesc::new_repeating(self.id, self.base_size + first, &items))
    }
}

/// collapses sorted reference-slot offsets into maximal runs of adjacent
/// slots
pub fn coalesce_runs(offsets: &[ByteSize]) -> Vec<PtrRun> {
    let mut runs: Vec<PtrRun> = vec![];

    for &off in offsets.iter() {
        let extend = match runs.last() {
            Some(run) => run.offset + run.nslots * POINTER_SIZE == off,
            None => false
        };

        if extend {
            let last = runs.len() - 1;
            runs[last].nslots += 1;
        } else {
            runs.push(PtrRun {
                offset: off,
                nslots: 1
            });
        }
    }

    runs
}

#[derive(Clone, Debug)]
pub enum RefPattern {
    Map {
        offsets: Vec<ByteSize>,
        size: usize
    },
    NestedType(Vec<Arc<GCType>>),
    Repeat {
        pattern: Box<RefPattern>,
        count: usize
    }
}

impl RefPattern {
    pub fn size(&self) -> ByteSize {
        match self {
            &RefPattern::Map { size, .. } => size,
            &RefPattern::NestedType(ref vec) => {
                let mut size = 0;
                for ty in vec.iter() {
                    size += ty.size();
                }
                size
            }
            &RefPattern::Repeat { ref pattern, count } => pattern.size() * count
        }
    }

    pub fn append_offsets(&self, base: ByteSize, vec: &mut Vec<ByteSize>) -> ByteSize {
        match self {
            &RefPattern::Map { ref offsets, size } => {
                for off in offsets {
                    vec.push(base + off);
                }

                base + size
            }
            &RefPattern::NestedType(ref types) => {
                let mut cur_base = base;

                for ty in types {
                    let nested_offset = ty.ref_offsets();
                    let mut nested_offset = nested_offset.iter().map(|x| x + cur_base).collect();

                    vec.append(&mut nested_offset);

                    cur_base += ty.size();
                }

                cur_base
            }
            &RefPattern::Repeat { ref pattern, count } => {
                let mut cur_base = base;

                for _ in 0..count {
                    cur_base = pattern.append_offsets(cur_base, vec);
                }

                cur_base
            }
        }
    }
}

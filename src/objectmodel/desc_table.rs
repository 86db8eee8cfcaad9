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

#![allow(non_upper_case_globals)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use utils::mem::anon_mmap;
use utils::mem::memmap;
use utils::Address;
use utils::WORD_SIZE;

use objectmodel::desc::GCDesc;
use objectmodel::TypeID;
use objectmodel::N_TYPES;

const TRACE_DESC: bool = true;

/// the global descriptor table: one word-sized slot per type ID, holding
/// a pointer to the type's heap-allocated GCDesc (0 while unregistered).
///
/// The memory looks like this
///
/// |----------------|  <- desc_table_base points to this
/// | slot 0         |
/// | slot 1         |
/// | ...            |
/// | slot N_TYPES-1 |
/// |________________|
///
/// The type loader registers each descriptor exactly once, under the
/// region lock; tracers look descriptors up concurrently with a single
/// atomic load. Entries are never removed.
pub struct GlobalDescTable;

/// storing a pointer to the slot region
static desc_table_base: AtomicUsize = AtomicUsize::new(0);
/// save Mmap to keep the memory map alive
//  it is okay to use lock here, as the lookup path never touches this field
lazy_static! {
    static ref gdt_mmap: Mutex<Option<memmap::MmapMut>> = Mutex::new(None);
}

impl GlobalDescTable {
    /// maps the slot region and publishes its base address. Idempotent:
    /// later calls (other tests, other subsystems racing on startup) are
    /// no-ops.
    pub fn init() {
        let mut mmap_lock = gdt_mmap.lock().unwrap();
        if mmap_lock.is_some() {
            return;
        }

        let mut mmap = anon_mmap(N_TYPES * WORD_SIZE);
        let base = Address::from_mut_ptr(mmap.as_mut_ptr());
        desc_table_base.store(base.as_usize(), Ordering::Relaxed);

        info!("GC descriptor table allocated at {}", base);

        *mmap_lock = Some(mmap);
        trace!("GC descriptor table initialization done");
    }

    #[inline(always)]
    fn slot(tid: TypeID) -> &'static AtomicUsize {
        debug_assert!(tid < N_TYPES);
        let base = desc_table_base.load(Ordering::Relaxed);
        debug_assert!(base != 0, "descriptor table is not initialized");
        unsafe { &*((base as *const AtomicUsize).offset(tid as isize)) }
    }

    /// registers the descriptor for a type. Type-load path: serialized by
    /// the region lock, publishes the descriptor with a release store so
    /// that any tracer that sees the slot sees the finished block.
    pub fn insert(tid: TypeID, desc: GCDesc) -> &'static GCDesc {
        let mmap_lock = gdt_mmap.lock().unwrap();
        assert!(mmap_lock.is_some(), "descriptor table is not initialized");
        assert!(tid < N_TYPES, "type {} overflows the descriptor table", tid);
        assert_eq!(
            desc.owner(),
            tid,
            "descriptor owner does not match the registered type"
        );

        let slot = GlobalDescTable::slot(tid);
        assert!(
            slot.load(Ordering::Relaxed) == 0,
            "type {} already has a descriptor",
            tid
        );

        let ptr = Box::into_raw(Box::new(desc));
        slot.store(ptr as usize, Ordering::Release);

        let desc: &'static GCDesc = unsafe { &*ptr };
        trace_if!(TRACE_DESC, "register type {}: {:?}", tid, desc);
        desc
    }

    /// descriptor of a registered type. Lookup path: a single atomic
    /// load, no locking. Looking up an unregistered type is a bug in the
    /// type loader (checked in debug builds only).
    #[inline(always)]
    pub fn get(tid: TypeID) -> &'static GCDesc {
        let ptr = GlobalDescTable::slot(tid).load(Ordering::Acquire);
        debug_assert!(ptr != 0, "type {} has no descriptor", tid);
        unsafe { &*(ptr as *const GCDesc) }
    }

    /// checked lookup for paths that tolerate unregistered types
    pub fn try_get(tid: TypeID) -> Option<&'static GCDesc> {
        if tid >= N_TYPES || desc_table_base.load(Ordering::Relaxed) == 0 {
            return None;
        }
        let ptr = GlobalDescTable::slot(tid).load(Ordering::Acquire);
        if ptr == 0 {
            None
        } else {
            Some(unsafe { &*(ptr as *const GCDesc) })
        }
    }
}

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

//! The handle capability surface.
//!
//! A handle is an extra indirection slot that keeps (or weakly tracks) an
//! object on behalf of runtime code that cannot hold a raw reference
//! across collections. This module only pins down the vocabulary: handle
//! kinds, the scan callbacks, and the store/manager traits a concrete
//! handle table implements. No storage or scanning algorithm lives here.

use utils::{Address, ObjectReference, Word};

/// the scanned slot holds an interior pointer
pub const GC_CALL_INTERIOR: u32 = 0x1;
/// the scanned slot pins its target
pub const GC_CALL_PINNED: u32 = 0x2;

/// every handle kind the runtime can ask for
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleType {
    WeakShort = 0,
    WeakLong = 1,
    Strong = 2,
    Pinned = 3,
    Variable = 4,
    RefCounted = 5,
    Dependent = 6,
    AsyncPinned = 7,
    SizedRef = 8
}

impl HandleType {
    pub fn from_raw(raw: u32) -> Option<HandleType> {
        match raw {
            0 => Some(HandleType::WeakShort),
            1 => Some(HandleType::WeakLong),
            2 => Some(HandleType::Strong),
            3 => Some(HandleType::Pinned),
            4 => Some(HandleType::Variable),
            5 => Some(HandleType::RefCounted),
            6 => Some(HandleType::Dependent),
            7 => Some(HandleType::AsyncPinned),
            8 => Some(HandleType::SizedRef),
            _ => None
        }
    }
}

/// an opaque ticket for one handle slot
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ObjectHandle(pub Address);

impl ObjectHandle {
    pub fn null() -> ObjectHandle {
        ObjectHandle(Address::zero())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_zero()
    }
}

/// per-scan state threaded through every promotion callback
#[derive(Clone, Debug)]
pub struct ScanContext {
    pub thread_index: usize,
    pub promotion: bool,
    pub concurrent: bool
}

impl ScanContext {
    pub fn new(thread_index: usize) -> ScanContext {
        ScanContext {
            thread_index: thread_index,
            promotion: false,
            concurrent: false
        }
    }
}

/// promotion callback: slot address, scan state, GC_CALL_* flags
pub type PromoteFn = fn(slot: Address, sc: &mut ScanContext, flags: u32);

/// async-pin enumeration callback; returning false stops the walk
pub type AsyncPinEnumFn = fn(object: ObjectReference, context: Word) -> bool;

/// ref-counted handle trace callback
pub type HandleScanFn = fn(slot: Address, extra_info: Word, param1: Word, param2: Word);

/// one handle table. A store hands out handles, destroys them, and walks
/// its live slots for the tracer.
pub trait HandleStore {
    /// drops every handle in the store at once
    fn uproot(&mut self);

    fn contains(&self, handle: ObjectHandle) -> bool;

    fn create_handle(&mut self, object: ObjectReference, ty: HandleType) -> ObjectHandle;

    fn create_handle_affinitized(
        &mut self,
        object: ObjectReference,
        ty: HandleType,
        heap_to_affinitize_to: usize
    ) -> ObjectHandle;

    fn create_handle_with_extra_info(
        &mut self,
        object: ObjectReference,
        ty: HandleType,
        extra_info: Word
    ) -> ObjectHandle;

    fn create_dependent_handle(
        &mut self,
        primary: ObjectReference,
        secondary: ObjectReference
    ) -> ObjectHandle;

    fn relocate_async_pinned_handles(
        &mut self,
        target: &mut dyn HandleStore,
        clear_if_complete: fn(ObjectReference),
        set_handle: fn(ObjectReference, ObjectHandle)
    );

    fn enumerate_async_pinned_handles(&mut self, callback: AsyncPinEnumFn, context: Word) -> bool;

    /// feeds every reference-holding slot of this store to the promotion
    /// callback
    fn scan_handles(&self, pf: PromoteFn, sc: &mut ScanContext);

    fn destroy_handle(&mut self, handle: ObjectHandle, ty: HandleType);

    fn destroy_handle_of_unknown_type(&mut self, handle: ObjectHandle);
}

/// the process-wide handle facility: owns the global store, creates and
/// destroys per-domain stores, and implements the slot primitives
pub trait HandleManager {
    fn initialize(&mut self) -> bool;

    fn shutdown(&mut self);

    fn handle_context(&self, handle: ObjectHandle) -> Word;

    fn global_store(&mut self) -> &mut dyn HandleStore;

    fn create_store(&mut self) -> Box<dyn HandleStore>;

    fn destroy_store(&mut self, store: Box<dyn HandleStore>);

    fn create_global_handle(&mut self, object: ObjectReference, ty: HandleType) -> ObjectHandle;

    fn duplicate_handle(&mut self, handle: ObjectHandle) -> ObjectHandle;

    fn destroy_handle(&mut self, handle: ObjectHandle, ty: HandleType);

    fn destroy_handle_of_unknown_type(&mut self, handle: ObjectHandle);

    fn set_extra_info(&mut self, handle: ObjectHandle, ty: HandleType, extra_info: Word);

    fn extra_info(&self, handle: ObjectHandle) -> Word;

    fn store_object(&mut self, handle: ObjectHandle, object: ObjectReference);

    fn store_object_if_null(&mut self, handle: ObjectHandle, object: ObjectReference) -> bool;

    fn set_dependent_secondary(&mut self, handle: ObjectHandle, secondary: ObjectReference);

    fn dependent_secondary(&self, handle: ObjectHandle) -> ObjectReference;

    /// atomically swaps the handled object if it still equals `comparand`;
    /// returns the previous object either way
    fn compare_exchange_object(
        &mut self,
        handle: ObjectHandle,
        object: ObjectReference,
        comparand: ObjectReference
    ) -> ObjectReference;

    fn handle_type(&self, handle: ObjectHandle) -> HandleType;

    fn trace_ref_counted_handles(&mut self, callback: HandleScanFn, param1: Word, param2: Word);

    fn scan_handles(&mut self, pf: PromoteFn, sc: &mut ScanContext);
}

#[cfg(test)]
mod handle_surface {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use utils::{Address, ObjectReference};

    struct Entry {
        object: ObjectReference,
        ty: HandleType,
        live: bool
    }

    // a toy store backed by a Vec, enough to drive the trait through a
    // full create/scan/destroy cycle
    struct VecStore {
        entries: Vec<Entry>
    }

    impl VecStore {
        fn new() -> VecStore {
            VecStore { entries: vec![] }
        }

        fn index_of(handle: ObjectHandle) -> usize {
            handle.0.as_usize() - 1
        }
    }

    impl HandleStore for VecStore {
        fn uproot(&mut self) {
            for entry in self.entries.iter_mut() {
                entry.live = false;
            }
        }

        fn contains(&self, handle: ObjectHandle) -> bool {
            let i = VecStore::index_of(handle);
            i < self.entries.len() && self.entries[i].live
        }

        fn create_handle(&mut self, object: ObjectReference, ty: HandleType) -> ObjectHandle {
            self.entries.push(Entry {
                object: object,
                ty: ty,
                live: true
            });
            ObjectHandle(Address::from_usize(self.entries.len()))
        }

        fn create_handle_affinitized(
            &mut self,
            object: ObjectReference,
            ty: HandleType,
            _heap_to_affinitize_to: usize
        ) -> ObjectHandle {
            self.create_handle(object, ty)
        }

        fn create_handle_with_extra_info(
            &mut self,
            object: ObjectReference,
            ty: HandleType,
            _extra_info: Word
        ) -> ObjectHandle {
            self.create_handle(object, ty)
        }

        fn create_dependent_handle(
            &mut self,
            primary: ObjectReference,
            _secondary: ObjectReference
        ) -> ObjectHandle {
            self.create_handle(primary, HandleType::Dependent)
        }

        fn relocate_async_pinned_handles(
            &mut self,
            target: &mut dyn HandleStore,
            clear_if_complete: fn(ObjectReference),
            set_handle: fn(ObjectReference, ObjectHandle)
        ) {
            for entry in self.entries.iter_mut() {
                if entry.live && entry.ty == HandleType::AsyncPinned {
                    entry.live = false;
                    clear_if_complete(entry.object);
                    let moved = target.create_handle(entry.object, HandleType::AsyncPinned);
                    set_handle(entry.object, moved);
                }
            }
        }

        fn enumerate_async_pinned_handles(
            &mut self,
            callback: AsyncPinEnumFn,
            context: Word
        ) -> bool {
            for entry in self.entries.iter() {
                if entry.live && entry.ty == HandleType::AsyncPinned {
                    if !callback(entry.object, context) {
                        return false;
                    }
                }
            }
            true
        }

        fn scan_handles(&self, pf: PromoteFn, sc: &mut ScanContext) {
            for entry in self.entries.iter() {
                if entry.live && entry.ty == HandleType::Strong {
                    pf(Address::from_ptr(&entry.object), sc, 0);
                }
            }
        }

        fn destroy_handle(&mut self, handle: ObjectHandle, ty: HandleType) {
            let i = VecStore::index_of(handle);
            assert_eq!(self.entries[i].ty, ty);
            self.entries[i].live = false;
        }

        fn destroy_handle_of_unknown_type(&mut self, handle: ObjectHandle) {
            let i = VecStore::index_of(handle);
            self.entries[i].live = false;
        }
    }

    static SCANNED: AtomicUsize = AtomicUsize::new(0);

    fn count_slot(slot: Address, sc: &mut ScanContext, _flags: u32) {
        assert!(!slot.is_zero());
        assert!(sc.promotion);
        SCANNED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_scan_strong_handles() {
        let mut store = VecStore::new();

        let a = store.create_handle(ObjectReference::null(), HandleType::Strong);
        let b = store.create_handle(ObjectReference::null(), HandleType::Strong);
        let w = store.create_handle(ObjectReference::null(), HandleType::WeakShort);

        assert!(store.contains(a));
        assert!(store.contains(b));
        assert!(store.contains(w));

        store.destroy_handle(b, HandleType::Strong);
        assert!(!store.contains(b));

        let mut sc = ScanContext::new(0);
        sc.promotion = true;

        SCANNED.store(0, Ordering::SeqCst);
        store.scan_handles(count_slot, &mut sc);
        assert_eq!(SCANNED.load(Ordering::SeqCst), 1);
    }

    static CLEARED: AtomicUsize = AtomicUsize::new(0);
    static RELOCATED: AtomicUsize = AtomicUsize::new(0);

    fn count_cleared(_object: ObjectReference) {
        CLEARED.fetch_add(1, Ordering::SeqCst);
    }

    fn count_relocated(_object: ObjectReference, new_handle: ObjectHandle) {
        assert!(!new_handle.is_null());
        RELOCATED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_relocate_async_pinned() {
        let mut from = VecStore::new();
        let mut to = VecStore::new();

        let p = from.create_handle(ObjectReference::null(), HandleType::AsyncPinned);
        let q = from.create_handle(ObjectReference::null(), HandleType::AsyncPinned);
        let s = from.create_handle(ObjectReference::null(), HandleType::Strong);

        CLEARED.store(0, Ordering::SeqCst);
        RELOCATED.store(0, Ordering::SeqCst);
        from.relocate_async_pinned_handles(&mut to, count_cleared, count_relocated);

        // the async pinned handles moved, the strong one stayed behind
        assert!(!from.contains(p));
        assert!(!from.contains(q));
        assert!(from.contains(s));
        assert_eq!(CLEARED.load(Ordering::SeqCst), 2);
        assert_eq!(RELOCATED.load(Ordering::SeqCst), 2);

        assert_eq!(to.entries.len(), 2);
        assert!(
            to.entries
                .iter()
                .all(|e| e.live && e.ty == HandleType::AsyncPinned)
        );
    }

    #[test]
    fn test_handle_type_raw() {
        assert_eq!(HandleType::from_raw(3), Some(HandleType::Pinned));
        assert_eq!(HandleType::from_raw(8), Some(HandleType::SizedRef));
        assert_eq!(HandleType::from_raw(9), None);
        assert_eq!(HandleType::Dependent as u32, 6);
    }

    #[test]
    fn test_store_as_trait_object() {
        let mut store = VecStore::new();
        let h = {
            let obj: &mut dyn HandleStore = &mut store;
            obj.create_handle(ObjectReference::null(), HandleType::Pinned)
        };
        assert!(store.contains(h));
        assert!(!h.is_null());
        assert!(ObjectHandle::null().is_null());
    }
}

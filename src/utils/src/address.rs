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

use math;
use {ByteOffset, ByteSize};

use std::fmt;
use std::mem;
use std::ops::*;

/// Address encodes an arbitrary memory address. There is no guarantee
/// that the address is valid to access.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    /// creates an Address from a raw pointer
    pub fn from_ptr<T>(ptr: *const T) -> Address {
        unsafe { mem::transmute(ptr) }
    }

    /// creates an Address from a mutable raw pointer
    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        unsafe { mem::transmute(ptr) }
    }

    /// creates an Address from its numeric value
    pub fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    /// loads a value of type T from the address
    pub unsafe fn load<T: Copy>(&self) -> T {
        *(self.0 as *const T)
    }

    /// stores a value of type T to the address
    pub unsafe fn store<T>(&self, value: T) {
        *(self.0 as *mut T) = value;
    }

    /// aligns up the address to the given alignment
    pub fn align_up(&self, align: ByteSize) -> Address {
        Address(math::align_up(self.0, align))
    }

    /// is this address aligned to the given alignment?
    pub fn is_aligned_to(&self, align: ByteSize) -> bool {
        self.0 % align == 0
    }

    /// converts the Address to an ObjectReference
    /// (the caller needs to guarantee the address is valid, and points to an object)
    pub unsafe fn to_object_reference(&self) -> ObjectReference {
        ObjectReference(self.0)
    }

    /// converts the Address to a raw pointer
    pub fn to_ptr<T>(&self) -> *const T {
        self.0 as *const T
    }

    /// converts the Address to a mutable raw pointer
    pub fn to_ptr_mut<T>(&self) -> *mut T {
        self.0 as *mut T
    }

    /// the numeric value of the address
    pub fn as_usize(&self) -> usize {
        self.0
    }

    /// the zero address
    pub fn zero() -> Address {
        Address(0)
    }

    /// is this address zero?
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add<ByteSize> for Address {
    type Output = Address;
    fn add(self, bytes: ByteSize) -> Address {
        Address(self.0 + bytes)
    }
}

impl AddAssign<ByteSize> for Address {
    fn add_assign(&mut self, bytes: ByteSize) {
        self.0 += bytes;
    }
}

impl Add<ByteOffset> for Address {
    type Output = Address;
    fn add(self, offset: ByteOffset) -> Address {
        Address((self.0 as isize + offset) as usize)
    }
}

impl Sub<ByteSize> for Address {
    type Output = Address;
    fn sub(self, bytes: ByteSize) -> Address {
        Address(self.0 - bytes)
    }
}

impl Sub<Address> for Address {
    type Output = ByteSize;
    fn sub(self, other: Address) -> ByteSize {
        self.0 - other.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// ObjectReference encodes an address that is guaranteed to be an object
/// reference (or the null reference).
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectReference(usize);

impl ObjectReference {
    /// converts the ObjectReference to an Address
    pub fn to_address(&self) -> Address {
        Address(self.0)
    }

    /// the numeric value of the reference
    pub fn value(&self) -> usize {
        self.0
    }

    /// the null reference
    pub fn null() -> ObjectReference {
        ObjectReference(0)
    }

    /// is this the null reference?
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

#[cfg(test)]
mod address_tests {
    use super::*;
    use POINTER_SIZE;

    #[test]
    fn test_align_up() {
        let addr = Address::from_usize(0x1001);
        assert_eq!(addr.align_up(0x1000), Address::from_usize(0x2000));
        assert_eq!(addr.align_up(1), addr);
    }

    #[test]
    fn test_is_aligned() {
        assert!(Address::from_usize(0x1000).is_aligned_to(POINTER_SIZE));
        assert!(!Address::from_usize(0x1001).is_aligned_to(POINTER_SIZE));
    }

    #[test]
    fn test_arithmetic() {
        let base = Address::from_usize(0x1000);
        assert_eq!(base + 16usize, Address::from_usize(0x1010));
        assert_eq!(base + (-16isize), Address::from_usize(0xff0));
        assert_eq!(base - 0x10usize, Address::from_usize(0xff0));
        assert_eq!((base + 16usize) - base, 16);
    }

    #[test]
    fn test_load_store() {
        let mut slot: usize = 42;
        let addr = Address::from_mut_ptr(&mut slot as *mut usize);
        assert_eq!(unsafe { addr.load::<usize>() }, 42);
        unsafe { addr.store::<usize>(99) };
        assert_eq!(slot, 99);
    }
}

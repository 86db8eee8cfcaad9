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

//! # Utility crate that serves the GC object model
//!
//! It includes:
//!
//! * word/half-word type aliases and pointer-size constants
//! * Address/ObjectReference type
//! * utility functions for
//!   * memory
//!   * mathematics
//!   * bit operations

// these type aliases make source code easier to read

/// size in bits
pub type BitSize    = usize;
/// size in bytes
pub type ByteSize   = usize;
/// offset in byte
pub type ByteOffset = isize;
/// word value
pub type Word       = usize;

#[cfg(target_pointer_width = "64")]
pub const LOG_POINTER_SIZE : usize = 3;
#[cfg(target_pointer_width = "32")]
pub const LOG_POINTER_SIZE : usize = 2;

/// pointer size in byte
pub const POINTER_SIZE     : ByteSize = 1 << LOG_POINTER_SIZE;
/// word size in byte
pub const WORD_SIZE        : ByteSize = 1 << LOG_POINTER_SIZE;

/// half of a word. Several GC encodings pack two quantities into one word,
/// each occupying half of the pointer width.
#[cfg(target_pointer_width = "64")]
pub type HalfWord = u32;
#[cfg(target_pointer_width = "32")]
pub type HalfWord = u16;

/// half of the pointer width, in bits (POINTER_SIZE * 8 / 2)
pub const HALF_WORD_BITS : BitSize = POINTER_SIZE << 2;
/// mask for the lower half of a word
pub const HALF_WORD_MASK : Word = (1 << HALF_WORD_BITS) - 1;

/// mem module:
/// * anonymous memory mapping
/// * re-export memmap crate
pub mod mem;

/// mathematics utilities
pub mod math;

mod address;
/// Address represents an arbitrary memory address (valid or not)
pub use address::Address;
/// ObjectReference is a reference to an object (the address is guaranteed to be valid with an object)
pub use address::ObjectReference;

/// bit operations
pub mod bit_utils;

/// print trace!() log if condition is true (the condition should be a constant boolean)
#[macro_export]
macro_rules! trace_if {
    ($cond: expr, $($arg:tt)*) => {
        if $cond {
            trace!($($arg)*)
        }
    }
}

/// print info!() log if condition is true (the condition should be a constant boolean)
#[macro_export]
macro_rules! info_if {
    ($cond: expr, $($arg:tt)*) => {
        if $cond {
            info!($($arg)*)
        }
    }
}

/// print debug!() log if condition is true (the condition should be a constant boolean)
#[macro_export]
macro_rules! debug_if {
    ($cond: expr, $($arg:tt)*) => {
        if $cond {
            debug!($($arg)*)
        }
    }
}

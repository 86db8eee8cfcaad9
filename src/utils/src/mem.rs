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

/// cross-platform mmap crate
pub extern crate memmap;

use self::memmap::MmapMut;

use math;
use ByteSize;

/// page size for mapped regions
pub const PAGE_SIZE: ByteSize = 1 << 12;

/// maps an anonymous, zero-filled, read-write region of at least the given
/// size (rounded up to whole pages). The mapping lives as long as the
/// returned MmapMut.
pub fn anon_mmap(size: ByteSize) -> MmapMut {
    match MmapMut::map_anon(math::align_up(size, PAGE_SIZE)) {
        Ok(m) => m,
        Err(_) => panic!("failed to mmap {} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anon_mmap_zeroed() {
        let m = anon_mmap(16);

        assert!(m.len() >= PAGE_SIZE);
        assert!(m.iter().take(16).all(|&b| b == 0));
    }
}

// Copyright 2025 eraflo
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

use memmap2::MmapMut;
use std::ptr;
use std::sync::atomic::{AtomicU32, AtomicU64};

enum Backing {
    Mapped(#[allow(dead_code)] MmapMut),
    Heap(#[allow(dead_code)] Box<[u64]>),
}

/// A fixed block of memory that may be shared with another process.
///
/// Control words are only ever touched through atomics. Pixel and event
/// payloads are copied with plain memcpy; the channels guard those copies with
/// sequence words and ring counters.
pub(crate) struct Region {
    base: *mut u8,
    len: usize,
    _backing: Backing,
}

// SAFETY: the memory is only accessed through atomics or through copies whose
// visibility is ordered by the channel protocols built on top.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Wraps a writable mapping.
    pub(crate) fn mapped(mut map: MmapMut) -> Self {
        let base = map.as_mut_ptr();
        let len = map.len();
        Self {
            base,
            len,
            _backing: Backing::Mapped(map),
        }
    }

    /// Allocates zeroed process-local memory with the same layout rules.
    pub(crate) fn heap(len: usize) -> Self {
        let words = len.div_ceil(8);
        let mut storage = vec![0u64; words].into_boxed_slice();
        let base = storage.as_mut_ptr().cast::<u8>();
        Self {
            base,
            len,
            _backing: Backing::Heap(storage),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn atomic_u32(&self, offset: usize) -> &AtomicU32 {
        assert!(offset % 4 == 0 && offset + 4 <= self.len, "bad u32 offset {offset}");
        // SAFETY: in bounds and aligned (the base is page- or u64-aligned).
        unsafe { &*self.base.add(offset).cast::<AtomicU32>() }
    }

    pub(crate) fn atomic_u64(&self, offset: usize) -> &AtomicU64 {
        assert!(offset % 8 == 0 && offset + 8 <= self.len, "bad u64 offset {offset}");
        // SAFETY: as above.
        unsafe { &*self.base.add(offset).cast::<AtomicU64>() }
    }

    /// Copies `src` into the region at `offset`.
    pub(crate) fn copy_in(&self, offset: usize, src: &[u8]) {
        assert!(offset + src.len() <= self.len, "copy_in out of bounds");
        // SAFETY: bounds checked; the destination never overlaps `src`.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.base.add(offset), src.len()) }
    }

    /// Copies `dst.len()` bytes from the region at `offset`.
    pub(crate) fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        assert!(offset + dst.len() <= self.len, "copy_out out of bounds");
        // SAFETY: as above.
        unsafe { ptr::copy_nonoverlapping(self.base.add(offset), dst.as_mut_ptr(), dst.len()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn heap_region_is_zeroed_and_word_aligned() {
        let region = Region::heap(100);
        assert_eq!(region.len(), 100);
        assert_eq!(region.atomic_u64(8).load(Ordering::Relaxed), 0);
        assert_eq!(region.atomic_u32(96).load(Ordering::Relaxed), 0);
    }

    #[test]
    fn copies_land_at_the_offset() {
        let region = Region::heap(64);
        region.copy_in(4, &[1, 2, 3, 4]);
        assert_eq!(
            region.atomic_u32(4).load(Ordering::Relaxed),
            u32::from_ne_bytes([1, 2, 3, 4])
        );
        let mut out = [0u8; 6];
        region.copy_out(2, &mut out);
        assert_eq!(out, [0, 0, 1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "bad u32 offset")]
    fn misaligned_word_access_panics() {
        Region::heap(64).atomic_u32(2);
    }
}

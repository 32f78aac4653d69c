/*
 * Copyright 2020 UT OVERSEAS INC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use cache_line_size::CACHE_LINE_SIZE;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};

use crate::utils::types::Index;

/// True if `address` is a multiple of `alignment` (a power of two).
#[inline]
pub fn is_aligned(address: usize, alignment: usize) -> bool {
    address & (alignment - 1) == 0
}

fn cache_aligned_layout(size: Index) -> Layout {
    match Layout::from_size_align(size as usize, CACHE_LINE_SIZE) {
        Ok(layout) => layout,
        Err(err) => panic!("invalid aligned buffer size {}: {}", size, err),
    }
}

/// Allocate a zeroed buffer aligned on the cache size
pub fn alloc_buffer_aligned(size: Index) -> *mut u8 {
    let layout = cache_aligned_layout(size);
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        handle_alloc_error(layout);
    }
    ptr
}

/// Deallocate a buffer aligned on a cache size
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn dealloc_buffer_aligned(buff_ptr: *mut u8, len: Index) {
    unsafe {
        if cfg!(debug_assertions) {
            // dealloc markers for debug
            for i in 0..len {
                *buff_ptr.offset(i) = 0xff;
            }
        }

        dealloc(buff_ptr, cache_aligned_layout(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0, 8));
        assert!(is_aligned(64, 8));
        assert!(!is_aligned(12, 8));
        assert!(is_aligned(12, 4));
    }

    #[test]
    fn that_allocation_is_cache_aligned() {
        let len = (CACHE_LINE_SIZE * 2) as Index;
        let ptr = alloc_buffer_aligned(len);
        assert!(is_aligned(ptr as usize, CACHE_LINE_SIZE));
        dealloc_buffer_aligned(ptr, len);
    }
}

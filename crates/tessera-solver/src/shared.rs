//! Shared mutable access to per-particle and per-constraint buffers
//! from concurrent projection workers.

use std::marker::PhantomData;

/// Pointer wrapper enabling parallel access to disjoint slots of a slice.
///
/// # Safety
///
/// Constraint partitions guarantee that within a single partition no two
/// constraints share a particle, and every constraint id appears at most
/// once. Concurrent reads and writes therefore touch distinct slots, which
/// makes them sound. Outside a partition the borrow held by the wrapper
/// keeps the slice exclusively owned.
pub(crate) struct SharedSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _borrow: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for SharedSlice<'_, T> {}
unsafe impl<T: Send> Sync for SharedSlice<'_, T> {}

impl<'a, T: Copy> SharedSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _borrow: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `idx < len`, and no other worker writes slot `idx` concurrently.
    #[inline(always)]
    pub(crate) unsafe fn read(&self, idx: usize) -> T {
        debug_assert!(idx < self.len);
        *self.ptr.add(idx)
    }

    /// # Safety
    ///
    /// `idx < len`, and no other worker reads or writes slot `idx` concurrently.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, idx: usize, value: T) {
        debug_assert!(idx < self.len);
        *self.ptr.add(idx) = value;
    }
}

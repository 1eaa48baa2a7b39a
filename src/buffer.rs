//! Alignment helpers and page-aligned scratch memory.
//!
//! libwebp writes decoded rows straight into caller-owned memory when the
//! output buffer is marked external. [`ScratchBuffer`] is that memory: it is
//! sized from a [`DecodeDescriptor`], starts on a page boundary, and is
//! released when it goes out of scope, on every exit path.

use whereat::at;

use crate::descriptor::DecodeDescriptor;
use crate::error::{DecodeError, DecodeResult};
use crate::limits::ResourceLimits;

/// Row alignment of decoded output, in bytes.
///
/// A multiple of wgpu's `COPY_BYTES_PER_ROW_ALIGNMENT` (256), so rows can be
/// handed to texture copies unchanged.
pub const SCANLINE_ALIGNMENT: usize = 512;

/// Alignment and size granularity of scratch allocations.
pub const PAGE_SIZE: usize = 4096;

/// Round `value` up to the nearest multiple of `multiple`.
///
/// The result is the smallest multiple of `multiple` that is `>= value`, so
/// it always lies in `[value, value + multiple)`. An already aligned value is
/// returned unchanged.
///
/// # Panics
///
/// Panics if `multiple` is zero. Use [`checked_align_up`] for untrusted
/// inputs.
#[inline]
pub const fn align_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// Checked variant of [`align_up`]. Returns `None` if `multiple` is zero or
/// the result does not fit in `usize`.
#[inline]
pub const fn checked_align_up(value: usize, multiple: usize) -> Option<usize> {
    if multiple == 0 {
        return None;
    }
    value.div_ceil(multiple).checked_mul(multiple)
}

/// Compute the byte offset needed to align `ptr` to `align`.
fn align_offset(ptr: *const u8, align: usize) -> usize {
    let addr = ptr as usize;
    align_up(addr, align) - addr
}

/// Zeroed, page-aligned scratch memory for one decode call.
///
/// The backing allocation is over-sized by one page and the usable window
/// starts at the first page boundary inside it.
pub struct ScratchBuffer {
    storage: Vec<u8>,
    offset: usize,
    len: usize,
}

impl ScratchBuffer {
    /// Allocate at least `len` bytes, rounded up to [`PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfMemory`] if the allocation fails.
    pub fn new(len: usize) -> DecodeResult<Self> {
        let len =
            checked_align_up(len, PAGE_SIZE).ok_or_else(|| at!(DecodeError::OutOfMemory(len)))?;
        let total = len
            .checked_add(PAGE_SIZE)
            .ok_or_else(|| at!(DecodeError::OutOfMemory(len)))?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(total)
            .map_err(|_| at!(DecodeError::OutOfMemory(total)))?;
        storage.resize(total, 0);

        let offset = align_offset(storage.as_ptr(), PAGE_SIZE);
        Ok(Self {
            storage,
            offset,
            len,
        })
    }

    /// Allocate the scratch memory for decoding `descriptor` with rows of
    /// `stride` bytes: `align_up(stride * image_height, PAGE_SIZE)`.
    ///
    /// The size is checked against `limits.max_memory_bytes` before
    /// anything is allocated.
    pub fn for_descriptor(
        descriptor: &DecodeDescriptor,
        stride: usize,
        limits: &ResourceLimits,
    ) -> DecodeResult<Self> {
        let requested = stride
            .checked_mul(descriptor.image_height() as usize)
            .ok_or_else(|| at!(DecodeError::OutOfMemory(usize::MAX)))?;
        let len = checked_align_up(requested, PAGE_SIZE)
            .ok_or_else(|| at!(DecodeError::OutOfMemory(requested)))?;
        limits
            .check_memory(len as u64)
            .map_err(|e| at!(DecodeError::from(e)))?;
        Self::new(len)
    }

    /// Usable length in bytes (a multiple of [`PAGE_SIZE`]).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer has no usable bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The usable window.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    /// The usable window, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    /// Pointer to the first usable byte, for handing to libwebp.
    ///
    /// Valid for writes of [`len()`](Self::len) bytes for as long as `self`
    /// is alive and not otherwise borrowed.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.as_mut_slice().as_mut_ptr()
    }
}

impl core::fmt::Debug for ScratchBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScratchBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

//! Sample buffer lent to the transfer engine.
//!
//! Once a scan is running the engine writes the buffer behind the CPU's
//! back, so the target keeps no Rust reference to it. The buffer is only
//! reachable through volatile reads until [`AcquisitionTarget::into_buffer`]
//! hands the `&'static mut` back.

use core::ptr::NonNull;

use platform::Address;

/// A `'static` buffer of 16-bit samples the engine streams into.
pub struct AcquisitionTarget {
    ptr: NonNull<i16>,
    len: usize,
}

// SAFETY: the target uniquely owns its `'static` buffer; moving it to another
// thread moves that ownership.
unsafe impl Send for AcquisitionTarget {}

impl AcquisitionTarget {
    /// Take ownership of `buffer` for the lifetime of the scan.
    pub fn new(buffer: &'static mut [i16]) -> Self {
        let len = buffer.len();
        Self {
            ptr: NonNull::from(buffer).cast(),
            len,
        }
    }

    /// Slots in the buffer.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer has no slots.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of slot 0, as the engine sees it.
    pub fn address(&self) -> Address {
        Address::from_ptr(self.ptr.as_ptr().cast_const())
    }

    /// Copy the current contents into `out` and return how many samples were
    /// copied. Each slot is read once, volatile; a scan in progress may leave
    /// `out` holding samples of two consecutive scans.
    pub fn read(&self, out: &mut [i16]) -> usize {
        let count = out.len().min(self.len);
        for (index, slot) in out.iter_mut().take(count).enumerate() {
            // SAFETY: `index < self.len`, and the buffer stays alive and
            // unaliased for as long as `self` exists.
            *slot = unsafe { self.ptr.as_ptr().add(index).read_volatile() };
        }
        count
    }

    /// Slot `index`, if it exists.
    pub fn read_slot(&self, index: usize) -> Option<i16> {
        if index >= self.len {
            return None;
        }
        // SAFETY: bounds checked above.
        Some(unsafe { self.ptr.as_ptr().add(index).read_volatile() })
    }

    /// Give the buffer back.
    ///
    /// Only reachable once the scheduler has handed the target out again,
    /// which happens after its channel was released.
    pub fn into_buffer(self) -> &'static mut [i16] {
        // SAFETY: built from a `&'static mut [i16]` of exactly `len` slots and
        // no other reference to it was created since.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl core::fmt::Debug for AcquisitionTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AcquisitionTarget")
            .field("address", &self.address())
            .field("len", &self.len)
            .finish()
    }
}

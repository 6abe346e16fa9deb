//! Memory-mapped register access.
//!
//! Drivers never dereference peripheral addresses themselves. They go through
//! a [`RegisterBus`], which is a volatile MMIO window on target ([`MmioBus`])
//! and simulated register memory on the host (`mocks::MockBus`).

/// A byte address in the peripheral or RAM address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(usize);

impl Address {
    /// Wrap a raw address.
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Address of the object behind `ptr`.
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// Raw address value.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// `self + bytes`, or `None` if the address space would overflow.
    #[must_use]
    pub const fn offset(self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Whether the address is aligned to `align` bytes (`align` must be a power of two).
    #[must_use]
    pub const fn is_aligned(self, align: usize) -> bool {
        align != 0 && self.0 & align.wrapping_sub(1) == 0
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// 32-bit register read/write primitive.
///
/// Writes are full-word: a write replaces every field of the target register.
pub trait RegisterBus {
    /// Write `value` to the register at `address`.
    fn write(&mut self, address: Address, value: u32);

    /// Read the register at `address`.
    fn read(&self, address: Address) -> u32;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn write(&mut self, address: Address, value: u32) {
        (**self).write(address, value);
    }

    fn read(&self, address: Address) -> u32 {
        (**self).read(address)
    }
}

/// Volatile access to the real peripheral address space.
#[derive(Debug)]
pub struct MmioBus {
    _private: (),
}

impl MmioBus {
    /// Create the MMIO bus.
    ///
    /// # Safety
    ///
    /// Every address later passed to [`RegisterBus::write`] or
    /// [`RegisterBus::read`] must be a valid, 4-byte aligned peripheral
    /// register on the running device.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for MmioBus {
    fn write(&mut self, address: Address, value: u32) {
        // SAFETY: `MmioBus::new` requires every address to be a valid aligned register.
        unsafe { core::ptr::write_volatile(address.get() as *mut u32, value) }
    }

    fn read(&self, address: Address) -> u32 {
        // SAFETY: `MmioBus::new` requires every address to be a valid aligned register.
        unsafe { core::ptr::read_volatile(address.get() as *const u32) }
    }
}

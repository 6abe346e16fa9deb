//! Pin routing geometry.
//!
//! Pure arithmetic from (port, pin, bank) to the select register and field
//! that route the pin onto an analog bus. Nothing here touches hardware.

use platform::Address;

use crate::config;
use crate::error::AmuxError;

// ── Bank ─────────────────────────────────────────────────────────────────────

/// One of the two global analog buses a pin can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// AMUXBUS A
    A,
    /// AMUXBUS B
    B,
}

impl Bank {
    /// Select code that routes a pin to this bus.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::A => config::AMUXA_CODE,
            Self::B => config::AMUXB_CODE,
        }
    }
}

impl TryFrom<u32> for Bank {
    type Error = AmuxError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            config::AMUXA_CODE => Ok(Self::A),
            config::AMUXB_CODE => Ok(Self::B),
            other => Err(AmuxError::InvalidBank(other)),
        }
    }
}

impl core::fmt::Display for Bank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::A => "AMUXA",
            Self::B => "AMUXB",
        })
    }
}

// ── Port / pin select ────────────────────────────────────────────────────────

/// A GPIO port number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Port(u8);

impl Port {
    /// Wrap a port number.
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Port number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

/// Which of a port's two select registers holds a pin's field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubRegister {
    /// PORT_SEL0, pins 0-3.
    Sel0,
    /// PORT_SEL1, pins 4-7.
    Sel1,
}

/// Location of one pin's select field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinSelect {
    /// Register holding the field.
    pub register: SubRegister,
    /// Bit offset of the field inside the register.
    pub shift: u32,
}

// ── Connection ───────────────────────────────────────────────────────────────

/// One routable pin: the register to write and the value that routes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    port: Port,
    pin: u8,
    register: Address,
    value: u32,
    mask: u32,
}

impl Connection {
    /// Port of the routed pin.
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Pin number within the port.
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Select register written to route or release the pin.
    pub const fn register(&self) -> Address {
        self.register
    }

    /// Register value with only this pin routed to the bank.
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Bits of the pin's select field.
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Whether `word`, read from [`Connection::register`], routes this pin.
    pub const fn is_asserted_in(&self, word: u32) -> bool {
        word & self.mask == self.value
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Register geometry of a routing matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RoutingLayout {
    /// First routing port block.
    pub base: usize,
    /// Bytes between port blocks.
    pub port_stride: usize,
    /// Offset of the second select register within a block.
    pub sel1_offset: usize,
    /// First GPIO port block, for [`RoutingLayout::port_of`].
    pub gpio_base: usize,
    /// Bytes between GPIO port blocks.
    pub gpio_stride: usize,
    /// Pins per port.
    pub pins_per_port: u8,
    /// Pin fields per select register.
    pub pins_per_register: u8,
    /// Width of a pin field in bits.
    pub field_bits: u8,
}

impl RoutingLayout {
    /// PSoC 6 HSIOM.
    pub const PSOC6: Self = Self {
        base: config::HSIOM_BASE,
        port_stride: config::HSIOM_PORT_STRIDE,
        sel1_offset: config::SEL1_OFFSET,
        gpio_base: config::GPIO_BASE,
        gpio_stride: config::GPIO_PORT_STRIDE,
        pins_per_port: config::PINS_PER_PORT,
        pins_per_register: config::PINS_PER_REGISTER,
        field_bits: config::FIELD_BITS,
    };

    /// Select register and field offset of `pin`.
    #[must_use]
    pub fn locate(&self, pin: u8) -> Option<PinSelect> {
        if pin >= self.pins_per_port {
            return None;
        }
        let register = match pin.checked_div(self.pins_per_register)? {
            0 => SubRegister::Sel0,
            1 => SubRegister::Sel1,
            _ => return None,
        };
        let slot = pin.checked_rem(self.pins_per_register)?;
        let shift = u32::from(slot).checked_mul(u32::from(self.field_bits))?;
        let end = shift.checked_add(u32::from(self.field_bits))?;
        (end <= u32::BITS).then_some(PinSelect { register, shift })
    }

    /// Address of a port's select register.
    #[must_use]
    pub fn register(&self, port: Port, sub: SubRegister) -> Option<Address> {
        let block = usize::from(port.number()).checked_mul(self.port_stride)?;
        let offset = match sub {
            SubRegister::Sel0 => block,
            SubRegister::Sel1 => block.checked_add(self.sel1_offset)?,
        };
        Address::new(self.base).offset(offset)
    }

    /// Port whose GPIO register block starts at `gpio`.
    #[must_use]
    pub fn port_of(&self, gpio: Address) -> Option<Port> {
        let offset = gpio.get().checked_sub(self.gpio_base)?;
        if offset.checked_rem(self.gpio_stride)? != 0 {
            return None;
        }
        let number = offset.checked_div(self.gpio_stride)?;
        u8::try_from(number).ok().map(Port::new)
    }

    /// Mask of a field starting at `shift`.
    #[must_use]
    pub fn field_mask(&self, shift: u32) -> u32 {
        let ones = 1u32
            .checked_shl(u32::from(self.field_bits))
            .map_or(u32::MAX, |bit| bit.wrapping_sub(1));
        ones.checked_shl(shift).unwrap_or(0)
    }

    /// Connection routing `pin` of `port` to `bank`.
    #[must_use]
    pub fn connection(&self, port: Port, pin: u8, bank: Bank) -> Option<Connection> {
        let select = self.locate(pin)?;
        let mask = self.field_mask(select.shift);
        Some(Connection {
            port,
            pin,
            register: self.register(port, select.register)?,
            value: bank.code().checked_shl(select.shift)? & mask,
            mask,
        })
    }
}

impl Default for RoutingLayout {
    fn default() -> Self {
        Self::PSOC6
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pins_split_across_select_registers() {
        let layout = RoutingLayout::PSOC6;
        assert_eq!(
            layout.locate(0),
            Some(PinSelect { register: SubRegister::Sel0, shift: 0 })
        );
        assert_eq!(
            layout.locate(3),
            Some(PinSelect { register: SubRegister::Sel0, shift: 24 })
        );
        assert_eq!(
            layout.locate(4),
            Some(PinSelect { register: SubRegister::Sel1, shift: 0 })
        );
        assert_eq!(
            layout.locate(6),
            Some(PinSelect { register: SubRegister::Sel1, shift: 16 })
        );
        assert_eq!(layout.locate(8), None);
    }

    #[test]
    fn register_addresses() {
        let layout = RoutingLayout::PSOC6;
        assert_eq!(
            layout.register(Port::new(9), SubRegister::Sel0),
            Some(Address::new(0x4031_0090))
        );
        assert_eq!(
            layout.register(Port::new(9), SubRegister::Sel1),
            Some(Address::new(0x4031_0094))
        );
    }

    #[test]
    fn connection_value_is_bank_code_in_pin_field() {
        let layout = RoutingLayout::PSOC6;
        let c = layout.connection(Port::new(10), 5, Bank::B).unwrap();
        assert_eq!(c.register(), Address::new(0x4031_00A4));
        assert_eq!(c.value(), 0x0000_0500);
        assert_eq!(c.mask(), 0x0000_FF00);
        assert!(c.is_asserted_in(0x0000_0500));
        assert!(!c.is_asserted_in(0x0000_0400));

        let a = layout.connection(Port::new(0), 3, Bank::A).unwrap();
        assert_eq!(a.value(), 0x0400_0000);
    }

    #[test]
    fn port_from_gpio_block() {
        let layout = RoutingLayout::PSOC6;
        assert_eq!(layout.port_of(Address::new(0x4032_0480)), Some(Port::new(9)));
        assert_eq!(layout.port_of(Address::new(0x4032_0000)), Some(Port::new(0)));
        assert_eq!(layout.port_of(Address::new(0x4032_0484)), None);
        assert_eq!(layout.port_of(Address::new(0x4031_0000)), None);
    }

    #[test]
    fn bank_codes() {
        assert_eq!(Bank::try_from(4), Ok(Bank::A));
        assert_eq!(Bank::try_from(5), Ok(Bank::B));
        assert_eq!(Bank::try_from(6), Err(AmuxError::InvalidBank(6)));
        assert_eq!(Bank::B.code(), 5);
    }

    #[test]
    fn wide_fields_do_not_overflow() {
        let layout = RoutingLayout {
            field_bits: 16,
            pins_per_register: 4,
            ..RoutingLayout::PSOC6
        };
        // Pin 2 would start at bit 32.
        assert_eq!(layout.locate(2), None);
        assert_eq!(layout.field_mask(16), 0xFFFF_0000);
    }
}

//! Transfer descriptors and descriptor chains.
//!
//! A [`Descriptor`] is one programmed unit of work for an autonomous transfer
//! engine: move `count` elements from a source to a destination, then follow
//! `next`. Descriptors here are logical: successors are indices into the chain
//! and constant sources are carried inline as [`Endpoint::Immediate`]. A
//! [`TransferChannel`](crate::TransferChannel) implementation materializes them
//! into whatever layout its engine reads.
//!
//! ```text
//!  ┌────────┐ next ┌────────┐ next ┌────────┐
//!  │  [0]   │─────►│  [1]   │─────►│  [2]   │──┐
//!  └────────┘      └────────┘      └────────┘  │
//!      ▲                                       │
//!      └───────────────────────────────────────┘
//! ```

use crate::register::Address;

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Position of a descriptor inside its chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorId(u16);

impl DescriptorId {
    /// First descriptor of a chain.
    pub const HEAD: Self = Self(0);

    /// Wrap a raw descriptor index.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Convert a `usize` index, failing if it does not fit the id space.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok().map(Self)
    }

    /// Index into the chain's descriptor slice.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Descriptor fields ────────────────────────────────────────────────────────

/// Width of one transferred element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 8-bit
    Byte,
    /// 16-bit
    HalfWord,
    /// 32-bit
    Word,
}

impl DataWidth {
    /// Element size in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::HalfWord => 2,
            Self::Word => 4,
        }
    }

    /// Mask selecting the bits this width carries.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::HalfWord => 0xFFFF,
            Self::Word => u32::MAX,
        }
    }
}

/// Where a descriptor reads its elements from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// A constant. Every element reads the same value.
    Immediate(u32),
    /// Memory or a peripheral register.
    Address(Address),
}

/// How much work one input trigger performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerMode {
    /// One element per trigger. The descriptor completes after `count` triggers.
    Element,
    /// All remaining elements of the descriptor per trigger, then stop at `next`.
    Descriptor,
    /// All remaining elements, then continue straight into `next` within the
    /// same trigger. The successor's own mode decides where the trigger ends.
    Chain,
}

// ── Descriptor ───────────────────────────────────────────────────────────────

/// One unit of autonomous transfer work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Descriptor {
    /// Source of the elements.
    pub src: Endpoint,
    /// First destination element.
    pub dst: Address,
    /// Width read from the source.
    pub src_width: DataWidth,
    /// Width written to the destination (truncating or zero-extending).
    pub dst_width: DataWidth,
    /// Elements moved before the descriptor completes. Never zero.
    pub count: u16,
    /// Source advance per element, in elements of `src_width`.
    pub src_step: u16,
    /// Destination advance per element, in elements of `dst_width`.
    pub dst_step: u16,
    /// Work performed per trigger.
    pub trigger: TriggerMode,
    /// Successor once complete; `None` leaves the channel idle.
    pub next: Option<DescriptorId>,
}

impl Descriptor {
    /// Single full-word write of `value` to the register at `dst`.
    #[must_use]
    pub const fn register_write(dst: Address, value: u32) -> Self {
        Self {
            src: Endpoint::Immediate(value),
            dst,
            src_width: DataWidth::Word,
            dst_width: DataWidth::Word,
            count: 1,
            src_step: 0,
            dst_step: 0,
            trigger: TriggerMode::Element,
            next: None,
        }
    }

    /// Replace the trigger mode.
    #[must_use]
    pub const fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.trigger = trigger;
        self
    }

    /// Replace the successor.
    #[must_use]
    pub const fn with_next(mut self, next: Option<DescriptorId>) -> Self {
        self.next = next;
        self
    }

    /// Source address of element `element`, or `None` for an immediate source.
    #[must_use]
    pub fn src_address(&self, element: u16) -> Option<Address> {
        match self.src {
            Endpoint::Immediate(_) => None,
            Endpoint::Address(base) => stride(base, element, self.src_step, self.src_width),
        }
    }

    /// Destination address of element `element`.
    #[must_use]
    pub fn dst_address(&self, element: u16) -> Option<Address> {
        stride(self.dst, element, self.dst_step, self.dst_width)
    }
}

fn stride(base: Address, element: u16, step: u16, width: DataWidth) -> Option<Address> {
    let bytes = usize::from(element)
        .checked_mul(usize::from(step))?
        .checked_mul(width.bytes())?;
    base.offset(bytes)
}

// ── Chain ────────────────────────────────────────────────────────────────────

/// Reasons a descriptor slice is not an installable chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChainError {
    /// No descriptors.
    #[error("descriptor chain is empty")]
    Empty,
    /// More descriptors than [`DescriptorId`] can address.
    #[error("descriptor chain is too long")]
    TooLong,
    /// The head is not part of the chain.
    #[error("chain head is out of range")]
    HeadOutOfRange,
    /// A successor points outside the chain.
    #[error("descriptor {at} links to missing descriptor {next}")]
    DanglingNext {
        /// Descriptor holding the bad link.
        at: u16,
        /// The link target.
        next: u16,
    },
    /// A descriptor moves no elements.
    #[error("descriptor {at} has a zero element count")]
    ZeroCount {
        /// Offending descriptor.
        at: u16,
    },
}

/// A validated, borrowed descriptor chain with its entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorChain<'a> {
    descriptors: &'a [Descriptor],
    head: DescriptorId,
}

impl<'a> DescriptorChain<'a> {
    /// Validate `descriptors` as a chain entered at `head`.
    pub fn new(descriptors: &'a [Descriptor], head: DescriptorId) -> Result<Self, ChainError> {
        if descriptors.is_empty() {
            return Err(ChainError::Empty);
        }
        if DescriptorId::from_index(descriptors.len()).is_none() {
            return Err(ChainError::TooLong);
        }
        if head.index() >= descriptors.len() {
            return Err(ChainError::HeadOutOfRange);
        }
        for (index, descriptor) in descriptors.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            // Safety: length checked against the id space above.
            let at = index as u16;
            if descriptor.count == 0 {
                return Err(ChainError::ZeroCount { at });
            }
            if let Some(next) = descriptor.next {
                if next.index() >= descriptors.len() {
                    return Err(ChainError::DanglingNext { at, next: next.0 });
                }
            }
        }
        Ok(Self { descriptors, head })
    }

    /// Entry descriptor.
    #[must_use]
    pub const fn head(&self) -> DescriptorId {
        self.head
    }

    /// Number of descriptors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always `false`: an empty chain fails validation.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The underlying descriptors.
    #[must_use]
    pub const fn descriptors(&self) -> &'a [Descriptor] {
        self.descriptors
    }

    /// Descriptor at `id`.
    #[must_use]
    pub fn get(&self, id: DescriptorId) -> Option<&'a Descriptor> {
        self.descriptors.get(id.index())
    }

    /// Successor ids starting after `from`, ending where a descriptor has no
    /// successor. Cyclic chains yield forever.
    pub fn successors(&self, from: DescriptorId) -> impl Iterator<Item = DescriptorId> + 'a {
        let descriptors = self.descriptors;
        core::iter::successors(Some(from), move |id| {
            descriptors.get(id.index()).and_then(|d| d.next)
        })
        .skip(1)
    }

    /// Hops needed to come back to `from` by following successors, or `None`
    /// if `from` is not on a cycle.
    #[must_use]
    pub fn cycle_len(&self, from: DescriptorId) -> Option<usize> {
        self.successors(from)
            .take(self.descriptors.len())
            .position(|id| id == from)
            .and_then(|hops| hops.checked_add(1))
    }
}

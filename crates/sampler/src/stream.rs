//! The self-looping descriptor that moves results into the target.

use platform::{Address, DataWidth, Descriptor, DescriptorId, Endpoint, TriggerMode};

/// How conversion results map onto target slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamLayout {
    /// Every trigger copies result registers `0..n` into slots `0..n`.
    #[default]
    Burst,
    /// Every trigger copies result register 0 into the next slot, wrapping
    /// to slot 0 after `n` triggers. Fits one converter input fed by the
    /// multiplexer.
    Multiplexed,
}

impl StreamLayout {
    /// Result registers the layout reads.
    pub const fn result_registers(self, channels: u8) -> u8 {
        match self {
            Self::Burst => channels,
            Self::Multiplexed => 1,
        }
    }
}

/// Descriptor moving `channels` samples from `results` into `target`, then
/// returning to itself.
///
/// Sources are read as full result words and stored as 16-bit samples.
pub(crate) fn descriptor(
    layout: StreamLayout,
    results: Address,
    target: Address,
    channels: u16,
) -> Descriptor {
    let (src_step, trigger) = match layout {
        StreamLayout::Burst => (1, TriggerMode::Descriptor),
        StreamLayout::Multiplexed => (0, TriggerMode::Element),
    };
    Descriptor {
        src: Endpoint::Address(results),
        dst: target,
        src_width: DataWidth::Word,
        dst_width: DataWidth::HalfWord,
        count: channels,
        src_step,
        dst_step: 1,
        trigger,
        next: Some(DescriptorId::HEAD),
    }
}

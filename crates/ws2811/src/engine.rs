use crate::BUF_LEN;

/// Which half of the double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub(crate) fn index(self) -> usize {
        match self {
            Half::First => 0,
            Half::Second => 1,
        }
    }
}

/// GPIO set/reset byte lane for the LED pin.
///
/// The port's set/reset halfwords are written one byte at a time by the
/// DMA, so a pin mask living in the upper byte is shifted down and tagged
/// so the engine can address the upper lane instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinPattern {
    /// Byte written to the set/reset lane to move this pin.
    pub bit: u8,
    /// True when the pin sits in the upper byte of the port halfword.
    pub upper_lane: bool,
}

impl PinPattern {
    /// Derive the byte-lane pattern from a 16-bit port pin mask.
    ///
    /// A mask straddling both bytes cannot be clocked out one byte at a
    /// time; that is a wiring error, not a runtime condition.
    pub fn from_pin_mask(mask: u16) -> Self {
        if mask & 0xff00 != 0 {
            assert!(mask & 0x00ff == 0);
            Self { bit: (mask >> 8) as u8, upper_lane: true }
        } else {
            Self { bit: mask as u8, upper_lane: false }
        }
    }
}

/// Timer-plus-DMA back end that replays the two encoded halves
/// cyclically.
///
/// The hardware side runs two streams off one timer period: a
/// single-buffered stream that raises the pin at the start of every bit
/// period, and a double-buffered circular stream that clocks the encoded
/// fall patterns out. Each time the circular stream finishes a half, the
/// engine's interrupt glue must call
/// [`Ws2811::half_complete`](crate::Ws2811::half_complete) with that
/// half, then accept the refill handed back through [`submit`].
///
/// [`submit`]: TimingEngine::submit
pub trait TimingEngine {
    type Error: core::fmt::Debug;

    /// Configure the pin, program both streams with the pre-encoded
    /// halves, and start cyclic replay.
    fn arm(
        &mut self,
        pin: PinPattern,
        halves: [&[u8; BUF_LEN]; 2],
    ) -> Result<(), Self::Error>;

    /// Hand a refreshed half back to the hardware.
    fn submit(&mut self, half: Half, data: &[u8; BUF_LEN]);
}

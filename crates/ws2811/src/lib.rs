#![no_std]
//! WS2811 LED strip driver with all bit timing done in hardware.
//!
//! The wire protocol is encoded as pulse-fall times: every bit period the
//! pin goes high, and the moment it falls decides whether the strip sees
//! a `0` (early fall) or a `1` (late fall). The driver never touches the
//! pin per bit; it encodes pixel bytes into two fixed-size timing halves
//! that a [`TimingEngine`] (one timer, two DMA streams) replays
//! continuously, refilling each half as the hardware vacates it.
//!
//! Each half covers 6 pixels (24 bits at 2 bytes per bit, 288 bytes),
//! which is about 300 us of pixel data per refill.

mod engine;
mod errors;

pub use engine::{Half, PinPattern, TimingEngine};
pub use errors::ConfigError;
pub use smart_leds_trait::RGB8;

use heapless::Vec;

/// Bytes per DMA half: 6 pixels x 24 bits x 2 bytes per bit.
pub const BUF_LEN: usize = 6 * 24 * 2;

/// Hard cap on strip length.
pub const MAX_LEDS: usize = 1024;

/// WS2811 strip driver.
///
/// `set`/`set_all`/`trigger_update` are caller-context and non-reentrant;
/// `half_complete` is driven by the engine's completion events. Once a
/// frame is triggered, both halves belong to the refill path until
/// `update_in_progress` reads false again.
pub struct Ws2811<ENG: TimingEngine> {
    engine: ENG,
    pin: PinPattern,
    pixels: Vec<RGB8, MAX_LEDS>,
    halves: [[u8; BUF_LEN]; 2],
    /// Next pixel byte (r, g, b order) not yet encoded this frame.
    cursor: usize,
    source_done: bool,
    in_progress: bool,
}

impl<ENG: TimingEngine> Ws2811<ENG> {
    /// Allocate pixel state for `max_leds` LEDs, all black, and pre-arm
    /// both timing halves with the late-fall byte at every odd offset.
    ///
    /// Those odd bytes are written once here and never touched again:
    /// encoding a `1` bit is then a no-op, because the pre-armed byte
    /// already lets the pulse fall at the late position.
    pub fn new(
        engine: ENG,
        pin_mask: u16,
        max_leds: usize,
    ) -> Result<Self, ConfigError> {
        if max_leds == 0 || max_leds > MAX_LEDS {
            return Err(ConfigError::Capacity(max_leds));
        }

        let pin = PinPattern::from_pin_mask(pin_mask);

        let mut pixels = Vec::new();
        // Cannot fail: max_leds is within capacity.
        let _ = pixels.resize(max_leds, RGB8 { r: 0, g: 0, b: 0 });

        let mut halves = [[0u8; BUF_LEN]; 2];
        for half in halves.iter_mut() {
            for slot in half.chunks_exact_mut(2) {
                slot[1] = pin.bit;
            }
        }

        Ok(Self {
            engine,
            pin,
            pixels,
            halves,
            cursor: 0,
            source_done: false,
            in_progress: false,
        })
    }

    /// Number of LEDs configured at construction. Never zero.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True while a triggered frame is still draining.
    pub fn update_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Stage one pixel's colour. Takes effect at the next
    /// `trigger_update`.
    ///
    /// Indexing past the strip is a programmer error, not a runtime
    /// fault.
    pub fn set(&mut self, idx: usize, r: u8, g: u8, b: u8) {
        assert!(idx < self.pixels.len());

        self.pixels[idx] = RGB8 { r, g, b };
    }

    /// Currently staged colour of one pixel.
    pub fn pixel(&self, idx: usize) -> RGB8 {
        assert!(idx < self.pixels.len());

        self.pixels[idx]
    }

    /// Stage the same colour on every pixel.
    pub fn set_all(&mut self, r: u8, g: u8, b: u8) {
        for idx in 0..self.pixels.len() {
            self.set(idx, r, g, b);
        }
    }

    /// Start clocking the staged pixels out.
    ///
    /// A trigger while a frame is still draining is a no-op: the request
    /// coalesces into the in-flight frame, which keeps whatever pixel
    /// state it was triggered with. Callers must not assume every
    /// trigger emits a distinct frame.
    pub fn trigger_update(&mut self) -> Result<(), ENG::Error> {
        if self.in_progress {
            return Ok(());
        }

        self.in_progress = true;
        self.source_done = false;
        self.cursor = 0;

        // Both halves are encoded before the hardware sees either, so
        // replay can never outrun the refill at frame start.
        self.fill(Half::First);
        self.fill(Half::Second);

        self.engine.arm(self.pin, [&self.halves[0], &self.halves[1]])
    }

    /// Buffers-exchanged notification from the timing engine: the
    /// hardware has drained `half` and switched to the other one.
    ///
    /// Once a fill has exhausted the pixel source there is nothing left
    /// to encode. The halves then keep replaying stale repeat data,
    /// which the strip latches past harmlessly, and the frame is
    /// considered done.
    pub fn half_complete(&mut self, half: Half) {
        if !self.in_progress {
            return;
        }

        if self.source_done {
            self.in_progress = false;
            return;
        }

        self.source_done = self.fill(half);
        self.engine.submit(half, &self.halves[half.index()]);
    }

    /// Encode source bytes into one half until the half is full or the
    /// pixel source runs out. Returns true once the source is exhausted;
    /// any remaining slots keep their previous contents.
    ///
    /// A zero bit must make the pin fall early, so its even slot gets
    /// the pin byte. A one bit writes 0 there and the pre-armed odd slot
    /// produces the late fall.
    fn fill(&mut self, half: Half) -> bool {
        let total = self.pixels.len() * 3;

        let mut i = 0;
        while i < BUF_LEN && self.cursor < total {
            let byte = self.channel_byte(self.cursor);
            self.cursor += 1;

            let buf = &mut self.halves[half.index()];
            for bit in 0..8 {
                // Most significant bit first.
                buf[i + bit * 2] = if byte & (0x80 >> bit) == 0 {
                    self.pin.bit
                } else {
                    0
                };
            }

            i += 16;
        }

        self.cursor >= total
    }

    fn channel_byte(&self, cursor: usize) -> u8 {
        let px = self.pixels[cursor / 3];
        match cursor % 3 {
            0 => px.r,
            1 => px.g,
            _ => px.b,
        }
    }
}

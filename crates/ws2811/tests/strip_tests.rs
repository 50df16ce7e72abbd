use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use ws2811::{
    ConfigError, Half, PinPattern, TimingEngine, Ws2811, BUF_LEN, MAX_LEDS,
};

// ---------------------------------------------------------------------------
// Mock timing engine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EngineLog {
    /// Snapshot of pin + both halves at every `arm`.
    arms: Vec<(PinPattern, [Vec<u8>; 2])>,
    /// Snapshot of every refilled half handed back.
    submits: Vec<(Half, Vec<u8>)>,
}

#[derive(Clone)]
struct MockEngine {
    log: Rc<RefCell<EngineLog>>,
}

impl MockEngine {
    fn new() -> Self {
        Self { log: Rc::new(RefCell::new(EngineLog::default())) }
    }

    fn log(&self) -> Rc<RefCell<EngineLog>> {
        self.log.clone()
    }
}

impl TimingEngine for MockEngine {
    type Error = Infallible;

    fn arm(
        &mut self,
        pin: PinPattern,
        halves: [&[u8; BUF_LEN]; 2],
    ) -> Result<(), Infallible> {
        self.log
            .borrow_mut()
            .arms
            .push((pin, [halves[0].to_vec(), halves[1].to_vec()]));
        Ok(())
    }

    fn submit(&mut self, half: Half, data: &[u8; BUF_LEN]) {
        self.log.borrow_mut().submits.push((half, data.to_vec()));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PIN: u16 = 0x0008;
const PIN_BIT: u8 = 0x08;

fn strip(max_leds: usize) -> (Ws2811<MockEngine>, Rc<RefCell<EngineLog>>) {
    let engine = MockEngine::new();
    let log = engine.log();
    let strip = Ws2811::new(engine, PIN, max_leds).unwrap();
    (strip, log)
}

/// Expected 16-byte timing slot for one source byte, MSB first: zero
/// bits mark the early fall at the even offset, odd offsets carry the
/// pre-armed late fall.
fn encoded(byte: u8, pin: u8) -> [u8; 16] {
    let mut out = [0u8; 16];
    for bit in 0..8 {
        out[bit * 2] = if byte & (0x80 >> bit) == 0 { pin } else { 0 };
        out[bit * 2 + 1] = pin;
    }
    out
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn rejects_empty_and_oversized_strips() {
    let engine = MockEngine::new();
    assert_eq!(
        Ws2811::new(engine, PIN, 0).err(),
        Some(ConfigError::Capacity(0))
    );

    let engine = MockEngine::new();
    assert_eq!(
        Ws2811::new(engine, PIN, MAX_LEDS + 1).err(),
        Some(ConfigError::Capacity(MAX_LEDS + 1))
    );

    let engine = MockEngine::new();
    let strip = Ws2811::new(engine, PIN, MAX_LEDS).unwrap();
    assert_eq!(strip.len(), MAX_LEDS);
}

#[test]
fn pixels_start_black() {
    let (strip, _) = strip(4);
    for idx in 0..4 {
        let px = strip.pixel(idx);
        assert_eq!((px.r, px.g, px.b), (0, 0, 0));
    }
}

#[test]
fn pin_pattern_byte_lane_fixup() {
    let low = PinPattern::from_pin_mask(0x0004);
    assert_eq!(low.bit, 0x04);
    assert!(!low.upper_lane);

    let high = PinPattern::from_pin_mask(0x0200);
    assert_eq!(high.bit, 0x02);
    assert!(high.upper_lane);
}

#[test]
#[should_panic]
fn pin_mask_straddling_both_bytes_is_rejected() {
    let _ = PinPattern::from_pin_mask(0x0101);
}

// ---------------------------------------------------------------------------
// Pixel staging
// ---------------------------------------------------------------------------

#[test]
fn set_and_set_all_stage_pixels() {
    let (mut strip, log) = strip(3);

    strip.set_all(1, 2, 3);
    for idx in 0..3 {
        let px = strip.pixel(idx);
        assert_eq!((px.r, px.g, px.b), (1, 2, 3));
    }

    strip.set(1, 9, 8, 7);
    let px = strip.pixel(1);
    assert_eq!((px.r, px.g, px.b), (9, 8, 7));

    // Staging alone never touches the hardware.
    assert!(log.borrow().arms.is_empty());
    assert!(log.borrow().submits.is_empty());
}

#[test]
#[should_panic]
fn set_past_the_strip_panics() {
    let (mut strip, _) = strip(8);
    strip.set(8, 1, 2, 3);
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[test]
fn zero_bits_mark_the_early_fall() {
    let (mut strip, log) = strip(1);

    // 0b1011_0000: zero bits at MSB-first positions 1, 4, 5, 6, 7.
    strip.set(0, 0b1011_0000, 0x00, 0xFF);
    strip.trigger_update().unwrap();

    let log = log.borrow();
    let (pin, halves) = &log.arms[0];
    assert_eq!(pin.bit, PIN_BIT);

    let r = &halves[0][0..16];
    let ones = [true, false, true, true, false, false, false, false];
    for (bit, one) in ones.iter().enumerate() {
        let expected = if *one { 0 } else { PIN_BIT };
        assert_eq!(r[bit * 2], expected, "bit {}", bit);
    }

    // All-zero byte: every even slot marked. All-ones byte: none.
    assert_eq!(&halves[0][16..32], &encoded(0x00, PIN_BIT));
    assert_eq!(&halves[0][32..48], &encoded(0xFF, PIN_BIT));
}

#[test]
fn encodes_red_green_blue_in_order() {
    let (mut strip, log) = strip(2);

    strip.set(0, 0xA5, 0x5A, 0x0F);
    strip.set(1, 0xF0, 0x00, 0xFF);
    strip.trigger_update().unwrap();

    let log = log.borrow();
    let half = &log.arms[0].1[0];
    assert_eq!(&half[0..16], &encoded(0xA5, PIN_BIT));
    assert_eq!(&half[16..32], &encoded(0x5A, PIN_BIT));
    assert_eq!(&half[32..48], &encoded(0x0F, PIN_BIT));
    assert_eq!(&half[48..64], &encoded(0xF0, PIN_BIT));
    assert_eq!(&half[64..80], &encoded(0x00, PIN_BIT));
    assert_eq!(&half[80..96], &encoded(0xFF, PIN_BIT));
}

#[test]
fn odd_offsets_stay_pre_armed() {
    let (mut strip, log) = strip(1);

    strip.set(0, 0xFF, 0xFF, 0xFF);
    strip.trigger_update().unwrap();

    let log = log.borrow();
    for half in &log.arms[0].1 {
        for (offset, value) in half.iter().enumerate() {
            if offset % 2 == 1 {
                assert_eq!(*value, PIN_BIT, "odd offset {}", offset);
            }
        }
    }

    // Nothing beyond the 3 encoded source bytes was touched in the
    // first half, and the second half carries no pixel data at all.
    for offset in (48..BUF_LEN).step_by(2) {
        assert_eq!(log.arms[0].1[0][offset], 0);
    }
    for offset in (0..BUF_LEN).step_by(2) {
        assert_eq!(log.arms[0].1[1][offset], 0);
    }
}

// ---------------------------------------------------------------------------
// Trigger / refill protocol
// ---------------------------------------------------------------------------

#[test]
fn trigger_while_in_progress_is_a_no_op() {
    let (mut strip, log) = strip(20);

    strip.set_all(0x10, 0x20, 0x30);
    strip.trigger_update().unwrap();
    assert!(strip.update_in_progress());

    // Staging new content and re-triggering must neither re-arm nor
    // write into the in-flight buffers.
    strip.set_all(0xFF, 0xFF, 0xFF);
    strip.trigger_update().unwrap();

    let log = log.borrow();
    assert_eq!(log.arms.len(), 1);
    assert!(log.submits.is_empty());
    assert_eq!(&log.arms[0].1[0][0..16], &encoded(0x10, PIN_BIT));
}

#[test]
fn refill_continues_from_the_cursor() {
    // 18 LEDs: the two armed halves carry pixels 0..11, the first
    // refill carries 12..17 and exhausts the source exactly at the end
    // of the half.
    let (mut strip, log) = strip(18);
    for idx in 0..18 {
        strip.set(idx, idx as u8, 0, 0);
    }
    strip.trigger_update().unwrap();

    {
        let log = log.borrow();
        assert_eq!(&log.arms[0].1[0][0..16], &encoded(0, PIN_BIT));
        assert_eq!(&log.arms[0].1[1][0..16], &encoded(6, PIN_BIT));
    }

    strip.half_complete(Half::First);
    {
        let log = log.borrow();
        assert_eq!(log.submits.len(), 1);
        let (half, data) = &log.submits[0];
        assert_eq!(*half, Half::First);
        assert_eq!(&data[0..16], &encoded(12, PIN_BIT));
        assert_eq!(&data[(5 * 48)..(5 * 48 + 16)], &encoded(17, PIN_BIT));
    }
    assert!(strip.update_in_progress());

    // Source exhausted: the next exchange ends the frame without
    // another refill.
    strip.half_complete(Half::Second);
    assert!(!strip.update_in_progress());
    assert_eq!(log.borrow().submits.len(), 1);

    // A new frame can now be triggered.
    strip.trigger_update().unwrap();
    assert_eq!(log.borrow().arms.len(), 2);
}

#[test]
fn exhaustion_mid_half_leaves_stale_tail() {
    // 13 LEDs: the refill encodes only pixel 12 and stops, leaving the
    // remaining slots at whatever the frame start wrote there.
    let (mut strip, log) = strip(13);
    strip.set_all(0xFF, 0xFF, 0xFF);
    strip.set(12, 0x00, 0x00, 0x00);
    strip.trigger_update().unwrap();

    strip.half_complete(Half::First);
    {
        let log = log.borrow();
        let (_, data) = &log.submits[0];
        assert_eq!(&data[0..16], &encoded(0x00, PIN_BIT));
        // Stale from this frame's first fill (an all-ones pixel byte).
        assert_eq!(&data[48..64], &encoded(0xFF, PIN_BIT));
    }

    strip.half_complete(Half::Second);
    assert!(!strip.update_in_progress());
}

#[test]
fn short_strip_drains_both_halves_before_completing() {
    // 6 LEDs fit entirely in the first half. The first exchange finds
    // the source already exhausted and the second one ends the frame.
    let (mut strip, log) = strip(6);
    strip.trigger_update().unwrap();

    strip.half_complete(Half::First);
    assert!(strip.update_in_progress());
    assert_eq!(log.borrow().submits.len(), 1);

    strip.half_complete(Half::Second);
    assert!(!strip.update_in_progress());
    assert_eq!(log.borrow().submits.len(), 1);
}

#[test]
fn half_complete_without_a_frame_is_ignored() {
    let (mut strip, log) = strip(6);
    strip.half_complete(Half::First);
    assert!(log.borrow().arms.is_empty());
    assert!(log.borrow().submits.is_empty());
}

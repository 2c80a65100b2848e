//! GPIO button sampling.
//!
//! A task samples the pins every millisecond and publishes the result as a
//! single atomic word. The USB interrupt reads that word through
//! [`SharedInput`], so the engine never waits on the sampler.
//!
//! Word layout:
//!
//! ```text
//! bit 31     fresh (set by the sampler, cleared by the reader)
//! bits 16..  hat switch value
//! bits 0..   button mask
//! ```

use embassy_time::{Duration, Ticker};
use embedded_hal::digital::InputPin;
use hidpad_core::InputSource;
use hidpad_proto::{Buttons, GamepadState, Hat};
use portable_atomic::{AtomicU32, Ordering};

/// Sampling period of the button task.
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(1);

const FRESH: u32 = 1 << 31;
const HAT_SHIFT: u32 = 16;

/// Latest sampled state, shared between the sampler task and the USB IRQ.
static LATEST: AtomicU32 = AtomicU32::new(0);

fn pack(state: &GamepadState) -> u32 {
    FRESH | (u32::from(state.hat.raw()) << HAT_SHIFT) | u32::from(state.buttons.raw())
}

fn unpack(word: u32) -> GamepadState {
    GamepadState {
        buttons: Buttons(word as u16 & Buttons::MASK),
        hat: Hat::from_raw((word >> HAT_SHIFT) as u8),
    }
}

/// Non-blocking reader of the sampler's output.
///
/// Returns a state only when the sampler published something since the last
/// read; otherwise the engine resends its last report.
#[derive(Debug, Default)]
pub struct SharedInput;

impl InputSource for SharedInput {
    fn sample(&mut self) -> Option<GamepadState> {
        let word = LATEST.fetch_and(!FRESH, Ordering::AcqRel);
        (word & FRESH != 0).then(|| unpack(word))
    }
}

/// Directional pins folded into the hat switch.
pub struct DirectionPins<P> {
    pub up: P,
    pub down: P,
    pub left: P,
    pub right: P,
}

/// Active-low button inputs (pulled up, pressed = low).
pub struct ButtonPins<P, const N: usize> {
    pub buttons: [P; N],
    pub directions: DirectionPins<P>,
}

impl<P: InputPin, const N: usize> ButtonPins<P, N> {
    /// Read every pin once. A pin that fails to read counts as released.
    pub fn read(&mut self) -> GamepadState {
        let mut buttons = Buttons::NONE;
        for (index, pin) in self.buttons.iter_mut().enumerate() {
            if let Some(button) = Buttons::nth(index) {
                buttons.set(button, pressed(pin));
            }
        }

        let d = &mut self.directions;
        let hat = Hat::from_directions(
            pressed(&mut d.up),
            pressed(&mut d.down),
            pressed(&mut d.left),
            pressed(&mut d.right),
        );

        GamepadState { buttons, hat }
    }
}

fn pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

/// Publish `state` for the USB interrupt. Unchanged states are not
/// republished.
pub fn publish(state: &GamepadState) {
    let word = pack(state);
    let previous = LATEST.load(Ordering::Acquire);
    if previous | FRESH != word {
        LATEST.store(word, Ordering::Release);
    }
}

/// Sample `pins` forever at [`SAMPLE_PERIOD`].
pub async fn run<P: InputPin, const N: usize>(mut pins: ButtonPins<P, N>) -> ! {
    let mut ticker = Ticker::every(SAMPLE_PERIOD);
    loop {
        publish(&pins.read());
        ticker.next().await;
    }
}

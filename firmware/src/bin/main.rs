#![no_std]
#![no_main]

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use hidpad_firmware::usb_irq::{self, UsbContext};
use hidpad_firmware::{
    buttons, ButtonPins, DirectionPins, Engine, Rp2040Usb, SharedInput, UsbInterruptHandler,
    ENGINE_CONFIG,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler;
});

/// Number of face/shoulder buttons wired up (GP0..GP9).
const BUTTON_COUNT: usize = 10;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("hidpad starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Buttons (active low, internal pull-ups) ---
    let pins = ButtonPins {
        buttons: [
            Input::new(p.PIN_0, Pull::Up),
            Input::new(p.PIN_1, Pull::Up),
            Input::new(p.PIN_2, Pull::Up),
            Input::new(p.PIN_3, Pull::Up),
            Input::new(p.PIN_4, Pull::Up),
            Input::new(p.PIN_5, Pull::Up),
            Input::new(p.PIN_6, Pull::Up),
            Input::new(p.PIN_7, Pull::Up),
            Input::new(p.PIN_8, Pull::Up),
            Input::new(p.PIN_9, Pull::Up),
        ],
        directions: DirectionPins {
            up: Input::new(p.PIN_10, Pull::Up),
            down: Input::new(p.PIN_11, Pull::Up),
            left: Input::new(p.PIN_12, Pull::Up),
            right: Input::new(p.PIN_13, Pull::Up),
        },
    };

    // --- USB Setup ---
    let mut hw = Rp2040Usb::new(p.USB, Irqs);
    let mut engine = Engine::new(ENGINE_CONFIG);

    // The enable sequence writes several register groups that must not be
    // observed half done.
    cortex_m::interrupt::free(|_| engine.power_on(&mut hw));
    usb_irq::install(UsbContext {
        engine,
        hw,
        input: SharedInput,
    });

    spawner.spawn(button_task(pins).unwrap());

    info!("hidpad initialized, waiting for host...");
}

/// Button task - samples the GPIOs for the USB interrupt.
#[embassy_executor::task]
async fn button_task(pins: ButtonPins<Input<'static>, BUTTON_COUNT>) {
    buttons::run(pins).await
}

//! USB interrupt handler and the state it shares with `main`.
//!
//! The engine runs entirely inside `USBCTRL_IRQ`. `main` builds the
//! [`UsbContext`], powers it on and parks it in [`USB`]; after that only the
//! handler touches it.

use core::cell::RefCell;

use defmt::{error, warn};
use embassy_rp::interrupt;
use embassy_rp::interrupt::typelevel::{Interrupt, USBCTRL_IRQ};
use embassy_rp::pac;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use hidpad_core::{Engine, UsbError};

use crate::buttons::SharedInput;
use crate::usb_hw::Rp2040Usb;

/// Everything the interrupt handler needs.
pub struct UsbContext {
    pub engine: Engine,
    pub hw: Rp2040Usb,
    pub input: SharedInput,
}

/// Engine state, owned by the interrupt handler once installed.
pub static USB: Mutex<CriticalSectionRawMutex, RefCell<Option<UsbContext>>> =
    Mutex::new(RefCell::new(None));

/// Hand the powered-on context to the interrupt handler and unmask the IRQ.
pub fn install(context: UsbContext) {
    USB.lock(|usb| usb.replace(Some(context)));
    USBCTRL_IRQ::unpend();
    // SAFETY: the handler only touches state behind `USB`.
    unsafe { USBCTRL_IRQ::enable() };
}

/// `USBCTRL_IRQ` handler driving the engine.
pub struct UsbInterruptHandler;

impl interrupt::typelevel::Handler<USBCTRL_IRQ> for UsbInterruptHandler {
    unsafe fn on_interrupt() {
        let regs = pac::USBCTRL_REGS;
        // Buffers that completed before this pass; acked afterwards so an
        // IN bank refilled during the pass keeps its next completion.
        let buffers = regs.buff_status().read().0;

        USB.lock(|usb| {
            let mut usb = usb.borrow_mut();
            let Some(context) = usb.as_mut() else {
                warn!("USB interrupt before the engine was installed");
                regs.inte().write_value(Default::default());
                return;
            };
            let UsbContext { engine, hw, input } = context;
            if let Err(e) = engine.poll(hw, input) {
                report(e);
            }
        });

        regs.buff_status()
            .write_value(pac::usb::regs::BuffStatus(buffers));
    }
}

fn report(e: UsbError) {
    match e {
        UsbError::Timeout { endpoint } => warn!("USB timeout on endpoint {}", endpoint),
        UsbError::Hardware(e) => error!("USB hardware error: {:?}", e),
    }
}

//! RP2040 USB controller behind the engine's [`UsbPeripheral`] facade.
//!
//! Register access goes through `embassy_rp::pac`. Endpoint buffers live in
//! the controller's dual-port RAM:
//!
//! ```text
//! 0x000  SETUP packet (8 bytes)
//! 0x100  EP0 buffer, shared by IN and OUT
//! 0x180  EP1 IN buffer (report endpoint)
//! ```
//!
//! The controller has no byte FIFO; one is emulated with a write cursor per
//! IN buffer and a read cursor over the SETUP packet. The controller also
//! leaves DATA0/DATA1 toggling to software, so the next PID of every
//! endpoint is tracked here.

use embassy_rp::interrupt::typelevel::{Binding, USBCTRL_IRQ};
use embassy_rp::pac;
use embassy_rp::pac::usb_dpram::vals::EpControlEndpointType;
use embassy_rp::peripherals::USB;
use embassy_rp::Peri;
use hidpad_core::{Direction, EndpointConfig, Flag, HardwareError, TransferType, UsbPeripheral};
use hidpad_proto::SETUP_PACKET_SIZE;

use crate::usb_irq::UsbInterruptHandler;

const EP0_BUFFER: usize = 0x100;
const EP1_IN_BUFFER: usize = 0x180;
/// Largest packet a single DPRAM buffer holds.
const MAX_PACKET: usize = 64;
const ENDPOINTS: usize = 2;

/// Flag bits for the software interrupt mask. Endpoints the controller
/// does not drive here map to no bit.
fn mask_bit(flag: Flag) -> u32 {
    let shift = match flag {
        Flag::Vbus => 0,
        Flag::EndOfReset => 1,
        Flag::SetupReceived(ep) => 4 + u32::from(ep & 0x0F),
        Flag::InReady(ep) => 8 + 2 * u32::from(ep & 0x0F),
        Flag::OutReceived(ep) => 9 + 2 * u32::from(ep & 0x0F),
    };
    1u32.checked_shl(shift).unwrap_or(0)
}

/// `BUFF_STATUS` bit of an endpoint direction: IN at `2n`, OUT at `2n + 1`.
fn buff_bit(endpoint: u8, direction: Direction) -> u32 {
    let shift = 2 * u32::from(endpoint & 0x0F);
    match direction {
        Direction::In => 1 << shift,
        Direction::Out => 1 << (shift + 1),
    }
}

fn dpram() -> *mut u8 {
    pac::USBCTRL_DPRAM.as_ptr() as *mut u8
}

/// Owner of the RP2040 USB controller.
pub struct Rp2040Usb {
    /// Next PID for each endpoint's IN buffer (`true` = DATA1).
    in_pid: [bool; ENDPOINTS],
    out_pid: bool,
    /// Bytes staged in each IN buffer.
    tx_len: [usize; ENDPOINTS],
    max_packet: [usize; ENDPOINTS],
    rx_cursor: usize,
    interrupts: u32,
}

impl Rp2040Usb {
    /// Take the controller. The binding proves that [`UsbInterruptHandler`]
    /// is installed on `USBCTRL_IRQ`.
    pub fn new(
        _usb: Peri<'static, USB>,
        _irq: impl Binding<USBCTRL_IRQ, UsbInterruptHandler>,
    ) -> Self {
        Self {
            in_pid: [false; ENDPOINTS],
            out_pid: false,
            tx_len: [0; ENDPOINTS],
            max_packet: [MAX_PACKET; ENDPOINTS],
            rx_cursor: 0,
            interrupts: 0,
        }
    }

    fn buffer_offset(endpoint: u8) -> usize {
        match endpoint {
            0 => EP0_BUFFER,
            _ => EP1_IN_BUFFER,
        }
    }

    fn slot(endpoint: u8) -> usize {
        usize::from(endpoint).min(ENDPOINTS - 1)
    }

    /// Hand the EP0 OUT buffer to the controller for the status stage.
    fn arm_out(&mut self) {
        let pid = self.out_pid;
        pac::USBCTRL_DPRAM.ep_out_buffer_control(0).write(|w| {
            w.set_pid(0, pid);
            w.set_length(0, self.max_packet[0] as u16);
            w.set_available(0, true);
        });
        self.out_pid = !pid;
    }

    /// Enable or disable `BUFF_STATUS` as an interrupt source, depending on
    /// whether any endpoint flag is unmasked.
    fn sync_buffer_interrupt(&self) {
        let buffers = (0..ENDPOINTS as u8)
            .map(|ep| mask_bit(Flag::InReady(ep)) | mask_bit(Flag::OutReceived(ep)))
            .fold(0, |acc, bits| acc | bits);
        let enabled = self.interrupts & buffers != 0;
        pac::USBCTRL_REGS.inte().modify(|w| w.set_buff_status(enabled));
    }
}

impl UsbPeripheral for Rp2040Usb {
    fn enable(&mut self) {
        pac::RESETS.reset().modify(|w| w.set_usbctrl(true));
        pac::RESETS.reset().modify(|w| w.set_usbctrl(false));
        while !pac::RESETS.reset_done().read().usbctrl() {}

        // Clear the control part of DPRAM.
        let dpram = pac::USBCTRL_DPRAM;
        dpram.setup_packet_low().write_value(Default::default());
        dpram.setup_packet_high().write_value(Default::default());
        for n in 0..15 {
            dpram.ep_in_control(n).write_value(Default::default());
            dpram.ep_out_control(n).write_value(Default::default());
        }
        for n in 0..16 {
            dpram.ep_in_buffer_control(n).write_value(Default::default());
            dpram.ep_out_buffer_control(n).write_value(Default::default());
        }

        let regs = pac::USBCTRL_REGS;
        regs.usb_muxing().write(|w| {
            w.set_to_phy(true);
            w.set_softcon(true);
        });
        // Not every board routes VBUS to the controller; force detection.
        regs.usb_pwr().write(|w| {
            w.set_vbus_detect(true);
            w.set_vbus_detect_override_en(true);
        });
        regs.main_ctrl().write(|w| {
            w.set_controller_en(true);
            w.set_host_ndevice(false);
        });
        regs.sie_ctrl().write(|w| w.set_ep0_int_1buf(true));
        regs.inte().write_value(Default::default());
        self.interrupts = 0;
    }

    fn disable(&mut self) {
        pac::USBCTRL_REGS.inte().write_value(Default::default());
        pac::USBCTRL_REGS.main_ctrl().write(|w| w.set_controller_en(false));
        self.interrupts = 0;
    }

    fn attach(&mut self) {
        pac::USBCTRL_REGS.sie_ctrl().modify(|w| w.set_pullup_en(true));
    }

    fn detach(&mut self) {
        pac::USBCTRL_REGS.sie_ctrl().modify(|w| w.set_pullup_en(false));
    }

    fn vbus_present(&self) -> bool {
        pac::USBCTRL_REGS.sie_status().read().vbus_detected()
    }

    fn configure_endpoint(&mut self, config: &EndpointConfig) -> Result<(), HardwareError> {
        let endpoint = config.number;
        if config.bank_count != 1 {
            return Err(HardwareError::Unsupported { endpoint });
        }
        let max_packet = usize::from(config.max_packet_size);
        if max_packet == 0 || max_packet > MAX_PACKET {
            return Err(HardwareError::EndpointConfig { endpoint });
        }

        match (endpoint, config.direction, config.transfer_type) {
            // EP0 is always enabled; its buffer address is fixed.
            (0, _, TransferType::Control) => {
                self.max_packet[0] = max_packet;
                self.arm_out();
                Ok(())
            }
            (1, Direction::In, TransferType::Interrupt) => {
                self.max_packet[1] = max_packet;
                pac::USBCTRL_DPRAM.ep_in_control(0).write(|w| {
                    w.set_enable(true);
                    w.set_interrupt_per_buff(true);
                    w.set_endpoint_type(EpControlEndpointType::INTERRUPT);
                    w.set_buffer_address(EP1_IN_BUFFER as u16);
                });
                Ok(())
            }
            _ => Err(HardwareError::Unsupported { endpoint }),
        }
    }

    fn disable_endpoint(&mut self, number: u8) {
        if number == 0 {
            return;
        }
        let index = usize::from(number);
        pac::USBCTRL_DPRAM
            .ep_in_control(index - 1)
            .write_value(Default::default());
        pac::USBCTRL_DPRAM
            .ep_in_buffer_control(index)
            .write_value(Default::default());
    }

    fn reset_endpoint(&mut self, number: u8) {
        let slot = Self::slot(number);
        self.tx_len[slot] = 0;
        self.in_pid[slot] = false;
        let index = usize::from(number);
        pac::USBCTRL_DPRAM
            .ep_in_buffer_control(index)
            .write_value(Default::default());
        if number == 0 {
            self.out_pid = false;
            self.rx_cursor = 0;
            pac::USBCTRL_DPRAM
                .ep_out_buffer_control(0)
                .write_value(Default::default());
        }
    }

    fn read_byte(&mut self, endpoint: u8) -> u8 {
        let offset = if endpoint == 0 && self.rx_cursor < SETUP_PACKET_SIZE {
            self.rx_cursor
        } else {
            Self::buffer_offset(endpoint) + self.rx_cursor.saturating_sub(SETUP_PACKET_SIZE)
        };
        self.rx_cursor += 1;
        // SAFETY: offsets stay inside the 4 KiB DPRAM; the hardware does
        // not write the SETUP area while SETUP_REC is set.
        unsafe { dpram().add(offset).read_volatile() }
    }

    fn write_byte(&mut self, endpoint: u8, byte: u8) {
        let slot = Self::slot(endpoint);
        if self.tx_len[slot] >= self.max_packet[slot] {
            return;
        }
        let offset = Self::buffer_offset(endpoint) + self.tx_len[slot];
        // SAFETY: the buffer is ours until `commit_in` sets AVAILABLE.
        unsafe { dpram().add(offset).write_volatile(byte) };
        self.tx_len[slot] += 1;
    }

    fn commit_in(&mut self, endpoint: u8) {
        let slot = Self::slot(endpoint);
        let index = usize::from(endpoint);
        let pid = self.in_pid[slot];
        let len = self.tx_len[slot] as u16;
        let control = pac::USBCTRL_DPRAM.ep_in_buffer_control(index);
        control.write(|w| {
            w.set_pid(0, pid);
            w.set_length(0, len);
            w.set_full(0, true);
        });
        // AVAILABLE must be set a few cycles after the rest (datasheet 4.1.2.5.1).
        cortex_m::asm::delay(12);
        control.write(|w| {
            w.set_pid(0, pid);
            w.set_length(0, len);
            w.set_full(0, true);
            w.set_available(0, true);
        });
        self.in_pid[slot] = !pid;
        self.tx_len[slot] = 0;
    }

    fn release_out(&mut self, endpoint: u8) {
        if endpoint == 0 {
            self.arm_out();
        }
    }

    fn flag(&self, flag: Flag) -> bool {
        let regs = pac::USBCTRL_REGS;
        match flag {
            // VBUS detection is forced on, it never changes.
            Flag::Vbus => false,
            Flag::EndOfReset => regs.sie_status().read().bus_reset(),
            Flag::SetupReceived(0) => regs.sie_status().read().setup_rec(),
            Flag::SetupReceived(_) => false,
            Flag::InReady(ep) => !pac::USBCTRL_DPRAM
                .ep_in_buffer_control(usize::from(ep))
                .read()
                .available(0),
            Flag::OutReceived(ep) => regs.buff_status().read().0 & buff_bit(ep, Direction::Out) != 0,
        }
    }

    fn clear_flag(&mut self, flag: Flag) {
        let regs = pac::USBCTRL_REGS;
        match flag {
            Flag::Vbus => {}
            Flag::EndOfReset => regs.sie_status().write(|w| w.set_bus_reset(true)),
            Flag::SetupReceived(_) => {
                regs.sie_status().write(|w| w.set_setup_rec(true));
                // A SETUP always restarts EP0 at DATA1 in both directions.
                self.rx_cursor = 0;
                self.in_pid[0] = true;
                self.out_pid = true;
                self.arm_out();
            }
            Flag::InReady(ep) => regs
                .buff_status()
                .write_value(pac::usb::regs::BuffStatus(buff_bit(ep, Direction::In))),
            Flag::OutReceived(ep) => regs
                .buff_status()
                .write_value(pac::usb::regs::BuffStatus(buff_bit(ep, Direction::Out))),
        }
    }

    fn set_interrupt(&mut self, flag: Flag, enabled: bool) {
        if enabled {
            self.interrupts |= mask_bit(flag);
        } else {
            self.interrupts &= !mask_bit(flag);
        }
        let regs = pac::USBCTRL_REGS;
        match flag {
            Flag::Vbus => {}
            Flag::EndOfReset => regs.inte().modify(|w| w.set_bus_reset(enabled)),
            Flag::SetupReceived(_) => regs.inte().modify(|w| w.set_setup_req(enabled)),
            Flag::InReady(_) | Flag::OutReceived(_) => self.sync_buffer_interrupt(),
        }
    }

    fn interrupt_enabled(&self, flag: Flag) -> bool {
        self.interrupts & mask_bit(flag) != 0
    }

    fn stall(&mut self, endpoint: u8) {
        if endpoint == 0 {
            pac::USBCTRL_REGS.ep_stall_arm().write(|w| {
                w.set_ep0_in(true);
                w.set_ep0_out(true);
            });
            pac::USBCTRL_DPRAM
                .ep_out_buffer_control(0)
                .modify(|w| w.set_stall(true));
        }
        pac::USBCTRL_DPRAM
            .ep_in_buffer_control(usize::from(endpoint))
            .modify(|w| w.set_stall(true));
    }

    fn clear_stall(&mut self, endpoint: u8) {
        if endpoint == 0 {
            pac::USBCTRL_REGS.ep_stall_arm().write(|w| {
                w.set_ep0_in(false);
                w.set_ep0_out(false);
            });
            pac::USBCTRL_DPRAM
                .ep_out_buffer_control(0)
                .modify(|w| w.set_stall(false));
        }
        pac::USBCTRL_DPRAM
            .ep_in_buffer_control(usize::from(endpoint))
            .modify(|w| w.set_stall(false));
    }

    fn is_stalled(&self, endpoint: u8) -> bool {
        pac::USBCTRL_DPRAM
            .ep_in_buffer_control(usize::from(endpoint))
            .read()
            .stall()
    }

    fn set_address(&mut self, address: u8) {
        pac::USBCTRL_REGS.addr_endp().write(|w| w.set_address(address));
    }
}

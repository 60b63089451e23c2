use crate::vip::{Eye, FrameSurface, Vip, LINES_PER_FRAME};

pub use self::types::IrqLines;

// CPU interrupt inputs, numbered as the V810 sees them.
pub const LINE_PAD: usize = 0;
pub const LINE_TIMER: usize = 1;
pub const LINE_CART: usize = 2;
pub const LINE_VIP: usize = 4;

// The address bus repeats every 128 MiB.
const ADDRESS_MASK: u32 = 0x07FF_FFFF;
const WRAM_BYTES: usize = 0x1_0000;

pub(crate) const MASTER_CLOCK_HZ: u32 = 20_000_000;
// 757 dots per scanline at the 10 MHz pixel clock, 264 lines per frame.
pub(crate) const CYCLES_PER_SCANLINE: u32 = 757 * 2;
const TIMER_PERIOD_20US: u32 = MASTER_CLOCK_HZ / 50_000;
const TIMER_PERIOD_100US: u32 = MASTER_CLOCK_HZ / 10_000;
// Pad-ready cadence, 50.038 Hz (once per displayed frame).
const PAD_TICK_CYCLES: u32 = 399_696;

pub(crate) const TCR_ENABLE: u8 = 0x01;
pub(crate) const TCR_ZERO_FLAG: u8 = 0x02;
pub(crate) const TCR_ZERO_ACK: u8 = 0x04;
pub(crate) const TCR_IRQ_ENABLE: u8 = 0x08;
pub(crate) const TCR_RATE_20US: u8 = 0x10;

// Hardware control block register offsets (byte offsets, one register
// every four bytes).
const IO_LPC: usize = 0x00;
const IO_LPC2: usize = 0x04;
const IO_LPT: usize = 0x08;
const IO_LPR: usize = 0x0C;
const IO_KLB: usize = 0x10;
const IO_KHB: usize = 0x14;
const IO_TLB: usize = 0x18;
const IO_THB: usize = 0x1C;
const IO_TCR: usize = 0x20;
const IO_WCR: usize = 0x24;
const IO_KCR: usize = 0x28;

mod env;
mod io;
mod types;

use self::types::{Cartridge, HwRegs, Timer};

/// Address-decoded memory bus gluing the VIP, the hardware timer, the
/// keypad block and the cartridge windows to the host CPU's 27-bit
/// address space, and dividing the 20 MHz master clock down to the
/// scanline / timer / pad-ready cadences.
#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct Bus {
    pub(crate) vip: Vip,
    wram: Vec<u8>,
    cart: Cartridge,
    pub(crate) hw: HwRegs,
    pub(crate) timer: Timer,
    pub(crate) lines: IrqLines,

    scanline: u16,
    scan_accum: u32,
    pub(crate) timer_accum: u32,
    pad_accum: u32,

    left_frame: FrameSurface,
    right_frame: FrameSurface,
    frame_ready: bool,
}

impl Bus {
    pub fn new() -> Self {
        let mut bus = Self {
            vip: Vip::new(),
            wram: vec![0; WRAM_BYTES],
            cart: Cartridge::new(),
            hw: HwRegs::new(Self::env_pad_default()),
            timer: Timer::new(),
            lines: IrqLines::default(),
            scanline: 0,
            scan_accum: 0,
            timer_accum: 0,
            pad_accum: 0,
            left_frame: FrameSurface::new(),
            right_frame: FrameSurface::new(),
            frame_ready: false,
        };
        if let Some(size) = Self::env_cart_ram_override() {
            bus.configure_cart_ram(size);
        }
        bus
    }

    /// Power-cycle everything except the cartridge contents.
    pub fn reset(&mut self) {
        self.vip.reset();
        self.wram.fill(0);
        let input = self.hw.input;
        self.hw = HwRegs::new(input);
        self.timer.reset();
        self.lines.clear_all();
        self.scanline = 0;
        self.scan_accum = 0;
        self.timer_accum = 0;
        self.pad_accum = 0;
        self.left_frame = FrameSurface::new();
        self.right_frame = FrameSurface::new();
        self.frame_ready = false;
    }

    // ---- address decode ------------------------------------------------

    #[inline]
    pub fn read_u8(&self, addr: u32) -> u8 {
        let half = self.read_halfword(addr);
        (half >> ((addr & 1) * 8)) as u8
    }

    #[inline]
    pub fn read_u16(&self, addr: u32) -> u16 {
        self.read_halfword(addr)
    }

    #[inline]
    pub fn read_u32(&self, addr: u32) -> u32 {
        let base = addr & !3;
        let lo = self.read_halfword(base) as u32;
        let hi = self.read_halfword(base + 2) as u32;
        (hi << 16) | lo
    }

    #[inline]
    pub fn write_u8(&mut self, addr: u32, value: u8) {
        let shift = (addr & 1) * 8;
        self.write_halfword(addr, (value as u16) << shift, 0x00FF << shift);
    }

    #[inline]
    pub fn write_u16(&mut self, addr: u32, data: u16) {
        self.write_halfword(addr, data, 0xFFFF);
    }

    #[inline]
    pub fn write_u32(&mut self, addr: u32, data: u32) {
        let base = addr & !3;
        self.write_halfword(base, data as u16, 0xFFFF);
        self.write_halfword(base + 2, (data >> 16) as u16, 0xFFFF);
    }

    fn read_halfword(&self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK;
        let aligned = (addr & !1) as usize;
        match addr {
            0x0000_0000..=0x0001_FFFF => self.read_video_halfword(aligned),
            0x0002_0000..=0x0003_FFFF => self.vip.read_bgmap((aligned - 0x0002_0000) >> 1),
            0x0005_F800..=0x0005_F87F => self.vip.read_register(aligned & 0x7E),
            0x0007_8000..=0x0007_FFFF => {
                // Character banks 0-3, contiguous mirror.
                let word = (aligned - 0x0007_8000) >> 1;
                self.vip.read_char(word >> 12, word & 0xFFF)
            }
            // Audio unit lives on its own die; external to this core.
            0x0100_0000..=0x01FF_FFFF => {
                log::debug!("audio-region read at {addr:#010X}");
                0
            }
            0x0200_0000..=0x02FF_FFFF => {
                let value = self.io_read(aligned & 0xFF & !3);
                if addr & 2 == 0 {
                    value as u16
                } else {
                    (value >> 16) as u16
                }
            }
            // Cartridge expansion: open bus on every released cart.
            0x0400_0000..=0x04FF_FFFF => 0xFFFF,
            0x0500_0000..=0x05FF_FFFF => {
                let base = aligned & (WRAM_BYTES - 1);
                self.wram[base] as u16 | ((self.wram[base + 1] as u16) << 8)
            }
            0x0600_0000..=0x06FF_FFFF => {
                let base = aligned & 0x00FF_FFFF;
                self.cart.read_ram(base) as u16 | ((self.cart.read_ram(base + 1) as u16) << 8)
            }
            0x0700_0000..=0x07FF_FFFF => {
                let base = aligned & 0x00FF_FFFF;
                self.cart.read_rom(base) as u16 | ((self.cart.read_rom(base + 1) as u16) << 8)
            }
            _ => {
                log::warn!("unmapped bus read at {addr:#010X}");
                0xFFFF
            }
        }
    }

    fn write_halfword(&mut self, addr: u32, data: u16, mask: u16) {
        let addr = addr & ADDRESS_MASK;
        let aligned = (addr & !1) as usize;
        match addr {
            0x0000_0000..=0x0001_FFFF => self.write_video_halfword(aligned, data, mask),
            0x0002_0000..=0x0003_FFFF => {
                self.vip
                    .write_bgmap((aligned - 0x0002_0000) >> 1, data, mask);
            }
            0x0005_F800..=0x0005_F87F => {
                let offset = aligned & 0x7E;
                let value = if mask == 0xFFFF {
                    data
                } else {
                    log::debug!("narrow VIP register write at {addr:#010X} (mask {mask:#06X})");
                    (data & mask) | (self.vip.read_register(offset) & !mask)
                };
                self.vip.write_register(offset, value);
                self.refresh_vip_irq();
            }
            0x0007_8000..=0x0007_FFFF => {
                let word = (aligned - 0x0007_8000) >> 1;
                self.vip.write_char(word >> 12, word & 0xFFF, data, mask);
            }
            0x0100_0000..=0x01FF_FFFF => {
                log::debug!("audio-region write at {addr:#010X}, data {data:#06X}");
            }
            0x0200_0000..=0x02FF_FFFF => {
                if addr & 2 == 0 {
                    self.io_write(aligned & 0xFF & !3, (data & mask) as u32);
                    self.refresh_vip_irq();
                } else {
                    log::trace!("write to upper half of I/O register at {addr:#010X}");
                }
            }
            0x0400_0000..=0x04FF_FFFF => {
                log::debug!("cartridge-expansion write at {addr:#010X}, data {data:#06X}");
            }
            0x0500_0000..=0x05FF_FFFF => {
                let base = aligned & (WRAM_BYTES - 1);
                if mask & 0x00FF != 0 {
                    self.wram[base] = data as u8;
                }
                if mask & 0xFF00 != 0 {
                    self.wram[base + 1] = (data >> 8) as u8;
                }
            }
            0x0600_0000..=0x06FF_FFFF => {
                let base = aligned & 0x00FF_FFFF;
                if mask & 0x00FF != 0 {
                    self.cart.write_ram(base, data as u8);
                }
                if mask & 0xFF00 != 0 {
                    self.cart.write_ram(base + 1, (data >> 8) as u8);
                }
            }
            0x0700_0000..=0x07FF_FFFF => {
                log::debug!("write to cartridge ROM window at {addr:#010X} ignored");
            }
            _ => {
                log::warn!("unmapped bus write at {addr:#010X}, data {data:#06X}");
            }
        }
    }

    fn read_video_halfword(&self, offset: usize) -> u16 {
        match offset {
            0x0000..=0x5FFF => fb_halfword(&self.vip.left_fb0, offset),
            0x6000..=0x7FFF => self.vip.read_char(0, (offset - 0x6000) >> 1),
            0x8000..=0xDFFF => fb_halfword(&self.vip.left_fb1, offset - 0x8000),
            0xE000..=0xFFFF => self.vip.read_char(1, (offset - 0xE000) >> 1),
            0x1_0000..=0x1_5FFF => fb_halfword(&self.vip.right_fb0, offset - 0x1_0000),
            0x1_6000..=0x1_7FFF => self.vip.read_char(2, (offset - 0x1_6000) >> 1),
            0x1_8000..=0x1_DFFF => fb_halfword(&self.vip.right_fb1, offset - 0x1_8000),
            _ => self.vip.read_char(3, (offset - 0x1_E000) >> 1),
        }
    }

    fn write_video_halfword(&mut self, offset: usize, data: u16, mask: u16) {
        match offset {
            0x0000..=0x5FFF => write_fb_halfword(&mut self.vip.left_fb0, offset, data, mask),
            0x6000..=0x7FFF => self.vip.write_char(0, (offset - 0x6000) >> 1, data, mask),
            0x8000..=0xDFFF => write_fb_halfword(&mut self.vip.left_fb1, offset - 0x8000, data, mask),
            0xE000..=0xFFFF => self.vip.write_char(1, (offset - 0xE000) >> 1, data, mask),
            0x1_0000..=0x1_5FFF => {
                write_fb_halfword(&mut self.vip.right_fb0, offset - 0x1_0000, data, mask)
            }
            0x1_6000..=0x1_7FFF => self.vip.write_char(2, (offset - 0x1_6000) >> 1, data, mask),
            0x1_8000..=0x1_DFFF => {
                write_fb_halfword(&mut self.vip.right_fb1, offset - 0x1_8000, data, mask)
            }
            _ => self.vip.write_char(3, (offset - 0x1_E000) >> 1, data, mask),
        }
    }

    // ---- clocking ------------------------------------------------------

    /// Advance the chipset by `cycles` master-clock cycles, firing any
    /// scanline / timer / pad events that fall inside the span.  Returns
    /// whether any CPU interrupt line is asserted afterwards.
    pub fn tick(&mut self, cycles: u32) -> bool {
        self.scan_accum += cycles;
        while self.scan_accum >= CYCLES_PER_SCANLINE {
            self.scan_accum -= CYCLES_PER_SCANLINE;
            let line = self.scanline;
            self.scanline = (line + 1) % LINES_PER_FRAME;
            self.scanline_tick(line);
        }

        if self.hw.timer_enabled() {
            let period = if self.hw.timer_fast_rate() {
                TIMER_PERIOD_20US
            } else {
                TIMER_PERIOD_100US
            };
            self.timer_accum += cycles;
            while self.timer_accum >= period {
                self.timer_accum -= period;
                self.timer_tick();
            }
        } else {
            // Disabling the timer cancels any partially elapsed tick.
            self.timer_accum = 0;
        }

        self.pad_accum += cycles;
        while self.pad_accum >= PAD_TICK_CYCLES {
            self.pad_accum -= PAD_TICK_CYCLES;
            self.pad_tick();
        }

        self.refresh_vip_irq();
        self.irq_pending()
    }

    /// One display scanline.  Only the left eye's raster drives the
    /// display state machine; the right eye's schedule is dormant on this
    /// hardware revision.
    pub fn scanline_tick(&mut self, scanline: u16) {
        self.vip.scanline_tick(scanline, Eye::Left);
        if scanline == 0 {
            self.render_frames();
        }
        self.refresh_vip_irq();
    }

    /// One programmable-timer tick (50 kHz or 10 kHz, per TCR).
    pub fn timer_tick(&mut self) {
        if self.timer.counter > 0 {
            self.timer.counter -= 1;
            self.hw.tlb = (self.timer.counter & 0x00FF) as u8;
            self.hw.thb = (self.timer.counter >> 8) as u8;
        }

        if self.timer.counter == 0 {
            self.timer.counter = self.timer.latch;
            self.hw.set_timer_zero_flag();
            if self.hw.timer_irq_enabled() {
                self.lines.set(LINE_TIMER, true);
            }
        }
    }

    /// Pad-ready tick at 50.038 Hz: interrupt the CPU while the KCR
    /// strobe-done latch is clear.
    pub fn pad_tick(&mut self) {
        if self.hw.kcr & 0x80 == 0 {
            self.lines.set(LINE_PAD, true);
        }
    }

    // ---- interrupts ----------------------------------------------------

    pub(crate) fn refresh_vip_irq(&mut self) {
        self.lines.set(LINE_VIP, self.vip.irq_active());
    }

    #[inline]
    pub fn irq_line(&self, line: usize) -> bool {
        self.lines.asserted(line)
    }

    pub fn irq_pending(&self) -> bool {
        self.lines.any()
    }

    /// Acknowledge a pulse-style line.  The timer and VIP lines are level
    /// signals cleared through their own registers; the cartridge line
    /// follows the collaborator's `set_cart_irq`.
    pub fn acknowledge_irq(&mut self, line: usize) {
        if line == LINE_PAD {
            self.lines.set(LINE_PAD, false);
        } else {
            log::debug!("acknowledge of level-driven interrupt line {line}");
        }
    }

    /// Cartridge interrupt output, wired to CPU line 2.
    pub fn set_cart_irq(&mut self, asserted: bool) {
        self.lines.set(LINE_CART, asserted);
    }

    // ---- frames --------------------------------------------------------

    fn render_frames(&mut self) {
        self.vip.render_eye(Eye::Left, &mut self.left_frame);
        self.vip.render_eye(Eye::Right, &mut self.right_frame);
        self.frame_ready = true;
    }

    /// Host-driven render of one eye into a caller-owned surface.
    pub fn render_eye(&self, eye: Eye, surface: &mut FrameSurface) {
        self.vip.render_eye(eye, surface);
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn take_frames(&mut self) -> Option<(FrameSurface, FrameSurface)> {
        if !self.frame_ready {
            return None;
        }
        self.frame_ready = false;
        Some((self.left_frame.clone(), self.right_frame.clone()))
    }

    /// Copy both eyes' pen indices into the caller's buffers, reusing
    /// their allocations.  Returns `true` if a frame was ready.
    pub fn take_frames_into(&mut self, left: &mut Vec<u8>, right: &mut Vec<u8>) -> bool {
        if !self.frame_ready {
            return false;
        }
        self.frame_ready = false;
        left.clear();
        left.extend_from_slice(self.left_frame.pixels());
        right.clear();
        right.extend_from_slice(self.right_frame.pixels());
        true
    }

    /// Red LED intensity per pen index, for mapping frames to colours.
    pub fn pens(&self) -> [u8; 4] {
        self.vip.pens()
    }

    pub fn current_scanline(&self) -> u16 {
        self.scanline
    }

    // ---- input / cartridge ---------------------------------------------

    pub fn set_keypad_input(&mut self, state: u16) {
        self.hw.input = state;
    }

    pub fn load_rom(&mut self, data: Vec<u8>) {
        self.cart.rom = data;
    }

    pub fn rom_len(&self) -> usize {
        self.cart.rom.len()
    }

    pub fn configure_cart_ram(&mut self, size: usize) {
        if size == 0 {
            self.cart.ram.clear();
        } else if self.cart.ram.len() != size {
            self.cart.ram = vec![0; size];
        } else {
            self.cart.ram.fill(0);
        }
    }

    pub fn cart_ram(&self) -> Option<&[u8]> {
        if self.cart.ram.is_empty() {
            None
        } else {
            Some(&self.cart.ram)
        }
    }

    pub fn cart_ram_mut(&mut self) -> Option<&mut [u8]> {
        if self.cart.ram.is_empty() {
            None
        } else {
            Some(&mut self.cart.ram)
        }
    }

    pub fn load_cart_ram(&mut self, data: &[u8]) -> Result<(), &'static str> {
        if self.cart.ram.is_empty() {
            return Err("cartridge RAM not present");
        }
        if self.cart.ram.len() != data.len() {
            return Err("cartridge RAM size mismatch");
        }
        self.cart.ram.copy_from_slice(data);
        Ok(())
    }
}

#[inline]
fn fb_halfword(fb: &[u8], offset: usize) -> u16 {
    fb[offset] as u16 | ((fb[offset + 1] as u16) << 8)
}

#[inline]
fn write_fb_halfword(fb: &mut [u8], offset: usize, data: u16, mask: u16) {
    if mask & 0x00FF != 0 {
        fb[offset] = data as u8;
    }
    if mask & 0xFF00 != 0 {
        fb[offset + 1] = (data >> 8) as u8;
    }
}

#[cfg(test)]
mod tests;

use super::{TCR_ENABLE, TCR_IRQ_ENABLE, TCR_RATE_20US, TCR_ZERO_FLAG};

/// The five level-sensitive CPU interrupt inputs.  Index 3 is wired to
/// nothing on this board; it stays in the array so line numbers match the
/// CPU's inputs directly.
#[derive(Clone, Copy, Default, bincode::Encode, bincode::Decode)]
pub struct IrqLines {
    lines: [bool; 5],
}

impl IrqLines {
    pub(super) fn clear_all(&mut self) {
        self.lines = [false; 5];
    }

    #[inline]
    pub(super) fn set(&mut self, line: usize, asserted: bool) {
        if let Some(slot) = self.lines.get_mut(line) {
            *slot = asserted;
        }
    }

    #[inline]
    pub fn asserted(&self, line: usize) -> bool {
        self.lines.get(line).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.lines.iter().any(|&asserted| asserted)
    }
}

/// The hardware control registers at 0x0200_0000: keypad latch, timer
/// facade, wait control, keypad control.  `input` is the host-supplied pad
/// snapshot that a KCR strobe latches into KLB/KHB.
#[derive(Clone, Copy, bincode::Encode, bincode::Decode)]
pub(super) struct HwRegs {
    pub(super) klb: u8,
    pub(super) khb: u8,
    pub(super) tlb: u8,
    pub(super) thb: u8,
    pub(super) tcr: u8,
    pub(super) wcr: u8,
    pub(super) kcr: u8,
    pub(super) input: u16,
}

impl HwRegs {
    pub(super) fn new(input: u16) -> Self {
        let mut regs = Self {
            klb: 0,
            khb: 0,
            tlb: 0,
            thb: 0,
            tcr: 0,
            wcr: 0,
            kcr: 0,
            input,
        };
        regs.reset();
        regs
    }

    pub(super) fn reset(&mut self) {
        self.klb = 0;
        self.khb = 0;
        self.tlb = 0xFF;
        self.thb = 0xFF;
        self.tcr = 0xE4;
        self.wcr = 0xFC;
        // Strobe-done latch starts set, so the pad interrupt stays quiet
        // until software arms a read.
        self.kcr = 0x4C | 0x80;
    }

    #[inline]
    pub(super) fn timer_enabled(&self) -> bool {
        self.tcr & TCR_ENABLE != 0
    }

    #[inline]
    pub(super) fn timer_fast_rate(&self) -> bool {
        self.tcr & TCR_RATE_20US != 0
    }

    #[inline]
    pub(super) fn timer_irq_enabled(&self) -> bool {
        self.tcr & TCR_IRQ_ENABLE != 0
    }

    pub(super) fn set_timer_zero_flag(&mut self) {
        self.tcr |= TCR_ZERO_FLAG;
    }
}

/// 16-bit down-counter with a reload latch.  The tick cadence (and the
/// TLB/THB mirrors) are driven by the Bus.
#[derive(Clone, Copy, bincode::Encode, bincode::Decode)]
pub(super) struct Timer {
    pub(super) counter: u16,
    pub(super) latch: u16,
}

impl Timer {
    pub(super) fn new() -> Self {
        Self { counter: 0, latch: 0 }
    }

    pub(super) fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Cartridge windows: ROM (mirrored over its 16 MiB window), optional
/// battery-backed chip RAM, and the expansion area which reads as open
/// bus on every released cartridge.
#[derive(Clone, bincode::Encode, bincode::Decode)]
pub(super) struct Cartridge {
    pub(super) rom: Vec<u8>,
    pub(super) ram: Vec<u8>,
}

impl Cartridge {
    pub(super) fn new() -> Self {
        Self {
            rom: Vec::new(),
            ram: Vec::new(),
        }
    }

    #[inline]
    pub(super) fn read_rom(&self, offset: usize) -> u8 {
        if self.rom.is_empty() {
            0xFF
        } else {
            self.rom[offset % self.rom.len()]
        }
    }

    #[inline]
    pub(super) fn read_ram(&self, offset: usize) -> u8 {
        if self.ram.is_empty() {
            0xFF
        } else {
            self.ram[offset % self.ram.len()]
        }
    }

    #[inline]
    pub(super) fn write_ram(&mut self, offset: usize, value: u8) {
        if !self.ram.is_empty() {
            let len = self.ram.len();
            self.ram[offset % len] = value;
        }
    }
}

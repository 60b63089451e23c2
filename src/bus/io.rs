use super::*;

impl Bus {
    /// Read a hardware control register (byte offset within the
    /// 0x0200_0000 block, word-aligned).
    pub(super) fn io_read(&self, offset: usize) -> u32 {
        match offset {
            // Link port is stubbed: no second unit attached.
            IO_LPC | IO_LPC2 | IO_LPT | IO_LPR => 0,
            IO_KLB => self.hw.klb as u32,
            IO_KHB => self.hw.khb as u32,
            IO_TLB => self.hw.tlb as u32,
            IO_THB => self.hw.thb as u32,
            IO_TCR => self.hw.tcr as u32,
            IO_WCR => self.hw.wcr as u32,
            // Bits 6, 3 and 2 of KCR are tied high.
            IO_KCR => (self.hw.kcr | 0x4C) as u32,
            _ => {
                log::warn!("unmapped I/O register read at offset {offset:#04X}");
                0xFFFF
            }
        }
    }

    pub(super) fn io_write(&mut self, offset: usize, data: u32) {
        #[cfg(feature = "trace_hw_writes")]
        eprintln!("  IO[{offset:02X}] <= {data:08X}");
        match offset {
            // Link port transmit side: accepted, nothing listens.
            IO_LPC | IO_LPC2 | IO_LPT => {}
            IO_LPR | IO_KLB | IO_KHB => {
                log::debug!("write to read-only I/O register at offset {offset:#04X}");
            }
            IO_TLB => {
                self.hw.tlb = data as u8;
                self.timer.latch = (self.timer.latch & 0xFF00) | self.hw.tlb as u16;
            }
            IO_THB => {
                self.hw.thb = data as u8;
                self.timer.latch = ((self.hw.thb as u16) << 8) | (self.timer.latch & 0x00FF);
            }
            IO_TCR => {
                // 111- ---- tied high
                // ---x ---- rate select (1 = 20 us, 0 = 100 us)
                // ---- x--- interrupt enable
                // ---- -x-- zero-flag acknowledge
                // ---- --x- zero flag (read only)
                // ---- ---x count enable
                if data & TCR_IRQ_ENABLE as u32 == 0 {
                    self.lines.set(LINE_TIMER, false);
                }

                if data & TCR_ENABLE as u32 != 0 {
                    self.hw.tlb = (self.timer.latch & 0x00FF) as u8;
                    self.hw.thb = (self.timer.latch >> 8) as u8;
                    self.timer.counter = self.timer.latch;

                    // Arm the periodic tick only on the 0 -> 1 edge of the
                    // enable bit; re-writes while running leave the phase
                    // alone.
                    if !self.hw.timer_enabled() {
                        self.timer_accum = 0;
                    }
                }

                self.hw.tcr = (data as u8 & 0xFD) | 0xE4 | (self.hw.tcr & TCR_ZERO_FLAG);
                if data & TCR_ZERO_ACK as u32 != 0 {
                    self.hw.tcr &= !TCR_ZERO_FLAG;
                }
            }
            IO_WCR => {
                // Bits 2-7 are tied high.
                self.hw.wcr = data as u8 | 0xFC;
            }
            IO_KCR => {
                if data & 0x04 != 0 {
                    // Latch the pad.  Bit 1 is the hardware "always 1" line.
                    let snapshot = self.hw.input | 0x0002;
                    self.hw.klb = (snapshot & 0x00FF) as u8;
                    self.hw.khb = (snapshot >> 8) as u8;
                }
                if data & 0x01 != 0 {
                    self.hw.klb = 0;
                    self.hw.khb = 0;
                }
                // Bits 6 and 3 are tied high; bit 1 is read only.
                self.hw.kcr = (data as u8 | 0x48) & 0xFD;
            }
            _ => {
                log::warn!("unmapped I/O register write at offset {offset:#04X}, data {data:#06X}");
            }
        }
    }
}

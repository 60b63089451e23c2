#[cfg(test)]
mod tests;

use crate::bus::{Bus, CYCLES_PER_SCANLINE};
use crate::vip::FrameSurface;
use std::error::Error;

/// Headless chipset aggregate: the bus plus a master-cycle counter.  The
/// host CPU is an external collaborator — it issues loads/stores through
/// `bus`, polls the interrupt lines, and calls `run` with the cycles its
/// instruction batches consumed.
#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct Emulator {
    pub bus: Bus,
    cycles: u64,
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            bus: Bus::new(),
            cycles: 0,
        }
    }

    /// Load a raw cartridge image into the ROM window.  No header parsing;
    /// the image is the bus contents.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), Box<dyn Error>> {
        if image.is_empty() {
            return Err("cartridge image is empty".into());
        }
        self.bus.load_rom(image.to_vec());
        Ok(())
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cycles = 0;
    }

    /// Advance the chipset clock.  Returns whether any CPU interrupt line
    /// is asserted afterwards.
    pub fn run(&mut self, cycles: u32) -> bool {
        self.cycles += cycles as u64;
        self.bus.tick(cycles)
    }

    /// Run until the next frame is ready and leave it pending for
    /// `take_frames`.
    pub fn run_frame(&mut self) {
        // Bounded by a little over one frame's worth of scanlines in case
        // a frame was already pending.
        for _ in 0..=crate::vip::LINES_PER_FRAME {
            if self.bus.frame_ready() {
                return;
            }
            self.run(CYCLES_PER_SCANLINE);
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_keypad_input(&mut self, state: u16) {
        self.bus.set_keypad_input(state);
    }

    pub fn take_frames(&mut self) -> Option<(FrameSurface, FrameSurface)> {
        self.bus.take_frames()
    }

    pub fn take_frames_into(&mut self, left: &mut Vec<u8>, right: &mut Vec<u8>) -> bool {
        self.bus.take_frames_into(left, right)
    }

    /// Expand a pen-index surface to 0x00RRGGBB pixels using the current
    /// brightness pens (red LED display: green/blue stay 0).
    pub fn frame_rgb(&self, surface: &FrameSurface) -> Vec<u32> {
        let pens = self.bus.pens();
        surface
            .pixels()
            .iter()
            .map(|&pen| (pens[pen as usize & 3] as u32) << 16)
            .collect()
    }

    pub fn irq_pending(&self) -> bool {
        self.bus.irq_pending()
    }

    pub fn irq_line(&self, line: usize) -> bool {
        self.bus.irq_line(line)
    }

    pub fn save_state_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn Error>> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_state_from_file<P: AsRef<std::path::Path>>(
        &mut self,
        path: P,
    ) -> Result<(), Box<dyn Error>> {
        let bytes = std::fs::read(path)?;
        let (state, _): (Emulator, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())?;
        *self = state;
        Ok(())
    }
}

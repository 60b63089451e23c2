// Virtual Boy chipset core: the VIP display processor, the hardware timer,
// the keypad/link I/O block, and the memory bus that glues them to the
// host CPU's address space.  The V810 itself, the audio unit, and the
// front end are external to this crate.

pub mod bus;
pub mod emulator;
pub mod vip;

pub use emulator::Emulator;

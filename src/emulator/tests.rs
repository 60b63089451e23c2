use super::*;

const IO_BASE: u32 = 0x0200_0000;
const VIP_BASE: u32 = 0x0005_F800;

#[test]
fn reset_restores_power_on_defaults() {
    let mut emu = Emulator::new();
    emu.bus.write_u8(IO_BASE + 0x20, 0x19);
    emu.bus.write_u16(VIP_BASE + 0x24, 0x40);
    emu.reset();

    assert_eq!(emu.bus.read_u8(IO_BASE + 0x20), 0xE4); // TCR
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x24), 0xFC); // WCR
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x28), 0xCC); // KCR
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x18), 0xFF); // TLB
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x1C), 0xFF); // THB
    // the display comes up enabled so FRAME_START fires at boot
    assert_ne!(emu.bus.read_u16(VIP_BASE + 0x22) & 0x0002, 0);
    assert_eq!(emu.cycles(), 0);
}

#[test]
fn run_frame_paces_frames() {
    let mut emu = Emulator::new();
    emu.run_frame();
    assert!(emu.take_frames().is_some());
    assert!(emu.take_frames().is_none());
    emu.run_frame();
    assert!(emu.take_frames().is_some());
}

#[test]
fn frame_rgb_applies_pens() {
    let mut emu = Emulator::new();
    emu.bus.write_u16(VIP_BASE + 0x24, 0x80); // BRTA: pen 1 saturates
    emu.bus.write_u16(VIP_BASE + 0x70, 0x0001); // BKCOL

    emu.run_frame();
    let (left, _right) = emu.take_frames().unwrap();
    let rgb = emu.frame_rgb(&left);
    assert_eq!(rgb[0], 0x00FF_0000);
}

#[test]
fn keypad_input_reaches_latch() {
    let mut emu = Emulator::new();
    emu.set_keypad_input(0xA550);
    emu.bus.write_u8(IO_BASE + 0x28, 0x04);
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x10), 0x52);
    assert_eq!(emu.bus.read_u8(IO_BASE + 0x14), 0xA5);
}

#[test]
fn empty_rom_is_rejected() {
    let mut emu = Emulator::new();
    assert!(emu.load_rom(&[]).is_err());
    assert!(emu.load_rom(&[0x42]).is_ok());
    assert_eq!(emu.bus.read_u8(0x0700_0000), 0x42);
}

#[test]
fn save_state_round_trips() {
    let path = std::env::temp_dir().join("vb_state_round_trip.bin");

    let mut emu = Emulator::new();
    emu.bus.write_u16(VIP_BASE + 0x24, 0x40);
    emu.bus.write_u16(0x0002_0000, 0xBEEF);
    emu.bus.write_u16(0x0000_6000, 0xAAAA);
    emu.run(crate::bus::CYCLES_PER_SCANLINE * 3);
    emu.save_state_to_file(&path).unwrap();

    let mut restored = Emulator::new();
    restored.load_state_from_file(&path).unwrap();
    assert_eq!(restored.bus.read_u16(0x0002_0000), 0xBEEF);
    assert_eq!(restored.bus.pens(), emu.bus.pens());
    assert_eq!(restored.bus.vip.read_font(0x10000), 0x5555);
    assert_eq!(restored.bus.current_scanline(), emu.bus.current_scanline());
    assert_eq!(restored.cycles(), emu.cycles());

    let _ = std::fs::remove_file(&path);
}

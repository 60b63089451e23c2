use super::*;
use crate::vip::{COLUMN_TABLE_1_BASE, COLUMN_TABLE_2_BASE, INT_FRAME_START};

const VIP_BASE: u32 = 0x0005_F800;
const IO_BASE: u32 = 0x0200_0000;

// ---- interrupt plumbing ------------------------------------------------

#[test]
fn vip_interrupt_gating_drives_cpu_line() {
    let mut bus = Bus::new();
    bus.write_u16(VIP_BASE + 0x02, INT_FRAME_START); // INTENB
    bus.vip.raise_interrupt(INT_FRAME_START);
    bus.refresh_vip_irq();
    assert!(bus.irq_line(LINE_VIP));

    bus.write_u16(VIP_BASE + 0x04, INT_FRAME_START); // INTCLR
    assert!(!bus.irq_line(LINE_VIP));
    assert_eq!(bus.read_u16(VIP_BASE), 0x0000); // INTPND
}

#[test]
fn pending_without_enable_never_asserts() {
    let mut bus = Bus::new();
    bus.scanline_tick(0); // FRAME_START, GAME_START, SB_HIT pend
    assert_ne!(bus.read_u16(VIP_BASE), 0);
    assert!(!bus.irq_line(LINE_VIP));

    bus.write_u16(VIP_BASE + 0x02, 0xFFFF);
    assert!(bus.irq_line(LINE_VIP));
    bus.write_u16(VIP_BASE + 0x02, 0x0000);
    assert!(!bus.irq_line(LINE_VIP));
}

#[test]
fn display_reset_strobe_clears_display_interrupts() {
    let mut bus = Bus::new();
    bus.write_u16(VIP_BASE + 0x02, 0xFFFF);
    bus.scanline_tick(0);
    assert!(bus.irq_line(LINE_VIP));

    // DPRST drops FRAME_START/GAME_START but leaves SB_HIT pending
    bus.write_u16(VIP_BASE + 0x22, 0x0003);
    assert_eq!(bus.read_u16(VIP_BASE), 0x2000);
    assert!(bus.irq_line(LINE_VIP));

    // XPRST drops the pixel-processor side; the line falls
    bus.write_u16(VIP_BASE + 0x42, 0x0001);
    assert_eq!(bus.read_u16(VIP_BASE), 0x0000);
    assert!(!bus.irq_line(LINE_VIP));
}

#[test]
fn cartridge_interrupt_line_is_level_driven() {
    let mut bus = Bus::new();
    bus.set_cart_irq(true);
    assert!(bus.irq_line(LINE_CART) && bus.irq_pending());
    bus.set_cart_irq(false);
    assert!(!bus.irq_pending());
}

// ---- timer -------------------------------------------------------------

#[test]
fn timer_one_shot_then_interrupt_enabled_run() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE + 0x18, 0x34); // TLB
    bus.write_u8(IO_BASE + 0x1C, 0x12); // THB
    bus.write_u8(IO_BASE + 0x20, 0x11); // enable, 20 us rate

    // the enable write latches the counter and mirrors it into TLB/THB
    assert_eq!(bus.read_u8(IO_BASE + 0x18), 0x34);
    assert_eq!(bus.read_u8(IO_BASE + 0x1C), 0x12);

    for _ in 0..0x1234 {
        bus.timer_tick();
    }
    assert_eq!(bus.timer.counter, 0x1234); // reloaded on underflow
    assert_ne!(bus.read_u8(IO_BASE + 0x20) & TCR_ZERO_FLAG, 0);
    assert!(!bus.irq_line(LINE_TIMER)); // interrupt enable was clear

    bus.write_u8(IO_BASE + 0x20, 0x19);
    for _ in 0..0x1234 {
        bus.timer_tick();
    }
    assert!(bus.irq_line(LINE_TIMER));

    // clearing the interrupt-enable bit drops the line
    bus.write_u8(IO_BASE + 0x20, 0x11);
    assert!(!bus.irq_line(LINE_TIMER));
}

#[test]
fn tcr_stored_bits_follow_hardware_mask() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE + 0x20, 0x00);
    assert_eq!(bus.read_u8(IO_BASE + 0x20), 0xE4);

    bus.write_u8(IO_BASE + 0x18, 0x01);
    bus.write_u8(IO_BASE + 0x20, 0x01);
    bus.timer_tick(); // 1 -> 0 -> reload; zero flag sets
    assert_ne!(bus.read_u8(IO_BASE + 0x20) & TCR_ZERO_FLAG, 0);

    // the flag survives plain writes and clears only on acknowledge
    bus.write_u8(IO_BASE + 0x20, 0x01);
    assert_ne!(bus.read_u8(IO_BASE + 0x20) & TCR_ZERO_FLAG, 0);
    bus.write_u8(IO_BASE + 0x20, 0x05);
    assert_eq!(bus.read_u8(IO_BASE + 0x20) & TCR_ZERO_FLAG, 0);
}

#[test]
fn timer_rate_select_and_cancel() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE + 0x18, 0x10);
    bus.write_u8(IO_BASE + 0x20, 0x11); // 20 us ticks
    bus.tick(TIMER_PERIOD_20US * 4);
    assert_eq!(bus.timer.counter, 0x10 - 4);

    // clearing the enable bit cancels pending ticks
    bus.write_u8(IO_BASE + 0x20, 0x10);
    bus.tick(TIMER_PERIOD_20US * 8);
    assert_eq!(bus.timer.counter, 0x10 - 4);

    // 100 us rate counts four times slower
    bus.write_u8(IO_BASE + 0x20, 0x01);
    bus.tick(TIMER_PERIOD_100US * 2);
    assert_eq!(bus.timer.counter, 0x10 - 2);
}

#[test]
fn timer_rearms_only_on_enable_edge() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE + 0x18, 0x10);
    bus.write_u8(IO_BASE + 0x20, 0x01);
    bus.tick(TIMER_PERIOD_100US / 2); // half a period elapsed
    // re-writing the enable bit must not reset the tick phase
    bus.write_u8(IO_BASE + 0x20, 0x01);
    bus.tick(TIMER_PERIOD_100US / 2);
    assert_eq!(bus.timer.counter, 0x10 - 1);
}

// ---- keypad / wait / link ----------------------------------------------

#[test]
fn keypad_strobe_latches_and_clears() {
    let mut bus = Bus::new();
    bus.set_keypad_input(0xA550);

    bus.write_u8(IO_BASE + 0x28, 0x04); // sample
    assert_eq!(bus.read_u8(IO_BASE + 0x10), 0x52); // bit 1 pinned high
    assert_eq!(bus.read_u8(IO_BASE + 0x14), 0xA5);

    bus.write_u8(IO_BASE + 0x28, 0x01); // clear
    assert_eq!(bus.read_u8(IO_BASE + 0x10), 0x00);
    assert_eq!(bus.read_u8(IO_BASE + 0x14), 0x00);

    bus.write_u8(IO_BASE + 0x28, 0x80);
    assert_eq!(bus.read_u8(IO_BASE + 0x28), 0xCC);
}

#[test]
fn pad_tick_interrupts_while_strobe_latch_clear() {
    let mut bus = Bus::new();
    bus.pad_tick();
    assert!(!bus.irq_line(LINE_PAD)); // latch is set out of reset

    bus.write_u8(IO_BASE + 0x28, 0x00);
    bus.pad_tick();
    assert!(bus.irq_line(LINE_PAD));

    bus.acknowledge_irq(LINE_PAD);
    assert!(!bus.irq_line(LINE_PAD));
}

#[test]
fn wait_control_reads_back_with_high_bits() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE + 0x24, 0x01);
    assert_eq!(bus.read_u8(IO_BASE + 0x24), 0xFD);
}

#[test]
fn link_port_stubs_and_unmapped_io() {
    let mut bus = Bus::new();
    bus.write_u8(IO_BASE, 0x55); // LPC: accepted, no effect
    assert_eq!(bus.read_u8(IO_BASE), 0);
    assert_eq!(bus.read_u8(IO_BASE + 0x0C), 0); // LPR
    assert_eq!(bus.read_u16(IO_BASE + 0x2C), 0xFFFF);

    bus.write_u8(IO_BASE + 0x10, 0x99); // KLB is read-only
    assert_eq!(bus.read_u8(IO_BASE + 0x10), 0x00);

    // the register block mirrors across the whole 16 MiB window
    bus.write_u8(IO_BASE + 0x00FF_0024, 0x01);
    assert_eq!(bus.read_u8(IO_BASE + 0x24), 0xFD);
}

// ---- address map -------------------------------------------------------

#[test]
fn framebuffers_and_wram_are_host_memory() {
    let mut bus = Bus::new();
    bus.write_u8(0x0000_0000, 0x12); // left framebuffer 0
    assert_eq!(bus.read_u8(0x0000_0000), 0x12);
    bus.write_u16(0x0000_8000, 0x3456); // left framebuffer 1
    assert_eq!(bus.read_u16(0x0000_8000), 0x3456);
    bus.write_u8(0x0001_0005, 0x78); // right framebuffer 0
    assert_eq!(bus.read_u8(0x0001_0005), 0x78);
    bus.write_u8(0x0001_8000, 0x9A); // right framebuffer 1
    assert_eq!(bus.read_u8(0x0001_8000), 0x9A);

    bus.write_u32(0x0500_0000, 0xDEAD_BEEF);
    assert_eq!(bus.read_u32(0x0500_0000), 0xDEAD_BEEF);
    // work RAM mirrors across its 16 MiB window
    assert_eq!(bus.read_u32(0x05F1_0000), 0xDEAD_BEEF);
    // and the whole map repeats every 128 MiB
    assert_eq!(bus.read_u8(0x0D00_0000), 0xEF);
}

#[test]
fn character_banks_alias_their_mirror_window() {
    let mut bus = Bus::new();
    bus.write_u16(0x0000_6000, 0xAAAA); // bank 0 word 0
    assert_eq!(bus.read_u16(0x0000_6000), 0xAAAA);
    assert_eq!(bus.read_u16(0x0007_8000), 0xAAAA); // mirror window

    bus.write_u16(0x0007_8000 + 0x2000 * 3 + 2, 0x1234); // bank 3 word 1
    assert_eq!(bus.read_u16(0x0001_E000 + 2), 0x1234);

    // the flip planes tracked the primary write
    assert_eq!(bus.vip.read_font(0x10000), 0x5555);
}

#[test]
fn bgmap_window_overlays_world_and_object_tables() {
    let mut bus = Bus::new();
    bus.write_u16(0x0002_0000, 0x0123);
    assert_eq!(bus.vip.read_bgmap(0), 0x0123);

    bus.write_u16(0x0002_0000 + 0x1D800 + 4, 0xBEEF);
    assert_eq!(bus.vip.read_world(2), 0xBEEF);
    bus.write_u16(0x0002_0000 + 0x1E000, 0x0456);
    assert_eq!(bus.vip.read_objects(0), 0x0456);
    bus.write_u16(0x0002_0000 + 0x1DC00, 0x0789);
    assert_eq!(bus.vip.read_bgmap(COLUMN_TABLE_1_BASE), 0x0789);
    bus.write_u16(0x0002_0000 + 0x1DE00, 0x0321);
    assert_eq!(bus.vip.read_bgmap(COLUMN_TABLE_2_BASE), 0x0321);

    // byte writes merge into the 16-bit entry
    bus.write_u8(0x0002_0001, 0xAB);
    assert_eq!(bus.read_u16(0x0002_0000), 0xAB23);
}

#[test]
fn vip_register_window_handles_narrow_writes() {
    let mut bus = Bus::new();
    bus.write_u16(VIP_BASE + 0x2E, 0x0005); // FRMCYC
    assert_eq!(bus.read_u16(VIP_BASE + 0x2E), 0x0005);

    bus.write_u8(VIP_BASE + 0x2E, 0x07);
    assert_eq!(bus.read_u16(VIP_BASE + 0x2E), 0x0007);
    bus.write_u8(VIP_BASE + 0x2F, 0x01);
    assert_eq!(bus.read_u16(VIP_BASE + 0x2E), 0x0107);

    // holes inside the register window read as open bus
    assert_eq!(bus.read_u16(VIP_BASE + 0x10), 0xFFFF);
}

#[test]
fn cartridge_rom_mirrors_and_ram_round_trips() {
    let mut bus = Bus::new();
    bus.load_rom(vec![0x11, 0x22, 0x33, 0x44]);
    assert_eq!(bus.read_u8(0x0700_0000), 0x11);
    assert_eq!(bus.read_u8(0x0700_0004), 0x11); // mirrored
    bus.write_u8(0x0700_0000, 0x99); // ROM ignores writes
    assert_eq!(bus.read_u8(0x0700_0000), 0x11);

    assert!(bus.cart_ram().is_none());
    bus.configure_cart_ram(0x2000);
    bus.write_u8(0x0600_0000, 0x5A);
    assert_eq!(bus.read_u8(0x0600_0000), 0x5A);
    assert_eq!(bus.read_u8(0x0600_2000), 0x5A); // mirrored
    assert!(bus.load_cart_ram(&[0u8; 4]).is_err());

    // expansion window reads as open bus
    assert_eq!(bus.read_u16(0x0400_0000), 0xFFFF);
}

// ---- clocking ----------------------------------------------------------

#[test]
fn full_frame_tick_produces_both_eyes() {
    let mut bus = Bus::new();
    bus.write_u16(VIP_BASE + 0x70, 0x0003); // BKCOL

    bus.tick(CYCLES_PER_SCANLINE);
    assert!(bus.frame_ready());
    let (left, right) = bus.take_frames().unwrap();
    assert_eq!(left.pixel(0, 0), 3);
    assert_eq!(right.pixel(10, 10), 3);
    assert!(bus.take_frames().is_none());
}

#[test]
fn scanline_counter_wraps_at_frame_end() {
    let mut bus = Bus::new();
    for _ in 0..u32::from(crate::vip::LINES_PER_FRAME) {
        bus.tick(CYCLES_PER_SCANLINE);
    }
    assert_eq!(bus.current_scanline(), 0);
    bus.tick(CYCLES_PER_SCANLINE);
    assert_eq!(bus.current_scanline(), 1);
}

use std::{env, error::Error, fs, io::Write as _, path::PathBuf};

use vb::emulator::Emulator;
use vb::vip::{FrameSurface, DISPLAY_HEIGHT, DISPLAY_WIDTH};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut rom_path: Option<PathBuf> = None;
    let mut frames = 1usize;
    let mut dump_left: Option<PathBuf> = None;
    let mut save_state: Option<PathBuf> = None;
    let mut load_state: Option<PathBuf> = None;
    let mut pad: Option<u16> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let Some(value) = args.next() else {
                    eprintln!("--frames requires a value");
                    return Ok(());
                };
                match value.parse::<usize>() {
                    Ok(count) => frames = count,
                    Err(_) => {
                        eprintln!("invalid --frames value: {value}");
                        return Ok(());
                    }
                }
            }
            "--dump-left" => {
                if let Some(path) = args.next() {
                    dump_left = Some(PathBuf::from(path));
                } else {
                    eprintln!("--dump-left requires a file path");
                    return Ok(());
                }
            }
            "--save-state" => {
                if let Some(path) = args.next() {
                    save_state = Some(PathBuf::from(path));
                } else {
                    eprintln!("--save-state requires a file path");
                    return Ok(());
                }
            }
            "--load-state" => {
                if let Some(path) = args.next() {
                    load_state = Some(PathBuf::from(path));
                } else {
                    eprintln!("--load-state requires a file path");
                    return Ok(());
                }
            }
            "--pad" => {
                let Some(value) = args.next() else {
                    eprintln!("--pad requires a hex value");
                    return Ok(());
                };
                match u16::from_str_radix(value.trim_start_matches("0x"), 16) {
                    Ok(state) => pad = Some(state),
                    Err(_) => {
                        eprintln!("invalid --pad value: {value}");
                        return Ok(());
                    }
                }
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ if rom_path.is_none() => rom_path = Some(PathBuf::from(arg)),
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                return Ok(());
            }
        }
    }

    let mut emulator = Emulator::new();

    if let Some(path) = &rom_path {
        let rom = fs::read(path)?;
        emulator.load_rom(&rom)?;
    }
    emulator.reset();

    if let Some(path) = &load_state {
        emulator.load_state_from_file(path)?;
    }
    if let Some(state) = pad {
        emulator.set_keypad_input(state);
    }

    let mut last_left: Option<FrameSurface> = None;
    for _ in 0..frames {
        emulator.run_frame();
        if let Some((left, _right)) = emulator.take_frames() {
            last_left = Some(left);
        }
    }

    let pens = emulator.bus.pens();
    println!(
        "Ran {} cycle(s), {} frame(s); scanline {}, pens {:02X?}, INTPND {:#06X}",
        emulator.cycles(),
        frames,
        emulator.bus.current_scanline(),
        pens,
        emulator.bus.read_u16(0x0005_F800),
    );

    if let Some(path) = &dump_left {
        match &last_left {
            Some(surface) => write_pgm(path, surface, pens)?,
            None => eprintln!("warning: no frame was produced; nothing dumped"),
        }
    }

    if let Some(path) = &save_state {
        emulator.save_state_to_file(path)?;
    }

    Ok(())
}

fn write_pgm(path: &std::path::Path, surface: &FrameSurface, pens: [u8; 4]) -> std::io::Result<()> {
    let mut out = fs::File::create(path)?;
    write!(out, "P5\n{DISPLAY_WIDTH} {DISPLAY_HEIGHT}\n255\n")?;
    let bytes: Vec<u8> = surface
        .pixels()
        .iter()
        .map(|&pen| pens[pen as usize & 3])
        .collect();
    out.write_all(&bytes)
}

fn print_usage() {
    eprintln!("Usage: vb [rom.vb] [--frames <n>] [--dump-left <file.pgm>] [--pad <hex>]");
    eprintln!("          [--save-state <file>] [--load-state <file>]");
    eprintln!("  Runs the chipset clock headlessly (no CPU) and reports display state.");
    eprintln!("Options:");
    eprintln!("  --frames <n>        Number of display frames to run (default 1)");
    eprintln!("  --dump-left <file>  Write the last left-eye frame as a binary PGM");
    eprintln!("  --pad <hex>         Keypad state latched on KCR strobes");
    eprintln!("  --save-state <file> Save a machine snapshot after the run");
    eprintln!("  --load-state <file> Restore a machine snapshot before the run");
}

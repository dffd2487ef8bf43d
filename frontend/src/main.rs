use phosphor_core::core::machine::Machine;
use phosphor_machines::SnesSystem;

mod audio;
mod emulator;
mod input;
mod overlay;
mod video;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    // Usage: phosphor-snes <rom-path> [--scale N] [--sram <path>]

    let rom_path = args
        .get(1)
        .expect("Usage: phosphor-snes <rom-path> [--scale N] [--sram <path>]");
    let scale = parse_scale_arg(&args).unwrap_or(3);

    let rom_data = std::fs::read(rom_path).expect("Failed to read ROM file");
    let mut machine = SnesSystem::new();
    machine.load_rom(rom_data).expect("Failed to load ROM");

    let sram_path = parse_sram_arg(&args).unwrap_or_else(|| sram_path_for(rom_path));
    if let Ok(data) = std::fs::read(&sram_path) {
        machine.load_nvram(&data);
    }

    let key_map = input::default_key_map(machine.input_map());
    machine.reset();
    emulator::run(&mut machine, &key_map, scale);

    if let Some(data) = machine.save_nvram()
        && let Err(e) = std::fs::write(&sram_path, data)
    {
        eprintln!("Warning: failed to save SRAM: {e}");
    }
}

fn sram_path_for(rom_path: &str) -> std::path::PathBuf {
    std::path::Path::new(rom_path).with_extension("srm")
}

fn parse_scale_arg(args: &[String]) -> Option<u32> {
    args.windows(2).find_map(|w| {
        if w[0] == "--scale" {
            w[1].parse().ok()
        } else {
            None
        }
    })
}

fn parse_sram_arg(args: &[String]) -> Option<std::path::PathBuf> {
    args.windows(2).find_map(|w| {
        if w[0] == "--sram" {
            Some(std::path::PathBuf::from(&w[1]))
        } else {
            None
        }
    })
}

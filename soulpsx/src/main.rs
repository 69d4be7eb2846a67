use std::path::Path;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command, arg, value_parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use libsoulpsx::cpu::CPU;
use libsoulpsx::r3000::{cop0_register_name, register_name};
use libsoulpsx::r3000::cop0::{BAD_VADDR, CAUSE, EPC, PRID, SR};
use libsoulpsx::{BIOS, System};

fn parse_address(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid address `{}`: {}", value, e))
}

fn dump_state(system: &System) {
    let cpu = system.cpu();

    println!("PC: 0x{:08X}  next: 0x{:08X}", cpu.pc(), cpu.next_pc());
    println!(
        "Last: 0x{:08X}: {}",
        cpu.current_pc(),
        cpu.current_instruction()
    );
    if cpu.in_delay_slot() {
        println!("      (in branch delay slot)");
    }
    if let Some(load) = cpu.load_delay() {
        println!("Pending load: ${} <- 0x{:08X}", register_name(load.register), load.value);
    }

    for row in 0..8 {
        let line: Vec<String> = (0..4)
            .map(|col| {
                let index = row * 4 + col;
                format!("{:>4}: 0x{:08X}", register_name(index), cpu.read_register(index))
            })
            .collect();
        println!("{}", line.join("  "));
    }
    println!("  hi: 0x{:08X}    lo: 0x{:08X}", cpu.read_hi(), cpu.read_lo());

    for index in [BAD_VADDR, SR, CAUSE, EPC, PRID] {
        println!("{:>5}: 0x{:08X}", cop0_register_name(index), cpu.read_cop0_register(index));
    }
}

fn main() -> ExitCode {
    println!("SoulPSX - A Rust, PlayStation Emulator");
    let arguments = Command::new("SoulPSX")
        .version("0.0.1")
        .about("A Rust, PlayStation Emulator")
        .arg(arg!(--bios <VALUE> "Path to a 512 KiB BIOS image").required(true))
        .arg(
            arg!(--steps <COUNT> "Stop after this many instructions")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("break")
                .long("break")
                .value_name("ADDRESS")
                .help("Hex address to stop at, may be repeated")
                .action(ArgAction::Append)
                .value_parser(parse_address),
        )
        .arg(arg!(--log <FILTER> "Log filter, overrides RUST_LOG"))
        .get_matches();

    let filter = match arguments.get_one::<String>("log") {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(bios_path) = arguments.get_one::<String>("bios") else {
        error!("No BIOS path provided!");
        return ExitCode::FAILURE;
    };

    let bios = match BIOS::new(Path::new(bios_path)) {
        Ok(bios) => bios,
        Err(e) => {
            error!("Failed to load BIOS: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut system = match System::new(bios) {
        Ok(system) => system,
        Err(e) => {
            error!("Failed to initialize system: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(breakpoints) = arguments.get_many::<u32>("break") {
        for addr in breakpoints {
            info!("Breakpoint set at 0x{:08X}", addr);
            system.add_breakpoint(*addr);
        }
    }

    let result = match arguments.get_one::<u64>("steps") {
        Some(steps) => system.run_for(*steps).map(|executed| {
            info!("Executed {} instructions", executed);
        }),
        None => system.run_until_break(),
    };

    dump_state(&system);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Emulation stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

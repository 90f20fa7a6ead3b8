//! Breadboard Emulator - CLI Entry Point
//!
//! Commands:
//! - `breadboard-emu run <program>` - Run a built-in program, ASM or ROM file
//! - `breadboard-emu debug <program>` - Interactive debugger
//! - `breadboard-emu asm <source>` - Assemble to a ROM image
//! - `breadboard-emu disasm <image>` - Disassemble a ROM image
//! - `breadboard-emu programs` - List built-in programs
//!
//! Set `RUST_LOG=debug` to log every decoded instruction, `RUST_LOG=trace`
//! for every tick.

use breadboard::{
    assemble, load_image, save_image, BuiltinProgram, Computer, ComputerOptions, ComputerState, ControlLine,
    Instruction, LedMatrix, RomImage,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "breadboard-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of an 8-bit breadboard TTL computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Built-in program name, or path to an ASM or ROM file
        program: String,
        /// Maximum number of clock ticks to run
        #[arg(short, long, default_value = "100000")]
        max_ticks: u64,
        /// Print the control lines of every tick
        #[arg(short, long)]
        trace: bool,
        /// Disable memory-mapped IO
        #[arg(long)]
        no_io: bool,
        /// Write the final machine state as JSON
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Interactive debugger
    Debug {
        /// Built-in program name, or path to an ASM or ROM file
        program: String,
        /// Disable memory-mapped IO
        #[arg(long)]
        no_io: bool,
    },
    /// Assemble source to a ROM image
    Asm {
        /// Path to the source file
        source: String,
        /// Output ROM file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a ROM image to readable text
    Disasm {
        /// Path to the ROM file
        image: String,
    },
    /// List the built-in programs
    Programs,
    /// Run the built-in self-test
    Test,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_ticks, trace, no_io, dump_state }) => {
            run_program(&program, max_ticks, trace, options(no_io), dump_state.as_deref());
        }
        Some(Commands::Debug { program, no_io }) => {
            debug_program(&program, options(no_io));
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Programs) => {
            list_programs();
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Breadboard Emulator v0.1.0");
            println!("An 8-bit breadboard TTL computer emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            list_programs();
        }
    }
}

fn options(no_io: bool) -> ComputerOptions {
    ComputerOptions { memory_mapped_io: !no_io }
}

/// Resolve a program argument to a loaded computer, exiting on failure.
fn load_computer(source: &str, options: ComputerOptions) -> Computer {
    let mut computer = Computer::with_options(options);

    let result = if let Some(builtin) = BuiltinProgram::from_name(source) {
        let program = builtin.instructions();
        println!("📦 Built-in program '{}' ({} instructions)", builtin.name(), program.len());
        computer.load(&program)
    } else if source.ends_with(".asm") {
        let program = assemble_source(source);
        println!("📝 Assembled {} instructions", program.len());
        computer.load(&program)
    } else {
        let image = match load_image(source) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("❌ Failed to load ROM image: {}", e);
                std::process::exit(1);
            }
        };
        println!("📂 Loaded {} instructions", image.len());
        computer.load_image(&image)
    };

    if let Err(e) = result {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }
    if computer.program().is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }
    computer
}

fn assemble_source(path: &str) -> Vec<Instruction> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    match assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, max_ticks: u64, trace: bool, options: ComputerOptions, dump_state: Option<&str>) {
    println!("🔧 Running: {}", path);
    let mut computer = load_computer(path, options);

    println!();
    println!("━━━ Execution ━━━");

    let ticks = computer.run_with(max_ticks, |state| {
        if trace {
            println!(
                "PC={:3} T{} {:06x}  {}",
                state.regs.pc,
                state.step.previous().value(),
                state.control.packed(),
                state.control
            );
        }
        if state.control.is_on(ControlLine::DoIn) {
            println!("📟 {}", state.regs.decimal_output);
        }
    });

    let state = computer.state();
    println!();
    println!("━━━ Result ━━━");
    print_summary(state, ticks);

    let matrix = LedMatrix::from_io(&state.io);
    if matrix.lit_count() > 0 {
        println!();
        println!("━━━ LED Matrix ━━━");
        print!("{:?}", matrix);
    }

    if let Some(path) = dump_state {
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(path, json) {
            eprintln!("❌ Failed to write {}: {}", path, e);
            std::process::exit(1);
        }
        println!();
        println!("✓ State written to {}", path);
    }

    if !state.finished && ticks >= max_ticks {
        println!();
        println!("⚠️  Reached max ticks limit ({}). Use --max-ticks to increase.", max_ticks);
    }
}

fn print_summary(state: &ComputerState, ticks: u64) {
    let regs = &state.regs;
    println!("Ticks: {}", ticks);
    println!("State: {}", if state.finished { "Halted" } else { "Running" });
    println!(
        "R1: {:3}  R2: {:3}  R3: {:3}  R4: {:3}",
        regs.general[0], regs.general[1], regs.general[2], regs.general[3]
    );
    println!("PC: {:3}  IR: {:08b}  Step: {:?}", regs.pc, regs.ir, state.step);
    println!(
        "Flags: overflow={} zero={}",
        state.flags.overflow, state.flags.zero
    );
    println!("Display: {}", regs.decimal_output);
}

fn debug_program(path: &str, options: ComputerOptions) {
    #[cfg(feature = "tui")]
    {
        println!("🔍 Loading: {}", path);
        let computer = load_computer(path, options);

        println!("🚀 Launching debugger...");
        println!();

        if let Err(e) = breadboard::run_debugger(computer) {
            eprintln!("❌ Debugger error: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "tui"))]
    {
        let _ = (path, options);
        eprintln!("❌ Built without the 'tui' feature");
        std::process::exit(1);
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".rom"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let program = assemble_source(source_path);
    println!("✓ Assembled {} instructions", program.len());

    if let Err(e) = save_image(&out_path, &RomImage::from_program(&program)) {
        eprintln!("❌ Failed to save ROM image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    use breadboard::disassemble;

    println!("📖 Disassembling: {}", image_path);
    println!();

    let image = match load_image(image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Failed to load ROM image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&image.words));
}

fn list_programs() {
    println!("━━━ Built-in Programs ━━━");
    for program in BuiltinProgram::ALL {
        println!("  {:<18} {}", program.name(), program.description());
    }
}

/// Collect the decimal display value each time `out` latches it.
fn outputs_of(program: &[Instruction], max_ticks: u64) -> Vec<u8> {
    let mut computer = Computer::new();
    if computer.load(program).is_err() {
        return Vec::new();
    }
    let mut seen = Vec::new();
    computer.run_with(max_ticks, |state| {
        if state.control.is_on(ControlLine::DoIn) {
            seen.push(state.regs.decimal_output);
        }
    });
    seen
}

fn run_self_test() {
    use breadboard::cpu::{decode, encode, Operation, Register};
    use breadboard::programs;

    println!("━━━ Breadboard Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    // Test 1: Instruction codec
    let codec_ok = programs::fibonacci()
        .iter()
        .chain(programs::two_times_tables().iter())
        .all(|i| {
            let (upper, lower) = encode(i);
            decode(upper, lower).as_ref() == Ok(i)
        });
    check("Instruction encode/decode roundtrip", codec_ok);

    // Test 2: Reserved opcodes
    check("Reserved opcodes rejected", (11u8..=14).all(|op| decode(op << 4, 0).is_err()));

    // Test 3: Halt
    let mut computer = Computer::new();
    let halt_ok = computer.load(&[Instruction::halt()]).is_ok() && computer.run(100) == 3 && computer.is_finished();
    check("Halt stops the clock", halt_ok);

    // Test 4: Arithmetic
    let mut computer = Computer::new();
    let add_ok = computer
        .load(&[
            Instruction::load_immediate(10, Register::R1),
            Instruction::add_immediate(5),
            Instruction::halt(),
        ])
        .is_ok()
        && {
            computer.run(100);
            computer.state().regs.get(Register::R3) == 15
        };
    check("ALU add into R3", add_ok);

    // Test 5: Doubling sequence
    let expected: Vec<u8> = (0..=15).map(|n| n * 2).collect();
    check("Two times tables", outputs_of(&programs::two_times_tables(), 10_000) == expected);

    // Test 6: Fibonacci
    let fib = outputs_of(&programs::fibonacci(), 2_000);
    check("Fibonacci", fib.starts_with(&[1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 1]));

    // Test 7: LED matrix
    let mut computer = Computer::new();
    let leds_ok = computer.load(&programs::board_outline()).is_ok() && {
        computer.run(10_000);
        LedMatrix::from_io(&computer.state().io).lit_count() > 0
    };
    check("Board outline lights LEDs", leds_ok);

    // Test 8: Unknown opcodes run as no-ops
    let mut computer = Computer::new();
    let nop_ok = computer.load_words(&[(0xb0, 0), encode(&Instruction::halt())]).is_ok() && {
        computer.run(100);
        computer.is_finished() && computer.current_instruction().map(|i| i.operation) == Ok(Operation::Halt)
    };
    check("Reserved opcode executes as NOP", nop_ok);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

//! Clock driver and bus transfers.
//!
//! Each [`Computer::clock_tick`] performs exactly one microcode step:
//! assert the control lines for (IR, step), move one value across the bus,
//! latch it into every asserted input, then advance the step counter.

use crate::cpu::control::{ControlLine, ControlLines};
use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::memory::{LoadError, Rom};
use crate::cpu::microcode::{self, MicrocodeInputs};
use crate::cpu::registers::Flags;
use crate::cpu::state::{ComputerState, Step};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

/// Machine options applied when a program is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerOptions {
    /// Mirror RAM writes to 128-255 into the IO array.
    pub memory_mapped_io: bool,
}

impl Default for ComputerOptions {
    fn default() -> Self {
        Self { memory_mapped_io: true }
    }
}

/// The breadboard computer: a state snapshot plus the sequencer that
/// advances it.
#[derive(Clone, Debug)]
pub struct Computer {
    state: ComputerState,
    options: ComputerOptions,
    /// Encoded program, kept for [`Computer::reset`].
    program: Vec<(u8, u8)>,
    /// Ticks executed since the last load.
    ticks: u64,
}

impl Computer {
    /// Create a computer with an empty ROM.
    pub fn new() -> Self {
        Self::with_options(ComputerOptions::default())
    }

    pub fn with_options(options: ComputerOptions) -> Self {
        let mut computer = Self {
            state: ComputerState::new(),
            options,
            program: Vec::new(),
            ticks: 0,
        };
        computer.power_on();
        computer
    }

    /// Load a program, replacing the whole machine state.
    pub fn load(&mut self, program: &[Instruction]) -> Result<(), LoadError> {
        let words: Vec<(u8, u8)> = program.iter().map(decode::encode).collect();
        self.load_words(&words)
    }

    /// Load pre-encoded (upper, lower) byte pairs.
    pub fn load_words(&mut self, words: &[(u8, u8)]) -> Result<(), LoadError> {
        let mut rom = Rom::new();
        rom.burn(words)?;

        self.program = words.to_vec();
        self.power_on();
        self.state.rom = rom;

        info!("loaded {} instructions", words.len());
        Ok(())
    }

    /// Reload the current program.
    pub fn reset(&mut self) {
        let words = std::mem::take(&mut self.program);
        if let Err(e) = self.load_words(&words) {
            error!("reset failed: {}", e);
        }
    }

    fn power_on(&mut self) {
        self.state = ComputerState::new();
        self.state.memory_mapped_io_active = self.options.memory_mapped_io;
        self.ticks = 0;
    }

    /// Advance the machine by one microcode step.
    ///
    /// Does nothing once the machine has halted.
    pub fn clock_tick(&mut self) {
        if self.state.finished {
            return;
        }

        let step = self.state.step;
        let decoded = if step.is_fetch() {
            None
        } else {
            self.decode_ir(step)
        };

        let inputs = MicrocodeInputs {
            overflow: self.state.flags.overflow,
            io_active: self.state.memory_mapped_io_active,
        };
        self.state.control = microcode::control_lines(decoded.as_ref(), step, inputs);

        trace!(
            "PC={:3} {:?} {:06x} {}",
            self.state.regs.pc,
            step,
            self.state.control.packed(),
            self.state.control
        );

        self.transfer();

        self.state.step = step.next();
        self.state.clock = self.state.clock.toggled();
        self.ticks += 1;

        if self.state.finished {
            info!("halted after {} ticks", self.ticks);
        }
    }

    /// Decode the instruction register for an execute step.
    fn decode_ir(&self, step: Step) -> Option<Instruction> {
        match self.current_instruction() {
            Ok(instr) => {
                if step == Step::new(2) {
                    debug!("{:3}: {}", self.state.rom_address, instr);
                }
                Some(instr)
            }
            Err(e) => {
                if step == Step::new(2) {
                    warn!("{} at ROM address {}; executing as NOP", e, self.state.rom_address);
                }
                None
            }
        }
    }

    /// Move one value across the bus.
    fn transfer(&mut self) {
        use ControlLine::*;

        let lines = self.state.control;
        let alu = self.state.alu();
        let bus = self.bus_value(&lines, alu.output);
        let s = &mut self.state;

        for (i, (input, _)) in REGISTER_LINES.iter().enumerate() {
            if lines.is_on(*input) {
                s.regs.general[i] = bus;
            }
        }
        if lines.is_on(RomAddrIn) {
            s.rom_address = bus;
        }
        if lines.is_on(RamAddrIn) {
            s.ram_address = bus;
        }
        if lines.is_on(RamValueIn) {
            s.write_ram(bus);
        }
        if lines.is_on(IrIn) {
            s.regs.ir = bus;
        }
        if lines.is_on(DoIn) {
            s.regs.decimal_output = bus;
        }
        if lines.is_on(PcIn) {
            s.regs.jump(bus);
        }
        if lines.is_on(PcInc) {
            s.regs.advance_pc();
        }
        if lines.is_on(AluSetFlags) {
            s.flags = Flags {
                overflow: alu.overflow,
                zero: alu.zero,
            };
        }
        if lines.is_on(Halt) {
            s.finished = true;
        }
    }

    /// Value driven onto the bus by the asserted output line, or 0 when the
    /// bus is idle.
    fn bus_value(&self, lines: &ControlLines, alu_output: u8) -> u8 {
        let s = &self.state;
        let mut drivers = lines.outputs().map(|line| match line {
            ControlLine::RomValueOut => s.current_rom_value(),
            ControlLine::RamValueOut => s.current_ram_value(),
            ControlLine::PcOut => s.regs.pc,
            ControlLine::AluOut => alu_output,
            other => REGISTER_LINES
                .iter()
                .position(|(_, out)| *out == other)
                .map_or(0, |i| s.regs.general[i]),
        });

        let value = drivers.next().unwrap_or(0);
        let rest: Vec<u8> = drivers.collect();
        if rest.is_empty() {
            value
        } else {
            error!("bus contention: {}", lines);
            rest.into_iter().fold(value, |acc, v| acc | v)
        }
    }

    /// Tick until halted or `max_ticks` have run. Returns ticks executed.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        self.run_with(max_ticks, |_| {})
    }

    /// Like [`Computer::run`], handing every new snapshot to `observer`.
    pub fn run_with<F>(&mut self, max_ticks: u64, mut observer: F) -> u64
    where
        F: FnMut(&ComputerState),
    {
        let mut executed = 0;
        while !self.state.finished && executed < max_ticks {
            self.clock_tick();
            observer(&self.state);
            executed += 1;
        }
        executed
    }

    /// Tick through the rest of the current instruction.
    ///
    /// Returns the instruction that just completed, or `None` if the machine
    /// had already halted.
    pub fn step_instruction(&mut self) -> Option<Result<Instruction, DecodeError>> {
        if self.state.finished {
            return None;
        }
        loop {
            self.clock_tick();
            if self.state.finished || self.state.step == Step::FIRST {
                break;
            }
        }
        Some(self.current_instruction())
    }

    /// Decode IR together with the payload at the latched ROM address.
    pub fn current_instruction(&self) -> Result<Instruction, DecodeError> {
        let payload = self.state.rom.read(self.state.rom_address, true);
        decode::decode(self.state.regs.ir, payload)
    }

    /// Read-only snapshot.
    pub fn state(&self) -> &ComputerState {
        &self.state
    }

    pub fn options(&self) -> ComputerOptions {
        self.options
    }

    /// Encoded program as loaded.
    pub fn program(&self) -> &[(u8, u8)] {
        &self.program
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Mutable access for tests and debuggers that poke memory directly.
    pub fn state_mut(&mut self) -> &mut ComputerState {
        &mut self.state
    }
}

impl Default for Computer {
    fn default() -> Self {
        Self::new()
    }
}

/// (input, output) line pair of each general register, by index.
const REGISTER_LINES: [(ControlLine, ControlLine); 4] = [
    (ControlLine::Reg1In, ControlLine::Reg1Out),
    (ControlLine::Reg2In, ControlLine::Reg2Out),
    (ControlLine::Reg3In, ControlLine::Reg3Out),
    (ControlLine::Reg4In, ControlLine::Reg4Out),
];

//! WebAssembly bindings for the breadboard emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::{Computer, Instruction};
use crate::display::LedMatrix;
use crate::programs::BuiltinProgram;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly computer wrapper.
#[wasm_bindgen]
pub struct WasmComputer {
    computer: Computer,
}

impl WasmComputer {
    fn load(&mut self, program: &[Instruction]) -> Result<usize, JsError> {
        self.computer
            .load(program)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(program.len())
    }
}

#[wasm_bindgen]
impl WasmComputer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            computer: Computer::new(),
        }
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        self.load(&program)
    }

    /// Load a built-in program by name, e.g. `"fibonacci"`.
    #[wasm_bindgen]
    pub fn load_builtin(&mut self, name: &str) -> Result<usize, JsError> {
        let program = BuiltinProgram::from_name(name)
            .ok_or_else(|| JsError::new(&format!("unknown program '{}'", name)))?;
        self.load(&program.instructions())
    }

    /// Advance one clock tick.
    #[wasm_bindgen]
    pub fn tick(&mut self) {
        self.computer.clock_tick();
    }

    /// Run to the end of the current instruction. Returns its disassembly.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        match self.computer.step_instruction() {
            Some(Ok(instr)) => Ok(instr.to_string()),
            Some(Err(e)) => Ok(format!("{} (NOP)", e)),
            None => Err(JsError::new("computer is halted")),
        }
    }

    /// Run until halt or `max_ticks`. Returns the ticks executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_ticks: u32) -> u32 {
        self.computer.run(max_ticks as u64) as u32
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.computer.reset();
    }

    #[wasm_bindgen]
    pub fn is_finished(&self) -> bool {
        self.computer.is_finished()
    }

    #[wasm_bindgen]
    pub fn ticks(&self) -> f64 {
        self.computer.ticks() as f64
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.computer.state().regs.pc
    }

    #[wasm_bindgen]
    pub fn step_index(&self) -> u8 {
        self.computer.state().step.value()
    }

    /// General register value, `index` 0-3 for R1-R4.
    #[wasm_bindgen]
    pub fn register(&self, index: usize) -> u8 {
        self.computer.state().regs.general.get(index).copied().unwrap_or(0)
    }

    /// Value on the decimal display.
    #[wasm_bindgen]
    pub fn output(&self) -> u8 {
        self.computer.state().regs.decimal_output
    }

    /// Packed control word of the last tick.
    #[wasm_bindgen]
    pub fn control_word(&self) -> u32 {
        self.computer.state().control.packed()
    }

    /// Control lines of the last tick as text, e.g. `"PCO ROMAI"`.
    #[wasm_bindgen]
    pub fn control_text(&self) -> String {
        self.computer.state().control.to_string()
    }

    #[wasm_bindgen]
    pub fn ram(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.computer.state().ram.as_slice())
    }

    #[wasm_bindgen]
    pub fn io_bytes(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.computer.state().io.as_slice())
    }

    /// LED matrix as 32 rows of 16 `0`/`1` characters joined by newlines.
    #[wasm_bindgen]
    pub fn leds(&self) -> String {
        LedMatrix::from_io(&self.computer.state().io)
            .render('1', '0')
            .join("\n")
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.computer.state()).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmComputer {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return instruction count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let program = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(program.len())
}

/// Disassemble one encoded instruction.
#[wasm_bindgen]
pub fn wasm_disassemble(upper: u8, lower: u8) -> String {
    disassemble_instruction(upper, lower)
}

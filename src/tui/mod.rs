//! TUI debugger for the breadboard emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register, flag and control line visualization
//! - RAM view and the LED matrix
//! - Tick/step/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};

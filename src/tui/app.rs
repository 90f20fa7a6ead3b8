//! Debugger application state and logic.

use crate::asm::disasm::disassemble_instruction;
use crate::cpu::{Computer, Step};
use std::collections::HashSet;

/// Clock ticks executed per frame while running.
const TICKS_PER_FRAME: u64 = 6;

/// Debugger application state.
pub struct DebuggerApp {
    /// The computer being debugged.
    pub computer: Computer,
    /// Breakpoints (by instruction address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// RAM view scroll offset, in rows of 16 bytes.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger around a loaded computer.
    pub fn new(computer: Computer) -> Self {
        Self {
            computer,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to tick, 'i' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Address of the instruction being fetched or executed.
    pub fn current_address(&self) -> u8 {
        let state = self.computer.state();
        if state.step == Step::FIRST {
            state.regs.pc
        } else {
            state.rom_address
        }
    }

    fn halted(&mut self) -> bool {
        if self.computer.is_finished() {
            self.status = format!("Halted after {} ticks", self.computer.ticks());
            self.running = false;
            return true;
        }
        false
    }

    /// Advance one clock tick.
    pub fn tick_once(&mut self) {
        if self.halted() {
            return;
        }
        let step = self.computer.state().step;
        self.computer.clock_tick();
        self.status = format!("T{}: {}", step.value(), self.computer.state().control);
    }

    /// Run to the end of the current instruction.
    pub fn step_instruction(&mut self) {
        if self.halted() {
            return;
        }
        let addr = self.current_address();
        match self.computer.step_instruction() {
            Some(Ok(instr)) => self.status = format!("{:03}: {}", addr, instr),
            Some(Err(e)) => self.status = format!("{:03}: {} (NOP)", addr, e),
            None => {}
        }
    }

    /// Run until halt or breakpoint.
    pub fn run(&mut self) {
        if self.halted() {
            return;
        }
        if self.at_breakpoint() {
            self.step_instruction();
        }
        self.running = true;
        self.status = "Running...".into();
    }

    pub fn pause(&mut self) {
        self.running = false;
        self.status = "Paused.".into();
    }

    fn at_breakpoint(&self) -> bool {
        self.computer.state().step == Step::FIRST && self.breakpoints.contains(&self.computer.state().regs.pc)
    }

    /// Run one frame of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        for _ in 0..TICKS_PER_FRAME {
            if self.halted() {
                return;
            }
            if self.at_breakpoint() {
                self.running = false;
                self.status = format!("Breakpoint at PC={}", self.computer.state().regs.pc);
                return;
            }
            self.computer.clock_tick();
        }
    }

    /// Toggle breakpoint at the current instruction.
    pub fn toggle_breakpoint(&mut self) {
        let addr = self.current_address();
        if self.breakpoints.remove(&addr) {
            self.status = format!("Removed breakpoint at {}", addr);
        } else {
            self.breakpoints.insert(addr);
            self.status = format!("Set breakpoint at {}", addr);
        }
    }

    /// Reload the program.
    pub fn reset(&mut self) {
        self.computer.reset();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_memory(&mut self, down: bool) {
        const MAX_SCROLL: usize = 15;
        if down {
            self.mem_scroll = (self.mem_scroll + 1).min(MAX_SCROLL);
        } else {
            self.mem_scroll = self.mem_scroll.saturating_sub(1);
        }
    }

    /// Get disassembly around the current instruction.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u8, String, bool)> {
        let current = self.current_address() as usize;
        let program = self.computer.program();
        let start = current.saturating_sub(lines / 2);

        program
            .iter()
            .enumerate()
            .skip(start)
            .take(lines)
            .map(|(addr, &(upper, lower))| {
                let addr = addr as u8;
                (addr, disassemble_instruction(upper, lower), addr as usize == current)
            })
            .collect()
    }
}

/// Run the debugger on a loaded computer.
pub fn run_debugger(computer: Computer) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(computer);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.tick_once();
                        }
                        KeyCode::Char('i') => {
                            app.running = false;
                            app.step_instruction();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(false),
                        KeyCode::Down => app.scroll_memory(true),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs;

    fn app() -> DebuggerApp {
        let mut computer = Computer::new();
        computer.load(&programs::two_times_tables()).unwrap();
        DebuggerApp::new(computer)
    }

    #[test]
    fn test_step_instruction_advances_pc() {
        let mut app = app();
        app.step_instruction();
        assert_eq!(app.computer.state().regs.pc, 1);
        assert!(app.status.starts_with("000: LDI R1"));
    }

    #[test]
    fn test_run_stops_at_breakpoint() {
        let mut app = app();
        app.breakpoints.insert(5);
        app.run();
        while app.running {
            app.tick();
        }
        assert_eq!(app.computer.state().regs.pc, 5);
        assert_eq!(app.computer.state().step, Step::FIRST);

        // Resuming leaves the breakpoint behind
        app.run();
        app.tick();
        assert_ne!(app.current_address(), 5);
    }

    #[test]
    fn test_run_to_halt() {
        let mut app = app();
        app.run();
        while app.running {
            app.tick();
        }
        assert!(app.computer.is_finished());
        assert!(app.status.starts_with("Halted"));
    }

    #[test]
    fn test_disassembly_marks_current() {
        let mut app = app();
        app.step_instruction();
        app.tick_once();
        let listing = app.get_disassembly(5);
        let current: Vec<_> = listing.iter().filter(|(_, _, cur)| *cur).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 1);
    }
}

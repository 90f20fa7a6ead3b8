//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::{ControlLine, LineKind};
use crate::display::LedMatrix;
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(36),
            Constraint::Percentage(36),
            Constraint::Percentage(28),
        ])
        .split(frame.area());

    // Left: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Middle: control bus and RAM
    let middle_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(6),
        ])
        .split(chunks[1]);

    draw_control_lines(frame, middle_chunks[0], app);
    draw_memory(frame, middle_chunks[1], app);

    // Right: LED matrix and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(18),
            Constraint::Min(5),
        ])
        .split(chunks[2]);

    draw_leds(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw disassembly view.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let state = app.computer.state();
    let regs = &state.regs;
    let value = Style::default().fg(Color::White);
    let flag = |on: bool| if on { Style::default().fg(Color::Green) } else { Style::default().fg(Color::DarkGray) };

    let content = vec![
        Line::from(
            regs.general
                .iter()
                .enumerate()
                .flat_map(|(i, v)| {
                    [
                        Span::raw(format!("R{}: ", i + 1)),
                        Span::styled(format!("{:3}  ", v), value),
                    ]
                })
                .collect::<Vec<_>>(),
        ),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:3}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   IR: "),
            Span::styled(format!("{:08b}", regs.ir), value),
            Span::raw("   Step: "),
            Span::styled(format!("{:?}", state.step), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("ALU: "),
            Span::styled(format!("{:3}", state.alu_output()), value),
            Span::raw("   Flags: "),
            Span::styled("OVF ", flag(state.flags.overflow)),
            Span::styled("ZERO", flag(state.flags.zero)),
        ]),
        Line::from(vec![
            Span::raw("RAM[@"),
            Span::raw(format!("{:3}", state.ram_address)),
            Span::raw("]: "),
            Span::styled(format!("{:3}", state.current_ram_value()), value),
            Span::raw("   Display: "),
            Span::styled(format!("{:3}", regs.decimal_output), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::raw("Ticks: "),
            Span::styled(format!("{}", app.computer.ticks()), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            if state.finished {
                Span::styled("Halted", Style::default().fg(Color::Red))
            } else {
                Span::styled("Running", Style::default().fg(Color::Green))
            },
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw all 24 control lines, lit ones highlighted by kind.
fn draw_control_lines(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let control = &app.computer.state().control;
    let by_pin = {
        let mut lines = ControlLine::ALL.to_vec();
        lines.sort_by_key(|l| l.pin());
        lines
    };

    let content: Vec<Line> = by_pin
        .chunks(3)
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|&line| {
                        let style = if control.is_on(line) {
                            let color = match line.kind() {
                                LineKind::Input => Color::Green,
                                LineKind::Output => Color::Yellow,
                                LineKind::Modifier => Color::Magenta,
                            };
                            Style::default().fg(color).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::DarkGray)
                        };
                        Span::styled(format!("{:2} {:<7}", line.pin(), line.mnemonic()), style)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(format!(" Control {:06x} ", control.packed()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)));

    frame.render_widget(paragraph, area);
}

/// Draw RAM, 16 bytes per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let state = app.computer.state();
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll * 16;

    let items: Vec<ListItem> = (0..visible_rows)
        .map(|row| start + row * 16)
        .take_while(|&base| base < state.ram.len())
        .map(|base| {
            let mut spans = vec![Span::styled(format!("{:03}: ", base), Style::default().fg(Color::DarkGray))];
            for (addr, value) in state.ram.dump(base, 16) {
                let style = if addr == state.ram_address as usize {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if value != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02x} ", value), style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" RAM ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the LED matrix, two rows per character cell.
fn draw_leds(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let matrix = LedMatrix::from_io(&app.computer.state().io);
    let rows: Vec<_> = matrix.rows().collect();

    let content: Vec<Line> = rows
        .chunks(2)
        .map(|pair| {
            let text: String = (0..pair[0].len())
                .map(|col| match (pair[0][col], pair.get(1).map_or(false, |r| r[col])) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            Line::styled(text, Style::default().fg(Color::Red))
        })
        .collect();

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" LED Matrix ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)));

    frame.render_widget(paragraph, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Tick  i: Instruction"),
        Line::from("r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll RAM  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, style::Print, terminal};

use crate::board::Direction;
use crate::error::Result;
use crate::game::{Action, Frontend};
use crate::node::Node;
use crate::search::SearchResult;

pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::Move(Direction::Up)),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::Move(Direction::Down)),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::Move(Direction::Left)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::Move(Direction::Right)),
        KeyCode::Enter => Some(Action::AcceptHint),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    }
}

pub fn hint_line(hint: Option<&SearchResult>) -> String {
    match hint {
        None => String::new(),
        Some(result) => match result.mv.direction() {
            Some(direction) => format!("Suggestion: {} {}", result.mv, direction),
            None => "No Suggestion!".to_string(),
        },
    }
}

/// Score, board and hint as the lines drawn in the middle of the screen.
pub fn screen_lines(node: &Node, hint: Option<&SearchResult>) -> Vec<String> {
    let mut lines = vec![node.score().to_string(), String::new()];
    lines.extend(node.to_string().lines().map(str::to_string));
    lines.push(String::new());
    lines.push(hint_line(hint));
    lines
}

/// Raw-mode alternate screen. Restores the terminal when dropped.
pub struct Terminal {
    out: Stdout,
    status: String,
}

impl Terminal {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self {
            out,
            status: String::new(),
        })
    }

    fn paint(&mut self, lines: &[String]) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let top = height.saturating_sub(lines.len() as u16) / 2;
        queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
        for (i, line) in lines.iter().enumerate() {
            let left = width.saturating_sub(line.chars().count() as u16) / 2;
            queue!(self.out, cursor::MoveTo(left, top + i as u16), Print(line))?;
        }
        self.paint_status(height)?;
        self.out.flush()
    }

    fn paint_status(&mut self, height: u16) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(0, height.saturating_sub(1)),
            terminal::Clear(terminal::ClearType::CurrentLine),
            Print(&self.status)
        )
    }

    fn wait_for_key(&mut self) -> io::Result<KeyEvent> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(key);
                }
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Frontend for Terminal {
    fn draw(&mut self, node: &Node, hint: Option<&SearchResult>) -> Result<()> {
        let lines = screen_lines(node, hint);
        self.paint(&lines)?;
        Ok(())
    }

    fn search_progress(&mut self, depth: u32, result: &SearchResult) {
        self.status = format!(
            "depth {} | best {} | value {} | pruned {}",
            depth, result.mv, result.value, result.pruned_nodes
        );
        let painted = terminal::size()
            .and_then(|(_, height)| self.paint_status(height))
            .and_then(|_| self.out.flush());
        if let Err(err) = painted {
            log::warn!("could not draw search status: {}", err);
        }
    }

    fn next_action(&mut self, wait: bool) -> Result<Option<Action>> {
        if !wait && !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        loop {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => return Ok(action_for(&key)),
                Event::Resize(_, _) => return Ok(None),
                _ if !wait => return Ok(None),
                _ => {}
            }
        }
    }

    fn game_over(&mut self, node: &Node) -> Result<()> {
        let mut lines = screen_lines(node, None);
        lines.pop();
        lines.push("Game Over!".to_string());
        lines.push(format!("Final Score: {}", node.score()));
        lines.push("press any key".to_string());
        self.status.clear();
        self.paint(&lines)?;
        self.wait_for_key()?;
        Ok(())
    }
}

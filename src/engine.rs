use std::collections::BTreeSet;
use std::io::{Read, Write};

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, queue, terminal};

use crate::lockfile::Lockfile;
use crate::model::PackageEntry;
use crate::render::{self, RenderOptions};
use crate::selection::SelectionState;

/// A decoded keystroke. Only the keys the engine reacts to are named;
/// everything else is `Other` and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Char(char),
    Interrupt,
    Other,
}

/// Blocking keystroke source. Injected so tests drive the engine with
/// scripted sequences instead of a terminal.
pub trait KeySource {
    fn next_key(&mut self) -> Result<Key>;

    /// Returns the terminal to cooked mode if the source changed it. The
    /// engine calls this when the selection phase ends; raw mode disables
    /// output post-processing, so anything printed after this point would
    /// otherwise staircase.
    fn release(&mut self) {}
}

/// Crossterm key source. Raw mode is entered on the first key read and
/// left when the engine releases the source (or on drop).
pub struct TerminalKeys {
    raw: bool,
}

impl TerminalKeys {
    pub fn new() -> Self {
        Self { raw: false }
    }

    fn leave_raw(&mut self) {
        if self.raw {
            let _ = terminal::disable_raw_mode();
            self.raw = false;
        }
    }
}

impl Default for TerminalKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        self.leave_raw();
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<Key> {
        if !self.raw {
            terminal::enable_raw_mode().context("enable raw mode")?;
            self.raw = true;
        }
        loop {
            match crossterm::event::read().context("read key event")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(translate(key));
                }
                _ => {}
            }
        }
    }

    fn release(&mut self) {
        self.leave_raw();
    }
}

fn translate(key: KeyEvent) -> Key {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Key::Interrupt,
            _ => Key::Other,
        };
    }
    match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Enter => Key::Enter,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}

/// Byte-stream key source for piped stdin (no terminal). Arrow escape
/// sequences and plain characters are decoded; end of input aborts.
pub struct StdinKeys<R: Read> {
    reader: R,
}

impl<R: Read> StdinKeys<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        let n = self.reader.read(&mut buf).context("read stdin")?;
        Ok(if n == 0 { None } else { Some(buf[0]) })
    }
}

impl<R: Read> KeySource for StdinKeys<R> {
    fn next_key(&mut self) -> Result<Key> {
        let Some(byte) = self.next_byte()? else {
            return Ok(Key::Interrupt);
        };
        match byte {
            b'\n' | b'\r' => Ok(Key::Enter),
            0x03 => Ok(Key::Interrupt),
            0x1b => {
                // ESC [ A / ESC [ B
                let Some(b'[') = self.next_byte()? else {
                    return Ok(Key::Other);
                };
                match self.next_byte()? {
                    Some(b'A') => Ok(Key::Up),
                    Some(b'B') => Ok(Key::Down),
                    _ => Ok(Key::Other),
                }
            }
            b if b.is_ascii() => Ok(Key::Char(b as char)),
            _ => Ok(Key::Other),
        }
    }
}

/// Scripted key source for tests.
pub struct ScriptedKeys {
    keys: std::vec::IntoIter<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: Vec<Key>) -> Self {
        Self {
            keys: keys.into_iter(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> Result<Key> {
        Ok(self.keys.next().unwrap_or(Key::Interrupt))
    }
}

/// Runs the cooperative select loop: block on a key, mutate the selection
/// model, re-render. One keystroke is one atomic dispatch-mutate-render
/// step. Returns the confirmed selection, or `None` on interrupt (nothing
/// has been written at that point). The key source is released on both
/// paths, so later output goes to a cooked terminal.
pub fn select_interactively(
    entries: &[PackageEntry],
    lock: &Lockfile,
    keys: &mut dyn KeySource,
    out: &mut dyn Write,
    opts: RenderOptions,
    in_place: bool,
) -> Result<Option<BTreeSet<String>>> {
    let mut state = SelectionState::new();
    let mut show_hint = false;
    let mut last_frame_lines = 0usize;

    loop {
        let implied = state.implied_closure(entries, lock);
        let mut frame = render::render_list(entries, &state, &implied, opts);
        if show_hint {
            frame.push_str(render::render_empty_selection_hint());
        }
        draw_frame(out, &frame, &mut last_frame_lines, in_place)?;

        match keys.next_key()? {
            Key::Up | Key::Char('k') => state.move_cursor(-1, entries.len()),
            Key::Down | Key::Char('j') => state.move_cursor(1, entries.len()),
            Key::Char(' ') => {
                state.toggle_current(entries);
                show_hint = false;
            }
            Key::Enter => match state.confirm() {
                Some(selected) => {
                    keys.release();
                    return Ok(Some(selected));
                }
                None => show_hint = true,
            },
            Key::Interrupt => {
                keys.release();
                return Ok(None);
            }
            Key::Char(_) | Key::Other => {}
        }
    }
}

/// Writes one frame. In place (a real terminal): move back over the
/// previous frame and clear it first; raw mode also needs explicit
/// carriage returns. Otherwise frames append, which keeps captured output
/// inspectable in tests.
fn draw_frame(
    mut out: &mut dyn Write,
    frame: &str,
    last_frame_lines: &mut usize,
    in_place: bool,
) -> Result<()> {
    if in_place {
        if *last_frame_lines > 0 {
            queue!(
                &mut out,
                cursor::MoveToColumn(0),
                cursor::MoveUp(*last_frame_lines as u16),
                terminal::Clear(terminal::ClearType::FromCursorDown),
            )
            .context("reposition cursor")?;
        }
        let raw = frame.replace('\n', "\r\n");
        out.write_all(raw.as_bytes()).context("write frame")?;
    } else {
        out.write_all(frame.as_bytes()).context("write frame")?;
    }
    out.flush().context("flush frame")?;
    *last_frame_lines = frame.lines().count();
    Ok(())
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;

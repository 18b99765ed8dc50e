/*
 *   Copyright (c) 2024 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveLeft, MoveRight, MoveToColumn},
    terminal::{Clear, ClearType::FromCursorDown},
    QueueableCommand,
};

use crate::EditBuffer;

/// Owns the [`EditBuffer`] and the prompt state, and translates every buffer mutation
/// into the minimal raw output that keeps the display consistent with the buffer.
///
/// The central correctness property of the whole engine: after any operation,
/// `prompt_len() + buffer.cursor()` equals the physical cursor column. Editing never
/// reaches left of the prompt region.
///
/// # Minimal-diff redraw
///
/// For an edit at offset `i`, only the tail of the line from `i` onwards is re-sent:
///
/// 1. A one-column cursor-left lead-in for a backward delete (the cursor is already at
///    `i` for a forward delete, and an insert echoes the inserted text first).
/// 2. The tail after the mutation, followed by one trailing space. The space overprints
///    the stale final character left over by a deletion; after a pure insertion it is a
///    harmless overwrite of a blank cell, because the line is always redrawn from `i` to
///    its new end.
/// 3. `len(tail) + 1` cursor-left moves, returning the cursor to column
///    `prompt_len + i`.
///
/// The untouched prefix `[0, i)` is never re-sent, so redraw cost is `O(len - i)`, not
/// `O(len)`.
pub struct LineState {
    pub buffer: EditBuffer,
    prompt: String,
}

impl LineState {
    pub fn new() -> Self {
        Self {
            buffer: EditBuffer::new(),
            prompt: String::new(),
        }
    }

    /// Number of display columns consumed by the most recently painted prompt. Defines
    /// the left boundary of editable space.
    pub fn prompt_len(&self) -> usize { self.prompt.chars().count() }

    pub fn prompt(&self) -> &str { &self.prompt }

    /// Record a new prompt without painting anything. Used when the `prompt` callback
    /// returns empty output.
    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt.clear();
        self.prompt.push_str(prompt);
    }

    /// Emit the tail after the cursor plus the trailing overprint space, then rewind the
    /// cursor to its buffer position.
    fn emit_tail_and_rewind<W: Write + ?Sized>(&self, term: &mut W) -> io::Result<()> {
        let tail = self.buffer.tail_from_cursor();
        let tail_cols = tail.chars().count() as u16;
        write!(term, "{} ", tail)?;
        term.queue(MoveLeft(tail_cols + 1))?;
        Ok(())
    }

    pub fn insert_and_render<W: Write + ?Sized>(
        &mut self,
        text: &str,
        term: &mut W,
    ) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.buffer.insert(text);
        write!(term, "{}", text)?;
        self.emit_tail_and_rewind(term)
    }

    pub fn delete_backward_and_render<W: Write + ?Sized>(
        &mut self,
        term: &mut W,
    ) -> io::Result<()> {
        if !self.buffer.delete_backward() {
            return Ok(());
        }
        term.queue(MoveLeft(1))?;
        self.emit_tail_and_rewind(term)
    }

    pub fn delete_forward_and_render<W: Write + ?Sized>(
        &mut self,
        term: &mut W,
    ) -> io::Result<()> {
        if !self.buffer.delete_forward() {
            return Ok(());
        }
        self.emit_tail_and_rewind(term)
    }

    pub fn move_left_and_render<W: Write + ?Sized>(&mut self, term: &mut W) -> io::Result<()> {
        if self.buffer.move_left() {
            term.queue(MoveLeft(1))?;
        }
        Ok(())
    }

    pub fn move_right_and_render<W: Write + ?Sized>(&mut self, term: &mut W) -> io::Result<()> {
        if self.buffer.move_right() {
            term.queue(MoveRight(1))?;
        }
        Ok(())
    }

    pub fn move_home_and_render<W: Write + ?Sized>(&mut self, term: &mut W) -> io::Result<()> {
        let moved = self.buffer.move_home();
        if moved > 0 {
            term.queue(MoveLeft(moved as u16))?;
        }
        Ok(())
    }

    pub fn move_end_and_render<W: Write + ?Sized>(&mut self, term: &mut W) -> io::Result<()> {
        let moved = self.buffer.move_end();
        if moved > 0 {
            term.queue(MoveRight(moved as u16))?;
        }
        Ok(())
    }

    /// Emit the line terminator for a committed line. The echoed line stays on screen;
    /// the cursor moves to column 0 of a fresh line.
    pub fn commit_newline<W: Write + ?Sized>(&self, term: &mut W) -> io::Result<()> {
        write!(term, "\r\n")
    }

    /// Erase the prompt + line region, leaving the cursor at column 0.
    fn clear_line<W: Write + ?Sized>(&self, term: &mut W) -> io::Result<()> {
        term.queue(MoveToColumn(0))?.queue(Clear(FromCursorDown))?;
        Ok(())
    }

    /// Paint the prompt and the full buffer, then rewind the cursor to its offset.
    fn render<W: Write + ?Sized>(&self, term: &mut W) -> io::Result<()> {
        write!(term, "{}{}", self.prompt, self.buffer.text())?;
        let rewind = (self.buffer.len() - self.buffer.cursor()) as u16;
        if rewind > 0 {
            term.queue(MoveLeft(rewind))?;
        }
        Ok(())
    }

    /// The async-safe print internals: write `data` to the display without corrupting
    /// the editing state.
    ///
    /// The prompt + line region is erased first, then `data` is written with every
    /// newline also acting as a carriage return. Afterwards:
    ///
    /// - `data` ends with `\n`: the current prompt and buffer are repainted unchanged
    ///   below the printed output.
    /// - `data` does not end with `\n`: the trailing segment after the last newline
    ///   becomes the new prompt (and is already painted), and the buffer is repainted
    ///   after it. This is exactly how the ordinary prompt path records
    ///   `prompt_len`, so a background task publishing `"done\n> "` leaves subsequent
    ///   edits clamped against the new two-column prompt.
    pub fn print_data<W: Write + ?Sized>(&mut self, data: &[u8], term: &mut W) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.clear_line(term)?;

        // Write data in a way that newlines also act as carriage returns.
        for segment in data.split_inclusive(|byte| *byte == b'\n') {
            term.write_all(segment)?;
            if segment.ends_with(b"\n") {
                term.queue(MoveToColumn(0))?;
            }
        }

        if data.ends_with(b"\n") {
            self.render(term)?;
        } else {
            let tail_start = data
                .iter()
                .rposition(|byte| *byte == b'\n')
                .map_or(0, |ix| ix + 1);
            self.prompt = String::from_utf8_lossy(&data[tail_start..]).into_owned();
            write!(term, "{}", self.buffer.text())?;
            let rewind = (self.buffer.len() - self.buffer.cursor()) as u16;
            if rewind > 0 {
                term.queue(MoveLeft(rewind))?;
            }
        }

        Ok(())
    }

    pub fn print<W: Write + ?Sized>(&mut self, text: &str, term: &mut W) -> io::Result<()> {
        self.print_data(text.as_bytes(), term)
    }

    /// Replace the prompt and repaint it in place, preserving the buffer and cursor.
    pub fn update_prompt<W: Write + ?Sized>(
        &mut self,
        prompt: &str,
        term: &mut W,
    ) -> io::Result<()> {
        self.clear_line(term)?;
        self.set_prompt(prompt);
        self.render(term)?;
        term.flush()?;
        Ok(())
    }
}

impl Default for LineState {
    fn default() -> Self { Self::new() }
}

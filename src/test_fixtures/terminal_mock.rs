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

use std::{
    io::{Result, Write},
    sync::Arc,
};

use strip_ansi_escapes::strip;

use crate::{StdMutex, TerminalSurface};

/// You can safely clone this struct; the inner buffer and cursor model are shared via
/// [Arc].
///
/// Beyond capturing the emitted bytes, this mock models the physical cursor column of a
/// raw terminal by interpreting the control bytes it receives (backspace, carriage
/// return, and the `CUB`/`CUF`/`CHA` CSI sequences). That is what lets tests assert the
/// engine's central invariant: `prompt_len + cursor_offset == physical cursor column`.
#[derive(Clone)]
pub struct TerminalMock {
    pub buffer: Arc<StdMutex<Vec<u8>>>,
    column: Arc<StdMutex<u16>>,
    pending_escape: Arc<StdMutex<Vec<u8>>>,
}

impl Default for TerminalMock {
    fn default() -> Self {
        Self {
            buffer: Arc::new(StdMutex::new(Vec::new())),
            column: Arc::new(StdMutex::new(0)),
            pending_escape: Arc::new(StdMutex::new(Vec::new())),
        }
    }
}

impl TerminalMock {
    pub fn new() -> Self { Self::default() }

    /// The modelled physical cursor column (0-based).
    pub fn cursor_column(&self) -> u16 { *self.column.lock().unwrap() }

    pub fn get_copy_of_buffer(&self) -> Vec<u8> { self.buffer.lock().unwrap().clone() }

    pub fn get_copy_of_buffer_as_string(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        String::from_utf8(buffer_data.clone()).expect("utf8")
    }

    pub fn get_copy_of_buffer_as_string_strip_ansi(&self) -> String {
        let buffer_data = self.buffer.lock().unwrap();
        let stripped = strip(buffer_data.clone());
        String::from_utf8(stripped).expect("utf8")
    }

    /// Drain and return the captured bytes, so a test can assert the output of exactly
    /// one operation. The cursor model is unaffected.
    pub fn take_buffer(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().unwrap())
    }

    fn advance_column_model(&self, byte: u8) {
        let column = &mut *self.column.lock().unwrap();
        let pending = &mut *self.pending_escape.lock().unwrap();

        if !pending.is_empty() {
            pending.push(byte);
            if pending.len() == 2 && byte != b'[' {
                // Not a CSI sequence; ignore it.
                pending.clear();
            } else if pending.len() >= 3 && (0x40..=0x7e).contains(&byte) {
                Self::apply_csi(pending, column);
                pending.clear();
            }
            return;
        }

        match byte {
            0x1b => pending.push(byte),
            0x08 => *column = column.saturating_sub(1),
            b'\r' => *column = 0,
            // Line feed moves down a row; the column is unchanged in raw mode.
            b'\n' => {}
            // One printed char is one column. UTF-8 continuation bytes don't count.
            byte if (0x20..=0x7e).contains(&byte) || byte >= 0xc0 => *column += 1,
            _ => {}
        }
    }

    fn apply_csi(pending: &[u8], column: &mut u16) {
        let final_byte = *pending.last().expect("non-empty");
        let params = &pending[2..pending.len() - 1];
        let count: u16 = std::str::from_utf8(params)
            .ok()
            .and_then(|params_str| params_str.parse().ok())
            .unwrap_or(1);
        match final_byte {
            // CUB: cursor back.
            b'D' => *column = column.saturating_sub(count),
            // CUF: cursor forward.
            b'C' => *column += count,
            // CHA: cursor to (1-based) column.
            b'G' => *column = count.saturating_sub(1),
            // Erase operations don't move the cursor.
            _ => {}
        }
    }
}

impl Write for TerminalMock {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        for byte in buf {
            self.advance_column_model(*byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}

impl TerminalSurface for TerminalMock {
    fn cursor_column(&mut self) -> Result<u16> { Ok(TerminalMock::cursor_column(self)) }
}

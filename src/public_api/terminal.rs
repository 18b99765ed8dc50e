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
    io::{self, Write},
    sync::Arc,
};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use miette::IntoDiagnostic as _;

use crate::{SafeRawSurface, Session, SharedPrinter, StdMutex};

/// The two primitives the engine consumes from its display collaborator: emit raw bytes
/// (the [`Write`] supertrait), and report the current physical cursor column.
pub trait TerminalSurface: Write {
    /// 0-based column of the physical cursor.
    fn cursor_column(&mut self) -> io::Result<u16>;
}

/// Production surface backed by `stdout`, for a terminal in raw mode.
pub struct StdoutSurface {
    stdout: io::Stdout,
}

impl StdoutSurface {
    pub fn new() -> Self { Self { stdout: io::stdout() } }
}

impl Default for StdoutSurface {
    fn default() -> Self { Self::new() }
}

impl Write for StdoutSurface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.stdout.write(buf) }

    fn flush(&mut self) -> io::Result<()> { self.stdout.flush() }
}

impl TerminalSurface for StdoutSurface {
    fn cursor_column(&mut self) -> io::Result<u16> {
        let (column, _row) = crossterm::cursor::position()?;
        Ok(column)
    }
}

/// The simplest way to use this crate on a real terminal: puts `stdout` into raw mode,
/// wires up a [`Session`] over it, and takes the terminal out of raw mode on drop.
pub struct TermLine {
    pub session: Session,
    pub shared_printer: SharedPrinter,
}

impl TermLine {
    /// Create a new instance. Example of `prompt` is `"> "`.
    ///
    /// # Returns
    /// 1. If the terminal is not fully interactive (`stdin` or `stdout` is piped, eg
    ///    when running under `cargo test` or `echo "foo" | program`) then it will return
    ///    [None], and won't touch the terminal mode.
    /// 2. Otherwise a [TermLine] instance with the terminal in raw mode.
    /// 3. In case there are any issues putting the terminal into raw mode, it will
    ///    return an error.
    pub fn try_new(prompt: &str) -> miette::Result<Option<TermLine>> {
        use crossterm::tty::IsTty;

        if !io::stdin().is_tty() || !io::stdout().is_tty() {
            return Ok(None);
        }

        enable_raw_mode().into_diagnostic()?;

        let safe_raw_surface: SafeRawSurface =
            Arc::new(StdMutex::new(StdoutSurface::new()));
        let (session, shared_printer) =
            Session::new(prompt, safe_raw_surface).into_diagnostic()?;

        Ok(Some(TermLine {
            session,
            shared_printer,
        }))
    }

    pub fn clone_shared_printer(&self) -> SharedPrinter { self.shared_printer.clone() }
}

impl Drop for TermLine {
    fn drop(&mut self) {
        _ = disable_raw_mode();
    }
}

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

use tokio::sync::mpsc;

use crate::{SafeLineState, SafeRawSurface, Text};

/// Signals sent to the print channel, which is drained by the pump task spawned in
/// [`spawn_print_pump`].
#[derive(Debug, PartialEq, Clone)]
pub enum PrintSignal {
    Text(Text),
}

/// The async-safe print primitive. Cloneable object that implements [`Write`] and allows
/// sending data to the terminal without corrupting the edit buffer / cursor
/// synchronization of the owning [`crate::Session`].
///
/// This is the *only* entry point permitted to be invoked off the input-processing task.
/// The actual painting happens on the pump task, under the same locks the session uses,
/// so the session may keep accepting keystrokes for a new line while a previous
/// asynchronous command is still finishing its output.
///
/// # Nothing is output until a newline, unless you call [`SharedPrinter::flush()`]
///
/// Data is buffered until a line feed is written. `flush()` publishes a partial
/// (non-newline-terminated) buffer; the trailing segment of such a payload becomes the
/// new prompt, which is how a background task redraws a prompt once its work completes.
#[derive(Debug)]
pub struct SharedPrinter {
    /// Holds the data to be written to the terminal.
    pub buffer: Text,

    /// Sender end of the channel; the receiver end lives in the pump task, which does
    /// the actual printing.
    pub print_channel_sender: mpsc::Sender<PrintSignal>,

    /// Set to `true` on clones. Only the first instance reports errors when the
    /// receiver end of the channel has closed.
    pub silent_error: bool,
}

impl SharedPrinter {
    pub fn new(print_channel_sender: mpsc::Sender<PrintSignal>) -> Self {
        Self {
            buffer: Default::default(),
            print_channel_sender,
            silent_error: false,
        }
    }

    fn try_send_buffer(&mut self) -> io::Result<()> {
        match self
            .print_channel_sender
            .try_send(PrintSignal::Text(self.buffer.clone()))
        {
            Ok(_) => {
                self.buffer.clear();
                Ok(())
            }
            Err(_) => {
                if self.silent_error {
                    Ok(())
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::Other,
                        "SharedPrinter receiver has closed",
                    ))
                }
            }
        }
    }
}

/// Each clone gets its own buffer to write data into, and a clone of the channel sender,
/// so all payloads end up in the same print channel.
impl Clone for SharedPrinter {
    fn clone(&self) -> Self {
        Self {
            buffer: Default::default(),
            print_channel_sender: self.print_channel_sender.clone(),
            silent_error: true,
        }
    }
}

impl Write for SharedPrinter {
    fn write(&mut self, payload: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(payload);
        if self.buffer.ends_with(b"\n") {
            self.try_send_buffer()?;
        }
        Ok(payload.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.try_send_buffer()
    }
}

/// Spawn the task that drains the print channel and paints each payload via
/// [`crate::LineState::print_data`], under the session's locks. The task ends when the
/// channel closes (all [`SharedPrinter`]s dropped) or the terminal surface errors.
pub fn spawn_print_pump(
    mut print_channel_receiver: mpsc::Receiver<PrintSignal>, /* This is moved. */
    safe_line_state: SafeLineState,
    safe_raw_surface: SafeRawSurface,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = print_channel_receiver.recv().await {
            match signal {
                PrintSignal::Text(data) => {
                    let mut term = safe_raw_surface.lock().unwrap();
                    let mut line_state = safe_line_state.lock().unwrap();
                    if line_state.print_data(&data, &mut *term).is_err() {
                        break;
                    }
                    if term.flush().is_err() {
                        break;
                    }
                }
            }
        }
    })
}

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

use std::{io, sync::Arc};

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    spawn_print_pump, Callback, CallbackRegistry, HookEvent, InputToken, LineState,
    PinnedInputStream, SafeLineState, SafeRawSurface, SharedPrinter, StdMutex, CHANNEL_CAPACITY,
};

/// Error returned from [`Session`] operations.
#[derive(Debug, Error)]
pub enum TermlineError {
    /// An internal I/O error occurred while painting the terminal.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A callback handler failed. The failure is propagated unmodified; the engine does
    /// not suppress or retry.
    #[error("callback handler failed: {0}")]
    Handler(miette::Report),

    /// The print channel closed before the payload could be sent.
    #[error("print channel closed")]
    Closed,
}

/// One line-editing session: the single point of mutation for the edit buffer and the
/// prompt state.
///
/// # Mental model and overview
///
/// The session is driven by one logical input-processing task: the terminal surface
/// delivers decoded input chunks to [`Session::feed_input`] (or via
/// [`Session::process_stream`]). Each chunk is classified into one [`InputToken`], the
/// buffer is mutated, and a minimal-diff redraw is emitted. On line commit the `enter`
/// callback receives a deep-copied snapshot of the line, the buffer is cleared, and the
/// `prompt` callback supplies the next prompt.
///
/// # Synchronous vs. asynchronous `enter` handlers
///
/// A synchronous handler runs to completion before the prompt is dispatched; the prompt
/// loop is blocked for the duration. An asynchronous handler returns near-immediately
/// after scheduling background work, registers no `prompt` handler, and later publishes
/// its output and a fresh prompt through the [`SharedPrinter`] — the only entry point
/// legal off the input-processing task. There is no cancellation primitive for in-flight
/// handlers: one that never completes leaves the prompt never reappearing.
///
/// # Inputs and dependency injection
///
/// [`Session::new`] takes a [`SafeRawSurface`]. In production this is
/// [`crate::StdoutSurface`]; for tests you can supply
/// [`crate::test_fixtures::TerminalMock`] and drive the session from a
/// [`crate::test_fixtures::gen_input_stream`].
pub struct Session {
    /// Raw terminal surface, supplied via dependency injection.
    pub safe_raw_surface: SafeRawSurface,

    /// Edit buffer + prompt state + redraw driver.
    pub safe_line_state: SafeLineState,

    /// The registered command callbacks.
    pub registry: CallbackRegistry,

    /// Gates per-token diagnostic output.
    debug: bool,

    /// Kept so [`Session::println`] can write through the async-safe path.
    shared_printer: SharedPrinter,
}

impl Session {
    /// Create a session, spawn its print pump, paint the initial `prompt`, and return
    /// the session together with the [`SharedPrinter`] associated with it. The printer
    /// can be cloned freely and handed to background tasks.
    pub fn new(
        prompt: &str,
        safe_raw_surface: SafeRawSurface,
    ) -> Result<(Self, SharedPrinter), TermlineError> {
        let (print_channel_sender, print_channel_receiver) =
            mpsc::channel(CHANNEL_CAPACITY);

        let safe_line_state: SafeLineState = Arc::new(StdMutex::new(LineState::new()));

        spawn_print_pump(
            print_channel_receiver,
            safe_line_state.clone(),
            safe_raw_surface.clone(),
        );

        // Paint the initial prompt. This is the same code path a background task uses,
        // so prompt_len is recorded identically in both cases.
        {
            let mut term = safe_raw_surface.lock().unwrap();
            safe_line_state
                .lock()
                .unwrap()
                .print_data(prompt.as_bytes(), &mut *term)?;
            term.flush()?;
        }

        let shared_printer = SharedPrinter::new(print_channel_sender);

        let session = Session {
            safe_raw_surface,
            safe_line_state,
            registry: CallbackRegistry::new(),
            debug: false,
            shared_printer: shared_printer.clone(),
        };

        Ok((session, shared_printer))
    }

    pub fn register(&mut self, callback: Callback) { self.registry.register(callback); }

    pub fn register_named(
        &mut self,
        event_name: &str,
        handler: impl FnMut(&str) -> miette::Result<String> + Send + 'static,
    ) {
        self.registry.register_named(event_name, handler);
    }

    pub fn debug_mode(&mut self, enabled: bool) { self.debug = enabled; }

    /// The authoritative contents of the line currently being edited.
    pub fn current_text(&self) -> String {
        self.safe_line_state.lock().unwrap().buffer.text()
    }

    /// Feed one raw input chunk (one complete keystroke, escape sequence, or paste)
    /// into the engine.
    pub fn feed_input(&mut self, chunk: &str) -> Result<(), TermlineError> {
        let token = InputToken::classify(chunk);
        if self.debug {
            tracing::debug!(token = %token, chunk_len = chunk.len(), "feed_input");
        }

        match token {
            InputToken::Literal(text) => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .insert_and_render(&text, &mut *term)?;
            }
            InputToken::DeleteBackward => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .delete_backward_and_render(&mut *term)?;
            }
            InputToken::DeleteForward => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .delete_forward_and_render(&mut *term)?;
            }
            InputToken::MoveLeft => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .move_left_and_render(&mut *term)?;
            }
            InputToken::MoveRight => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .move_right_and_render(&mut *term)?;
            }
            InputToken::MoveHome => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .move_home_and_render(&mut *term)?;
            }
            InputToken::MoveEnd => {
                let mut term = self.safe_raw_surface.lock().unwrap();
                self.safe_line_state
                    .lock()
                    .unwrap()
                    .move_end_and_render(&mut *term)?;
            }
            InputToken::HistoryPrevious => self.dispatch_hook(HookEvent::HistoryPrevious)?,
            InputToken::HistoryNext => self.dispatch_hook(HookEvent::HistoryNext)?,
            InputToken::CommitLine => self.commit_line()?,
        }

        self.safe_raw_surface.lock().unwrap().flush()?;
        Ok(())
    }

    /// Drive the session from an async stream of input chunks. Returns when the stream
    /// ends or an operation fails.
    pub async fn process_stream(
        &mut self,
        mut input_stream: PinnedInputStream<String>,
    ) -> Result<(), TermlineError> {
        while let Some(chunk) = input_stream.next().await {
            self.feed_input(&chunk)?;
        }
        Ok(())
    }

    /// Invoke a no-argument hook and feed its output (if any) to the display through the
    /// same print path background tasks use.
    fn dispatch_hook(&mut self, event: HookEvent) -> Result<(), TermlineError> {
        let output = self
            .registry
            .run_hook(event)
            .map_err(TermlineError::Handler)?;
        if output.is_empty() {
            return Ok(());
        }
        let mut term = self.safe_raw_surface.lock().unwrap();
        self.safe_line_state
            .lock()
            .unwrap()
            .print_data(output.as_bytes(), &mut *term)?;
        Ok(())
    }

    /// Commit the current line.
    ///
    /// Ordering contract: the newline is emitted, then the buffer text is deep-copied
    /// into a snapshot, then the buffer is cleared, and only then is the `enter` handler
    /// dispatched with the snapshot. The snapshot strictly happens-before the clear, so
    /// an asynchronous handler can keep reading its copy while the user is already
    /// typing the next line.
    ///
    /// After `enter` returns, the `prompt` hook is dispatched silently (its output is
    /// not printed until the length is recorded), and its return value is painted as the
    /// new prompt. An empty prompt paints nothing and records a zero-length prompt.
    pub fn commit_line(&mut self) -> Result<(), TermlineError> {
        let snapshot = {
            let mut term = self.safe_raw_surface.lock().unwrap();
            let mut line_state = self.safe_line_state.lock().unwrap();
            line_state.commit_newline(&mut *term)?;
            line_state.buffer.take()
        };

        let echoed = self
            .registry
            .run_enter(&snapshot)
            .map_err(TermlineError::Handler)?;
        let prompt_text = self
            .registry
            .run_hook(HookEvent::Prompt)
            .map_err(TermlineError::Handler)?;

        let mut term = self.safe_raw_surface.lock().unwrap();
        let mut line_state = self.safe_line_state.lock().unwrap();
        if !echoed.is_empty() {
            line_state.print_data(echoed.as_bytes(), &mut *term)?;
        }
        if prompt_text.is_empty() {
            line_state.set_prompt("");
        } else {
            line_state.print_data(prompt_text.as_bytes(), &mut *term)?;
        }
        Ok(())
    }

    /// Replace the prompt and repaint it in place.
    pub fn update_prompt(&mut self, prompt: &str) -> Result<(), TermlineError> {
        let mut term = self.safe_raw_surface.lock().unwrap();
        self.safe_line_state
            .lock()
            .unwrap()
            .update_prompt(prompt, &mut *term)?;
        Ok(())
    }

    /// Print `content` through the async-safe path. Works concurrently with input
    /// processing.
    pub fn println<T>(&mut self, content: T)
    where
        T: std::fmt::Display,
    {
        use std::io::Write as _;
        let _ = writeln!(self.shared_printer, "{}", content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{gen_input_stream, TerminalMock};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn new_session() -> (Session, SharedPrinter, TerminalMock) {
        let mock = TerminalMock::default();
        let safe_raw_surface: SafeRawSurface = Arc::new(StdMutex::new(mock.clone()));
        let (session, shared_printer) = Session::new("> ", safe_raw_surface).unwrap();
        (session, shared_printer, mock)
    }

    #[tokio::test]
    async fn test_initial_prompt_is_painted() {
        let (session, _printer, mock) = new_session();
        assert_eq!(mock.get_copy_of_buffer_as_string_strip_ansi(), "> ");
        assert_eq!(mock.cursor_column(), 2);
        assert_eq!(session.safe_line_state.lock().unwrap().prompt_len(), 2);
    }

    #[tokio::test]
    async fn test_commit_hands_snapshot_to_enter_and_clears_buffer() {
        let (mut session, _printer, _mock) = new_session();

        let captured = Arc::new(Mutex::new(None::<String>));
        let captured_clone = captured.clone();
        session.register(Callback::Enter(Box::new(move |line| {
            *captured_clone.lock().unwrap() = Some(line.to_string());
            Ok(String::new())
        })));

        session.feed_input("ls").unwrap();
        session.feed_input("\r").unwrap();

        assert_eq!(captured.lock().unwrap().as_deref(), Some("ls"));
        assert_eq!(session.current_text(), "");
        assert_eq!(session.safe_line_state.lock().unwrap().buffer.cursor(), 0);
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_for_buffer_state() {
        let (mut session, _printer, _mock) = new_session();
        session.feed_input("anything at all").unwrap();
        session.feed_input("\r").unwrap();
        session.feed_input("\r").unwrap();
        assert_eq!(session.current_text(), "");
        assert_eq!(session.safe_line_state.lock().unwrap().buffer.cursor(), 0);
    }

    #[tokio::test]
    async fn test_prompt_hook_sets_prompt_after_commit() {
        let (mut session, _printer, mock) = new_session();
        session.register(Callback::Prompt(Box::new(|| Ok("sql> ".into()))));

        session.feed_input("select 1").unwrap();
        session.feed_input("\r").unwrap();

        assert_eq!(session.safe_line_state.lock().unwrap().prompt_len(), 5);
        assert!(mock
            .get_copy_of_buffer_as_string_strip_ansi()
            .ends_with("sql> "));
        assert_eq!(mock.cursor_column(), 5);
    }

    #[tokio::test]
    async fn test_commit_without_prompt_handler_records_zero_length_prompt() {
        let (mut session, _printer, _mock) = new_session();
        session.feed_input("ls").unwrap();
        session.feed_input("\r").unwrap();
        assert_eq!(session.safe_line_state.lock().unwrap().prompt_len(), 0);
    }

    #[tokio::test]
    async fn test_enter_output_is_fed_to_display() {
        let (mut session, _printer, mock) = new_session();
        session.register(Callback::Enter(Box::new(|line| {
            Ok(format!("you said: {line}\n"))
        })));
        session.register(Callback::Prompt(Box::new(|| Ok("> ".into()))));

        session.feed_input("hi").unwrap();
        session.feed_input("\r").unwrap();

        let output = mock.get_copy_of_buffer_as_string_strip_ansi();
        assert!(output.contains("you said: hi"));
        assert!(output.ends_with("> "));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates_to_caller() {
        let (mut session, _printer, _mock) = new_session();
        session.register(Callback::Enter(Box::new(|_| {
            Err(miette::miette!("command engine offline"))
        })));

        session.feed_input("ls").unwrap();
        let result = session.feed_input("\r");
        assert!(matches!(result, Err(TermlineError::Handler(_))));
    }

    #[tokio::test]
    async fn test_history_hook_output_is_printed() {
        let (mut session, _printer, mock) = new_session();
        session.register(Callback::HistoryPrevious(Box::new(|| {
            Ok("ls -la\n".into())
        })));

        session.feed_input("\x1b[A").unwrap();
        assert!(mock
            .get_copy_of_buffer_as_string_strip_ansi()
            .contains("ls -la"));

        // No history_next handler registered: silently no output.
        let before = mock.get_copy_of_buffer().len();
        session.feed_input("\x1b[B").unwrap();
        assert_eq!(mock.get_copy_of_buffer().len(), before);
    }

    #[tokio::test]
    async fn test_cursor_column_tracks_prompt_plus_offset() {
        let (mut session, _printer, mock) = new_session();
        let chunks = ["hello", "\x1b[D", "\x1b[D", "x", "\x7f", "\x1b[H", "\x1b[F"];
        for chunk in chunks {
            session.feed_input(chunk).unwrap();
            let line_state = session.safe_line_state.lock().unwrap();
            assert_eq!(
                mock.cursor_column() as usize,
                line_state.prompt_len() + line_state.buffer.cursor(),
                "sync invariant violated after chunk {chunk:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_move_left_at_boundary_emits_nothing() {
        let (mut session, _printer, mock) = new_session();
        session.feed_input("abc").unwrap();
        session.feed_input("\x1b[H").unwrap();
        mock.take_buffer();

        session.feed_input("\x1b[D").unwrap();

        assert!(mock.take_buffer().is_empty());
        assert_eq!(session.safe_line_state.lock().unwrap().buffer.cursor(), 0);
    }

    #[tokio::test]
    async fn test_process_stream_drives_session() {
        let (mut session, _printer, _mock) = new_session();

        let captured = Arc::new(Mutex::new(None::<String>));
        let captured_clone = captured.clone();
        session.register(Callback::Enter(Box::new(move |line| {
            *captured_clone.lock().unwrap() = Some(line.to_string());
            Ok(String::new())
        })));

        let input_stream = gen_input_stream(vec![
            "l".to_string(),
            "s".to_string(),
            "\r".to_string(),
        ]);
        session.process_stream(input_stream).await.unwrap();

        assert_eq!(captured.lock().unwrap().as_deref(), Some("ls"));
    }

    #[tokio::test]
    async fn test_async_enter_publishes_prompt_via_shared_printer() {
        let (mut session, printer, mock) = new_session();

        // Asynchronous mode: enter returns immediately with no output, and no prompt
        // handler is registered.
        session.register(Callback::Enter(Box::new(|_| Ok(String::new()))));

        session.feed_input("starttask1").unwrap();
        session.feed_input("\r").unwrap();
        assert_eq!(session.safe_line_state.lock().unwrap().prompt_len(), 0);

        // Background task finishes later and publishes its output plus a new prompt.
        let mut task_printer = printer.clone();
        let background = tokio::spawn(async move {
            use std::io::Write as _;
            task_printer.write_all(b"done\n").unwrap();
            task_printer.write_all(b"> ").unwrap();
            task_printer.flush().unwrap();
        });
        background.await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(session.safe_line_state.lock().unwrap().prompt_len(), 2);
        assert!(mock
            .get_copy_of_buffer_as_string_strip_ansi()
            .contains("done"));

        // Subsequent edits clamp against the new prompt length, not the old one.
        session.feed_input("x").unwrap();
        {
            let line_state = session.safe_line_state.lock().unwrap();
            assert_eq!(line_state.buffer.text(), "x");
            assert_eq!(mock.cursor_column() as usize, line_state.prompt_len() + 1);
        }
        session.feed_input("\x1b[D").unwrap();
        session.feed_input("\x1b[D").unwrap();
        // Cursor never moves left of the prompt region.
        assert_eq!(mock.cursor_column(), 2);
    }

    #[tokio::test]
    async fn test_println_goes_through_print_pump() {
        let (mut session, _printer, mock) = new_session();
        session.println("status: ok");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(mock
            .get_copy_of_buffer_as_string_strip_ansi()
            .contains("status: ok"));
    }
}

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

//! The `termline` library is a small terminal line-editing engine. It keeps an in-memory
//! edit buffer byte-for-byte synchronized with what is painted on a raw,
//! cursor-addressable terminal surface, while driving user commands through pluggable
//! callbacks that may run synchronously (blocking the prompt loop) or asynchronously (a
//! background task feeding output while the prompt loop keeps accepting input).
//!
//! # Features
//!
//! 1. Feed raw input chunks into a [`Session`] with [`Session::feed_input()`] (or drive
//!    it from any async stream with [`Session::process_stream()`]). Each chunk is
//!    classified into one [`InputToken`], the edit buffer is mutated, and a minimal-diff
//!    redraw is emitted: only the changed suffix of the line plus cursor repositioning,
//!    never the whole line.
//!
//! 2. Register command callbacks with [`Session::register()`]: `enter` receives a
//!    snapshot of the committed line, `history_previous` / `history_next` delegate
//!    history navigation to the caller, and `prompt` supplies the next prompt string.
//!
//! 3. Spawned tasks can write to the terminal concurrently via the cloneable
//!    [`SharedPrinter`], without corrupting the edit buffer / cursor synchronization
//!    invariant. This is how an asynchronous `enter` handler publishes its eventual
//!    output and a fresh prompt.
//!
//! 4. Use tokio tracing for diagnostics, with optional concurrent `stdout` writes
//!    through the [`SharedPrinter`]. See [`init_tracing()`] and [`TracingConfig`].
//!
//! 5. You can plug in your own terminal via the [`TerminalSurface`] trait. The engine
//!    only asks the surface to emit raw bytes and to report the current cursor column,
//!    which is what makes the whole crate testable without a tty; see
//!    [`test_fixtures::TerminalMock`].
//!
//! # The core invariant
//!
//! At every step, `prompt_len + cursor_offset == physical cursor column`. The prompt
//! region is never editable: deletes and cursor moves clamp at the prompt boundary.
//! Redraw cost for an edit at offset `i` of a line of length `n` is `O(n - i)`; the
//! untouched prefix of the line is never re-sent to the terminal.
//!
//! # Known limitations
//!
//! - Each input chunk must carry one complete token (a keystroke or a full escape
//!   sequence). Chunks that split an escape sequence across two events may be
//!   misclassified as literal text; no reassembly heuristic is applied.
//! - One [`char`] is counted as one display column. Wide and combining characters are
//!   out of scope.
//! - There is no cancellation for in-flight asynchronous handlers: a handler that never
//!   prints a new prompt leaves none displayed.

// Attach sources.
pub mod editor_impl;
pub mod public_api;
pub mod test_fixtures;

// Re-export the public API.
pub use editor_impl::*;
pub use public_api::*;

// Type aliases.
use std::{pin::Pin, sync::Arc};

use futures_core::Stream;

pub type StdMutex<T> = std::sync::Mutex<T>;

pub type SendRawSurface = dyn TerminalSurface + Send;
pub type SafeRawSurface = Arc<StdMutex<SendRawSurface>>;

pub type SafeLineState = Arc<StdMutex<LineState>>;

pub type Text = Vec<u8>;

pub type PinnedInputStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

// Constants.
pub const CHANNEL_CAPACITY: usize = 1_000;

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

/// The authoritative in-memory text of the line currently being edited, plus the cursor
/// offset within it.
///
/// The buffer is an ordered sequence of [`char`]s, with one `char` counted as one
/// display column. Wide and combining characters are an explicit non-goal.
///
/// Invariant: `0 <= cursor <= chars.len()` after every mutator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl EditBuffer {
    pub fn new() -> Self { Self::default() }

    pub fn cursor(&self) -> usize { self.cursor }

    pub fn len(&self) -> usize { self.chars.len() }

    pub fn is_empty(&self) -> bool { self.chars.is_empty() }

    pub fn text(&self) -> String { self.chars.iter().collect() }

    /// The substring from the cursor to the end of the line.
    pub fn tail_from_cursor(&self) -> String { self.chars[self.cursor..].iter().collect() }

    /// Insert `text` at the cursor, atomically, and advance the cursor past it. A
    /// multi-character chunk (paste) is a single edit.
    pub fn insert(&mut self, text: &str) {
        let incoming: Vec<char> = text.chars().collect();
        let count = incoming.len();
        self.chars.splice(self.cursor..self.cursor, incoming);
        self.cursor += count;
        debug_assert!(self.cursor <= self.chars.len());
    }

    /// Remove the character before the cursor. Returns `false` (no mutation) at offset
    /// 0: deleting into the prompt region is not possible.
    pub fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    /// Remove the character at the cursor. Returns `false` (no mutation) at the end of
    /// the line. The cursor does not move.
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor == self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor == self.chars.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move the cursor to offset 0. Returns the number of columns moved.
    pub fn move_home(&mut self) -> usize {
        let moved = self.cursor;
        self.cursor = 0;
        moved
    }

    /// Move the cursor to the end of the line. Returns the number of columns moved.
    pub fn move_end(&mut self) -> usize {
        let moved = self.chars.len() - self.cursor;
        self.cursor = self.chars.len();
        moved
    }

    /// Deep-copy the current text, then reset the buffer to empty. The snapshot is taken
    /// strictly before the clear, so a caller handing the returned [`String`] to an
    /// asynchronous consumer never observes the cleared state through it.
    pub fn take(&mut self) -> String {
        let snapshot = self.text();
        self.chars.clear();
        self.cursor = 0;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_advances_cursor() {
        let mut buffer = EditBuffer::new();
        buffer.insert("ls");
        assert_eq!(buffer.text(), "ls");
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn test_insert_mid_line() {
        let mut buffer = EditBuffer::new();
        buffer.insert("helo");
        buffer.move_left();
        // Cursor between 'e' and 'l'.
        assert_eq!(buffer.cursor(), 3);
        buffer.insert("l");
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.cursor(), 4);
    }

    #[test]
    fn test_delete_backward_twice() {
        let mut buffer = EditBuffer::new();
        buffer.insert("hello");
        assert!(buffer.delete_backward());
        assert!(buffer.delete_backward());
        assert_eq!(buffer.text(), "hel");
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn test_delete_backward_at_prompt_boundary_is_noop() {
        let mut buffer = EditBuffer::new();
        buffer.insert("abc");
        buffer.move_home();
        assert!(!buffer.delete_backward());
        assert_eq!(buffer.text(), "abc");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_delete_forward() {
        let mut buffer = EditBuffer::new();
        buffer.insert("abc");
        buffer.move_home();
        assert!(buffer.delete_forward());
        assert_eq!(buffer.text(), "bc");
        assert_eq!(buffer.cursor(), 0);
        buffer.move_end();
        assert!(!buffer.delete_forward());
        assert_eq!(buffer.text(), "bc");
    }

    #[test]
    fn test_move_boundaries() {
        let mut buffer = EditBuffer::new();
        assert!(!buffer.move_left());
        assert!(!buffer.move_right());
        buffer.insert("ab");
        assert!(!buffer.move_right());
        assert_eq!(buffer.move_home(), 2);
        assert!(!buffer.move_left());
        assert_eq!(buffer.move_end(), 2);
    }

    #[test]
    fn test_take_snapshots_then_clears() {
        let mut buffer = EditBuffer::new();
        buffer.insert("run task1");
        let snapshot = buffer.take();
        assert_eq!(snapshot, "run task1");
        assert_eq!(buffer.text(), "");
        assert_eq!(buffer.cursor(), 0);
        // Taking again is idempotent with respect to buffer state.
        assert_eq!(buffer.take(), "");
    }

    #[test]
    fn test_cursor_stays_in_bounds_across_mixed_edits() {
        let mut buffer = EditBuffer::new();
        let chunks = ["foo", "bar", "b", "az"];
        for chunk in chunks {
            buffer.insert(chunk);
            assert!(buffer.cursor() <= buffer.len());
            buffer.move_left();
            assert!(buffer.cursor() <= buffer.len());
            buffer.delete_backward();
            assert!(buffer.cursor() <= buffer.len());
            buffer.delete_forward();
            assert!(buffer.cursor() <= buffer.len());
            buffer.move_right();
            assert!(buffer.cursor() <= buffer.len());
        }
    }

    #[test]
    fn test_unicode_chars_count_as_one_column() {
        let mut buffer = EditBuffer::new();
        buffer.insert("héllo");
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.cursor(), 5);
        buffer.move_home();
        buffer.move_right();
        buffer.delete_forward();
        assert_eq!(buffer.text(), "hllo");
    }
}

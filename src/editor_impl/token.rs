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

use strum_macros::Display;

/// A classified unit of terminal input: either literal text, or one recognized control
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum InputToken {
    Literal(String),
    DeleteBackward,
    DeleteForward,
    CommitLine,
    MoveLeft,
    MoveRight,
    HistoryPrevious,
    HistoryNext,
    MoveHome,
    MoveEnd,
}

impl InputToken {
    /// Classify one raw input chunk by exact byte-sequence match against the fixed table
    /// of recognized control sequences. Anything that doesn't match is [`Literal`] text,
    /// never an error.
    ///
    /// Each chunk is assumed to carry one complete token (a single keystroke, a full
    /// escape sequence, or a paste). There is no partial / streaming match: a control
    /// sequence split across two chunks will be misclassified as literal text. This is a
    /// known limitation of the input contract, not something this function guesses
    /// around.
    ///
    /// [`Literal`]: InputToken::Literal
    pub fn classify(chunk: &str) -> InputToken {
        match chunk {
            "\x7f" | "\x08" => InputToken::DeleteBackward,
            "\x1b[3~" => InputToken::DeleteForward,
            "\r" | "\n" | "\r\n" => InputToken::CommitLine,
            "\x1b[D" => InputToken::MoveLeft,
            "\x1b[C" => InputToken::MoveRight,
            "\x1b[A" => InputToken::HistoryPrevious,
            "\x1b[B" => InputToken::HistoryNext,
            "\x1b[H" | "\x1b[1~" => InputToken::MoveHome,
            "\x1b[F" | "\x1b[4~" => InputToken::MoveEnd,
            _ => InputToken::Literal(chunk.to_string()),
        }
    }
}

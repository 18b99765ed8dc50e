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

use strum_macros::{Display, EnumString};

/// Handler for the `enter` event. Receives a snapshot of the committed line.
pub type EnterHandler = Box<dyn FnMut(&str) -> miette::Result<String> + Send>;

/// Handler for the no-argument events (`history_previous`, `history_next`, `prompt`).
pub type HookHandler = Box<dyn FnMut() -> miette::Result<String> + Send>;

/// The closed set of callback registrations, each carrying its strongly-typed handler.
/// There is no open-ended string-keyed dispatch table.
pub enum Callback {
    /// Invoked with a snapshot of the line when the user commits it. Whatever text it
    /// returns is written to the display.
    Enter(EnterHandler),
    /// Invoked on the up-arrow. The engine has no history storage of its own; the
    /// returned text (if any) is written to the display.
    HistoryPrevious(HookHandler),
    /// Invoked on the down-arrow. Same contract as [`Callback::HistoryPrevious`].
    HistoryNext(HookHandler),
    /// Invoked after `enter` completes; returns the next prompt string.
    Prompt(HookHandler),
}

/// The no-argument event kinds, used to pick a hook at dispatch time. The string forms
/// (`history_previous`, `history_next`, `prompt`) are the event names accepted by
/// [`CallbackRegistry::register_named`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HookEvent {
    HistoryPrevious,
    HistoryNext,
    Prompt,
}

/// At most one handler per event; the last registration wins. Populated during session
/// setup and not re-registered afterwards in the expected usage.
#[derive(Default)]
pub struct CallbackRegistry {
    enter: Option<EnterHandler>,
    history_previous: Option<HookHandler>,
    history_next: Option<HookHandler>,
    prompt: Option<HookHandler>,
}

impl CallbackRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, callback: Callback) {
        match callback {
            Callback::Enter(handler) => self.enter = Some(handler),
            Callback::HistoryPrevious(handler) => self.history_previous = Some(handler),
            Callback::HistoryNext(handler) => self.history_next = Some(handler),
            Callback::Prompt(handler) => self.prompt = Some(handler),
        }
    }

    /// Registration by event name. The handler receives the committed line for
    /// `"enter"` and an empty string for the other events. An unrecognized name is
    /// accepted but the handler is never invoked.
    pub fn register_named(
        &mut self,
        event_name: &str,
        mut handler: impl FnMut(&str) -> miette::Result<String> + Send + 'static,
    ) {
        if event_name == "enter" {
            self.register(Callback::Enter(Box::new(handler)));
            return;
        }
        if let Ok(event) = event_name.parse::<HookEvent>() {
            let hook: HookHandler = Box::new(move || handler(""));
            self.register(match event {
                HookEvent::HistoryPrevious => Callback::HistoryPrevious(hook),
                HookEvent::HistoryNext => Callback::HistoryNext(hook),
                HookEvent::Prompt => Callback::Prompt(hook),
            });
        }
    }

    /// Invoke the `enter` handler with the committed line. A missing handler produces
    /// empty output; a failing handler propagates unmodified.
    pub fn run_enter(&mut self, line: &str) -> miette::Result<String> {
        match &mut self.enter {
            Some(handler) => handler(line),
            None => Ok(String::new()),
        }
    }

    /// Invoke a no-argument hook. Same missing-handler and failure semantics as
    /// [`Self::run_enter`].
    pub fn run_hook(&mut self, event: HookEvent) -> miette::Result<String> {
        let slot = match event {
            HookEvent::HistoryPrevious => &mut self.history_previous,
            HookEvent::HistoryNext => &mut self.history_next,
            HookEvent::Prompt => &mut self.prompt,
        };
        match slot {
            Some(handler) => handler(),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_handler_yields_empty_output() {
        let mut registry = CallbackRegistry::new();
        assert_eq!(registry.run_enter("ls").unwrap(), "");
        assert_eq!(registry.run_hook(HookEvent::Prompt).unwrap(), "");
        assert_eq!(registry.run_hook(HookEvent::HistoryPrevious).unwrap(), "");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = CallbackRegistry::new();
        registry.register(Callback::Prompt(Box::new(|| Ok("one> ".into()))));
        registry.register(Callback::Prompt(Box::new(|| Ok("two> ".into()))));
        assert_eq!(registry.run_hook(HookEvent::Prompt).unwrap(), "two> ");
    }

    #[test]
    fn test_enter_receives_line() {
        let mut registry = CallbackRegistry::new();
        registry.register(Callback::Enter(Box::new(|line| {
            Ok(format!("ran: {line}\n"))
        })));
        assert_eq!(registry.run_enter("ls").unwrap(), "ran: ls\n");
    }

    #[test]
    fn test_register_named_known_events() {
        let mut registry = CallbackRegistry::new();
        registry.register_named("enter", |line| Ok(line.to_uppercase()));
        registry.register_named("history_previous", |_| Ok("prev\n".into()));
        registry.register_named("history_next", |_| Ok("next\n".into()));
        registry.register_named("prompt", |_| Ok("> ".into()));

        assert_eq!(registry.run_enter("abc").unwrap(), "ABC");
        assert_eq!(
            registry.run_hook(HookEvent::HistoryPrevious).unwrap(),
            "prev\n"
        );
        assert_eq!(registry.run_hook(HookEvent::HistoryNext).unwrap(), "next\n");
        assert_eq!(registry.run_hook(HookEvent::Prompt).unwrap(), "> ");
    }

    #[test]
    fn test_register_named_unknown_event_is_inert() {
        let mut registry = CallbackRegistry::new();
        registry.register_named("bogus", |_| Ok("never".into()));
        assert_eq!(registry.run_enter("x").unwrap(), "");
        assert_eq!(registry.run_hook(HookEvent::Prompt).unwrap(), "");
    }

    #[test]
    fn test_handler_failure_propagates() {
        let mut registry = CallbackRegistry::new();
        registry.register(Callback::Enter(Box::new(|_| {
            Err(miette::miette!("command engine offline"))
        })));
        let result = registry.run_enter("ls");
        assert!(result.is_err());
    }
}

//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Parsed script documents

use crate::error::EmulationResult;
use regex::Regex;
use std::sync::LazyLock;

/// Greeting prepended to every script unless overridden
pub const DEFAULT_GREETING: &str = "PyEmu v0.1 Session\n\n";

/// Pattern recognizing an input marker: `<%` capture `%>` plus its newline
pub const DEFAULT_INPUT_TAG: &str = "<%(.*?)?%>\n";

static DEFAULT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_INPUT_TAG).expect("default input tag pattern"));

/// Options for constructing a [`Transcript`]
#[derive(Debug, Clone)]
pub struct TranscriptOptions {
    /// Greeting prefix; counted as part of line 0 of the script
    pub greeting: String,
    /// Input marker pattern with a single capture group for the expectation
    pub input_tag: String,
}

impl Default for TranscriptOptions {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            input_tag: DEFAULT_INPUT_TAG.to_string(),
        }
    }
}

impl TranscriptOptions {
    /// Create options with the default greeting and marker pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the greeting prefix
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Set the input marker pattern
    pub fn with_input_tag(mut self, input_tag: impl Into<String>) -> Self {
        self.input_tag = input_tag.into();
        self
    }
}

/// A marker occurrence within a transcript body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagMatch {
    /// Byte offset of the marker's start
    pub start: usize,
    /// Byte offset just past the marker's terminating newline
    pub end: usize,
    /// Captured expectation, `None` when the capture was absent or empty
    pub expected: Option<String>,
}

/// Immutable parsed view over a script document.
///
/// A transcript is the greeting prefix plus the raw script text, with the
/// compiled marker pattern used to locate input expectations. It is never
/// mutated after construction, so concurrent [`crate::Emulator`] instances
/// may share one via `Arc`.
#[derive(Debug, Clone)]
pub struct Transcript {
    greeting: String,
    body: String,
    tag: Regex,
}

impl Transcript {
    /// Create a transcript with the default greeting and marker pattern
    pub fn new(data: impl AsRef<str>) -> Self {
        let greeting = DEFAULT_GREETING.to_string();
        let body = format!("{}{}", greeting, data.as_ref());
        Self {
            greeting,
            body,
            tag: DEFAULT_TAG.clone(),
        }
    }

    /// Create a transcript with custom options
    ///
    /// Fails when the configured marker pattern does not compile.
    pub fn with_options(data: impl AsRef<str>, options: &TranscriptOptions) -> EmulationResult<Self> {
        let tag = Regex::new(&options.input_tag)?;
        let body = format!("{}{}", options.greeting, data.as_ref());
        Ok(Self {
            greeting: options.greeting.clone(),
            body,
            tag,
        })
    }

    /// The greeting prefix
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// The full playback text (greeting + script)
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of newlines contributed by the greeting.
    ///
    /// Subtracted from the initial line counter so user-visible line numbers
    /// refer to the script, not the greeting.
    pub(crate) fn greeting_newlines(&self) -> i64 {
        self.greeting.matches('\n').count() as i64
    }

    /// Find the next input marker at or after `offset`
    pub(crate) fn next_tag(&self, offset: usize) -> Option<TagMatch> {
        let captures = self.tag.captures_at(&self.body, offset)?;
        let whole = captures.get(0)?;
        let expected = captures
            .get(1)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(TagMatch {
            start: whole.start(),
            end: whole.end(),
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_is_prepended() {
        let transcript = Transcript::new("hello\n");
        assert_eq!(transcript.body(), "PyEmu v0.1 Session\n\nhello\n");
        assert_eq!(transcript.greeting(), DEFAULT_GREETING);
        assert_eq!(transcript.greeting_newlines(), 2);
    }

    #[test]
    fn test_next_tag_finds_marker() {
        let transcript = Transcript::new("Enter 'foo'\n<%foo%>\nBye!\n");
        let tag = transcript.next_tag(0).unwrap();
        assert_eq!(&transcript.body()[tag.start..tag.end], "<%foo%>\n");
        assert_eq!(tag.expected.as_deref(), Some("foo"));
        assert!(transcript.next_tag(tag.end).is_none());
    }

    #[test]
    fn test_empty_capture_is_none() {
        let transcript = Transcript::new("anything goes\n<%%>\ndone\n");
        let tag = transcript.next_tag(0).unwrap();
        assert_eq!(tag.expected, None);
    }

    #[test]
    fn test_custom_options() {
        let options = TranscriptOptions::new()
            .with_greeting("hi\n")
            .with_input_tag(r"\[\[(.*?)\]\]\n");
        let transcript = Transcript::with_options("go [[run]]\nok\n", &options).unwrap();
        assert_eq!(transcript.greeting_newlines(), 1);
        let tag = transcript.next_tag(0).unwrap();
        assert_eq!(tag.expected.as_deref(), Some("run"));
    }

    #[test]
    fn test_invalid_tag_pattern() {
        let options = TranscriptOptions::new().with_input_tag("<%(%>");
        assert!(Transcript::with_options("data", &options).is_err());
    }

    #[test]
    fn test_marker_requires_newline() {
        // A marker without its terminating newline is plain text.
        let transcript = Transcript::new("prompt <%foo%>");
        assert!(transcript.next_tag(0).is_none());
    }
}

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

//! Replay engine state machine

use crate::error::{EmulationError, EmulationResult};
use crate::transcript::Transcript;
use regex::Regex;
use std::sync::Arc;

/// Per-connection replay state machine over one [`Transcript`].
///
/// The engine keeps a cursor into the transcript body and the expectation
/// pending from the last marker it crossed. Each [`Emulator::input`] call
/// validates the supplied command against that expectation, then returns the
/// body slice up to the next marker; when no marker remains it returns the
/// tail and halts.
pub struct Emulator {
    transcript: Arc<Transcript>,
    offset: usize,
    line: i64,
    expected: Option<String>,
    running: bool,
}

impl Emulator {
    /// Create an engine bound to the given transcript, ready to run
    pub fn new(transcript: Arc<Transcript>) -> Self {
        let mut emulator = Self {
            transcript,
            offset: 0,
            line: 0,
            expected: None,
            running: false,
        };
        emulator.start();
        emulator
    }

    /// Reset the emulation to the start.
    ///
    /// This is the only way back to a usable state after the engine halts,
    /// whether by running off the end of the script or by an input mismatch.
    pub fn start(&mut self) {
        self.offset = 0;
        self.line = -self.transcript.greeting_newlines();
        self.expected = None;
        self.running = true;
    }

    /// Run one input step and return everything up to the next marker.
    ///
    /// `None` is the "no input yet" sentinel used for the very first call to
    /// obtain the greeting chunk. Once the engine has halted this returns
    /// `Ok(None)` with no side effects.
    ///
    /// Input matching tries exact equality first, then the expectation
    /// interpreted as a regular expression anchored at the start of the
    /// input (not a full match). A literal expectation containing regex
    /// metacharacters may therefore accept more than intended; that latitude
    /// is part of the script format and is kept as-is. An expectation that
    /// does not compile as a regex simply never matches that way.
    pub fn input(&mut self, cmd: Option<&str>) -> EmulationResult<Option<String>> {
        if !self.running {
            return Ok(None);
        }

        // check they entered what we expected
        if let Some(expected) = self.expected.clone() {
            let got = cmd.unwrap_or_default();
            if !Self::matches(&expected, got) {
                self.running = false;
                return Err(EmulationError::UnexpectedInput {
                    expected,
                    got: got.to_string(),
                    line: self.line,
                });
            }
        }

        // find the next input tag
        match self.transcript.next_tag(self.offset) {
            Some(tag) => {
                self.expected = tag.expected;
                Ok(Some(self.chunk(tag.start, tag.end)))
            }
            None => {
                tracing::debug!("at end of script");
                self.running = false;
                let end = self.transcript.body().len();
                Ok(Some(self.chunk(end, end)))
            }
        }
    }

    /// True once the engine has halted
    pub fn eof(&self) -> bool {
        !self.running
    }

    /// Current script line number.
    ///
    /// Starts below zero by the greeting's line count and reads as the
    /// script's own line once playback passes the greeting.
    pub fn line(&self) -> i64 {
        self.line
    }

    /// The transcript this engine replays
    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    fn chunk(&mut self, tag_start: usize, tag_end: usize) -> String {
        let result = &self.transcript.body()[self.offset..tag_start];
        self.offset = tag_end;
        self.line += result.matches('\n').count() as i64 + 1;
        result.to_string()
    }

    fn matches(expected: &str, got: &str) -> bool {
        if got == expected {
            return true;
        }
        match Regex::new(expected) {
            Ok(pattern) => pattern.find(got).is_some_and(|m| m.start() == 0),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("offset", &self.offset)
            .field("line", &self.line)
            .field("expected", &self.expected)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptOptions;

    const FOOBAR: &str = "This is a test script\n\nEnter 'foo'\n<%foo%>\n\nEnter 'bar'\n<%bar%>\n\nBye!\n";

    fn foobar_emulator() -> Emulator {
        Emulator::new(Arc::new(Transcript::new(FOOBAR)))
    }

    #[test]
    fn test_successful_run() {
        let mut e = foobar_emulator();

        assert_eq!(
            e.input(None).unwrap().as_deref(),
            Some("PyEmu v0.1 Session\n\nThis is a test script\n\nEnter 'foo'\n")
        );
        assert_eq!(e.line(), 4);
        assert_eq!(e.input(Some("foo")).unwrap().as_deref(), Some("\nEnter 'bar'\n"));
        assert_eq!(e.line(), 7);
        assert_eq!(e.input(Some("bar")).unwrap().as_deref(), Some("\nBye!\n"));
        assert_eq!(e.line(), 10);
        assert!(e.eof());
        assert_eq!(e.input(Some("foo")).unwrap(), None);
    }

    #[test]
    fn test_unexpected_input() {
        let mut e = foobar_emulator();
        e.input(None).unwrap();

        let err = e.input(Some("bar")).unwrap_err();
        assert_eq!(err.to_string(), "Expected \"foo\", got \"bar\" at line 4");

        // emulation is closed
        assert!(e.eof());
        assert_eq!(e.input(Some("foo")).unwrap(), None);

        // can restart
        e.start();
        e.input(None).unwrap();
        assert_eq!(e.input(Some("foo")).unwrap().as_deref(), Some("\nEnter 'bar'\n"));
    }

    #[test]
    fn test_restart_reproduces_run() {
        let mut e = foobar_emulator();
        let first: Vec<(Option<String>, i64)> = [None, Some("foo"), Some("bar")]
            .into_iter()
            .map(|cmd| (e.input(cmd).unwrap(), e.line()))
            .collect();

        e.start();
        let second: Vec<(Option<String>, i64)> = [None, Some("foo"), Some("bar")]
            .into_iter()
            .map(|cmd| (e.input(cmd).unwrap(), e.line()))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_script_without_markers() {
        let mut e = Emulator::new(Arc::new(Transcript::new("just some text\nno input needed\n")));
        assert_eq!(
            e.input(None).unwrap().as_deref(),
            Some("PyEmu v0.1 Session\n\njust some text\nno input needed\n")
        );
        assert!(e.eof());
        assert_eq!(e.input(None).unwrap(), None);
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut e = Emulator::new(Arc::new(Transcript::new("done\n")));
        e.input(None).unwrap();
        assert!(e.eof());
        for _ in 0..3 {
            assert_eq!(e.input(Some("anything")).unwrap(), None);
            assert!(e.eof());
        }
    }

    #[test]
    fn test_regex_latitude_pattern_match() {
        let mut e = Emulator::new(Arc::new(Transcript::new("Enter it\n<%f.o%>\nok\n")));
        e.input(None).unwrap();
        assert_eq!(e.input(Some("foo")).unwrap().as_deref(), Some("ok\n"));
    }

    #[test]
    fn test_regex_latitude_prefix_match() {
        // The match is anchored at the start only, so a literal expectation
        // accepts any input it prefixes.
        let mut e = Emulator::new(Arc::new(Transcript::new("Enter it\n<%foo%>\nok\n")));
        e.input(None).unwrap();
        assert_eq!(e.input(Some("foobar")).unwrap().as_deref(), Some("ok\n"));
    }

    #[test]
    fn test_regex_match_must_start_at_beginning() {
        let mut e = Emulator::new(Arc::new(Transcript::new("Enter it\n<%foo%>\nok\n")));
        e.input(None).unwrap();
        let err = e.input(Some("xfoo")).unwrap_err();
        assert!(matches!(err, EmulationError::UnexpectedInput { .. }));
    }

    #[test]
    fn test_empty_marker_accepts_anything() {
        let mut e = Emulator::new(Arc::new(Transcript::new("Press enter\n<%%>\ndone\n")));
        e.input(None).unwrap();
        assert_eq!(e.input(Some("whatever")).unwrap().as_deref(), Some("done\n"));
        assert!(e.eof());
    }

    #[test]
    fn test_unparseable_expectation_reports_mismatch() {
        let mut e = Emulator::new(Arc::new(Transcript::new("Enter it\n<%((%>\nok\n")));
        e.input(None).unwrap();
        // "((" is not a valid regex; only the exact text matches.
        let err = e.input(Some("x")).unwrap_err();
        assert!(matches!(err, EmulationError::UnexpectedInput { .. }));

        e.start();
        e.input(None).unwrap();
        assert_eq!(e.input(Some("((")).unwrap().as_deref(), Some("ok\n"));
    }

    #[test]
    fn test_custom_greeting_line_numbers() {
        let options = TranscriptOptions::new().with_greeting("hi\n");
        let transcript = Transcript::with_options("Enter\n<%go%>\nend\n", &options).unwrap();
        let mut e = Emulator::new(Arc::new(transcript));
        assert_eq!(e.line(), -1);
        assert_eq!(e.input(None).unwrap().as_deref(), Some("hi\nEnter\n"));
        assert_eq!(e.line(), 2);
    }

    #[test]
    fn test_no_input_sentinel_with_pending_expectation() {
        let mut e = foobar_emulator();
        e.input(None).unwrap();
        let err = e.input(None).unwrap_err();
        match err {
            EmulationError::UnexpectedInput { expected, got, .. } => {
                assert_eq!(expected, "foo");
                assert_eq!(got, "");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

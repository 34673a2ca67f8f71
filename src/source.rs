//! Line sources feeding the scanner
//!
//! The scanner pulls one physical line at a time through [`LineSource`].
//! A read reports the text it obtained together with a [`ReadStatus`]; text
//! may accompany any status (a final line without a newline arrives with
//! `EndOfStream`).

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::Config;

/// Outcome of a line request
#[derive(Debug)]
pub enum ReadStatus {
    Ok,
    /// The user pressed Ctrl-C while the line was being read
    Interrupted,
    EndOfStream,
    Failed(io::Error),
}

pub trait LineSource {
    /// Read up to and including `delimiter`
    fn read_line(&mut self, delimiter: char) -> (String, ReadStatus);
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self, delimiter: char) -> (String, ReadStatus) {
        (**self).read_line(delimiter)
    }
}

// ============================================================================
// Buffered reader
// ============================================================================

/// Lines from any buffered reader: files, pipes, in-memory text.
///
/// Never reports [`ReadStatus::Interrupted`]; `read_until` retries interrupted
/// reads itself, so Ctrl-C reaches the scanner through [`EditorSource`] or a
/// [`ScriptedSource`].
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, delimiter: char) -> (String, ReadStatus) {
        let byte = if delimiter.is_ascii() {
            delimiter as u8
        } else {
            b'\n'
        };

        let mut buf = Vec::new();
        match self.reader.read_until(byte, &mut buf) {
            Ok(0) => (String::new(), ReadStatus::EndOfStream),
            Ok(_) => {
                let complete = buf.last() == Some(&byte);
                let text = String::from_utf8_lossy(&buf).into_owned();
                if complete {
                    (text, ReadStatus::Ok)
                } else {
                    (text, ReadStatus::EndOfStream)
                }
            }
            Err(e) => (String::from_utf8_lossy(&buf).into_owned(), ReadStatus::Failed(e)),
        }
    }
}

// ============================================================================
// Interactive editor
// ============================================================================

/// Lines typed at an interactive terminal, with history
pub struct EditorSource {
    editor: DefaultEditor,
    prompt: String,
    history: Option<PathBuf>,
}

impl EditorSource {
    pub fn new(config: &Config) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &config.history {
            // A missing history file is normal on first run.
            if let Err(e) = editor.load_history(path) {
                log::debug!("no history loaded from {}: {}", path.display(), e);
            }
        }

        Ok(EditorSource {
            editor,
            prompt: config.prompt.clone(),
            history: config.history.clone(),
        })
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Write the history file, if one is configured
    pub fn save_history(&mut self) {
        if let Some(path) = &self.history {
            if let Err(e) = self.editor.save_history(path) {
                log::warn!("failed to write history {}: {}", path.display(), e);
            }
        }
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, _delimiter: char) -> (String, ReadStatus) {
        match self.editor.readline(&self.prompt) {
            Ok(mut line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                line.push('\n');
                (line, ReadStatus::Ok)
            }
            Err(ReadlineError::Interrupted) => (String::new(), ReadStatus::Interrupted),
            Err(ReadlineError::Eof) => (String::new(), ReadStatus::EndOfStream),
            Err(ReadlineError::Io(e)) => (String::new(), ReadStatus::Failed(e)),
            Err(e) => (
                String::new(),
                ReadStatus::Failed(io::Error::new(io::ErrorKind::Other, e.to_string())),
            ),
        }
    }
}

impl Drop for EditorSource {
    fn drop(&mut self) {
        self.save_history();
    }
}

// ============================================================================
// Scripted reads
// ============================================================================

/// A fixed sequence of reads, then end of stream.
///
/// Useful for driving the scanner from a host that already has its input, and
/// for exercising interrupt and failure handling.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    reads: VecDeque<(String, ReadStatus)>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a complete line; a newline is appended when missing
    pub fn line(mut self, text: &str) -> Self {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.reads.push_back((text, ReadStatus::Ok));
        self
    }

    pub fn interrupt(mut self) -> Self {
        self.reads.push_back((String::new(), ReadStatus::Interrupted));
        self
    }

    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.reads
            .push_back((String::new(), ReadStatus::Failed(io::Error::from(kind))));
        self
    }

    /// Queue final text that arrives together with end of stream
    pub fn last(mut self, text: &str) -> Self {
        self.reads
            .push_back((text.to_string(), ReadStatus::EndOfStream));
        self
    }

    pub fn remaining(&self) -> usize {
        self.reads.len()
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, _delimiter: char) -> (String, ReadStatus) {
        self.reads
            .pop_front()
            .unwrap_or_else(|| (String::new(), ReadStatus::EndOfStream))
    }
}

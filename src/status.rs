use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracer::common::progress::{ProgressSnapshot, StatusObserver};
use tracing::debug;

/// Prints progress on a single console line that is overwritten in place.
pub struct ConsoleStatus<W: Write + Send> {
    inner: Mutex<ConsoleLine<W>>,
    finish_line: bool,
}

struct ConsoleLine<W> {
    out: W,
    max_len: usize,
}

impl ConsoleStatus<io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleStatus::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        ConsoleStatus { inner: Mutex::new(ConsoleLine { out, max_len: 0 }), finish_line: true }
    }

    /// Only end the status line on finish, without printing "Finished Rendering.".
    pub fn without_finish_line(mut self) -> Self {
        self.finish_line = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).out
    }

    fn line(&self) -> MutexGuard<'_, ConsoleLine<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write> ConsoleLine<W> {
    /// Return to the start of the line and pad with spaces so nothing of a longer
    /// earlier line remains visible.
    fn print(&mut self, text: &str) -> io::Result<()> {
        let len = text.chars().count();
        self.max_len = self.max_len.max(len);

        write!(self.out, "\r{}{:pad$}", text, "", pad = self.max_len - len)?;
        self.out.flush()
    }
}

pub fn format_status(snapshot: &ProgressSnapshot) -> String {
    let mut line = format!("Progress {:5.2}   {}", snapshot.progress * 100.0, snapshot.status);
    if !snapshot.substatus.is_empty() {
        line.push_str(": ");
        line.push_str(&snapshot.substatus);
    }
    line
}

impl<W: Write + Send> StatusObserver for ConsoleStatus<W> {
    fn update(&self, snapshot: &ProgressSnapshot) {
        if let Err(e) = self.line().print(&format_status(snapshot)) {
            debug!("failed to print status: {}", e);
        }
    }

    fn finish(&self) {
        let mut line = self.line();
        let result = if self.finish_line {
            line.print("Finished Rendering.").and_then(|()| writeln!(line.out))
        } else if line.max_len > 0 {
            writeln!(line.out).and_then(|()| line.out.flush())
        } else {
            Ok(())
        };
        if let Err(e) = result {
            debug!("failed to print status: {}", e);
        }
    }
}

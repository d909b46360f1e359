// ABOUTME: Terminal output sink for deployment progress.
// ABOUTME: Serial writes to stderr, color scheme, and line-clearing redraws.

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Bold/green styling, honoring a global on/off switch.
#[derive(Debug, Clone, Copy)]
pub struct ColorScheme {
    enabled: bool,
}

impl ColorScheme {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn bold(&self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        if self.enabled {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Where deployment progress goes.
///
/// All writes funnel through one lock so the renderer's clear-and-redraw
/// cycles never interleave with plain progress lines. Per-machine waiter
/// tasks must not write here directly; they report through the trackers.
pub struct Output {
    writer: Mutex<Box<dyn Write + Send>>,
    colors: ColorScheme,
}

impl Output {
    /// Progress sink on stderr, the conventional stream for it.
    pub fn stderr(colors: ColorScheme) -> Self {
        Self::with_writer(Box::new(io::stderr()), colors)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, colors: ColorScheme) -> Self {
        Self {
            writer: Mutex::new(writer),
            colors,
        }
    }

    pub fn colors(&self) -> ColorScheme {
        self.colors
    }

    /// Phase heading, set off with a blank line.
    pub fn heading(&self, text: &str) {
        self.write(&format!("\n{text}\n"));
    }

    /// One progress line.
    pub fn line(&self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    /// Move the cursor up `count` lines, erasing each.
    pub fn clear_lines_above(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.write(&"\x1b[1A\x1b[2K".repeat(count));
    }

    fn write(&self, text: &str) {
        let mut writer = self.writer.lock();
        let _ = writer.write_all(text.as_bytes());
        let _ = writer.flush();
    }
}

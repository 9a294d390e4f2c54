//! Line-oriented terminal implementations of the core prompt and notification traits.

use intake_core::{NotificationSink, PreviewDecision, SelectorPrompt};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Numbered picker and use/retry/cancel preview over any reader and writer.
///
/// End of input cancels.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        write!(self.output, "{question}").ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> SelectorPrompt for TerminalPrompt<R, W> {
    fn pick(&mut self, candidates: &[PathBuf]) -> Option<PathBuf> {
        if candidates.is_empty() {
            let _ = writeln!(self.output, "No intake documents found.");
            return None;
        }

        for (number, path) in candidates.iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            let _ = writeln!(self.output, "{:>3}) {name}", number + 1);
        }

        loop {
            let answer = self.ask("Select a document number (q to cancel): ")?;
            if answer.eq_ignore_ascii_case("q") {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=candidates.len()).contains(&n) => {
                    return Some(candidates[n - 1].clone())
                }
                _ => {
                    let _ = writeln!(
                        self.output,
                        "Enter a number between 1 and {}.",
                        candidates.len()
                    );
                }
            }
        }
    }

    fn preview(&mut self, document: &Path) -> PreviewDecision {
        let _ = writeln!(self.output, "Selected: {}", document.display());
        loop {
            let Some(answer) = self.ask("[u]se this file, [r]etry, [c]ancel: ") else {
                return PreviewDecision::Cancel;
            };
            match answer.to_ascii_lowercase().as_str() {
                "u" | "use" => return PreviewDecision::UseThis,
                "r" | "retry" => return PreviewDecision::Retry,
                "c" | "cancel" => return PreviewDecision::Cancel,
                _ => {}
            }
        }
    }
}

/// Prints notifications to stderr.
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn show(&self, _key: &str, message: &str) {
        eprintln!("\n{message}\n");
    }
}

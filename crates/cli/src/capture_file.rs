//! Plain-text capture files.
//!
//! A capture file holds the raw text of every section under a `[key]` header:
//!
//! ```text
//! # comments are allowed before the first header
//! [demographics]
//! Maria Reyes
//! 1978-03-14
//! [vitals]
//! 120/80
//! ```
//!
//! Trailing blank lines of a section are dropped; everything else is kept verbatim. `render`
//! writes body lines that `parse` would otherwise misread with one leading `\`, which
//! `parse` removes again.

use anyhow::{bail, Result};
use intake_core::schema::CHIEF_COMPLAINT;
use intake_core::sections::SECTIONS;
use intake_core::IntakeCapture;

pub fn parse(text: &str) -> Result<IntakeCapture> {
    let mut capture = IntakeCapture::default();
    let mut current: Option<(String, Vec<&str>)> = None;

    for (number, line) in text.lines().enumerate() {
        if let Some(key) = header_key(line) {
            if let Some((key, body)) = current.take() {
                store(&mut capture, &key, &body)?;
            }
            if capture.text_mut(key).is_none() {
                bail!("line {}: unknown section [{key}]", number + 1);
            }
            current = Some((key.to_string(), Vec::new()));
            continue;
        }

        match current.as_mut() {
            Some((_, body)) => body.push(line),
            None if line.trim().is_empty() || line.trim_start().starts_with('#') => {}
            None => bail!(
                "line {}: text before the first [section] header",
                number + 1
            ),
        }
    }

    if let Some((key, body)) = current {
        store(&mut capture, &key, &body)?;
    }
    Ok(capture)
}

fn header_key(line: &str) -> Option<&str> {
    let key = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    valid.then_some(key)
}

fn store(capture: &mut IntakeCapture, key: &str, body: &[&str]) -> Result<()> {
    let mut lines = body.to_vec();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    match capture.text_mut(key) {
        Some(text) => {
            *text = lines
                .into_iter()
                .map(unescape)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(())
        }
        None => bail!("unknown section [{key}]"),
    }
}

fn needs_escape(line: &str) -> bool {
    line.starts_with('\\') || header_key(line).is_some()
}

fn unescape(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if needs_escape(rest) || rest.trim().is_empty() => rest,
        _ => line,
    }
}

/// Writes every section under its header, separated by blank lines.
pub fn render(capture: &IntakeCapture) -> String {
    let mut out = String::new();
    for (key, text) in capture.entries() {
        out.push_str(&format!("[{key}]\n"));
        if !text.is_empty() {
            let lines: Vec<&str> = text.split('\n').collect();
            let kept = lines
                .iter()
                .rposition(|l| !l.trim().is_empty())
                .map_or(0, |last| last + 1);

            for (i, line) in lines.iter().enumerate() {
                if needs_escape(line) || i >= kept {
                    out.push('\\');
                }
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

/// An empty capture file whose leading comments list the expected line order.
pub fn template() -> String {
    let mut out = String::from("# One line per field, in this order. Extra lines become notes.\n");
    for schema in SECTIONS {
        let labels: Vec<&str> = schema.fields.iter().map(|f| f.label).collect();
        out.push_str(&format!("# [{}] {}\n", schema.key, labels.join(" / ")));
        if schema.key == "vitals" {
            out.push_str("#   BMI is recomputed from height and weight when both parse\n");
        }
    }
    out.push_str(&format!(
        "# [chief-complaint] {} (free text)\n\n",
        CHIEF_COMPLAINT.label
    ));
    out.push_str(&render(&IntakeCapture::default()));
    out
}

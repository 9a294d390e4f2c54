//! Field encoder and decoder.
//!
//! Encoding maps the lines of a capture section onto its ordinal fields plus an overflow
//! bucket; decoding rebuilds section text for re-editing. The pair stabilises after one
//! pass: `encode(decode(encode(x))) == encode(x)`.

use crate::schema::{FieldSpec, SectionSchema, PLACEHOLDER};

/// Result of encoding one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSection {
    /// Trimmed ordinal values, exactly `ordinal_count` long.
    pub fields: Vec<String>,
    /// Lines past the last ordinal, joined with `\n` verbatim.
    pub overflow: String,
}

/// Splits on `\r\n` or `\n` and nothing else.
///
/// Empty input yields a single empty line, and a trailing newline yields a trailing empty
/// line, so no line is ever dropped.
pub fn split_lines(raw: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    for line in &mut lines[..last] {
        if let Some(stripped) = line.strip_suffix('\r') {
            *line = stripped;
        }
    }
    lines
}

pub fn encode_section(raw: &str, ordinal_count: usize) -> EncodedSection {
    let lines = split_lines(raw);

    let fields = (0..ordinal_count)
        .map(|i| {
            lines
                .get(i)
                .map(|line| line.trim().to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        })
        .collect();

    let overflow = lines
        .get(ordinal_count..)
        .map(|rest| rest.join("\n"))
        .unwrap_or_default();

    EncodedSection { fields, overflow }
}

/// Joins ordinals with `\n` and appends the overflow as a trailing block when non-empty.
pub fn decode_section<S: AsRef<str>>(fields: &[S], overflow: &str) -> String {
    let mut text = fields
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");

    if !overflow.is_empty() {
        text.push('\n');
        text.push_str(overflow);
    }
    text
}

/// A record section whose fields are laid out by a [`SectionSchema`].
pub trait Section: Sized {
    const SCHEMA: SectionSchema;

    /// Ordinal values in schema order.
    fn ordinals(&self) -> Vec<&str>;

    fn overflow(&self) -> &str;

    fn from_encoded(encoded: EncodedSection) -> Self;

    fn encode(raw: &str) -> Self {
        Self::from_encoded(encode_section(raw, Self::SCHEMA.ordinal_count()))
    }

    fn decode(&self) -> String {
        decode_section(&self.ordinals(), self.overflow())
    }

    /// Every field (ordinals then overflow) paired with its spec.
    fn entries(&self) -> Vec<(FieldSpec, &str)> {
        Self::SCHEMA
            .fields
            .iter()
            .copied()
            .zip(self.ordinals())
            .chain(std::iter::once((Self::SCHEMA.overflow, self.overflow())))
            .collect()
    }
}

//! Built-in PDF renderer.
//!
//! Writes a minimal PDF 1.4 file by hand: A4 pages, the two standard Type1 fonts
//! (Helvetica and Helvetica-Bold), one content stream per page and a classic xref table.
//! Text is Latin-1; characters outside it print as `?`.
//!
//! Object layout: `1` catalog, `2` page tree, `3`/`4` fonts, then for page `i` a content
//! stream `5 + 2i` and its page object `6 + 2i`.

use crate::collaborators::{CollaboratorResult, DocumentRenderer};
use crate::record::PatientIntakeRecord;
use chrono::{DateTime, Local};
use std::fmt;

const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 45.0;
const LINE_HEIGHT: f64 = 14.0;
const WRAP_COLUMNS: usize = 92;
const MAX_LINE_CHARS: usize = 1400;
const MAX_HEADING_CHARS: usize = 120;

/// Placeholder printed for a blank field.
const BLANK_VALUE: &str = "-";

pub const INTAKE_TITLE: &str = "Patient Intake Summary";
const REPORT_HEADING: &str = "AI Enhanced Report";

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Font::Regular => f.write_str("F1"),
            Font::Bold => f.write_str("F2"),
        }
    }
}

/// Renders intake summaries and reports without any external engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfSummaryRenderer;

impl DocumentRenderer for PdfSummaryRenderer {
    fn render_intake(&self, record: &PatientIntakeRecord) -> CollaboratorResult<Vec<u8>> {
        Ok(render_intake_summary(record, Local::now()))
    }

    fn render_report(
        &self,
        record: &PatientIntakeRecord,
        report_text: &str,
    ) -> CollaboratorResult<Vec<u8>> {
        Ok(render_report_document(record, report_text, Local::now()))
    }
}

/// Renders the intake summary: one heading per field, blank values printed as `-`.
pub fn render_intake_summary(
    record: &PatientIntakeRecord,
    generated_at: DateTime<Local>,
) -> Vec<u8> {
    let sections: Vec<(&str, &str)> = record
        .fields()
        .into_iter()
        .map(|field| {
            let value = if field.value.trim().is_empty() {
                BLANK_VALUE
            } else {
                field.value
            };
            (field.label, value)
        })
        .collect();

    render_document(INTAKE_TITLE, &sections, generated_at)
}

/// Renders an enhanced report under the patient's report title.
pub fn render_report_document(
    record: &PatientIntakeRecord,
    report_text: &str,
    generated_at: DateTime<Local>,
) -> Vec<u8> {
    render_document(
        &report_title(record),
        &[(REPORT_HEADING, report_text)],
        generated_at,
    )
}

/// `Patient Report: {name} (DOB: {dob})`.
pub fn report_title(record: &PatientIntakeRecord) -> String {
    format!(
        "Patient Report: {} (DOB: {})",
        record.demographics.full_name, record.demographics.date_of_birth
    )
}

/// Lays out a title, a generation stamp and `(heading, body)` sections onto A4 pages.
///
/// Sections whose heading and body are both blank are skipped.
pub fn render_document(
    title: &str,
    sections: &[(&str, &str)],
    generated_at: DateTime<Local>,
) -> Vec<u8> {
    let mut layout = Layout::new();

    layout.ensure_space(2);
    let title = match title.trim() {
        "" => "Document",
        t => t,
    };
    layout.write_line(&take_chars(title, MAX_HEADING_CHARS), Font::Bold, 16);
    layout.gap(4.0);
    layout.write_line(
        &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        Font::Regular,
        8,
    );
    layout.gap(2.0);

    for (heading, body) in sections {
        let heading = heading.trim();
        let body = body.trim();
        if heading.is_empty() && body.is_empty() {
            continue;
        }

        let heading = if heading.is_empty() { "Section" } else { heading };
        layout.write_line(&take_chars(heading, MAX_HEADING_CHARS), Font::Bold, 12);
        for line in wrap_lines(body, WRAP_COLUMNS) {
            layout.write_line(&line, Font::Regular, 10);
        }
        layout.gap(4.0);
    }

    let streams: Vec<String> = layout
        .pages
        .into_iter()
        .filter(|page| !page.is_empty())
        .map(|page| page.join("\n"))
        .collect();

    build_pdf(&streams)
}

struct Layout {
    pages: Vec<Vec<String>>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_space(&mut self, lines: usize) {
        if self.y - LINE_HEIGHT * (lines.max(1) as f64) < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn write_line(&mut self, text: &str, font: Font, size: u8) {
        self.ensure_space(1);
        let safe = escape_text(&take_chars(text, MAX_LINE_CHARS));
        let command = format!(
            "BT /{font} {size} Tf 1 0 0 1 {MARGIN:.2} {:.2} Tm ({safe}) Tj ET",
            self.y
        );
        if let Some(page) = self.pages.last_mut() {
            page.push(command);
        }
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self, points: f64) {
        self.y -= points;
    }
}

fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Splits on line breaks and greedily wraps each line at `width` columns.
///
/// Words longer than `width` stay whole. Blank lines are kept.
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();

    for raw in text.replace('\r', "\n").split('\n') {
        let line = raw.trim_end();
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in line.split(' ') {
            let fits = current.is_empty()
                || current.chars().count() + 1 + word.chars().count() <= width;
            if fits {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        out.push(current);
    }

    out
}

/// Flattens line breaks, maps to Latin-1 and escapes the PDF string delimiters.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' | '\n' => out.push(' '),
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if u32::from(c) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Assembles the page streams into a complete PDF file.
fn build_pdf(page_streams: &[String]) -> Vec<u8> {
    let empty = [String::new()];
    let streams = if page_streams.is_empty() {
        &empty[..]
    } else {
        page_streams
    };
    let page_count = streams.len();
    let max_object = 4 + page_count * 2;

    let mut objects: Vec<Vec<u8>> = vec![Vec::new(); max_object + 1];
    let mut kids = Vec::with_capacity(page_count);

    for (i, stream) in streams.iter().enumerate() {
        let content_id = 5 + i * 2;
        let page_id = 6 + i * 2;
        kids.push(format!("{page_id} 0 R"));

        let bytes = latin1_bytes(stream);
        let mut content = format!("<< /Length {} >>\nstream\n", bytes.len()).into_bytes();
        content.extend_from_slice(&bytes);
        content.extend_from_slice(b"\nendstream");
        objects[content_id] = content;

        objects[page_id] = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> \
             /Contents {content_id} 0 R >>"
        )
        .into_bytes();
    }

    objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
    objects[2] = format!(
        "<< /Type /Pages /Count {page_count} /Kids [{}] >>",
        kids.join(" ")
    )
    .into_bytes();
    objects[3] = b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec();
    objects[4] = b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_vec();

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut offsets = vec![0usize; max_object + 1];

    for (id, body) in objects.iter().enumerate().skip(1) {
        offsets[id] = out.len();
        out.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        out.extend_from_slice(body);
        if !body.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.extend_from_slice(b"endobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", max_object + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets[1..] {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF",
            max_object + 1
        )
        .as_bytes(),
    );

    out
}

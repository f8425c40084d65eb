//! # Minimal PDF Emitter
//!
//! Writes a small, valid PDF 1.4 document: one Helvetica font, one
//! uncompressed content stream per page, an xref table with correct byte
//! offsets. Enough for text reports; layout beyond pagination is out of
//! scope.

use std::io::{self, Write};

// US Letter geometry, 1/72 inch units.
const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const MARGIN_X: u32 = 72;
const TOP_Y: u32 = 720;
const HEADING_SIZE: u32 = 16;
const BODY_SIZE: u32 = 11;
const LEADING: u32 = 14;
const HEADING_GAP: u32 = 30;

/// Write a paginated text document as a PDF.
///
/// `heading` appears once at the top of the first page; `lines` flow
/// across pages at `lines_per_page` body lines each. The whole document
/// is assembled in memory (offsets must be known before the xref table
/// can be written) and then streamed to `out`.
pub fn write_pdf(
    heading: &str,
    lines: &[String],
    lines_per_page: usize,
    out: &mut dyn Write,
) -> io::Result<()> {
    let lines_per_page = lines_per_page.max(1);
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&[] as &[String]]
    } else {
        lines.chunks(lines_per_page).collect()
    };
    let page_count = pages.len();

    // Object ids are deterministic: 1 catalog, 2 page tree, 3 font, then
    // a (page, content) pair per page.
    let page_obj = |i: usize| 4 + 2 * i;
    let content_obj = |i: usize| 5 + 2 * i;
    let object_count = 3 + 2 * page_count;

    let mut buf: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(object_count);
    buf.extend_from_slice(b"%PDF-1.4\n");

    // 1: catalog
    offsets.push(buf.len());
    buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    // 2: page tree
    offsets.push(buf.len());
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", page_obj(i))).collect();
    buf.extend_from_slice(
        format!(
            "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
            kids.join(" "),
            page_count
        )
        .as_bytes(),
    );

    // 3: font
    offsets.push(buf.len());
    buf.extend_from_slice(
        b"3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n",
    );

    for (i, page_lines) in pages.iter().enumerate() {
        // Page object
        offsets.push(buf.len());
        buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>\nendobj\n",
                page_obj(i),
                PAGE_WIDTH,
                PAGE_HEIGHT,
                content_obj(i)
            )
            .as_bytes(),
        );

        // Content stream
        let stream = page_stream(if i == 0 { Some(heading) } else { None }, page_lines);
        offsets.push(buf.len());
        buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
                content_obj(i),
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    // xref table + trailer
    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out.write_all(&buf)
}

/// Build the text-drawing stream for one page.
fn page_stream(heading: Option<&str>, lines: &[String]) -> String {
    let mut stream = String::new();
    stream.push_str("BT\n");
    match heading {
        Some(text) => {
            stream.push_str(&format!("/F1 {HEADING_SIZE} Tf\n{MARGIN_X} {TOP_Y} Td\n"));
            stream.push_str(&format!("({}) Tj\n", escape_text(text)));
            stream.push_str(&format!("/F1 {BODY_SIZE} Tf\n0 -{HEADING_GAP} Td\n"));
        }
        None => {
            stream.push_str(&format!("/F1 {BODY_SIZE} Tf\n{MARGIN_X} {TOP_Y} Td\n"));
        }
    }
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            stream.push_str(&format!("0 -{LEADING} Td\n"));
        }
        stream.push_str(&format!("({}) Tj\n", escape_text(line)));
    }
    stream.push_str("ET\n");
    stream
}

/// Escape a line for a PDF literal string.
///
/// Backslash and parentheses get escaped; bytes outside the printable
/// ASCII range are replaced, since the emitter only declares a Latin
/// text font.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            ' '..='~' => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

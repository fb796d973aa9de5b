//! Text handling for the standard Helvetica fonts.

/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f64 = 0.52;

/// Estimated rendered width of `text` in points.
pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVG_GLYPH_WIDTH
}

/// Clip `text` so it fits in `max_width` points, marking the cut with `...`.
pub fn fit_text(text: &str, size: f64, max_width: f64) -> String {
    let max_chars = (max_width / (size * AVG_GLYPH_WIDTH)).floor().max(0.0) as usize;
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Map a character to its WinAnsiEncoding byte, if it has one.
fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            _ => None,
        },
    }
}

/// Encode `text` as the body of a PDF literal string (without parentheses).
///
/// Output is pure ASCII: bytes above 0x7E are written as octal escapes so the
/// content stream stays valid regardless of the host string encoding.
pub fn pdf_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = if c.is_control() { ' ' } else { c };
        match win_ansi_byte(c) {
            Some(b'\\') => out.push_str("\\\\"),
            Some(b'(') => out.push_str("\\("),
            Some(b')') => out.push_str("\\)"),
            Some(b) if b < 0x80 => out.push(b as char),
            Some(b) => out.push_str(&format!("\\{b:03o}")),
            None => out.push('?'),
        }
    }
    out
}

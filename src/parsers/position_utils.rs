//! Conversions between editor positions and byte offsets
//!
//! Editor positions are `(line, character)` pairs with both parts zero-based
//! and `character` counted in chars. The syntax tree works in byte offsets.
//! Out-of-range positions clamp to the nearest valid location instead of
//! failing, since positions frequently arrive for text that changed underneath.

use ropey::Rope;
use rowan::{TextRange, TextSize};
use tower_lsp::lsp_types::{Position, Range};

/// Byte offset of `(line, character)` in `text`
pub fn byte_offset(text: &Rope, line: usize, character: usize) -> usize {
    if line >= text.len_lines() {
        return text.len_bytes();
    }
    let line_start = text.line_to_char(line);
    let line_len = line_content_chars(text, line);
    text.char_to_byte(line_start + character.min(line_len))
}

/// Byte offset of an LSP position
pub fn position_to_byte_offset(position: &Position, text: &Rope) -> usize {
    byte_offset(text, position.line as usize, position.character as usize)
}

/// LSP position of a byte offset
pub fn byte_offset_to_position(text: &Rope, offset: usize) -> Position {
    let offset = offset.min(text.len_bytes());
    let char_idx = text.byte_to_char(offset);
    let line = text.char_to_line(char_idx);
    let character = char_idx - text.line_to_char(line);
    Position::new(line as u32, character as u32)
}

/// LSP range of a syntax tree range
pub fn text_range_to_lsp(text: &Rope, range: TextRange) -> Range {
    Range::new(
        byte_offset_to_position(text, usize::from(range.start())),
        byte_offset_to_position(text, usize::from(range.end())),
    )
}

pub fn offset_to_text_size(offset: usize) -> TextSize {
    TextSize::from(offset as u32)
}

/// Number of chars on `line`, excluding the line terminator
pub fn line_content_chars(text: &Rope, line: usize) -> usize {
    if line >= text.len_lines() {
        return 0;
    }
    let slice = text.line(line);
    let mut len = slice.len_chars();
    while len > 0 {
        match slice.char(len - 1) {
            '\n' | '\r' => len -= 1,
            _ => break,
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_round_trip_with_multibyte_chars() {
        let text = Rope::from_str("class É {\n  x;\n}\n");
        let offset = byte_offset(&text, 0, 8);
        assert_eq!(&text.to_string()[offset..offset + 1], "{");
        assert_eq!(byte_offset_to_position(&text, offset), Position::new(0, 8));
    }

    #[test]
    fn test_character_past_line_end_clamps() {
        let text = Rope::from_str("ab\ncd\n");
        assert_eq!(byte_offset(&text, 0, 99), 2);
        assert_eq!(byte_offset(&text, 99, 0), text.len_bytes());
    }

    #[test]
    fn test_line_content_excludes_crlf() {
        let text = Rope::from_str("abc\r\ndef");
        assert_eq!(line_content_chars(&text, 0), 3);
        assert_eq!(line_content_chars(&text, 1), 3);
    }
}

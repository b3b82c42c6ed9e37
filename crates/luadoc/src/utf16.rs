/// Convert a UTF-16 column offset (as editors report it) to a byte
/// offset within the given line. Tree ranges are byte offsets, not
/// UTF-16 code units.
pub fn utf16_column_to_byte_offset(line: &str, utf16_col: u32) -> usize {
    let mut utf16_count = 0;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= utf16_col as usize {
            return byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line.len()
}

/// Inverse of `utf16_column_to_byte_offset`.
pub fn byte_offset_to_utf16_column(line: &str, byte_offset: usize) -> u32 {
    line.char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .map(|(_, ch)| ch.len_utf16() as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_columns_are_bytes() {
        assert_eq!(utf16_column_to_byte_offset("local x", 6), 6);
        assert_eq!(byte_offset_to_utf16_column("local x", 6), 6);
    }

    #[test]
    fn test_multibyte_columns() {
        // 'é' is 2 bytes / 1 unit, '😀' is 4 bytes / 2 units
        let line = "é😀x";
        assert_eq!(utf16_column_to_byte_offset(line, 1), 2);
        assert_eq!(utf16_column_to_byte_offset(line, 3), 6);
        assert_eq!(byte_offset_to_utf16_column(line, 6), 3);
    }

    #[test]
    fn test_column_past_end_clamps() {
        assert_eq!(utf16_column_to_byte_offset("ab", 10), 2);
    }
}

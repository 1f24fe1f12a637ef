//! Substitutes mathematical Unicode alphanumeric blocks that common fonts
//! can't render with their plain ASCII/Greek equivalents.
//!
//! Mirrors `subMissingGlyph` from the source engine's grapher: each block of
//! mathematical italic/bold/script letters is contiguous and maps onto the
//! ordinary alphabet (or the Greek block, for the mathematical Greek range)
//! by simple subtraction.

/// (range start, range end inclusive, target block base)
const RANGES: &[(u32, u32, u32)] = &[
    (0x1D434, 0x1D44D, 'A' as u32), // mathematical italic capital
    (0x1D44E, 0x1D467, 'a' as u32), // mathematical italic small
    (0x1D7BC, 0x1D7D4, 0x03B1),     // mathematical Greek
    (0x1D41A, 0x1D433, 'a' as u32), // mathematical bold small
    (0x1D49C, 0x1D4B5, 'A' as u32), // mathematical script capital
    (0x1D400, 0x1D419, 'A' as u32), // mathematical bold capital
];

/// Maps a single code point to its renderable substitute. Total and
/// idempotent: characters outside every range pass through unchanged, and a
/// substituted character never falls in a range itself.
pub fn map_glyph(c: char) -> char {
    let code = c as u32;
    for &(start, end, base) in RANGES {
        if code >= start && code <= end {
            return char::from_u32(base + (code - start)).unwrap_or(c);
        }
    }
    c
}

/// Applies [`map_glyph`] to every character of a string.
pub fn map_glyphs(s: &str) -> String {
    s.chars().map(map_glyph).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn maps_italic_capital() {
        assert_eq!(map_glyph('\u{1D434}'), 'A');
    }

    #[test]
    fn maps_greek() {
        assert_eq!(map_glyph('\u{1D7BC}'), '\u{03B1}');
    }

    #[test]
    fn identity_outside_ranges() {
        assert_eq!(map_glyph('x'), 'x');
        assert_eq!(map_glyph('+'), '+');
    }

    #[test]
    fn idempotent_on_output() {
        for c in ['A', 'a', '\u{03B1}', 'x', '7'] {
            assert_eq!(map_glyph(map_glyph(c)), map_glyph(c));
        }
    }

    #[test]
    fn maps_bold_capital_and_script_capital_distinctly() {
        assert_eq!(map_glyph('\u{1D400}'), 'A');
        assert_eq!(map_glyph('\u{1D49C}'), 'A');
    }
}

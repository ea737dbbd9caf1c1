use unicode_normalization::UnicodeNormalization;

/// Clean up one decoded text fragment.
///
/// Applies Unicode NFC normalization, ligature expansion, and replacement
/// character removal. Fragments never span lines, so no hyphenation or
/// line-break repair happens here.
pub fn cleanup_text(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    // Expand typographic ligatures (fi, fl, ffi, ffl).
    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }

    result.replace('\u{FFFD}', "")
}

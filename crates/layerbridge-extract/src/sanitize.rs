//! Filesystem-safe names for extracted assets.

use unicode_normalization::UnicodeNormalization;

/// Longest sanitized name, in characters.
const MAX_LEN: usize = 120;

/// Substitute for names that sanitize away to nothing.
const FALLBACK: &str = "SmartObject";

/// Characters that are unsafe in a path component on at least one major
/// filesystem.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Produces a filesystem-safe, ASCII-only identifier from an arbitrary layer
/// name.
///
/// Cyrillic letters are transliterated, accented forms are flattened via
/// NFKD, everything outside `[A-Za-z0-9_.-]` becomes `_`, and the result is
/// trimmed and capped at 120 characters. Never returns an empty string: a
/// name with no salvageable characters becomes `"SmartObject"`.
pub fn sanitize(raw: &str) -> String {
    let transliterated = transliterate(raw);

    let mut flattened = String::with_capacity(transliterated.len());
    for ch in transliterated.nfkd() {
        if FORBIDDEN.contains(&ch) || ch.is_control() {
            flattened.push('_');
        } else if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
            flattened.push(ch);
        } else {
            flattened.push('_');
        }
    }

    let trimmed = flattened.trim().trim_end_matches(['.', ' ']);
    let mut result: String = trimmed.chars().take(MAX_LEN).collect();
    if result.is_empty() {
        result = FALLBACK.to_string();
    }
    result
}

/// Maps one uppercase cyrillic letter to its Latin rendering. Soft and hard
/// signs map to the empty string.
fn translit_upper(ch: char) -> Option<&'static str> {
    Some(match ch {
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ё' => "E",
        'Ж' => "Zh",
        'З' => "Z",
        'И' => "I",
        'Й' => "Y",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "Kh",
        'Ц' => "Ts",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Shch",
        'Ы' => "Y",
        'Э' => "E",
        'Ю' => "Yu",
        'Я' => "Ya",
        'Ь' => "",
        'Ъ' => "",
        // Ukrainian letters
        'Є' => "Ye",
        'І' => "I",
        'Ї' => "Yi",
        'Ґ' => "G",
        _ => return None,
    })
}

/// Transliterates cyrillic letters, preserving case: uppercase sources keep
/// the table's titlecase rendering, lowercase sources are lowercased.
/// Characters outside the table pass through unchanged.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let upper = ch.to_uppercase().next().unwrap_or(ch);
        match translit_upper(upper) {
            Some(mapped) if ch.is_lowercase() => {
                for mapped_ch in mapped.chars() {
                    out.extend(mapped_ch.to_lowercase());
                }
            }
            Some(mapped) => out.push_str(mapped),
            None => out.push(ch),
        }
    }
    out
}

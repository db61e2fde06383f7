//! Numeric, character and string literal parsing: dispatches on a literal's
//! prefix to pick a radix, covering the bin/oct/dec/hex forms and C-style
//! escapes an assembler's literal grammar needs.

/// Parses a (already sign-stripped) numeric literal token — `0x1A`, `0o17`,
/// `0b101`, or plain decimal — into its unsigned value.
pub fn parse_unsigned(token: &str) -> Result<u64, String> {
    let lower = token.to_ascii_lowercase();
    if let Some(digits) = lower.strip_prefix("0x") {
        u64::from_str_radix(digits, 16).map_err(|e| e.to_string())
    } else if let Some(digits) = lower.strip_prefix("0o") {
        u64::from_str_radix(digits, 8).map_err(|e| e.to_string())
    } else if let Some(digits) = lower.strip_prefix("0b") {
        u64::from_str_radix(digits, 2).map_err(|e| e.to_string())
    } else if lower.len() > 1 && lower.starts_with('0') {
        // C-style octal: a leading zero followed by more digits, e.g.
        // `0755`. Bare `0` itself falls through to the decimal branch.
        u64::from_str_radix(&lower[1..], 8).map_err(|e| e.to_string())
    } else {
        lower.parse::<u64>().map_err(|e| e.to_string())
    }
}

/// Parses a full `expr` pair's text (optional leading sign plus a
/// `number`) into a signed 64-bit value, wide enough to range-check
/// against any instruction's immediate width before narrowing.
pub fn parse_signed(text: &str) -> Result<i64, String> {
    let trimmed = text.trim();
    let (neg, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let value = parse_unsigned(rest)? as i64;
    Ok(if neg { -value } else { value })
}

/// Decodes one C-style escape sequence body (the text between `\` and the
/// following character already consumed) to its byte value.
fn decode_escape(escaped: char) -> u8 {
    match escaped {
        'n' => b'\n',
        't' => b'\t',
        'r' => b'\r',
        '0' => 0,
        '\\' => b'\\',
        '\'' => b'\'',
        '"' => b'"',
        other => other as u8,
    }
}

/// Decodes a character literal's inner text (without the surrounding
/// quotes) to its single byte value.
pub fn decode_char_literal(inner: &str) -> u8 {
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => decode_escape(chars.next().unwrap_or('0')),
        Some(c) => c as u8,
        None => 0,
    }
}

/// Decodes a string literal's inner text (without the surrounding quotes)
/// to its byte sequence, resolving escapes.
pub fn decode_string_literal(inner: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            bytes.push(decode_escape(chars.next().unwrap_or('0')));
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_every_radix() {
        assert_eq!(parse_unsigned("0x1A").unwrap(), 26);
        assert_eq!(parse_unsigned("0o17").unwrap(), 15);
        assert_eq!(parse_unsigned("0b101").unwrap(), 5);
        assert_eq!(parse_unsigned("42").unwrap(), 42);
    }

    #[test]
    fn parses_c_style_bare_zero_octal() {
        assert_eq!(parse_unsigned("0755").unwrap(), 493);
        assert_eq!(parse_unsigned("0").unwrap(), 0);
    }

    #[test]
    fn parses_signed_with_explicit_sign() {
        assert_eq!(parse_signed("-1").unwrap(), -1);
        assert_eq!(parse_signed("-0x800").unwrap(), -2048);
        assert_eq!(parse_signed("+5").unwrap(), 5);
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode_char_literal("\\n"), b'\n');
        assert_eq!(decode_char_literal("a"), b'a');
        assert_eq!(decode_string_literal("ab\\n"), vec![b'a', b'b', b'\n']);
    }
}

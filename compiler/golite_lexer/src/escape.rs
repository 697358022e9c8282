//! Escape sequence decoding for interpreted string and rune literals.

/// Decode the body of an interpreted string literal (without quotes).
///
/// Returns the offending escape text on failure. Byte escapes (`\xNN`,
/// octal) above 0x7F decode to the code point of the same value.
pub fn unescape_string(s: &str) -> Result<String, String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        let decoded = match chars.next() {
            Some('a') => '\u{07}',
            Some('b') => '\u{08}',
            Some('f') => '\u{0C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\u{0B}',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('x') => hex_escape(&mut chars, 2).ok_or_else(|| "\\x".to_owned())?,
            Some('u') => hex_escape(&mut chars, 4).ok_or_else(|| "\\u".to_owned())?,
            Some('U') => hex_escape(&mut chars, 8).ok_or_else(|| "\\U".to_owned())?,
            Some(d @ '0'..='7') => octal_escape(d, &mut chars).ok_or_else(|| format!("\\{d}"))?,
            Some(other) => return Err(format!("\\{other}")),
            None => return Err("\\".to_owned()),
        };
        result.push(decoded);
    }

    Ok(result)
}

/// Decode the body of a rune literal (without quotes).
pub fn unescape_char(s: &str) -> Option<char> {
    let decoded = unescape_string(s).ok()?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn hex_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        let d = chars.next()?.to_digit(16)?;
        value = value * 16 + d;
    }
    char::from_u32(value)
}

fn octal_escape(first: char, chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<char> {
    let mut value = first.to_digit(8)?;
    for _ in 0..2 {
        let d = chars.next()?.to_digit(8)?;
        value = value * 8 + d;
    }
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape_string(r"a\tb\n").as_deref(), Ok("a\tb\n"));
        assert_eq!(unescape_string(r#"say \"hi\""#).as_deref(), Ok("say \"hi\""));
    }

    #[test]
    fn test_numeric_escapes() {
        assert_eq!(unescape_string(r"\x41é\101").as_deref(), Ok("AéA"));
    }

    #[test]
    fn test_bad_escape_reports_sequence() {
        assert_eq!(unescape_string(r"\q"), Err("\\q".to_owned()));
    }

    #[test]
    fn test_char_literal() {
        assert_eq!(unescape_char("a"), Some('a'));
        assert_eq!(unescape_char(r"\n"), Some('\n'));
        assert_eq!(unescape_char("ab"), None);
    }
}

use super::*;
use pretty_assertions::assert_eq;

fn kinds(source: &str, interner: &StringInterner) -> Vec<TokenKind> {
    match lex(source, interner) {
        Ok(tokens) => tokens.into_iter().map(|t| t.kind).collect(),
        Err(e) => panic!("lex failed: {e}"),
    }
}

#[test]
fn test_lex_short_var_decl() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    assert_eq!(
        kinds("x := 42", &interner),
        vec![
            TokenKind::Ident(x),
            TokenKind::Define,
            TokenKind::Int(42),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_semicolon_inserted_after_closing_brace_only_at_line_end() {
    let interner = StringInterner::new();
    let toks = kinds("if x {\n}\n", &interner);
    let x = interner.intern("x");
    assert_eq!(
        toks,
        vec![
            TokenKind::If,
            TokenKind::Ident(x),
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_no_semicolon_after_operator_at_line_end() {
    let interner = StringInterner::new();
    let toks = kinds("a +\n b", &interner);
    assert!(!toks[..3].contains(&TokenKind::Semicolon));
}

#[test]
fn test_comments_are_trivia() {
    let interner = StringInterner::new();
    let toks = kinds("return // done\n/* multi\nline */", &interner);
    assert_eq!(toks, vec![TokenKind::Return, TokenKind::Semicolon, TokenKind::Eof]);
}

#[test]
fn test_numeric_literals() {
    let interner = StringInterner::new();
    let toks = kinds("0x1F 0b101 017 1.5 .25 2e3 3i", &interner);
    assert_eq!(
        &toks[..7],
        &[
            TokenKind::Int(31),
            TokenKind::Int(5),
            TokenKind::Int(15),
            TokenKind::Float(1.5),
            TokenKind::Float(0.25),
            TokenKind::Float(2000.0),
            TokenKind::Imag(3.0),
        ]
    );
}

#[test]
fn test_string_and_rune_literals() {
    let interner = StringInterner::new();
    let toks = kinds(r#""a\nb" `raw\n` 'x'"#, &interner);
    assert_eq!(toks[0], TokenKind::Str(interner.intern("a\nb")));
    assert_eq!(toks[1], TokenKind::Str(interner.intern("raw\\n")));
    assert_eq!(toks[2], TokenKind::Char(i64::from(u32::from('x'))));
}

#[test]
fn test_keywords_are_recognised() {
    let interner = StringInterner::new();
    let toks = kinds("func go select fallthrough", &interner);
    assert_eq!(
        &toks[..4],
        &[
            TokenKind::Func,
            TokenKind::Go,
            TokenKind::Select,
            TokenKind::Fallthrough,
        ]
    );
}

#[test]
fn test_unterminated_string_is_an_error() {
    let interner = StringInterner::new();
    let err = lex("x := \"open", &interner);
    assert!(err.is_err());
}

#[test]
fn test_unexpected_character() {
    let interner = StringInterner::new();
    match lex("a $ b", &interner) {
        Err(LexError {
            kind: LexErrorKind::UnexpectedChar('$'),
            ..
        }) => {}
        other => panic!("expected unexpected-char error, got {other:?}"),
    }
}

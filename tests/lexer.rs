use chronc::{
    lexer::{Lexer, TokenKind},
    Severity,
};
use test_case::test_case;

mod common;

fn kinds(source: &str) -> Vec<TokenKind> {
    common::lex(source).0.into_iter().map(|t| t.kind).collect()
}

#[test_case("int a $", &[TokenKind::Type, TokenKind::Id, TokenKind::EofSign]; "declaration")]
#[test_case("(a==b)", &[TokenKind::OpenParen, TokenKind::Id, TokenKind::DoubleEquals, TokenKind::Id, TokenKind::CloseParen, TokenKind::EofSign]; "double equals")]
#[test_case("a=b", &[TokenKind::Id, TokenKind::Equals, TokenKind::Id, TokenKind::EofSign]; "single equals")]
#[test_case("12$", &[TokenKind::Digit, TokenKind::Digit, TokenKind::EofSign]; "digits are split")]
#[test_case("intx$", &[TokenKind::Id, TokenKind::Id, TokenKind::Id, TokenKind::Id, TokenKind::EofSign]; "identifiers are split")]
#[test_case("while true if false$", &[TokenKind::While, TokenKind::Boolean, TokenKind::If, TokenKind::Boolean, TokenKind::EofSign]; "reserved words")]
#[test_case("1+2-3$", &[TokenKind::Digit, TokenKind::Op, TokenKind::Digit, TokenKind::Op, TokenKind::Digit, TokenKind::EofSign]; "operators")]
#[test_case(r#"{ print("a b") } $"#, &[TokenKind::OpenBrace, TokenKind::Print, TokenKind::OpenParen, TokenKind::Quote, TokenKind::Char, TokenKind::Space, TokenKind::Char, TokenKind::Quote, TokenKind::CloseParen, TokenKind::CloseBrace, TokenKind::EofSign]; "string")]
#[test_case(r#""""$"#, &[TokenKind::Quote, TokenKind::Quote, TokenKind::EofSign]; "empty string")]
fn token_kinds(source: &str, expected: &[TokenKind]) {
    assert_eq!(kinds(source), expected);
}

#[test_case("int A", "invalid character: 'A'"; "upper case letter")]
#[test_case("a = 1 * 2", "invalid character: '*'"; "unknown operator")]
#[test_case(r#"a = "aaa+bbb""#, "invalid character in string: '+'"; "operator in string")]
#[test_case(r#"a = "Hi""#, "invalid character in string: 'H'"; "upper case in string")]
#[test_case(r#"a = "ab"#, "invalid character: '\"'"; "unterminated string")]
fn lex_error(source: &str, expected: &str) {
    let err = Lexer::new(source).lex(&mut vec![]).unwrap_err();

    assert_eq!(err.to_string(), expected);
}

#[test_case("invalid_char", "ERROR 1 invalid character: 'A'"; "upper case identifier")]
#[test_case("invalid_char_list", "ERROR 1 invalid character in string: '+'"; "operator in string literal")]
fn lex_error_stops_compilation(name: &str, expected: &str) {
    let result = common::compile(name);

    assert_eq!(common::messages(&result), vec![expected]);
    assert!(result.tokens.is_empty());
    assert!(result.cst.is_none());
}

#[test]
fn error_line() {
    let err = Lexer::new("{\n  int a\n  a = #\n}").lex(&mut vec![]).unwrap_err();

    assert_eq!(err.span.line, 3);
}

#[test]
fn token_lines() {
    let (tokens, _) = common::lex("{\nint a\n\na = 1\n} $");
    let lines = tokens.iter().map(|t| t.span.line).collect::<Vec<_>>();

    assert_eq!(lines, vec![1, 2, 2, 4, 4, 4, 5, 5]);
}

#[test]
fn missing_end_of_file() {
    let (tokens, diagnostics) = common::lex("{\n  int a\n}");
    let eof = tokens.last().unwrap();

    assert_eq!(eof.kind, TokenKind::EofSign);
    assert_eq!(eof.span.line, 3);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].message, "program does not end with $");
    assert_eq!(diagnostics[0].line, 3);
}

#[test_case("int a $ int b"; "same line")]
#[test_case("int a $\nint b"; "next line")]
fn code_after_end_of_file(source: &str) {
    let (tokens, diagnostics) = common::lex(source);

    assert_eq!(tokens.len(), 3);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "ignoring code after $");
    assert_eq!(diagnostics[0].line, 1);
}

#[test]
fn whitespace_after_end_of_file_is_ignored() {
    let (_, diagnostics) = common::lex("int a $  \n\n   \n");

    assert!(diagnostics.is_empty());
}

#[test]
fn end_of_file_inside_a_line_stops_lexing() {
    let (tokens, _) = common::lex("a = 1 $ A # *");

    assert_eq!(tokens.last().map(|t| t.value.as_str()), Some("$"));
}

#[test]
fn token_names() {
    let (tokens, _) = common::lex("0 = \"x\" $");
    let names = tokens.iter().map(|t| t.name()).collect::<Vec<_>>();

    assert_eq!(
        names,
        vec![
            "digit '0'",
            "equals '='",
            "quotation '\"'",
            "character 'x'",
            "quotation '\"'",
            "end of file '$'",
        ]
    );
}

#[test_case("everything_1")]
#[test_case("everything_2")]
#[test_case("nested_everything")]
#[test_case("nested_blocks")]
#[test_case("best_of_both_worlds")]
#[test_case("after_eof")]
fn round_trip(name: &str) {
    let source = common::source(name);
    let (tokens, _) = common::lex(&source);

    let expected = source
        .split('$')
        .next()
        .unwrap()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let actual = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::EofSign)
        .flat_map(|t| t.value.chars())
        .filter(|c| !c.is_whitespace())
        .collect::<String>();

    assert_eq!(actual, expected);
}

use std::fmt::Display;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::Serialize;
use tracing::debug;

use crate::error::{Diagnostic, IntoSpanned, SpannedError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub line: u32,
}

impl Span {
    pub fn new(line: u32) -> Self {
        Self { line }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line)
    }
}

pub const RESERVED_WORDS: [&str; 8] = [
    "while", "if", "string", "int", "boolean", "true", "false", "print",
];

pub const SPECIAL_CHARACTERS: [&str; 9] = ["$", "{", "}", "(", ")", "=", "+", "-", "=="];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    EofSign,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Equals,
    Op,
    Quote,
    DoubleEquals,

    Type,
    Print,
    While,
    If,

    Digit,
    Char,
    Boolean,
    Space,
    Id,

    /// Inserted by the parser for empty list tails, never produced by the lexer.
    Epsilon,
}

impl TokenKind {
    /// Human readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::EofSign => "end of file",
            TokenKind::OpenBrace => "opening brace",
            TokenKind::CloseBrace => "closing brace",
            TokenKind::OpenParen => "opening parenthesis",
            TokenKind::CloseParen => "closing parenthesis",
            TokenKind::Equals => "equals",
            TokenKind::Op => "operator",
            TokenKind::Quote => "quotation",
            TokenKind::DoubleEquals => "double-equals",
            TokenKind::Type => "type",
            TokenKind::Print => "print",
            TokenKind::While => "while",
            TokenKind::If => "if",
            TokenKind::Digit => "digit",
            TokenKind::Char => "character",
            TokenKind::Boolean => "boolean",
            TokenKind::Space => "space",
            TokenKind::Id => "identifier",
            TokenKind::Epsilon => "epsilon",
        }
    }

    /// Reverse of [`TokenKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "end of file" => TokenKind::EofSign,
            "opening brace" => TokenKind::OpenBrace,
            "closing brace" => TokenKind::CloseBrace,
            "opening parenthesis" => TokenKind::OpenParen,
            "closing parenthesis" => TokenKind::CloseParen,
            "equals" => TokenKind::Equals,
            "operator" => TokenKind::Op,
            "quotation" => TokenKind::Quote,
            "double-equals" => TokenKind::DoubleEquals,
            "type" => TokenKind::Type,
            "print" => TokenKind::Print,
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "digit" => TokenKind::Digit,
            "character" => TokenKind::Char,
            "boolean" => TokenKind::Boolean,
            "space" => TokenKind::Space,
            "identifier" => TokenKind::Id,
            "epsilon" => TokenKind::Epsilon,
            _ => return None,
        })
    }

    /// Looks up a reserved word or special character.
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        Some(match lexeme {
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "string" | "int" | "boolean" => TokenKind::Type,
            "true" | "false" => TokenKind::Boolean,
            "print" => TokenKind::Print,
            "$" => TokenKind::EofSign,
            "{" => TokenKind::OpenBrace,
            "}" => TokenKind::CloseBrace,
            "(" => TokenKind::OpenParen,
            ")" => TokenKind::CloseParen,
            "=" => TokenKind::Equals,
            "+" | "-" => TokenKind::Op,
            "==" => TokenKind::DoubleEquals,
            _ => return None,
        })
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn epsilon() -> Self {
        Self::new(TokenKind::Epsilon, "\u{03B5}", Span::default())
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Kind and lexeme, e.g. `digit '4'`.
    pub fn name(&self) -> String {
        format!("{} '{}'", self.kind, self.value)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("invalid character: '{0}'")]
    InvalidCharacter(String),
    #[error("invalid character in string: '{0}'")]
    InvalidStringCharacter(char),
}

pub type LexError = SpannedError<ErrorKind>;

/// One piece of a line, split the way whitespace-separated lexemes would be if the
/// language's multi-character tokens were known up front.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece<'a> {
    Word(&'a str),
    Number(&'a str),
    String(&'a str),
    Other(&'a str),
}

fn run_end(chars: &mut Peekable<CharIndices<'_>>, len: usize, pred: fn(char) -> bool) -> usize {
    while let Some(&(_, next)) = chars.peek() {
        if !pred(next) {
            break;
        }

        chars.next();
    }

    chars.peek().map(|&(i, _)| i).unwrap_or(len)
}

fn split_line(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = vec![];
    let mut chars = line.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            'a'..='z' => {
                let end = run_end(&mut chars, line.len(), |c| c.is_ascii_lowercase());
                pieces.push(Piece::Word(&line[start..end]));
            }
            '0'..='9' => {
                let end = run_end(&mut chars, line.len(), |c| c.is_ascii_digit());
                pieces.push(Piece::Number(&line[start..end]));
            }
            '"' => match line[start + 1..].find('"') {
                Some(offset) => {
                    let end = start + offset + 2;

                    while matches!(chars.peek(), Some(&(i, _)) if i < end) {
                        chars.next();
                    }

                    pieces.push(Piece::String(&line[start..end]));
                }
                None => pieces.push(Piece::Other(&line[start..start + 1])),
            },
            '=' if matches!(chars.peek(), Some(&(_, '='))) => {
                chars.next();
                pieces.push(Piece::Other(&line[start..start + 2]));
            }
            c => pieces.push(Piece::Other(&line[start..start + c.len_utf8()])),
        }
    }

    pieces
}

pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: vec![],
        }
    }

    fn push(&mut self, kind: TokenKind, value: &str, span: Span) {
        self.tokens.push(Token::new(kind, value, span));
    }

    fn string(&mut self, lexeme: &str, span: Span) -> Result<(), LexError> {
        self.push(TokenKind::Quote, "\"", span);

        for c in lexeme[1..lexeme.len() - 1].chars() {
            match c {
                'a'..='z' => self.push(TokenKind::Char, &c.to_string(), span),
                ' ' => self.push(TokenKind::Space, " ", span),
                c => return Err(ErrorKind::InvalidStringCharacter(c).at(span)),
            }
        }

        self.push(TokenKind::Quote, "\"", span);
        Ok(())
    }

    fn per_char(&mut self, lexeme: &str, kind: TokenKind, span: Span) {
        for c in lexeme.chars() {
            self.push(kind, &c.to_string(), span);
        }
    }

    /// Splits the source into tokens. Warnings are appended to `diagnostics`; the first
    /// invalid character aborts lexing.
    pub fn lex(mut self, diagnostics: &mut Vec<Diagnostic>) -> Result<Vec<Token>, LexError> {
        let source = self.source;
        let lines = source.split('\n').collect::<Vec<_>>();

        for (i, line) in lines.iter().enumerate() {
            let span = Span::new(i as u32 + 1);
            let pieces = split_line(line);

            for (n, piece) in pieces.iter().enumerate() {
                match *piece {
                    Piece::Other("$") => {
                        self.push(TokenKind::EofSign, "$", span);

                        let rest_of_line = pieces.len() > n + 1;
                        let rest_of_source = lines[i + 1..]
                            .iter()
                            .any(|line| !line.trim().is_empty());

                        if rest_of_line || rest_of_source {
                            diagnostics.push(Diagnostic::warning("ignoring code after $", span));
                        }

                        debug!(tokens = self.tokens.len(), "lexed up to end of file marker");
                        return Ok(self.tokens);
                    }
                    Piece::String(lexeme) => self.string(lexeme, span)?,
                    Piece::Number(lexeme) => self.per_char(lexeme, TokenKind::Digit, span),
                    Piece::Word(lexeme) => match TokenKind::from_lexeme(lexeme) {
                        Some(kind) => self.push(kind, lexeme, span),
                        None => self.per_char(lexeme, TokenKind::Id, span),
                    },
                    Piece::Other(lexeme) => match TokenKind::from_lexeme(lexeme) {
                        Some(kind) => self.push(kind, lexeme, span),
                        None => {
                            return Err(ErrorKind::InvalidCharacter(lexeme.to_string()).at(span))
                        }
                    },
                }
            }
        }

        let span = Span::new(lines.len() as u32);

        diagnostics.push(Diagnostic::warning("program does not end with $", span));
        self.push(TokenKind::EofSign, "$", span);

        debug!(tokens = self.tokens.len(), "lexed without end of file marker");
        Ok(self.tokens)
    }
}

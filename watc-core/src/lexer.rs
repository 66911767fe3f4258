//! Lexer for watc source text.
//!
//! Tokens are produced lazily through the [`Lexer`] iterator. The
//! stream always ends with a single [`TokenKind::Eof`] token; after an
//! error the iterator is exhausted.

use crate::error::CoreError;
use crate::span::Span;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    IntLiteral(i32),

    // Punctuation
    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }
    Colon,  // :
    Comma,  // ,
    Semi,   // ;
    Equal,  // =

    // Operators
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /

    // Assignment operators
    PlusEqual,  // +=
    MinusEqual, // -=
    StarEqual,  // *=
    SlashEqual, // /=

    // Keywords
    Fn,
    Export,
    Return,
    Let,
}

impl TokenKind {
    /// Human readable description used in parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Ident => "identifier",
            TokenKind::IntLiteral(_) => "integer literal",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Colon => "`:`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Equal => "`=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::PlusEqual => "`+=`",
            TokenKind::MinusEqual => "`-=`",
            TokenKind::StarEqual => "`*=`",
            TokenKind::SlashEqual => "`/=`",
            TokenKind::Fn => "`fn`",
            TokenKind::Export => "`export`",
            TokenKind::Return => "`return`",
            TokenKind::Let => "`let`",
        }
    }
}

/// A single token with its kind, span and source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub span: Span,
    pub text: &'src str,
}

impl Token<'_> {
    /// How the token is shown in parse errors.
    pub fn found(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("`{}`", self.text),
        }
    }
}

/// Start lexing `source`.
///
/// The lexer borrows `source`; calling this twice on the same text
/// yields identical token streams.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
        finished: false,
    }
}

pub struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    finished: bool,
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if matches!(result, Err(_) | Ok(Token { kind: TokenKind::Eof, .. })) {
            self.finished = true;
        }
        Some(result)
    }
}

impl<'src> Lexer<'src> {
    fn next_token(&mut self) -> Result<Token<'src>, CoreError> {
        self.skip_trivia()?;

        let start = self.index;
        let Some(ch) = self.peek_char() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semi,
            b'=' => TokenKind::Equal,
            b'+' => self.operator(TokenKind::Plus, TokenKind::PlusEqual),
            b'-' => self.operator(TokenKind::Minus, TokenKind::MinusEqual),
            b'*' => self.operator(TokenKind::Star, TokenKind::StarEqual),
            b'/' => self.operator(TokenKind::Slash, TokenKind::SlashEqual),
            b'0'..=b'9' => return self.lex_number(start),
            _ if is_ident_start(ch) => return Ok(self.lex_ident_or_keyword(start)),
            _ => return Err(self.unexpected_char(start)),
        };
        self.consume_char();
        Ok(self.token(kind, start))
    }

    /// Arithmetic operator, or its compound assignment form when
    /// followed by `=`. Leaves the last character for the caller.
    fn operator(&mut self, plain: TokenKind, compound: TokenKind) -> TokenKind {
        if self.peek_next() == Some(b'=') {
            self.consume_char();
            compound
        } else {
            plain
        }
    }

    fn skip_trivia(&mut self) -> Result<(), CoreError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                _ if is_whitespace(ch) => self.consume_char(),
                b'/' if self.peek_next() == Some(b'/') => {
                    while let Some(ch) = self.peek_char() {
                        if ch == b'\n' {
                            break;
                        }
                        self.consume_char();
                    }
                }
                b'/' if self.peek_next() == Some(b'*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), CoreError> {
        let start = self.index;
        // '/' '*'
        self.consume_char();
        self.consume_char();
        loop {
            match self.peek_char() {
                Some(b'*') if self.peek_next() == Some(b'/') => {
                    self.consume_char();
                    self.consume_char();
                    return Ok(());
                }
                Some(_) => self.consume_char(),
                None => return Err(CoreError::UnterminatedComment { position: start }),
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'src> {
        Token {
            kind,
            span: Span::new(start, self.index),
            text: &self.source[start..self.index],
        }
    }

    fn unexpected_char(&self, start: usize) -> CoreError {
        let character = self.source[start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        CoreError::Lex {
            character,
            position: start,
        }
    }

    fn lex_number(&mut self, start: usize) -> Result<Token<'src>, CoreError> {
        while let Some(b'0'..=b'9') = self.peek_char() {
            self.consume_char();
        }

        let text = &self.source[start..self.index];
        let value = text
            .parse::<i32>()
            .map_err(|_| CoreError::IntegerOutOfRange {
                literal: text.to_string(),
                position: start,
            })?;
        Ok(self.token(TokenKind::IntLiteral(value), start))
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Token<'src> {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let kind = match &self.source[start..self.index] {
            "fn" => TokenKind::Fn,
            "export" => TokenKind::Export,
            "return" => TokenKind::Return,
            "let" => TokenKind::Let,
            _ => TokenKind::Ident,
        };
        self.token(kind, start)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

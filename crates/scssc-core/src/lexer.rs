//! Lexer (tokenizer) for SCSS source text.
//!
//! One pass, cursor-advancing, not restartable. Every token carries the
//! verbatim source slice plus its byte span and 1-based line/column so the
//! parser can rebuild selector and value text with original spacing and
//! downstream stages can locate errors. Lexing aborts on the first
//! failure; there is no recovery.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{CompilerError, Result};

/// Token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, including hyphenated names (`color`, `-webkit-box`)
    Ident,
    /// `$name` variable reference or declaration head
    Variable,
    /// `@name` at-keyword (`@media`, `@mixin`, `@include`, ...)
    AtKeyword,
    /// Numeric literal with optional unit suffix (`10`, `1.5em`, `50%`)
    Number,
    /// Quoted string, quotes included in the text
    Str,
    /// Hex color (`#fff`, `#1a2b3c`)
    HexColor,
    /// `#{...}` interpolation block, delimiters included in the text
    Interpolation,
    /// `#` followed by a non-hex name (id selector head)
    Hash,
    /// `url(...)` call, lexed whole: unquoted bodies may contain `//`
    /// and other characters the tokenizer would otherwise split
    Url,
    /// `/* ... */` block comment, delimiters included
    Comment,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Dot,
    Gt,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Bang,
    Eof,
}

impl TokenKind {
    /// Human-readable name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::Variable => "variable",
            TokenKind::AtKeyword => "at-keyword",
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::HexColor => "hex color",
            TokenKind::Interpolation => "interpolation",
            TokenKind::Hash => "`#`",
            TokenKind::Url => "url",
            TokenKind::Comment => "comment",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Colon => "`:`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Gt => "`>`",
            TokenKind::Tilde => "`~`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Amp => "`&`",
            TokenKind::Bang => "`!`",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token with its verbatim text and source position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source slice this token was lexed from
    pub text: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Lexer state.
pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
    line: usize,
    column: usize,
    last_kind: Option<TokenKind>,
    last_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            pos: 0,
            line: 1,
            column: 1,
            last_kind: None,
            last_end: 0,
        }
    }

    /// Tokenize the whole input. The returned sequence always ends with a
    /// single `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            self.last_kind = Some(token.kind);
            self.last_end = token.end;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1).map(|(_, c)| c)
    }

    fn next_char(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.pos = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn token(&self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: self.src[start..self.pos].to_string(),
            start,
            end: self.pos,
            line,
            column,
        }
    }

    /// Skip whitespace and `//` line comments. Block comments are tokens,
    /// line comments are not.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.next_char();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let start = self.pos;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                start,
                end: start,
                line,
                column,
            });
        };

        let simple = |lexer: &mut Self, kind: TokenKind| -> Result<Token> {
            lexer.next_char();
            Ok(lexer.token(kind, start, line, column))
        };

        match c {
            '{' => simple(self, TokenKind::LBrace),
            '}' => simple(self, TokenKind::RBrace),
            '(' => simple(self, TokenKind::LParen),
            ')' => simple(self, TokenKind::RParen),
            ':' => simple(self, TokenKind::Colon),
            ';' => simple(self, TokenKind::Semicolon),
            ',' => simple(self, TokenKind::Comma),
            '>' => simple(self, TokenKind::Gt),
            '~' => simple(self, TokenKind::Tilde),
            '+' => simple(self, TokenKind::Plus),
            '*' => simple(self, TokenKind::Star),
            '&' => simple(self, TokenKind::Amp),
            '!' => simple(self, TokenKind::Bang),
            '.' => {
                if self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                    self.lex_number(start, line, column)
                } else {
                    simple(self, TokenKind::Dot)
                }
            }
            '/' => {
                if self.peek_second() == Some('*') {
                    self.lex_block_comment(start, line, column)
                } else {
                    simple(self, TokenKind::Slash)
                }
            }
            '-' => self.lex_minus(start, line, column),
            '$' => {
                self.next_char();
                if self.peek_char().is_some_and(is_ident_start) {
                    self.consume_ident_run();
                    Ok(self.token(TokenKind::Variable, start, line, column))
                } else {
                    Err(CompilerError::syntax(
                        "expected a variable name after `$`",
                        line,
                        column,
                    ))
                }
            }
            '@' => {
                self.next_char();
                if self.peek_char().is_some_and(is_ident_start) {
                    self.consume_ident_run();
                    Ok(self.token(TokenKind::AtKeyword, start, line, column))
                } else {
                    Err(CompilerError::syntax(
                        "expected an at-rule name after `@`",
                        line,
                        column,
                    ))
                }
            }
            '#' => self.lex_hash(start, line, column),
            '"' | '\'' => self.lex_string(c, start, line, column),
            c if c.is_ascii_digit() => self.lex_number(start, line, column),
            c if is_ident_start(c) => {
                self.consume_ident_run();
                if self.src[start..self.pos].eq_ignore_ascii_case("url")
                    && self.peek_char() == Some('(')
                {
                    return self.lex_url(start, line, column);
                }
                Ok(self.token(TokenKind::Ident, start, line, column))
            }
            c => Err(CompilerError::syntax(
                format!("unrecognized character `{}`", c),
                line,
                column,
            )),
        }
    }

    fn consume_ident_run(&mut self) {
        while self.peek_char().is_some_and(is_ident_char) {
            self.next_char();
        }
    }

    /// `-` starts a negative number only when a number could begin here:
    /// after an operator or opening punctuation, or when the `-` is
    /// separated from the previous token (`10px -2px` is a two-element
    /// list, `10px-2px` and `10px - 2px` are subtractions).
    fn lex_minus(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        let next = self.peek_second();
        if next.is_some_and(|c| c.is_ascii_digit() || c == '.') {
            let allow_negative = match self.last_kind {
                None => true,
                Some(k) => {
                    matches!(
                        k,
                        TokenKind::LParen
                            | TokenKind::LBrace
                            | TokenKind::Colon
                            | TokenKind::Semicolon
                            | TokenKind::Comma
                            | TokenKind::Plus
                            | TokenKind::Minus
                            | TokenKind::Star
                            | TokenKind::Slash
                            | TokenKind::Gt
                            | TokenKind::Tilde
                    ) || start > self.last_end
                }
            };
            if allow_negative {
                self.next_char();
                return self.lex_number(start, line, column);
            }
        }
        if next.is_some_and(|c| is_ident_start(c) || c == '-') {
            self.next_char();
            self.consume_ident_run();
            return Ok(self.token(TokenKind::Ident, start, line, column));
        }
        self.next_char();
        Ok(self.token(TokenKind::Minus, start, line, column))
    }

    fn lex_number(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.next_char();
        }
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.next_char();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.next_char();
            }
        }
        // Unit suffix: an alphabetic run (`px`, `rem`, `ms`) or `%`
        if self.peek_char() == Some('%') {
            self.next_char();
        } else {
            while self.peek_char().is_some_and(|c| c.is_alphabetic()) {
                self.next_char();
            }
        }
        Ok(self.token(TokenKind::Number, start, line, column))
    }

    fn lex_block_comment(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        self.next_char(); // `/`
        self.next_char(); // `*`
        loop {
            match self.next_char() {
                Some('*') if self.peek_char() == Some('/') => {
                    self.next_char();
                    return Ok(self.token(TokenKind::Comment, start, line, column));
                }
                Some(_) => {}
                None => {
                    return Err(CompilerError::syntax(
                        "unterminated block comment",
                        line,
                        column,
                    ));
                }
            }
        }
    }

    /// `#` heads three things: `#{...}` interpolation, a hex color, or an
    /// id selector. A run of 3/4/6/8 hex digits is taken as a color; the
    /// id-selector reading keeps the full `#name` text either way, so
    /// selector reconstruction is unaffected by the guess.
    fn lex_hash(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        self.next_char(); // `#`
        if self.peek_char() == Some('{') {
            self.next_char();
            let mut depth = 1usize;
            loop {
                match self.next_char() {
                    Some('{') => depth += 1,
                    Some('}') => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(self.token(TokenKind::Interpolation, start, line, column));
                        }
                    }
                    Some(_) => {}
                    None => {
                        return Err(CompilerError::syntax(
                            "unterminated interpolation block",
                            line,
                            column,
                        ));
                    }
                }
            }
        }
        if self.peek_char().is_some_and(is_ident_char) {
            self.consume_ident_run();
            let run = &self.src[start + 1..self.pos];
            let is_hex = run.chars().all(|c| c.is_ascii_hexdigit())
                && matches!(run.len(), 3 | 4 | 6 | 8);
            let kind = if is_hex {
                TokenKind::HexColor
            } else {
                TokenKind::Hash
            };
            Ok(self.token(kind, start, line, column))
        } else {
            Ok(self.token(TokenKind::Hash, start, line, column))
        }
    }

    /// `url(...)` runs to its closing `)` as one token. An unquoted body
    /// is free-form up to the first `)`; a quoted body may contain `)`.
    fn lex_url(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        self.next_char(); // `(`
        loop {
            match self.next_char() {
                Some(')') => return Ok(self.token(TokenKind::Url, start, line, column)),
                Some(quote @ ('"' | '\'')) => loop {
                    match self.next_char() {
                        Some('\\') => {
                            self.next_char();
                        }
                        Some(c) if c == quote => break,
                        Some(_) => {}
                        None => {
                            return Err(CompilerError::syntax(
                                "unterminated string in `url(`",
                                line,
                                column,
                            ));
                        }
                    }
                },
                Some(_) => {}
                None => {
                    return Err(CompilerError::syntax("unterminated `url(`", line, column));
                }
            }
        }
    }

    fn lex_string(&mut self, quote: char, start: usize, line: usize, column: usize) -> Result<Token> {
        self.next_char(); // opening quote
        loop {
            match self.next_char() {
                Some('\\') => {
                    self.next_char();
                }
                Some('\n') | None => {
                    return Err(CompilerError::syntax(
                        "unterminated string literal",
                        line,
                        column,
                    ));
                }
                Some(c) if c == quote => {
                    return Ok(self.token(TokenKind::Str, start, line, column));
                }
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_a_simple_rule() {
        assert_eq!(
            kinds(".btn { color: red; }"),
            vec![
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_variables_and_at_keywords() {
        let tokens = Lexer::new("$gap: 4px; @media screen").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Variable);
        assert_eq!(tokens[0].text, "$gap");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "4px");
        assert_eq!(tokens[4].kind, TokenKind::AtKeyword);
        assert_eq!(tokens[4].text, "@media");
    }

    #[test]
    fn hex_color_vs_id_selector() {
        let tokens = Lexer::new("#fff #main").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::HexColor);
        assert_eq!(tokens[0].text, "#fff");
        assert_eq!(tokens[1].kind, TokenKind::Hash);
        assert_eq!(tokens[1].text, "#main");
    }

    #[test]
    fn interpolation_block_is_one_token() {
        let tokens = Lexer::new("#{$name}").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Interpolation);
        assert_eq!(tokens[0].text, "#{$name}");
    }

    #[test]
    fn negative_numbers_follow_spacing_rules() {
        // `10px -2px` is a list; `10px - 2px` and `10px-2px` subtract
        assert_eq!(
            kinds("a: 10px -2px;")[2..5].to_vec(),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Semicolon]
        );
        assert_eq!(
            kinds("a: 10px - 2px;")[2..5].to_vec(),
            vec![TokenKind::Number, TokenKind::Minus, TokenKind::Number]
        );
        assert_eq!(
            kinds("a: 10px-2px;")[2..5].to_vec(),
            vec![TokenKind::Number, TokenKind::Minus, TokenKind::Number]
        );
    }

    #[test]
    fn block_comment_keeps_line_tracking() {
        let src = "a: 1;\n/* two\nlines */\nb: 2;";
        let tokens = Lexer::new(src).tokenize().unwrap();
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.line, 4);
        assert_eq!(b.column, 1);
    }

    #[test]
    fn url_calls_lex_as_a_single_token() {
        // `//` in an unquoted url body is not a line comment
        let tokens = Lexer::new("background: url(https://example.com/x.png);")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Url);
        assert_eq!(tokens[2].text, "url(https://example.com/x.png)");
        assert_eq!(tokens[3].kind, TokenKind::Semicolon);

        let tokens = Lexer::new("src: url(\"a).woff2\");").tokenize().unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Url);
        assert_eq!(tokens[2].text, "url(\"a).woff2\")");
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("// nothing to see\ncolor: red;"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_fails_with_location() {
        let err = Lexer::new("a: \"oops").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.line, Some(1));
        assert_eq!(err.column, Some(4));
    }

    #[test]
    fn unterminated_block_comment_fails() {
        let err = Lexer::new("/* forever").tokenize().unwrap_err();
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn unterminated_interpolation_fails() {
        let err = Lexer::new("#{nope").tokenize().unwrap_err();
        assert!(err.message.contains("interpolation"));
    }

    #[test]
    fn unrecognized_character_fails() {
        let err = Lexer::new("a[href]").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert!(err.message.contains('['));
    }
}

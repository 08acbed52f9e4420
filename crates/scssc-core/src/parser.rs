//! Recursive-descent parser over the token sequence.
//!
//! Grammar:
//!
//! ```text
//! stylesheet   := (atRule | variableDecl | ruleSet)*
//! atRule       := '@' name paramsUntil('{' | ';') ( ';' | '{' ruleBody* '}' )
//! variableDecl := '$' name ':' valueUntil(';') ';'
//! ruleSet      := selectorUntil('{') '{' (variableDecl | atRule | ruleSet | declaration)* '}'
//! declaration  := identifier ':' valueUntil(';') ';'
//! ```
//!
//! Selector parsing is a token-concatenation scanner, not a full CSS
//! selector grammar: attribute selectors and comma-containing
//! pseudo-functions are unsupported and rejected by the lexer/parser
//! rather than mis-compiled. On any token mismatch the parser aborts with
//! a `SyntaxError` naming expected vs. found; no partial tree is
//! returned.

use crate::ast::Node;
use crate::error::{CompilerError, ErrorKind, Result};
use crate::lexer::{Token, TokenKind};

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Build a parser over a lexed token sequence. The sequence must end
    /// with `Eof`, as produced by [`Lexer::tokenize`](crate::lexer::Lexer).
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the whole token sequence into a `StyleSheet` node.
    pub fn parse(mut self) -> Result<Node> {
        let children = self.parse_items(false)?;
        Ok(Node::StyleSheet { children })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token sequence always ends with Eof")
        })
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(CompilerError::syntax(
                format!("expected {}, found {}", kind.name(), found.kind.name()),
                found.line,
                found.column,
            ))
        }
    }

    /// Rebuild source text from a token run, inserting a space wherever
    /// the original source had one between adjacent tokens.
    fn join(tokens: &[Token]) -> String {
        let mut out = String::new();
        let mut last_end: Option<usize> = None;
        for t in tokens {
            if let Some(end) = last_end
                && t.start > end
            {
                out.push(' ');
            }
            out.push_str(&t.text);
            last_end = Some(t.end);
        }
        out
    }

    fn parse_items(&mut self, in_block: bool) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Eof => {
                    if in_block {
                        let t = self.peek();
                        return Err(CompilerError::syntax(
                            "unexpected end of input, expected `}`",
                            t.line,
                            t.column,
                        ));
                    }
                    break;
                }
                TokenKind::RBrace => {
                    if in_block {
                        break;
                    }
                    let t = self.peek();
                    return Err(CompilerError::syntax(
                        "unexpected `}` outside of a block",
                        t.line,
                        t.column,
                    ));
                }
                TokenKind::Comment => {
                    let t = self.advance();
                    items.push(Node::Comment { text: t.text });
                }
                TokenKind::Semicolon => {
                    // Stray semicolons are tolerated, as in CSS
                    self.advance();
                }
                TokenKind::AtKeyword => items.push(self.parse_at_rule()?),
                TokenKind::Variable => items.push(self.parse_variable_decl()?),
                TokenKind::Interpolation
                    if self.peek_kind_at(1) == TokenKind::Semicolon =>
                {
                    let t = self.advance();
                    self.advance();
                    items.push(Node::Interpolation {
                        expr: t.text,
                        line: t.line,
                        column: t.column,
                    });
                }
                _ => {
                    if in_block && self.looks_like_declaration() {
                        items.push(self.parse_declaration()?);
                    } else {
                        items.push(self.parse_rule_set()?);
                    }
                }
            }
        }
        Ok(items)
    }

    /// A statement is a declaration when a `;` (or the closing `}`)
    /// arrives before any `{`. `a:hover { ... }` therefore parses as a
    /// rule set even though it starts `ident colon`.
    fn looks_like_declaration(&self) -> bool {
        let mut offset = 0;
        loop {
            match self.peek_kind_at(offset) {
                TokenKind::LBrace => return false,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => return true,
                _ => offset += 1,
            }
        }
    }

    fn parse_rule_set(&mut self) -> Result<Node> {
        let first = self.peek().clone();
        let mut selector_tokens = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::LBrace => break,
                TokenKind::Eof => {
                    let t = self.peek();
                    return Err(CompilerError::syntax(
                        "unexpected end of input, expected `{`",
                        t.line,
                        t.column,
                    ));
                }
                TokenKind::Semicolon | TokenKind::RBrace => {
                    let t = self.peek();
                    return Err(CompilerError::syntax(
                        format!("expected `{{`, found {}", t.kind.name()),
                        t.line,
                        t.column,
                    ));
                }
                TokenKind::Comment => {
                    self.advance();
                }
                _ => selector_tokens.push(self.advance()),
            }
        }
        let selector = Self::join(&selector_tokens);
        if selector.is_empty() {
            return Err(CompilerError::new(
                ErrorKind::SelectorParsingError,
                "empty selector before `{`",
            )
            .at(first.line, first.column));
        }
        self.expect(TokenKind::LBrace)?;
        let children = self.parse_items(true)?;
        self.expect(TokenKind::RBrace)?;
        Ok(Node::RuleSet {
            selector,
            children,
            line: first.line,
            column: first.column,
        })
    }

    fn parse_declaration(&mut self) -> Result<Node> {
        // A property name is an identifier run, possibly with
        // interpolation spliced in (`margin-#{$side}`)
        let mut property_tokens = Vec::new();
        while matches!(
            self.peek().kind,
            TokenKind::Ident | TokenKind::Interpolation
        ) {
            property_tokens.push(self.advance());
        }
        let Some(first) = property_tokens.first().cloned() else {
            let t = self.peek();
            return Err(CompilerError::syntax(
                format!("expected a property name, found {}", t.kind.name()),
                t.line,
                t.column,
            ));
        };
        self.expect(TokenKind::Colon)?;
        let value = self.parse_value_text()?;
        // A `}` may terminate the final declaration of a block
        if self.peek().kind == TokenKind::Semicolon {
            self.advance();
        }
        Ok(Node::Declaration {
            property: Self::join(&property_tokens),
            value,
            line: first.line,
            column: first.column,
        })
    }

    fn parse_variable_decl(&mut self) -> Result<Node> {
        let var = self.expect(TokenKind::Variable)?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_value_text()?;
        if self.peek().kind == TokenKind::Semicolon {
            self.advance();
        }
        Ok(Node::Variable {
            name: var.text.trim_start_matches('$').to_string(),
            value,
            line: var.line,
            column: var.column,
        })
    }

    fn parse_value_text(&mut self) -> Result<String> {
        let mut tokens = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Semicolon | TokenKind::RBrace => break,
                TokenKind::Eof => {
                    let t = self.peek();
                    return Err(CompilerError::syntax(
                        "unexpected end of input, expected `;`",
                        t.line,
                        t.column,
                    ));
                }
                TokenKind::Comment => {
                    self.advance();
                }
                _ => tokens.push(self.advance()),
            }
        }
        let value = Self::join(&tokens);
        if value.is_empty() {
            let t = self.peek();
            return Err(CompilerError::syntax(
                "expected a value after `:`",
                t.line,
                t.column,
            ));
        }
        Ok(value)
    }

    fn parse_at_rule(&mut self) -> Result<Node> {
        let at = self.expect(TokenKind::AtKeyword)?;
        let name = at.text.trim_start_matches('@').to_string();
        let mut param_tokens = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::LBrace | TokenKind::Semicolon | TokenKind::RBrace => break,
                TokenKind::Eof => {
                    let t = self.peek();
                    return Err(CompilerError::syntax(
                        "unexpected end of input, expected `{` or `;`",
                        t.line,
                        t.column,
                    ));
                }
                TokenKind::Comment => {
                    self.advance();
                }
                _ => param_tokens.push(self.advance()),
            }
        }
        let params = Self::join(&param_tokens);
        let children = match self.peek().kind {
            TokenKind::LBrace => {
                self.advance();
                let body = self.parse_items(true)?;
                self.expect(TokenKind::RBrace)?;
                Some(body)
            }
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            // The enclosing `}` terminates a body-less at-rule
            _ => None,
        };
        Ok(Node::AtRule {
            name,
            params,
            children,
            line: at.line,
            column: at.column,
        })
    }
}

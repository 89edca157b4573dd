//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: the token cursor, error types, helper methods, and the
//! parse entry point.
//!
//! # Parser Architecture
//!
//! The parser reads a flat token slice through a monotonically advancing
//! cursor with unlimited forward peek. There is no rewind: constructs that
//! need lookahead classification (casts, declarations) use pure peek scans,
//! and balanced `{...}` regions are sliced off with [`Parser::read_scope`]
//! and handed to a fresh sub-parser that owns its own cursor.
//!
//! Parsing methods are split across sibling files using `impl Parser`
//! blocks:
//! - `declarations`: declarators, variable declarations, function definitions
//! - `statements`: statement dispatch and compound statement desugarings
//! - `expressions`: precedence climbing over the binding-power table

use crate::ir::{Module, Stmt};
use crate::parser::lexer::{Token, TokenKind};
use std::fmt;

/// Options controlling how C constructs are represented in the IR.
#[derive(Debug, Clone, Copy)]
pub struct Setting {
    /// Keep symbolic cast wrapper nodes instead of dropping them.
    pub preserve_cast: bool,
    /// Represent `&x` / `*x` as symbolic `ref(x)` / `deref(x)` calls instead
    /// of passing the operand through.
    pub ref_semantics: bool,
}

impl Default for Setting {
    fn default() -> Self {
        Setting {
            preserve_cast: true,
            ref_semantics: true,
        }
    }
}

/// Parser error type. Every variant is fatal: the pipeline run for the
/// offending input aborts with no partial tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The cursor advanced past the last token.
    OutOfBoundsRead { position: usize },

    /// Expected one token kind, found another.
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        line: usize,
        offset: usize,
    },

    /// A token has no registered prefix or infix handler.
    UnhandledConstruct {
        found: TokenKind,
        role: &'static str,
        line: usize,
        offset: usize,
    },

    /// A compound statement is structurally broken, e.g. `switch` without a
    /// following block.
    MalformedConstruct {
        construct: &'static str,
        message: String,
        line: usize,
        offset: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::OutOfBoundsRead { position } => {
                write!(f, "out of bounds read at token {}", position)
            }
            ParseError::UnexpectedToken {
                expected,
                found,
                line,
                offset,
            } => write!(
                f,
                "type mismatch at line {}, offset {}: expected {} but got {}",
                line, offset, expected, found
            ),
            ParseError::UnhandledConstruct {
                found,
                role,
                line,
                offset,
            } => write!(
                f,
                "unhandled {} token {} at line {}, offset {}",
                role, found, line, offset
            ),
            ParseError::MalformedConstruct {
                construct,
                message,
                line,
                offset,
            } => write!(
                f,
                "malformed {} at line {}, offset {}: {}",
                construct, line, offset, message
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent statement parser with precedence-climbing expression
/// parsing, over a borrowed token slice.
pub struct Parser<'a> {
    pub(crate) tokens: &'a [Token],
    pub(crate) position: usize,
    pub(crate) setting: Setting,
    /// Switch nesting depth, used to derive per-switch temporary names.
    pub(crate) switch_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], setting: Setting) -> Self {
        Parser {
            tokens,
            position: 0,
            setting,
            switch_depth: 0,
        }
    }

    /// Parse the whole token slice into a module.
    pub fn parse(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();

        while !self.at_end() {
            // Stray semicolons produce no statement.
            if self.peek_kind() == TokenKind::Semicolon {
                self.next()?;
                continue;
            }
            body.push(self.parse_stmt()?);
        }

        Ok(Module::new(body))
    }

    // ===== Cursor =====

    pub(crate) fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub(crate) fn next(&mut self) -> Result<&'a Token, ParseError> {
        match self.tokens.get(self.position) {
            Some(tok) => {
                self.position += 1;
                Ok(tok)
            }
            None => Err(ParseError::OutOfBoundsRead {
                position: self.position,
            }),
        }
    }

    /// Kind of the current token, or [`TokenKind::End`] past the end.
    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(0)
    }

    /// Kind of the token `n` ahead of the cursor.
    pub(crate) fn peek_kind_at(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.position + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::End)
    }

    /// Kind of the most recently consumed token.
    pub(crate) fn prev_kind(&self) -> Option<TokenKind> {
        if self.position == 0 {
            None
        } else {
            self.tokens.get(self.position - 1).map(|t| t.kind)
        }
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn next_if(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Consume the current token, requiring the given kind.
    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
    ) -> Result<&'a Token, ParseError> {
        if self.peek_kind() == kind {
            self.next()
        } else {
            Err(self.unexpected(kind))
        }
    }

    /// Consume an identifier token and return its name.
    pub(crate) fn expect_ident(&mut self) -> Result<String, ParseError> {
        let tok = self.expect(TokenKind::Ident)?;
        Ok(tok.value.as_str().unwrap_or_default().to_string())
    }

    pub(crate) fn unexpected(&self, expected: TokenKind) -> ParseError {
        let (line, offset) = self.here();
        ParseError::UnexpectedToken {
            expected,
            found: self.peek_kind(),
            line,
            offset,
        }
    }

    /// Position of the current token for error reporting, falling back to
    /// the last token when the cursor is past the end.
    pub(crate) fn here(&self) -> (usize, usize) {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.offset))
            .unwrap_or((0, 0))
    }

    // ===== Balanced sub-slices =====

    /// Consume a balanced `opening ... closing` region and return the tokens
    /// strictly between the delimiters. The closing token is consumed.
    pub(crate) fn read_inbetween(
        &mut self,
        opening: TokenKind,
        closing: TokenKind,
    ) -> Result<Vec<Token>, ParseError> {
        self.expect(opening)?;
        let mut depth = 1usize;
        let mut acc = Vec::new();

        loop {
            let kind = self.peek_kind();
            if kind == TokenKind::End {
                // Unbalanced region: the cursor ran past the last token.
                return Err(ParseError::OutOfBoundsRead {
                    position: self.position,
                });
            }
            if kind == opening {
                depth += 1;
            } else if kind == closing {
                depth -= 1;
                if depth == 0 {
                    self.next()?;
                    break;
                }
            }
            acc.push(self.next()?.clone());
        }

        Ok(acc)
    }

    /// Consume a `{ ... }` region and return the enclosed tokens.
    pub(crate) fn read_scope(&mut self) -> Result<Vec<Token>, ParseError> {
        self.read_inbetween(TokenKind::LBrace, TokenKind::RBrace)
    }

    /// Parse an independent token slice with a fresh sub-parser that shares
    /// this parser's settings and switch depth.
    pub(crate) fn parse_slice(
        &self,
        tokens: &[Token],
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut sub = Parser::new(tokens, self.setting);
        sub.switch_depth = self.switch_depth;
        Ok(sub.parse()?.body)
    }

    /// Parse a brace-delimited body. A bare `;` and an empty `{}` both yield
    /// a single no-op statement.
    pub(crate) fn parse_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.peek_kind() == TokenKind::Semicolon {
            self.next()?;
            return Ok(vec![Stmt::Pass]);
        }

        if self.peek_kind() != TokenKind::LBrace {
            return Err(self.unexpected(TokenKind::LBrace));
        }
        let body_tokens = self.read_scope()?;
        if body_tokens.is_empty() {
            return Ok(vec![Stmt::Pass]);
        }

        let body = self.parse_slice(&body_tokens)?;
        if body.is_empty() {
            return Ok(vec![Stmt::Pass]);
        }
        Ok(body)
    }

    /// Parse a braceless statement body (e.g. `if (c) x = 1;`): statements
    /// up to and including the first semicolon-terminated one.
    pub(crate) fn parse_block_stmt(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();

        while !self.at_end() {
            if self.peek_kind() == TokenKind::Semicolon
                || self.prev_kind() == Some(TokenKind::Semicolon)
            {
                break;
            }
            body.push(self.parse_stmt()?);
        }
        self.next_if(TokenKind::Semicolon);

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn parse(source: &str) -> Result<Module, ParseError> {
        let tokens = tokenize(source);
        Parser::new(&tokens, Setting::default()).parse()
    }

    #[test]
    fn test_unbalanced_braces_run_out_of_tokens() {
        let err = parse("void f() { int x = 1;").unwrap_err();
        assert!(matches!(err, ParseError::OutOfBoundsRead { .. }));
    }

    #[test]
    fn test_unexpected_token_reports_kinds() {
        let err = parse("return 1 2;").unwrap_err();
        match err {
            ParseError::UnexpectedToken {
                expected, found, ..
            } => {
                assert_eq!(expected, TokenKind::Semicolon);
                assert_eq!(found, TokenKind::IntConst);
            }
            other => panic!("expected UnexpectedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_unhandled_prefix_token() {
        let err = parse("x = ];").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnhandledConstruct { role: "prefix", .. }
        ));
    }

    #[test]
    fn test_stray_semicolons_produce_nothing() {
        let module = parse(";;;").unwrap();
        assert!(module.body.is_empty());
    }

    #[test]
    fn test_error_display_mentions_position() {
        let err = ParseError::UnexpectedToken {
            expected: TokenKind::Semicolon,
            found: TokenKind::IntConst,
            line: 3,
            offset: 17,
        };
        let text = err.to_string();
        assert!(text.contains("line 3"));
        assert!(text.contains("SEMI"));
        assert!(text.contains("INT_CONST"));
    }
}

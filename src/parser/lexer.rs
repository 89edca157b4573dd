//! Tokenizer for C-like source fragments
//!
//! Converts raw source text into the flat [`Token`] stream consumed by the
//! parser. Comments are stripped and preprocessor lines are skipped rather
//! than parsed.
//!
//! Tokenizing is best-effort: anomalies (unknown characters, unterminated
//! literals) are swallowed and the lexer produces whatever token list it can,
//! so [`tokenize`] is infallible. Decompiler output is frequently mangled and
//! a partial token list still parses further than no list at all.

use std::fmt;

/// Token kinds. Fieldless so the parser's binding-power table and dispatch
/// can match on plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    IntConst,
    FloatConst,
    StrConst,
    CharConst,

    Ident,

    // Type keywords
    Int,
    Char,
    Float,
    Double,
    Void,
    Long,
    Short,
    Signed,
    Unsigned,
    Const,
    Volatile,
    Struct,
    Union,
    Enum,

    // Control keywords
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Sizeof,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    ShlEq,
    ShrEq,
    AmpEq,
    CaretEq,
    PipeEq,

    // Increment/decrement
    PlusPlus,
    MinusMinus,

    // Member access
    Dot,
    Arrow,

    // Ternary
    Question,
    Colon,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,

    /// Cursor-past-end sentinel. Never produced by the lexer; returned by
    /// the parser's peek when no token remains.
    End,
}

impl TokenKind {
    /// Uppercase kind name, used to build declaration type text.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::IntConst => "INT_CONST",
            TokenKind::FloatConst => "FLOAT_CONST",
            TokenKind::StrConst => "STR_CONST",
            TokenKind::CharConst => "CHAR_CONST",
            TokenKind::Ident => "ID",
            TokenKind::Int => "INT",
            TokenKind::Char => "CHAR",
            TokenKind::Float => "FLOAT",
            TokenKind::Double => "DOUBLE",
            TokenKind::Void => "VOID",
            TokenKind::Long => "LONG",
            TokenKind::Short => "SHORT",
            TokenKind::Signed => "SIGNED",
            TokenKind::Unsigned => "UNSIGNED",
            TokenKind::Const => "CONST",
            TokenKind::Volatile => "VOLATILE",
            TokenKind::Struct => "STRUCT",
            TokenKind::Union => "UNION",
            TokenKind::Enum => "ENUM",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Do => "DO",
            TokenKind::For => "FOR",
            TokenKind::Switch => "SWITCH",
            TokenKind::Case => "CASE",
            TokenKind::Default => "DEFAULT",
            TokenKind::Break => "BREAK",
            TokenKind::Continue => "CONTINUE",
            TokenKind::Return => "RETURN",
            TokenKind::Goto => "GOTO",
            TokenKind::Sizeof => "SIZEOF",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Percent => "PERCENT",
            TokenKind::EqEq => "EQEQ",
            TokenKind::NotEq => "NOTEQ",
            TokenKind::Lt => "LT",
            TokenKind::Le => "LE",
            TokenKind::Gt => "GT",
            TokenKind::Ge => "GE",
            TokenKind::AndAnd => "ANDAND",
            TokenKind::OrOr => "OROR",
            TokenKind::Bang => "BANG",
            TokenKind::Amp => "AMP",
            TokenKind::Pipe => "PIPE",
            TokenKind::Caret => "CARET",
            TokenKind::Tilde => "TILDE",
            TokenKind::Shl => "SHL",
            TokenKind::Shr => "SHR",
            TokenKind::Eq => "EQ",
            TokenKind::PlusEq => "PLUSEQ",
            TokenKind::MinusEq => "MINUSEQ",
            TokenKind::StarEq => "STAREQ",
            TokenKind::SlashEq => "SLASHEQ",
            TokenKind::PercentEq => "PERCENTEQ",
            TokenKind::ShlEq => "SHLEQ",
            TokenKind::ShrEq => "SHREQ",
            TokenKind::AmpEq => "AMPEQ",
            TokenKind::CaretEq => "CARETEQ",
            TokenKind::PipeEq => "PIPEEQ",
            TokenKind::PlusPlus => "PLUSPLUS",
            TokenKind::MinusMinus => "MINUSMINUS",
            TokenKind::Dot => "DOT",
            TokenKind::Arrow => "ARROW",
            TokenKind::Question => "QUESTION",
            TokenKind::Colon => "COLON",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::Semicolon => "SEMI",
            TokenKind::Comma => "COMMA",
            TokenKind::End => "END",
        }
    }

    /// Keywords that can open a type: the declaration detector and the cast
    /// heuristic both key off this set.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Char
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Void
                | TokenKind::Long
                | TokenKind::Short
                | TokenKind::Signed
                | TokenKind::Unsigned
                | TokenKind::Const
                | TokenKind::Volatile
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Literal payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Int(i64),
    Float(f64),
    Str(String),
    None,
}

impl TokenValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One token: kind, literal payload, and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub line: usize,
    pub offset: usize,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        value: TokenValue,
        line: usize,
        offset: usize,
    ) -> Self {
        Token {
            kind,
            value,
            line,
            offset,
        }
    }
}

/// Tokenize a source fragment. Never fails: anomalies are swallowed and the
/// best-effort token list is returned.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    fn run(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                break;
            }

            // Preprocessor lines are skipped, not parsed.
            if self.peek() == Some('#') {
                self.skip_to_line_end();
                continue;
            }

            if let Some(tok) = self.next_token() {
                tokens.push(tok);
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        let line = self.line;
        let offset = self.position;
        let ch = self.advance()?;

        let bare = |kind| Some(Token::new(kind, TokenValue::None, line, offset));

        match ch {
            '"' => self.string_literal(line, offset),
            '\'' => self.char_literal(line, offset),
            '0'..='9' => self.number_literal(ch, line, offset),
            'a'..='z' | 'A'..='Z' | '_' => {
                self.identifier_or_keyword(ch, line, offset)
            }

            '+' => {
                if self.eat('+') {
                    bare(TokenKind::PlusPlus)
                } else if self.eat('=') {
                    bare(TokenKind::PlusEq)
                } else {
                    bare(TokenKind::Plus)
                }
            }
            '-' => {
                if self.eat('-') {
                    bare(TokenKind::MinusMinus)
                } else if self.eat('=') {
                    bare(TokenKind::MinusEq)
                } else if self.eat('>') {
                    bare(TokenKind::Arrow)
                } else {
                    bare(TokenKind::Minus)
                }
            }
            '*' => {
                if self.eat('=') {
                    bare(TokenKind::StarEq)
                } else {
                    bare(TokenKind::Star)
                }
            }
            '/' => {
                if self.eat('=') {
                    bare(TokenKind::SlashEq)
                } else {
                    bare(TokenKind::Slash)
                }
            }
            '%' => {
                if self.eat('=') {
                    bare(TokenKind::PercentEq)
                } else {
                    bare(TokenKind::Percent)
                }
            }
            '=' => {
                if self.eat('=') {
                    bare(TokenKind::EqEq)
                } else {
                    bare(TokenKind::Eq)
                }
            }
            '!' => {
                if self.eat('=') {
                    bare(TokenKind::NotEq)
                } else {
                    bare(TokenKind::Bang)
                }
            }
            '<' => {
                if self.eat('=') {
                    bare(TokenKind::Le)
                } else if self.eat('<') {
                    if self.eat('=') {
                        bare(TokenKind::ShlEq)
                    } else {
                        bare(TokenKind::Shl)
                    }
                } else {
                    bare(TokenKind::Lt)
                }
            }
            '>' => {
                if self.eat('=') {
                    bare(TokenKind::Ge)
                } else if self.eat('>') {
                    if self.eat('=') {
                        bare(TokenKind::ShrEq)
                    } else {
                        bare(TokenKind::Shr)
                    }
                } else {
                    bare(TokenKind::Gt)
                }
            }
            '&' => {
                if self.eat('&') {
                    bare(TokenKind::AndAnd)
                } else if self.eat('=') {
                    bare(TokenKind::AmpEq)
                } else {
                    bare(TokenKind::Amp)
                }
            }
            '|' => {
                if self.eat('|') {
                    bare(TokenKind::OrOr)
                } else if self.eat('=') {
                    bare(TokenKind::PipeEq)
                } else {
                    bare(TokenKind::Pipe)
                }
            }
            '^' => {
                if self.eat('=') {
                    bare(TokenKind::CaretEq)
                } else {
                    bare(TokenKind::Caret)
                }
            }
            '~' => bare(TokenKind::Tilde),
            '.' => bare(TokenKind::Dot),
            '?' => bare(TokenKind::Question),
            ':' => bare(TokenKind::Colon),
            '(' => bare(TokenKind::LParen),
            ')' => bare(TokenKind::RParen),
            '{' => bare(TokenKind::LBrace),
            '}' => bare(TokenKind::RBrace),
            '[' => bare(TokenKind::LBracket),
            ']' => bare(TokenKind::RBracket),
            ';' => bare(TokenKind::Semicolon),
            ',' => bare(TokenKind::Comma),

            // Anomaly: skip the character and keep going.
            _ => None,
        }
    }

    fn string_literal(&mut self, line: usize, offset: usize) -> Option<Token> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' {
                self.advance();
                break;
            }

            if ch == '\\' {
                self.advance();
                let escaped = match self.advance() {
                    Some(c) => c,
                    // Unterminated escape at end of input.
                    None => break,
                };
                string.push(unescape(escaped));
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Some(Token::new(
            TokenKind::StrConst,
            TokenValue::Str(string),
            line,
            offset,
        ))
    }

    fn char_literal(&mut self, line: usize, offset: usize) -> Option<Token> {
        let ch = self.advance()?;

        let value = if ch == '\\' {
            let escaped = self.advance()?;
            unescape(escaped)
        } else {
            ch
        };

        // Closing quote; tolerate its absence.
        if self.peek() == Some('\'') {
            self.advance();
        }

        Some(Token::new(
            TokenKind::CharConst,
            TokenValue::Int(value as i64),
            line,
            offset,
        ))
    }

    fn number_literal(
        &mut self,
        first: char,
        line: usize,
        offset: usize,
    ) -> Option<Token> {
        let mut text = String::new();
        text.push(first);

        let hex = first == '0' && matches!(self.peek(), Some('x') | Some('X'));
        if hex {
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_hexdigit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&text[1..], 16).unwrap_or(0);
            self.skip_int_suffix();
            return Some(Token::new(
                TokenKind::IntConst,
                TokenValue::Int(value),
                line,
                offset,
            ));
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Fractional part makes it a float.
        if self.peek() == Some('.')
            && self.peek_ahead(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            text.push('.');
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let value = text.parse::<f64>().unwrap_or(0.0);
            if matches!(self.peek(), Some('f') | Some('F')) {
                self.advance();
            }
            return Some(Token::new(
                TokenKind::FloatConst,
                TokenValue::Float(value),
                line,
                offset,
            ));
        }

        // Leading zero means octal in C.
        let value = if text.len() > 1 && text.starts_with('0') {
            i64::from_str_radix(&text[1..], 8)
                .or_else(|_| text.parse::<i64>())
                .unwrap_or(0)
        } else {
            text.parse::<i64>().unwrap_or(0)
        };
        self.skip_int_suffix();

        Some(Token::new(
            TokenKind::IntConst,
            TokenValue::Int(value),
            line,
            offset,
        ))
    }

    fn skip_int_suffix(&mut self) {
        while matches!(
            self.peek(),
            Some('u') | Some('U') | Some('l') | Some('L')
        ) {
            self.advance();
        }
    }

    fn identifier_or_keyword(
        &mut self,
        first: char,
        line: usize,
        offset: usize,
    ) -> Option<Token> {
        let mut ident = String::new();
        ident.push(first);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match ident.as_str() {
            "int" => TokenKind::Int,
            "char" => TokenKind::Char,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "void" => TokenKind::Void,
            "long" => TokenKind::Long,
            "short" => TokenKind::Short,
            "signed" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "const" => TokenKind::Const,
            "volatile" => TokenKind::Volatile,
            "struct" => TokenKind::Struct,
            "union" => TokenKind::Union,
            "enum" => TokenKind::Enum,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "goto" => TokenKind::Goto,
            "sizeof" => TokenKind::Sizeof,
            _ => TokenKind::Ident,
        };

        let value = if kind == TokenKind::Ident {
            TokenValue::Str(ident)
        } else {
            TokenValue::None
        };

        Some(Token::new(kind, value, line, offset))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_to_line_end();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // '/'
        self.advance(); // '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
        // Unterminated block comment swallows the rest of the input.
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

fn unescape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let tokens = tokenize("int main() { return 0; }");

        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntConst,
                TokenKind::Semicolon,
                TokenKind::RBrace,
            ]
        );
        assert_eq!(tokens[1].value.as_str(), Some("main"));
        assert_eq!(tokens[6].value, TokenValue::Int(0));
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("++ -- += -= == != && || << >> <<= |=");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::ShlEq,
                TokenKind::PipeEq,
            ]
        );
    }

    #[test]
    fn test_comments_and_preprocessor() {
        let tokens =
            tokenize("#include <stdio.h>\nint x; // c\nint y; /* b\nc */ int z;");
        let idents: Vec<&str> =
            tokens.iter().filter_map(|t| t.value.as_str()).collect();
        assert_eq!(idents, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = tokenize("42 0x1F 010 3.5 2.0f 7u");
        assert_eq!(tokens[0].value, TokenValue::Int(42));
        assert_eq!(tokens[1].value, TokenValue::Int(31));
        assert_eq!(tokens[2].value, TokenValue::Int(8));
        assert_eq!(tokens[3].value, TokenValue::Float(3.5));
        assert_eq!(tokens[4].value, TokenValue::Float(2.0));
        assert_eq!(tokens[5].value, TokenValue::Int(7));
    }

    #[test]
    fn test_char_literal() {
        let tokens = tokenize(r"'A' '\n'");
        assert_eq!(tokens[0].value, TokenValue::Int(65));
        assert_eq!(tokens[1].value, TokenValue::Int(10));
    }

    #[test]
    fn test_anomalies_are_swallowed() {
        // Unknown characters and an unterminated string produce a partial
        // token list instead of an error.
        let tokens = tokenize("x @ y \"abc");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].value.as_str(), Some("x"));
        assert_eq!(tokens[1].value.as_str(), Some("y"));
        assert_eq!(tokens[2].kind, TokenKind::StrConst);
        assert_eq!(tokens[2].value.as_str(), Some("abc"));
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("a\nb\n  c");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 3);
    }
}

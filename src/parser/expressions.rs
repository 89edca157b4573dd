//! Expression parsing: precedence climbing over a binding-power table
//!
//! Every operator token kind maps to `(left_bp, right_bp, OpClass)`. Parsing
//! starts with a prefix handler for the current token, then repeatedly
//! consumes an infix handler while the next operator's left binding power
//! exceeds the caller's minimum. Right-associative operators (assignment,
//! ternary) carry a right binding power one below their left binding power;
//! left-associative operators use the symmetric gap, producing standard
//! left-to-right chaining. Calls, subscripts and member access are infix
//! operators at the highest tier.
//!
//! Pointer and increment operators have no direct dialect equivalent and are
//! represented symbolically as `ref`/`deref`/`inc`/`dec`/`postfix_inc`/
//! `postfix_dec`/`sizeof` calls.
//!
//! # Cast heuristic
//!
//! `(...)` in prefix position is classified by a forward scan: the content is
//! a type iff a type keyword or `*` appears before the matching `)` (tracking
//! nested paren depth), and the token after the `)` is one that can start an
//! operand. This is deliberately a heuristic, not a grammar: there is no
//! symbol table of typedef names at parse time, so `(x)(y)` is a call,
//! `(int)x` is a cast, and `if (a * b) {` stays a condition.

use crate::ir::{BinOp, CmpOp, Expr, LogicOp, UnOp};
use crate::parser::lexer::{TokenKind, TokenValue};
use crate::parser::parse::{ParseError, Parser};

/// Operator class dispatched by the infix loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    PostfixCall,
    PostfixIndex,
    PostfixMember,
    PostfixInc,
    PostfixDec,
    Comma,
    BinaryLeft,
    Ternary,
    TernaryColon,
    Assign,
    None,
}

/// `(left_bp, right_bp, class)` for an operator token kind.
pub fn op_info(kind: TokenKind) -> (i32, i32, OpClass) {
    use TokenKind::*;
    match kind {
        LParen => (160, 159, OpClass::PostfixCall),
        LBracket => (160, 159, OpClass::PostfixIndex),
        Dot | Arrow => (160, 160, OpClass::PostfixMember),
        PlusPlus => (160, 0, OpClass::PostfixInc),
        MinusMinus => (160, 0, OpClass::PostfixDec),
        Comma => (130, 0, OpClass::Comma),
        Star | Slash | Percent => (120, 120, OpClass::BinaryLeft),
        Plus | Minus => (110, 110, OpClass::BinaryLeft),
        Shl | Shr => (100, 100, OpClass::BinaryLeft),
        Lt | Le | Gt | Ge => (90, 90, OpClass::BinaryLeft),
        EqEq | NotEq => (80, 80, OpClass::BinaryLeft),
        Amp => (70, 70, OpClass::BinaryLeft),
        Caret => (60, 60, OpClass::BinaryLeft),
        Pipe => (50, 50, OpClass::BinaryLeft),
        AndAnd => (40, 40, OpClass::BinaryLeft),
        OrOr => (30, 30, OpClass::BinaryLeft),
        Question => (20, 19, OpClass::Ternary),
        Colon => (19, 0, OpClass::TernaryColon),
        Eq | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | ShlEq
        | ShrEq | AmpEq | CaretEq | PipeEq => (10, 9, OpClass::Assign),
        _ => (-1, -1, OpClass::None),
    }
}

/// Binding power of unary prefix operators.
const UNARY_BP: i32 = 130;

/// Per-call expression context flags.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ExprCtx {
    /// Treat top-level commas as the comma operator instead of stopping.
    pub eat_comma: bool,
}

impl<'a> Parser<'a> {
    /// Precedence-climbing expression parser.
    pub(crate) fn parse_expr(
        &mut self,
        min_bp: i32,
        ctx: ExprCtx,
    ) -> Result<Expr, ParseError> {
        let tok = self.next()?;
        let left = self.parse_prefix(tok.kind, &tok.value, ctx)?;
        self.parse_expr_continue(left, min_bp, ctx)
    }

    /// The infix half of [`Parser::parse_expr`], continuing from an
    /// already-parsed left operand.
    pub(crate) fn parse_expr_continue(
        &mut self,
        mut left: Expr,
        min_bp: i32,
        ctx: ExprCtx,
    ) -> Result<Expr, ParseError> {
        while !self.at_end() {
            let look = self.peek_kind();
            let (lbp, rbp, class) = op_info(look);

            if class == OpClass::Comma && !ctx.eat_comma {
                break;
            }
            if class == OpClass::TernaryColon {
                break;
            }
            if lbp <= min_bp || class == OpClass::None {
                break;
            }

            self.next()?;
            left = self.parse_infix(look, left, rbp, ctx)?;
        }

        Ok(left)
    }

    /// Prefix handler for the already-consumed token.
    fn parse_prefix(
        &mut self,
        kind: TokenKind,
        value: &TokenValue,
        ctx: ExprCtx,
    ) -> Result<Expr, ParseError> {
        match kind {
            TokenKind::LParen => self.parse_paren_prefix(ctx),

            TokenKind::Ident => {
                Ok(Expr::Ident(value.as_str().unwrap_or_default().to_string()))
            }
            TokenKind::IntConst | TokenKind::CharConst => match value {
                TokenValue::Int(n) => Ok(Expr::Int(*n)),
                _ => Ok(Expr::Int(0)),
            },
            TokenKind::FloatConst => match value {
                TokenValue::Float(x) => Ok(Expr::Float(*x)),
                _ => Ok(Expr::Float(0.0)),
            },
            TokenKind::StrConst => {
                Ok(Expr::Str(value.as_str().unwrap_or_default().to_string()))
            }

            // GNU-style brace expression: `{ expr; }`
            TokenKind::LBrace => {
                let inner = self.parse_expr(0, ctx)?;
                self.expect(TokenKind::Semicolon)?;
                self.expect(TokenKind::RBrace)?;
                Ok(inner)
            }

            // Designated initializer element: `.field = expr`
            TokenKind::Dot => {
                let name = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr(0, ctx)?;
                Ok(Expr::Call {
                    func: Box::new(Expr::ident("init")),
                    args: vec![Expr::Ident(name), value],
                })
            }

            TokenKind::Minus => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                })
            }
            // Unary plus: the operand passes through.
            TokenKind::Plus => self.parse_expr(UNARY_BP, ctx),
            TokenKind::Bang => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Tilde => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(Expr::Unary {
                    op: UnOp::BitNot,
                    operand: Box::new(operand),
                })
            }

            // Pointer operators are symbolic, gated by the ref setting.
            TokenKind::Star => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(self.ref_call("deref", operand))
            }
            TokenKind::Amp => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(self.ref_call("ref", operand))
            }

            TokenKind::PlusPlus => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(symbolic_call("inc", operand))
            }
            TokenKind::MinusMinus => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(symbolic_call("dec", operand))
            }
            TokenKind::Sizeof => {
                let operand = self.parse_expr(UNARY_BP, ctx)?;
                Ok(symbolic_call("sizeof", operand))
            }

            other => {
                let (line, offset) = self.here();
                Err(ParseError::UnhandledConstruct {
                    found: other,
                    role: "prefix",
                    line,
                    offset,
                })
            }
        }
    }

    /// `(` in prefix position: cast, comma tuple, or plain grouping.
    fn parse_paren_prefix(&mut self, ctx: ExprCtx) -> Result<Expr, ParseError> {
        if self.cast_ahead() {
            // Discard the type tokens; the cast wrapper is symbolic and
            // tracks no target type.
            self.skip_to_matching_rparen()?;
            let inner = self.parse_expr(UNARY_BP, ctx)?;
            if self.setting.preserve_cast {
                return Ok(Expr::Cast(Box::new(inner)));
            }
            return Ok(inner);
        }

        if self.tuple_ahead() {
            // Comma expression: the value is the last element.
            let mut items = Vec::new();
            loop {
                items.push(self.parse_expr(0, ExprCtx::default())?);
                if self.peek_kind() == TokenKind::RParen {
                    self.next()?;
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
            return Ok(Expr::Subscript {
                value: Box::new(Expr::List(items)),
                index: Box::new(Expr::Int(-1)),
            });
        }

        let inner = self.parse_expr(0, ctx)?;
        self.expect(TokenKind::RParen)?;
        Ok(inner)
    }

    /// Infix handler for the already-consumed operator token.
    fn parse_infix(
        &mut self,
        kind: TokenKind,
        left: Expr,
        rbp: i32,
        ctx: ExprCtx,
    ) -> Result<Expr, ParseError> {
        use TokenKind::*;

        match kind {
            LParen => {
                let mut args = Vec::new();
                if self.peek_kind() != RParen {
                    loop {
                        args.push(self.parse_expr(0, ExprCtx::default())?);
                        if self.peek_kind() == Comma {
                            self.next()?;
                            continue;
                        }
                        break;
                    }
                }
                self.expect(RParen)?;
                return Ok(Expr::Call {
                    func: Box::new(left),
                    args,
                });
            }
            LBracket => {
                let index = self.parse_expr(0, ExprCtx::default())?;
                self.expect(RBracket)?;
                return Ok(Expr::Subscript {
                    value: Box::new(left),
                    index: Box::new(index),
                });
            }
            PlusPlus => return Ok(symbolic_call("postfix_inc", left)),
            MinusMinus => return Ok(symbolic_call("postfix_dec", left)),
            _ => {}
        }

        let (_, _, class) = op_info(kind);

        match class {
            OpClass::BinaryLeft => {
                let right = self.parse_expr(rbp, ctx)?;

                if let Some(op) = logic_op(kind) {
                    return Ok(Expr::Logic {
                        op,
                        values: vec![left, right],
                    });
                }
                if let Some(op) = cmp_op(kind) {
                    return Ok(Expr::Compare {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    });
                }
                let op = bin_op(kind).expect("binary_left kind has a BinOp");
                Ok(Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }

            OpClass::Assign => {
                let right = self.parse_expr(rbp, ctx)?;
                if kind == Eq {
                    return Ok(Expr::Assign {
                        target: Box::new(left),
                        value: Box::new(right),
                    });
                }
                // Compound assignment desugars to `t = t op rhs`.
                let op = augmented_op(kind)
                    .expect("assign-class kind has an augmented op");
                Ok(Expr::Assign {
                    target: Box::new(left.clone()),
                    value: Box::new(Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                })
            }

            OpClass::Ternary => {
                let body = self.parse_expr(0, ctx)?;
                self.expect(Colon)?;
                let orelse = self.parse_expr(rbp, ctx)?;
                Ok(Expr::Ternary {
                    test: Box::new(left),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                })
            }

            OpClass::Comma => {
                let right = self.parse_expr(rbp, ctx)?;
                Ok(comma_chain(left, right))
            }

            OpClass::PostfixMember => {
                let right = self.parse_expr(rbp, ctx)?;
                let attr = match right {
                    Expr::Ident(name) => name,
                    _ => {
                        let (line, offset) = self.here();
                        return Err(ParseError::MalformedConstruct {
                            construct: "member access",
                            message: "field name must be an identifier"
                                .to_string(),
                            line,
                            offset,
                        });
                    }
                };
                Ok(Expr::Attribute {
                    value: Box::new(left),
                    attr,
                })
            }

            _ => {
                let (line, offset) = self.here();
                Err(ParseError::UnhandledConstruct {
                    found: kind,
                    role: "infix",
                    line,
                    offset,
                })
            }
        }
    }

    fn ref_call(&self, name: &str, operand: Expr) -> Expr {
        if self.setting.ref_semantics {
            symbolic_call(name, operand)
        } else {
            operand
        }
    }

    /// Forward scan from the cursor (just past an opening `(`): the content
    /// is a type iff a type keyword or `*` appears before the matching `)`
    /// and the token after the `)` can begin a cast operand. Binary and
    /// assignment operators after the `)` rule a cast out, which keeps
    /// `(a * b) == c` a grouping.
    pub(crate) fn cast_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut saw_type = false;
        let mut i = self.position;

        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Star => saw_type = true,
                k if k.is_type_keyword() => saw_type = true,
                _ => {}
            }
            i += 1;
        }

        if !saw_type || i == self.position {
            return false;
        }

        let after = self
            .tokens
            .get(i + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::End);
        !matches!(
            after,
            TokenKind::LBrace
                | TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
                | TokenKind::AmpEq
                | TokenKind::CaretEq
                | TokenKind::PipeEq
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Shl
                | TokenKind::Shr
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::EqEq
                | TokenKind::NotEq
        )
    }

    /// Forward scan: a depth-0 comma before the matching `)` marks a comma
    /// expression.
    fn tuple_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.position;

        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Comma if depth == 0 => return true,
                _ => {}
            }
            i += 1;
        }

        false
    }

    /// Consume everything up to and including the `)` matching an already
    /// consumed `(`.
    fn skip_to_matching_rparen(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }
}

fn symbolic_call(name: &str, operand: Expr) -> Expr {
    Expr::Call {
        func: Box::new(Expr::ident(name)),
        args: vec![operand],
    }
}

/// Flatten nested comma chains into one `(a, b, c)[-1]` list subscript.
fn comma_chain(left: Expr, right: Expr) -> Expr {
    let mut items = comma_items(left);
    items.extend(comma_items(right));
    Expr::Subscript {
        value: Box::new(Expr::List(items)),
        index: Box::new(Expr::Int(-1)),
    }
}

fn comma_items(expr: Expr) -> Vec<Expr> {
    if let Expr::Subscript { value, index } = &expr {
        if matches!(index.as_ref(), Expr::Int(-1)) {
            if let Expr::List(items) = value.as_ref() {
                return items.clone();
            }
        }
    }
    vec![expr]
}

fn bin_op(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Percent => Some(BinOp::Mod),
        TokenKind::Shl => Some(BinOp::Shl),
        TokenKind::Shr => Some(BinOp::Shr),
        TokenKind::Amp => Some(BinOp::BitAnd),
        TokenKind::Pipe => Some(BinOp::BitOr),
        TokenKind::Caret => Some(BinOp::BitXor),
        _ => None,
    }
}

fn cmp_op(kind: TokenKind) -> Option<CmpOp> {
    match kind {
        TokenKind::EqEq => Some(CmpOp::Eq),
        TokenKind::NotEq => Some(CmpOp::Ne),
        TokenKind::Lt => Some(CmpOp::Lt),
        TokenKind::Le => Some(CmpOp::Le),
        TokenKind::Gt => Some(CmpOp::Gt),
        TokenKind::Ge => Some(CmpOp::Ge),
        _ => None,
    }
}

fn logic_op(kind: TokenKind) -> Option<LogicOp> {
    match kind {
        TokenKind::AndAnd => Some(LogicOp::And),
        TokenKind::OrOr => Some(LogicOp::Or),
        _ => None,
    }
}

fn augmented_op(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::PlusEq => Some(BinOp::Add),
        TokenKind::MinusEq => Some(BinOp::Sub),
        TokenKind::StarEq => Some(BinOp::Mul),
        TokenKind::SlashEq => Some(BinOp::Div),
        TokenKind::PercentEq => Some(BinOp::Mod),
        TokenKind::ShlEq => Some(BinOp::Shl),
        TokenKind::ShrEq => Some(BinOp::Shr),
        TokenKind::AmpEq => Some(BinOp::BitAnd),
        TokenKind::CaretEq => Some(BinOp::BitXor),
        TokenKind::PipeEq => Some(BinOp::BitOr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::parser::parse::Setting;

    fn expr(source: &str) -> Expr {
        expr_with(source, Setting::default())
    }

    fn expr_with(source: &str, setting: Setting) -> Expr {
        let tokens = tokenize(source);
        let mut parser = Parser::new(&tokens, setting);
        parser.parse_expr(0, ExprCtx::default()).unwrap()
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let e = expr("a + b * c");
        match e {
            Expr::Binary { op, left, right } => {
                assert_eq!(op, BinOp::Add);
                assert_eq!(*left, Expr::ident("a"));
                assert!(matches!(
                    *right,
                    Expr::Binary { op: BinOp::Mul, .. }
                ));
            }
            other => panic!("expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_chaining() {
        // (a - b) - c
        let e = expr("a - b - c");
        match e {
            Expr::Binary { op, left, right } => {
                assert_eq!(op, BinOp::Sub);
                assert!(matches!(*left, Expr::Binary { op: BinOp::Sub, .. }));
                assert_eq!(*right, Expr::ident("c"));
            }
            other => panic!("expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let e = expr("a = b = c");
        match e {
            Expr::Assign { target, value } => {
                assert_eq!(*target, Expr::ident("a"));
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let e = expr("x += 2");
        match e {
            Expr::Assign { target, value } => {
                assert_eq!(*target, Expr::ident("x"));
                assert!(matches!(*value, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_heuristic() {
        // A type keyword before the matching ')' makes it a cast.
        assert!(matches!(expr("(int)x"), Expr::Cast(_)));
        assert!(matches!(expr("(unsigned char *)p"), Expr::Cast(_)));

        // No type keyword: a parenthesized callee applied to arguments.
        match expr("(x)(y)") {
            Expr::Call { func, args } => {
                assert_eq!(*func, Expr::ident("x"));
                assert_eq!(args, vec![Expr::ident("y")]);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_can_be_dropped() {
        let setting = Setting {
            preserve_cast: false,
            ref_semantics: true,
        };
        assert_eq!(expr_with("(int)x", setting), Expr::ident("x"));
    }

    #[test]
    fn test_ternary() {
        let e = expr("a ? b : c");
        match e {
            Expr::Ternary { test, body, orelse } => {
                assert_eq!(*test, Expr::ident("a"));
                assert_eq!(*body, Expr::ident("b"));
                assert_eq!(*orelse, Expr::ident("c"));
            }
            other => panic!("expected Ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_ternary_is_right_associative() {
        let e = expr("a ? b : c ? d : e");
        match e {
            Expr::Ternary { orelse, .. } => {
                assert!(matches!(*orelse, Expr::Ternary { .. }));
            }
            other => panic!("expected Ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain() {
        // a.b[1](2) chains member, index, call at the same tier.
        let e = expr("a.b[1](2)");
        match e {
            Expr::Call { func, args } => {
                assert_eq!(args, vec![Expr::Int(2)]);
                assert!(matches!(*func, Expr::Subscript { .. }));
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_is_symbolic_attribute() {
        let e = expr("p->next");
        assert_eq!(
            e,
            Expr::Attribute {
                value: Box::new(Expr::ident("p")),
                attr: "next".to_string(),
            }
        );
    }

    #[test]
    fn test_logical_operators() {
        let e = expr("a && b || c");
        match e {
            Expr::Logic { op, values } => {
                assert_eq!(op, LogicOp::Or);
                assert!(matches!(values[0], Expr::Logic { .. }));
                assert_eq!(values[1], Expr::ident("c"));
            }
            other => panic!("expected Logic, got {:?}", other),
        }
    }

    #[test]
    fn test_ref_and_deref_are_symbolic() {
        let e = expr("*p");
        match e {
            Expr::Call { func, .. } => assert_eq!(*func, Expr::ident("deref")),
            other => panic!("expected Call, got {:?}", other),
        }

        let setting = Setting {
            preserve_cast: true,
            ref_semantics: false,
        };
        assert_eq!(expr_with("&x", setting), Expr::ident("x"));
    }

    #[test]
    fn test_comma_tuple_yields_last_element_subscript() {
        let e = expr("(a, b, c)");
        match e {
            Expr::Subscript { value, index } => {
                assert_eq!(*index, Expr::Int(-1));
                match *value {
                    Expr::List(items) => assert_eq!(items.len(), 3),
                    other => panic!("expected List, got {:?}", other),
                }
            }
            other => panic!("expected Subscript, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_increment() {
        let e = expr("i++");
        match e {
            Expr::Call { func, args } => {
                assert_eq!(*func, Expr::ident("postfix_inc"));
                assert_eq!(args, vec![Expr::ident("i")]);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_plus_passes_through() {
        assert_eq!(expr("+x"), Expr::ident("x"));
    }

    #[test]
    fn test_shift_precedence_below_additive() {
        // a << (b + c)
        let e = expr("a << b + c");
        match e {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinOp::Shl);
                assert!(matches!(*right, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected Binary, got {:?}", other),
        }
    }
}

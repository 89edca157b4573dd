//! Statement parsing
//!
//! Recursive-descent dispatch on the next token's kind. C control flow is
//! desugared into the dialect's smaller statement set as it is parsed:
//!
//! - `for` becomes an init statement plus a `while` whose body appends the
//!   post-expression (wrapped in a block when there is an init).
//! - `do { B } while (c);` becomes `while (true) { B; if (!c) break; }`.
//! - `switch` becomes a single-iteration `while (true)` over an if-chain
//!   driven by matched flags, which models C fallthrough: once an arm
//!   matches, every following arm's test passes until a `break` exits the
//!   loop. An explicit source `break` is the loop exit; omitting it falls
//!   through to the next arm.
//! - labels and gotos become marker assignments (`_ = LABEL("l")`,
//!   `_ = goto("l")`) that the lowering pass consumes.

use crate::ir::{CasePattern, CmpOp, Expr, LogicOp, Stmt, UnOp};
use crate::parser::expressions::ExprCtx;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// Parse one statement.
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.next()?;
                Ok(Stmt::Pass)
            }

            k if k.is_type_keyword() => self.parse_declaration(),

            TokenKind::Ident => {
                if self.peek_kind_at(1) == TokenKind::Colon {
                    let name = self.expect_ident()?;
                    self.expect(TokenKind::Colon)?;
                    return Ok(Stmt::label_marker(&name));
                }
                if self.ident_starts_declaration() {
                    return self.parse_declaration();
                }
                self.parse_expr_stmt()
            }

            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Case => self.parse_case(),
            TokenKind::Default => self.parse_default(),
            TokenKind::Return => self.parse_return(),

            TokenKind::Goto => {
                self.next()?;
                let label = self.expect_ident()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::goto_marker(&label))
            }

            TokenKind::Break => {
                self.next()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.next()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue)
            }

            TokenKind::LBrace => Ok(Stmt::Block(self.parse_body()?)),

            // Bare expression-statement fallback.
            _ => self.parse_expr_stmt(),
        }
    }

    /// Expression statement. A top-level inline assignment becomes an
    /// assignment statement, so `a = b = c;` nests right-associatively under
    /// one statement.
    pub(crate) fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr(0, ExprCtx::default())?;
        self.next_if(TokenKind::Semicolon);
        Ok(assign_to_stmt(expr))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        // The condition's parentheses come through the paren prefix handler.
        let test = self.parse_expr(0, ExprCtx { eat_comma: true })?;

        let body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            self.parse_block_stmt()?
        };

        let orelse = if self.next_if(TokenKind::Else) {
            if self.peek_kind() == TokenKind::LBrace {
                self.parse_body()?
            } else {
                self.parse_block_stmt()?
            }
        } else {
            Vec::new()
        };

        Ok(Stmt::If { test, body, orelse })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let test = self.parse_expr(0, ExprCtx::default())?;
        self.expect(TokenKind::RParen)?;

        let body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            self.parse_block_stmt()?
        };

        Ok(Stmt::While {
            test,
            body,
            orelse: Vec::new(),
        })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Do)?;
        let mut body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            self.parse_block_stmt()?
        };

        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let test = self.parse_expr(0, ExprCtx::default())?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;

        // Body runs once before the first test.
        body.push(Stmt::If {
            test: Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(test),
            },
            body: vec![Stmt::Break],
            orelse: Vec::new(),
        });

        Ok(Stmt::While {
            test: Expr::Bool(true),
            body,
            orelse: Vec::new(),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.peek_kind() == TokenKind::Semicolon {
            self.next()?;
            None
        } else if self.peek_kind().is_type_keyword()
            || self.ident_starts_declaration()
        {
            let decl = self.parse_declaration()?;
            self.next_if(TokenKind::Semicolon);
            Some(decl)
        } else {
            let expr = self.parse_expr(0, ExprCtx::default())?;
            self.expect(TokenKind::Semicolon)?;
            Some(assign_to_stmt(expr))
        };

        let test = if self.peek_kind() == TokenKind::Semicolon {
            Expr::Bool(true)
        } else {
            self.parse_expr(0, ExprCtx::default())?
        };
        self.expect(TokenKind::Semicolon)?;

        let post = if self.peek_kind() == TokenKind::RParen {
            None
        } else {
            Some(self.parse_expr(0, ExprCtx::default())?)
        };
        self.expect(TokenKind::RParen)?;

        let mut body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            self.parse_block_stmt()?
        };
        if let Some(post) = post {
            body.push(assign_to_stmt(post));
        }

        let while_stmt = Stmt::While {
            test,
            body,
            orelse: Vec::new(),
        };

        match init {
            Some(init) => Ok(Stmt::Block(vec![init, while_stmt])),
            None => Ok(while_stmt),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Return)?;

        let value = if self.peek_kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expr(0, ExprCtx::default())?)
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Stmt::Return(value))
    }

    // ===== switch/case =====

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LParen)?;
        let subject = self.parse_expr(0, ExprCtx::default())?;
        self.expect(TokenKind::RParen)?;

        if self.peek_kind() != TokenKind::LBrace {
            let (line, offset) = self.here();
            return Err(ParseError::MalformedConstruct {
                construct: "switch",
                message: "expected block".to_string(),
                line,
                offset,
            });
        }

        let depth = self.switch_depth;
        self.switch_depth += 1;
        let parsed = self.parse_body()?;
        self.switch_depth -= 1;

        Ok(build_switch_dispatch(subject, parsed, depth))
    }

    fn parse_case(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Case)?;
        let value = self.parse_expr(0, ExprCtx::default())?;
        self.expect(TokenKind::Colon)?;

        let body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            self.parse_case_body(false)?
        };

        Ok(Stmt::MatchCase {
            pattern: CasePattern::Values(vec![value]),
            body,
        })
    }

    fn parse_default(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Default)?;
        self.expect(TokenKind::Colon)?;

        let body = if self.peek_kind() == TokenKind::LBrace {
            self.parse_body()?
        } else {
            // The default arm is the dispatch fallback; an explicit break is
            // consumed here, not smuggled into the arm body.
            self.parse_case_body(true)?
        };

        Ok(Stmt::MatchCase {
            pattern: CasePattern::Default,
            body,
        })
    }

    /// Collect statements up to the next `case`/`default` or the end of the
    /// switch body slice.
    fn parse_case_body(
        &mut self,
        filter_break: bool,
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();

        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Case | TokenKind::Default => break,
                TokenKind::Semicolon => {
                    self.next()?;
                }
                _ => {
                    let stmt = self.parse_stmt()?;
                    if filter_break && stmt == Stmt::Break {
                        continue;
                    }
                    body.push(stmt);
                }
            }
        }

        Ok(body)
    }
}

fn assign_to_stmt(expr: Expr) -> Stmt {
    match expr {
        Expr::Assign { target, value } => Stmt::Assign {
            targets: vec![*target],
            value: *value,
        },
        other => Stmt::Expr(other),
    }
}

/// Merge empty-bodied (fallthrough) case labels into the next real arm and
/// build the matched-flag dispatch loop.
fn build_switch_dispatch(
    subject: Expr,
    parsed: Vec<Stmt>,
    depth: usize,
) -> Stmt {
    let mut arms: Vec<Stmt> = Vec::new();
    let mut buffered: Vec<Expr> = Vec::new();
    let mut buffered_default = false;

    for stmt in parsed {
        match stmt {
            Stmt::MatchCase { pattern, body } if body.is_empty() => {
                match pattern {
                    CasePattern::Values(values) => buffered.extend(values),
                    CasePattern::Default => buffered_default = true,
                }
            }
            Stmt::MatchCase { pattern, body } => match pattern {
                CasePattern::Values(values) => {
                    if buffered_default {
                        // `default:` fell through into this case: the
                        // default arm subsumes the value tests.
                        buffered.clear();
                        buffered_default = false;
                        arms.push(Stmt::MatchCase {
                            pattern: CasePattern::Default,
                            body,
                        });
                    } else {
                        let mut all = std::mem::take(&mut buffered);
                        all.extend(values);
                        arms.push(Stmt::MatchCase {
                            pattern: CasePattern::Values(all),
                            body,
                        });
                    }
                }
                CasePattern::Default => {
                    for value in buffered.drain(..) {
                        arms.push(Stmt::MatchCase {
                            pattern: CasePattern::Values(vec![value]),
                            body: vec![Stmt::Pass],
                        });
                    }
                    buffered_default = false;
                    arms.push(Stmt::MatchCase {
                        pattern: CasePattern::Default,
                        body,
                    });
                }
            },
            other => arms.push(other),
        }
    }
    for value in buffered {
        arms.push(Stmt::MatchCase {
            pattern: CasePattern::Values(vec![value]),
            body: vec![Stmt::Pass],
        });
    }
    if buffered_default {
        arms.push(Stmt::MatchCase {
            pattern: CasePattern::Default,
            body: vec![Stmt::Pass],
        });
    }

    let on = format!("__switch_on{}", depth);
    let matched = format!("__matched{}", depth);
    let matched_any = format!("__switch_matched_any{}", depth);

    let mut body = vec![
        Stmt::Assign {
            targets: vec![Expr::Ident(on.clone())],
            value: subject,
        },
        Stmt::Assign {
            targets: vec![Expr::Ident(matched_any.clone())],
            value: Expr::Bool(false),
        },
        Stmt::Assign {
            targets: vec![Expr::Ident(matched.clone())],
            value: Expr::Bool(false),
        },
    ];

    for arm in arms {
        let (pattern, arm_body) = match arm {
            Stmt::MatchCase { pattern, body } => (pattern, body),
            other => {
                body.push(other);
                continue;
            }
        };

        match pattern {
            CasePattern::Values(values) => {
                let compare = value_test(&on, &values);

                // Fallthrough: once matched, every following arm runs until
                // a break exits the loop.
                let test = Expr::Logic {
                    op: LogicOp::Or,
                    values: vec![Expr::Ident(matched.clone()), compare.clone()],
                };

                let first_match = Expr::Logic {
                    op: LogicOp::And,
                    values: vec![
                        Expr::Unary {
                            op: UnOp::Not,
                            operand: Box::new(Expr::Ident(matched.clone())),
                        },
                        compare,
                    ],
                };
                let mut block = vec![
                    Stmt::If {
                        test: first_match,
                        body: vec![Stmt::Assign {
                            targets: vec![Expr::Ident(matched_any.clone())],
                            value: Expr::Bool(true),
                        }],
                        orelse: Vec::new(),
                    },
                    Stmt::Assign {
                        targets: vec![Expr::Ident(matched.clone())],
                        value: Expr::Bool(true),
                    },
                ];
                block.extend(arm_body);

                body.push(Stmt::If {
                    test,
                    body: block,
                    orelse: Vec::new(),
                });
            }
            CasePattern::Default => {
                let test = Expr::Logic {
                    op: LogicOp::Or,
                    values: vec![
                        Expr::Ident(matched.clone()),
                        Expr::Unary {
                            op: UnOp::Not,
                            operand: Box::new(Expr::Ident(matched_any.clone())),
                        },
                    ],
                };
                let mut block = vec![Stmt::Assign {
                    targets: vec![Expr::Ident(matched.clone())],
                    value: Expr::Bool(true),
                }];
                block.extend(arm_body);

                body.push(Stmt::If {
                    test,
                    body: block,
                    orelse: Vec::new(),
                });
            }
        }
    }

    body.push(Stmt::Break);

    Stmt::While {
        test: Expr::Bool(true),
        body,
        orelse: Vec::new(),
    }
}

fn value_test(on: &str, values: &[Expr]) -> Expr {
    let mut compares: Vec<Expr> = values
        .iter()
        .map(|v| Expr::Compare {
            left: Box::new(Expr::ident(on)),
            op: CmpOp::Eq,
            right: Box::new(v.clone()),
        })
        .collect();

    if compares.len() == 1 {
        compares.remove(0)
    } else {
        Expr::Logic {
            op: LogicOp::Or,
            values: compares,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::parser::parse::Setting;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = tokenize(source);
        Parser::new(&tokens, Setting::default())
            .parse()
            .unwrap()
            .body
    }

    #[test]
    fn test_if_else() {
        let body = parse("if (x > 0) { a(); } else { b(); }");
        match &body[0] {
            Stmt::If { test, body, orelse } => {
                assert!(matches!(test, Expr::Compare { .. }));
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_braceless_if_body() {
        let body = parse("if (x) y = 1; else y = 2;");
        match &body[0] {
            Stmt::If { body, orelse, .. } => {
                assert_eq!(body.len(), 1);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_label_and_goto_markers() {
        let body = parse("top: x = x + 1; goto top;");
        assert_eq!(body[0].as_label_marker(), Some("top"));
        assert_eq!(body[2].as_goto_marker(), Some("top"));
    }

    #[test]
    fn test_do_while_desugars_to_trailing_break() {
        let body = parse("do { x = x - 1; } while (x > 0);");
        match &body[0] {
            Stmt::While { test, body, .. } => {
                assert_eq!(*test, Expr::Bool(true));
                // body statement, then the negated-condition break
                assert_eq!(body.len(), 2);
                match &body[1] {
                    Stmt::If { test, body, .. } => {
                        assert!(matches!(
                            test,
                            Expr::Unary { op: UnOp::Not, .. }
                        ));
                        assert_eq!(body[0], Stmt::Break);
                    }
                    other => panic!("expected If, got {:?}", other),
                }
            }
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_for_desugars_to_init_plus_while() {
        let body = parse("for (i = 0; i < 10; i++) { f(i); }");
        match &body[0] {
            Stmt::Block(stmts) => {
                assert!(matches!(&stmts[0], Stmt::Assign { .. }));
                match &stmts[1] {
                    Stmt::While { body, .. } => {
                        // loop body plus appended post-expression
                        assert_eq!(body.len(), 2);
                    }
                    other => panic!("expected While, got {:?}", other),
                }
            }
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_for_without_init_is_bare_while() {
        let body = parse("for (; x < 3;) { f(); }");
        assert!(matches!(&body[0], Stmt::While { .. }));
    }

    #[test]
    fn test_switch_becomes_dispatch_loop() {
        let body = parse(
            "switch (x) { case 1: a(); break; case 2: b(); break; default: c(); }",
        );
        match &body[0] {
            Stmt::While { test, body, .. } => {
                assert_eq!(*test, Expr::Bool(true));
                // subject + two flag inits, three arms, final break
                assert_eq!(body.len(), 7);
                assert_eq!(body[body.len() - 1], Stmt::Break);
                assert!(matches!(&body[3], Stmt::If { .. }));
            }
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_fallthrough_labels_merge() {
        // `case 1: case 2: body` merges both values into one arm test.
        let body = parse("switch (x) { case 1: case 2: f(); break; }");
        match &body[0] {
            Stmt::While { body, .. } => match &body[3] {
                Stmt::If { test, .. } => match test {
                    Expr::Logic { values, .. } => {
                        assert!(matches!(&values[1], Expr::Logic { .. }));
                    }
                    other => panic!("expected Logic, got {:?}", other),
                },
                other => panic!("expected If, got {:?}", other),
            },
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_without_block_is_malformed() {
        let tokens = tokenize("switch (x) case 1: f();");
        let err = Parser::new(&tokens, Setting::default())
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::MalformedConstruct {
                construct: "switch",
                ..
            }
        ));
    }

    #[test]
    fn test_bare_block_is_a_nested_scope() {
        let body = parse("{ x = 1; y = 2; }");
        match &body[0] {
            Stmt::Block(stmts) => assert_eq!(stmts.len(), 2),
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_becomes_pass() {
        let body = parse("while (x) { }");
        match &body[0] {
            Stmt::While { body, .. } => assert_eq!(body, &vec![Stmt::Pass]),
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_member_store_is_plain_assignment() {
        let body = parse("p->count = 3;");
        match &body[0] {
            Stmt::Assign { targets, value } => {
                assert!(matches!(&targets[0], Expr::Attribute { .. }));
                assert_eq!(*value, Expr::Int(3));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_switch_temporaries_do_not_collide() {
        let body = parse(
            "switch (a) { case 1: switch (b) { case 2: f(); } break; }",
        );
        // Outer names end in 0, inner in 1.
        let text = format!("{:?}", body);
        assert!(text.contains("__switch_on0"));
        assert!(text.contains("__switch_on1"));
    }
}

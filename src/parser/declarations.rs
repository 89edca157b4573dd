//! Declaration and function definition parsing
//!
//! Declarations consume a greedy run of type keywords (plus a typedef-style
//! identifier when the following tokens still form a declarator), then
//! exactly one declarator: `*`s, the name, and `[...]` dimensions in source
//! order. The initializer is a plain expression or, on `{`, a recursively
//! collected brace-initializer list. A trailing `;` is mandatory.
//!
//! A simple scalar declaration (no pointer depth, no dimensions) lowers
//! directly to an assignment: the dialect has no use for a bare `int x;`
//! beyond introducing the name.

use crate::ir::{Expr, Param, Stmt};
use crate::parser::expressions::{op_info, ExprCtx, OpClass};
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// True when an identifier-led statement reads as `Type name` /
    /// `Type *name`, i.e. a typedef-style declaration.
    pub(crate) fn ident_starts_declaration(&self) -> bool {
        let mut i = 1;
        while self.peek_kind_at(i) == TokenKind::Star {
            i += 1;
        }
        self.peek_kind_at(i) == TokenKind::Ident
    }

    /// Dispatch between a variable declaration and a function definition,
    /// decided by a pure lookahead scan.
    pub(crate) fn parse_declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.fundef_ahead() {
            return self.parse_fundef();
        }
        self.parse_variable_decl()
    }

    /// A `(` right after a multi-token type/name run marks a function
    /// definition: `int main(`, `struct Foo make(`.
    fn fundef_ahead(&self) -> bool {
        let mut i = 0;
        loop {
            let kind = self.peek_kind_at(i);
            if kind.is_type_keyword()
                || kind == TokenKind::Ident
                || kind == TokenKind::Star
            {
                i += 1;
            } else {
                break;
            }
        }
        i >= 2
            && self.peek_kind_at(i) == TokenKind::LParen
            && self.peek_kind_at(i - 1) == TokenKind::Ident
    }

    fn parse_variable_decl(&mut self) -> Result<Stmt, ParseError> {
        let mut type_parts: Vec<String> = Vec::new();

        loop {
            let kind = self.peek_kind();
            if kind.is_type_keyword() {
                self.next()?;
                type_parts.push(kind.name().to_string());
                continue;
            }
            // A typedef name is part of the type only while a declarator
            // still follows it.
            if kind == TokenKind::Ident && self.ident_starts_declaration() {
                let tok = self.next()?;
                type_parts
                    .push(tok.value.as_str().unwrap_or_default().to_string());
                continue;
            }
            break;
        }

        let (name, pointer_depth, dims) = self.parse_declarator()?;

        // `int x |= 1;` is not a declaration; resume as an expression
        // statement on the declared name.
        let peeked = self.peek_kind();
        let (_, _, class) = op_info(peeked);
        if class == OpClass::Assign && peeked != TokenKind::Eq {
            let expr = self.parse_expr_continue(
                Expr::Ident(name),
                0,
                ExprCtx::default(),
            )?;
            self.next_if(TokenKind::Semicolon);
            return Ok(match expr {
                Expr::Assign { target, value } => Stmt::Assign {
                    targets: vec![*target],
                    value: *value,
                },
                other => Stmt::Expr(other),
            });
        }

        let init = if self.next_if(TokenKind::Eq) {
            if self.peek_kind() == TokenKind::LBrace {
                Some(self.parse_brace_initializer()?)
            } else {
                Some(self.parse_expr(0, ExprCtx::default())?)
            }
        } else {
            None
        };

        self.expect(TokenKind::Semicolon)?;

        // Simple scalar shortcut.
        if pointer_depth == 0 && dims.is_empty() {
            return Ok(Stmt::Assign {
                targets: vec![Expr::Ident(name)],
                value: init.unwrap_or(Expr::NoneLit),
            });
        }

        Ok(Stmt::Decl {
            type_text: type_parts.join(" "),
            name,
            pointer_depth,
            dims,
            init,
        })
    }

    /// `*`* identifier `[dims]`*
    pub(crate) fn parse_declarator(
        &mut self,
    ) -> Result<(String, usize, Vec<Option<Expr>>), ParseError> {
        let mut pointer_depth = 0;
        while self.next_if(TokenKind::Star) {
            pointer_depth += 1;
        }

        let name = self.expect_ident()?;

        let mut dims = Vec::new();
        while self.next_if(TokenKind::LBracket) {
            if self.peek_kind() == TokenKind::RBracket {
                self.next()?;
                dims.push(None);
            } else {
                let dim = self.parse_expr(0, ExprCtx::default())?;
                self.expect(TokenKind::RBracket)?;
                dims.push(Some(dim));
            }
        }

        Ok((name, pointer_depth, dims))
    }

    /// `{ elem, elem, ... }` with nested brace lists.
    fn parse_brace_initializer(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut elements = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.next()?;
                    break;
                }
                TokenKind::LBrace => {
                    elements.push(self.parse_brace_initializer()?);
                }
                _ => {
                    elements.push(self.parse_expr(0, ExprCtx::default())?);
                }
            }

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.next()?;
                }
                TokenKind::RBrace => {}
                other => {
                    let (line, offset) = self.here();
                    return Err(ParseError::MalformedConstruct {
                        construct: "brace initializer",
                        message: format!("unexpected token {}", other),
                        line,
                        offset,
                    });
                }
            }
        }

        Ok(Expr::List(elements))
    }

    fn parse_fundef(&mut self) -> Result<Stmt, ParseError> {
        // Everything before the parameter list; the last token is the name.
        let mut parts: Vec<String> = Vec::new();
        while !self.at_end() && self.peek_kind() != TokenKind::LParen {
            let tok = self.next()?;
            let text = match tok.kind {
                TokenKind::Ident => {
                    tok.value.as_str().unwrap_or_default().to_string()
                }
                TokenKind::Star => "*".to_string(),
                kind => kind.name().to_string(),
            };
            parts.push(text);
        }

        let name = match parts.pop() {
            Some(name) => name,
            None => {
                let (line, offset) = self.here();
                return Err(ParseError::MalformedConstruct {
                    construct: "function definition",
                    message: "missing function name".to_string(),
                    line,
                    offset,
                });
            }
        };
        let ret_text = if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        };

        self.expect(TokenKind::LParen)?;
        let params = self.parse_param_list()?;

        let body = self.parse_body()?;

        Ok(Stmt::FuncDef {
            name,
            params,
            body,
            ret_text,
        })
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        // `(void)` means no parameters.
        if self.peek_kind() == TokenKind::Void
            && self.peek_kind_at(1) == TokenKind::RParen
        {
            self.next()?;
            self.next()?;
            return Ok(params);
        }

        loop {
            if self.next_if(TokenKind::RParen) {
                break;
            }

            let mut type_parts: Vec<String> = Vec::new();
            loop {
                let kind = self.peek_kind();
                if kind.is_type_keyword() {
                    self.next()?;
                    type_parts.push(kind.name().to_string());
                } else if kind == TokenKind::Ident
                    && self.ident_starts_declaration()
                {
                    let tok = self.next()?;
                    type_parts.push(
                        tok.value.as_str().unwrap_or_default().to_string(),
                    );
                } else {
                    break;
                }
            }

            let (name, pointer_depth, dims) = self.parse_declarator()?;

            let mut type_text = type_parts.join(" ");
            for _ in 0..pointer_depth {
                type_text.push('*');
            }
            for _ in 0..dims.len() {
                type_text.push_str("[]");
            }

            params.push(Param {
                name,
                type_text: if type_text.is_empty() {
                    None
                } else {
                    Some(type_text)
                },
            });

            if self.next_if(TokenKind::RParen) {
                break;
            }
            self.expect(TokenKind::Comma)?;
        }

        Ok(params)
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
    fn test_simple_scalar_lowers_to_assignment() {
        let body = parse("int x;");
        assert_eq!(
            body[0],
            Stmt::Assign {
                targets: vec![Expr::ident("x")],
                value: Expr::NoneLit,
            }
        );
    }

    #[test]
    fn test_initialized_scalar() {
        let body = parse("int x = 5;");
        assert_eq!(
            body[0],
            Stmt::Assign {
                targets: vec![Expr::ident("x")],
                value: Expr::Int(5),
            }
        );
    }

    #[test]
    fn test_array_declaration() {
        let body = parse("int x[10];");
        match &body[0] {
            Stmt::Decl {
                type_text,
                name,
                pointer_depth,
                dims,
                init,
            } => {
                assert!(type_text.contains("INT"));
                assert_eq!(name, "x");
                assert_eq!(*pointer_depth, 0);
                assert_eq!(dims, &vec![Some(Expr::Int(10))]);
                assert!(init.is_none());
            }
            other => panic!("expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_unsized_dimension() {
        let body = parse("char buf[];");
        match &body[0] {
            Stmt::Decl { dims, .. } => assert_eq!(dims, &vec![None]),
            other => panic!("expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_declaration() {
        let body = parse("unsigned char **p;");
        match &body[0] {
            Stmt::Decl {
                type_text,
                name,
                pointer_depth,
                ..
            } => {
                assert_eq!(type_text, "UNSIGNED CHAR");
                assert_eq!(name, "p");
                assert_eq!(*pointer_depth, 2);
            }
            other => panic!("expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_typedef_style_declaration() {
        let body = parse("WorldView *view;");
        match &body[0] {
            Stmt::Decl {
                type_text,
                name,
                pointer_depth,
                ..
            } => {
                assert_eq!(type_text, "WorldView");
                assert_eq!(name, "view");
                assert_eq!(*pointer_depth, 1);
            }
            other => panic!("expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_brace_initializer() {
        let body = parse("int grid[2][2] = {{1, 2}, {3, 4}};");
        match &body[0] {
            Stmt::Decl { dims, init, .. } => {
                assert_eq!(dims.len(), 2);
                match init {
                    Some(Expr::List(rows)) => {
                        assert_eq!(rows.len(), 2);
                        assert!(matches!(&rows[0], Expr::List(_)));
                    }
                    other => panic!("expected List, got {:?}", other),
                }
            }
            other => panic!("expected Decl, got {:?}", other),
        }
    }

    #[test]
    fn test_function_definition() {
        let body = parse("int add(int a, int b) { return a + b; }");
        match &body[0] {
            Stmt::FuncDef {
                name,
                params,
                body,
                ret_text,
            } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].name, "a");
                assert_eq!(params[0].type_text.as_deref(), Some("INT"));
                assert_eq!(ret_text.as_deref(), Some("INT"));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_void_parameter_list() {
        let body = parse("void reset(void) { x = 0; }");
        match &body[0] {
            Stmt::FuncDef { params, .. } => assert!(params.is_empty()),
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_parameter() {
        let body = parse("void fill(char *dst, int n) { }");
        match &body[0] {
            Stmt::FuncDef { params, .. } => {
                assert_eq!(params[0].type_text.as_deref(), Some("CHAR*"));
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_spurious_type_before_compound_assign() {
        // Decompiler noise: `int x |= 1;` is an expression statement.
        let body = parse("int x |= 1;");
        match &body[0] {
            Stmt::Assign { targets, value } => {
                assert_eq!(targets[0], Expr::ident("x"));
                assert!(matches!(value, Expr::Binary { .. }));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_return_type() {
        let body = parse("struct Point origin() { return p; }");
        match &body[0] {
            Stmt::FuncDef { name, ret_text, .. } => {
                assert_eq!(name, "origin");
                assert_eq!(ret_text.as_deref(), Some("STRUCT Point"));
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }
}

//! Rendering the cleaned IR back to dialect text
//!
//! Statement structure renders Python-style (indentation, `def`, `pass`);
//! expressions keep C-style operators (`&&`, `!`, `c ? a : b`) so that an
//! expression-only rendering tokenizes and re-parses to a structurally equal
//! tree. Parenthesization is driven by the same binding powers the parser
//! climbs, emitting parens only where the child binds looser than its
//! context.
//!
//! The core's contract ends at a well-formed tree; this renderer exists for
//! tests and human inspection, not as a stable output format.

use crate::ir::{BinOp, CasePattern, Expr, Module, Stmt, UnOp};

/// Render a whole module.
pub fn emit(module: &Module) -> String {
    let mut w = Writer::new();
    w.stmts(&module.body);
    w.out
}

/// Render a single expression.
pub fn emit_expr(expr: &Expr) -> String {
    render_expr(expr, 0)
}

struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn new() -> Self {
        Writer {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, header: &str, body: &[Stmt]) {
        self.line(header);
        self.indent += 1;
        if body.is_empty() {
            self.line("pass");
        } else {
            self.stmts(body);
        }
        self.indent -= 1;
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.line(&render_expr(e, 0)),

            Stmt::Assign { targets, value } => {
                let mut text = String::new();
                for target in targets {
                    text.push_str(&render_expr(target, 0));
                    text.push_str(" = ");
                }
                text.push_str(&render_expr(value, 0));
                self.line(&text);
            }

            Stmt::Decl {
                type_text,
                name,
                pointer_depth,
                dims,
                init,
            } => {
                let mut ann = type_text.clone();
                for _ in 0..*pointer_depth {
                    ann.push('*');
                }
                for dim in dims {
                    match dim {
                        Some(e) => {
                            ann.push('[');
                            ann.push_str(&render_expr(e, 0));
                            ann.push(']');
                        }
                        None => ann.push_str("[]"),
                    }
                }
                let value = match init {
                    Some(e) => render_expr(e, 0),
                    None => "None".to_string(),
                };
                self.line(&format!("{}: \"{}\" = {}", name, ann, value));
            }

            Stmt::If { test, body, orelse } => {
                self.block(&format!("if {}:", render_expr(test, 0)), body);
                if !orelse.is_empty() {
                    self.block("else:", orelse);
                }
            }

            Stmt::While { test, body, orelse } => {
                self.block(&format!("while {}:", render_expr(test, 0)), body);
                if !orelse.is_empty() {
                    self.block("else:", orelse);
                }
            }

            Stmt::Return(None) => self.line("return"),
            Stmt::Return(Some(e)) => {
                self.line(&format!("return {}", render_expr(e, 0)))
            }
            Stmt::Break => self.line("break"),
            Stmt::Continue => self.line("continue"),
            Stmt::Pass => self.line("pass"),

            Stmt::Block(inner) => self.block("if true:", inner),

            Stmt::MatchCase { pattern, body } => {
                let header = match pattern {
                    CasePattern::Values(values) => {
                        let rendered: Vec<String> =
                            values.iter().map(|v| render_expr(v, 0)).collect();
                        format!("case {}:", rendered.join(", "))
                    }
                    CasePattern::Default => "case _:".to_string(),
                };
                self.block(&header, body);
            }

            Stmt::FuncDef {
                name, params, body, ..
            } => {
                let names: Vec<&str> =
                    params.iter().map(|p| p.name.as_str()).collect();
                self.block(
                    &format!("def {}({}):", name, names.join(", ")),
                    body,
                );
            }

            Stmt::ClassDef { name, body } => {
                self.block(&format!("class {}:", name), body);
            }

            Stmt::Nonlocal(names) => {
                self.line(&format!("nonlocal {}", names.join(", ")))
            }
        }
    }
}

/// Binding power of an expression node, mirroring the parser's table.
fn power(expr: &Expr) -> i32 {
    match expr {
        Expr::Assign { .. } => 10,
        Expr::Ternary { .. } => 20,
        Expr::Logic { op, .. } => match op {
            crate::ir::LogicOp::Or => 30,
            crate::ir::LogicOp::And => 40,
        },
        Expr::Binary { op, .. } => match op {
            BinOp::BitOr => 50,
            BinOp::BitXor => 60,
            BinOp::BitAnd => 70,
            BinOp::Shl | BinOp::Shr => 100,
            BinOp::Add | BinOp::Sub => 110,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 120,
        },
        Expr::Compare { op, .. } => match op {
            crate::ir::CmpOp::Eq | crate::ir::CmpOp::Ne => 80,
            _ => 90,
        },
        Expr::Unary { .. } => 130,
        Expr::Call { .. } | Expr::Subscript { .. } | Expr::Attribute { .. } => {
            160
        }
        Expr::Cast(inner) => power(inner),
        _ => 200,
    }
}

fn render_expr(expr: &Expr, parent_bp: i32) -> String {
    let bp = power(expr);
    let text = match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Int(n) => n.to_string(),
        Expr::Float(x) => format!("{:?}", x),
        Expr::Str(s) => format!("\"{}\"", escape(s)),
        Expr::Bool(true) => "true".to_string(),
        Expr::Bool(false) => "false".to_string(),
        Expr::NoneLit => "None".to_string(),

        Expr::Unary { op, operand } => {
            let sym = match op {
                UnOp::Neg => "-",
                UnOp::Not => "!",
                UnOp::BitNot => "~",
            };
            format!("{}{}", sym, render_expr(operand, bp))
        }

        Expr::Binary { op, left, right } => format!(
            "{} {} {}",
            render_expr(left, bp),
            op,
            render_expr(right, bp + 1)
        ),

        Expr::Compare { left, op, right } => format!(
            "{} {} {}",
            render_expr(left, bp),
            op,
            render_expr(right, bp + 1)
        ),

        Expr::Logic { op, values } => {
            let sym = match op {
                crate::ir::LogicOp::And => " && ",
                crate::ir::LogicOp::Or => " || ",
            };
            let rendered: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    render_expr(v, if i == 0 { bp } else { bp + 1 })
                })
                .collect();
            rendered.join(sym)
        }

        Expr::Ternary { test, body, orelse } => format!(
            "{} ? {} : {}",
            render_expr(test, bp + 1),
            render_expr(body, 0),
            render_expr(orelse, bp)
        ),

        Expr::Call { func, args } => {
            let rendered: Vec<String> =
                args.iter().map(|a| render_expr(a, 0)).collect();
            format!("{}({})", render_expr(func, bp), rendered.join(", "))
        }

        Expr::Subscript { value, index } => {
            // A comma expression renders back to its source form.
            if let (Expr::List(items), Expr::Int(-1)) =
                (value.as_ref(), index.as_ref())
            {
                let rendered: Vec<String> =
                    items.iter().map(|e| render_expr(e, 0)).collect();
                return format!("({})", rendered.join(", "));
            }
            format!(
                "{}[{}]",
                render_expr(value, bp),
                render_expr(index, 0)
            )
        }

        Expr::Attribute { value, attr } => {
            format!("{}.{}", render_expr(value, bp), attr)
        }

        Expr::List(items) => {
            let rendered: Vec<String> =
                items.iter().map(|e| render_expr(e, 0)).collect();
            format!("[{}]", rendered.join(", "))
        }

        Expr::Cast(inner) => return render_expr(inner, parent_bp),

        Expr::Assign { target, value } => format!(
            "{} = {}",
            render_expr(target, bp + 1),
            render_expr(value, bp)
        ),
    };

    if bp < parent_bp {
        format!("({})", text)
    } else {
        text
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::parser::parse::{Parser, Setting};

    fn parse(source: &str) -> Module {
        let tokens = tokenize(source);
        Parser::new(&tokens, Setting::default()).parse().unwrap()
    }

    #[test]
    fn test_precedence_needs_no_spurious_parens() {
        let module = parse("x = a + b * c;");
        let text = emit(&module);
        assert_eq!(text.trim(), "x = a + b * c");
    }

    #[test]
    fn test_parens_preserved_where_required() {
        let module = parse("x = (a + b) * c;");
        let text = emit(&module);
        assert_eq!(text.trim(), "x = (a + b) * c");
    }

    #[test]
    fn test_statement_layout() {
        let module = parse("if (x) { y = 1; } else { y = 2; }");
        let text = emit(&module);
        let expected = "if x:\n    y = 1\nelse:\n    y = 2\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_expression_round_trip() {
        let sources = [
            "a + b * c;",
            "a = b = c;",
            "f(x, y + 1);",
            "buf[i] + buf[i + 1];",
            "p.next.value;",
            "a < b && c != d || !e;",
            "x ? y : z ? w : v;",
            "(a, b, c);",
            "arr[2] * (n - 1) % k;",
            "-x + ~y;",
        ];

        for source in sources {
            let first = parse(source);
            let rendered = emit(&first);
            let second = parse(&rendered);
            assert_eq!(first, second, "round trip failed for {:?}", source);
        }
    }
}

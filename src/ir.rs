//! IR node definitions for the lifted scripting dialect
//!
//! The parser produces this tree and every clean-up pass consumes one tree
//! and returns a new one. All nodes have value semantics (`Clone` +
//! `PartialEq`); there is no shared mutable state between a pass's input and
//! its output.
//!
//! Labels and gotos are not distinct node kinds. The parser encodes them as
//! marker assignments (`_ = LABEL("name")` / `_ = goto("name")`) and the
//! lowering pass consumes and removes every tracked marker, so the cleaned
//! tree never contains them.

use std::fmt;

/// Name of the throwaway target used by label/goto marker assignments.
pub const MARKER_TARGET: &str = "_";

/// Callee name of a label marker call.
pub const LABEL_FN: &str = "LABEL";

/// Callee name of a goto marker call.
pub const GOTO_FN: &str = "goto";

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Not,    // !x
    BitNot, // ~x
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        values: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Ternary {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// Brace initializers and comma expressions.
    List(Vec<Expr>),
    /// Symbolic cast wrapper; the target type is not tracked.
    Cast(Box<Expr>),
    /// Inline assignment, so `a = b = c` nests right-associatively.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

/// Switch case pattern: one or more values (comma of fallthrough-merged
/// `case` labels) or the `default` arm.
#[derive(Debug, Clone, PartialEq)]
pub enum CasePattern {
    Values(Vec<Expr>),
    Default,
}

/// Function/method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_text: Option<String>,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    /// Pointer or array declaration. Simple scalars never reach this node:
    /// the parser shortcuts them to [`Stmt::Assign`].
    Decl {
        type_text: String,
        name: String,
        pointer_depth: usize,
        dims: Vec<Option<Expr>>,
        init: Option<Expr>,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    /// Bare `{ ... }` nested lexical scope.
    Block(Vec<Stmt>),
    MatchCase {
        pattern: CasePattern,
        body: Vec<Stmt>,
    },
    Pass,
    FuncDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        ret_text: Option<String>,
    },
    ClassDef {
        name: String,
        body: Vec<Stmt>,
    },
    Nonlocal(Vec<String>),
}

/// A parsed compilation unit: the ordered top-level statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new(body: Vec<Stmt>) -> Self {
        Module { body }
    }
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    pub fn str(value: &str) -> Expr {
        Expr::Str(value.to_string())
    }

    /// Boolean value of a literal condition, if the expression is one.
    /// Integer literals count (C has no boolean literals).
    pub fn as_literal_bool(&self) -> Option<bool> {
        match self {
            Expr::Bool(b) => Some(*b),
            Expr::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    /// True for expressions with no evaluation side effects: literals and
    /// lists of literals. Used to split off the shared leading-init run
    /// during goto lowering.
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Bool(_)
            | Expr::NoneLit => true,
            Expr::List(items) => items.iter().all(Expr::is_literal),
            Expr::Unary { operand, .. } => operand.is_literal(),
            _ => false,
        }
    }
}

fn marker(func: &str, name: &str) -> Stmt {
    Stmt::Assign {
        targets: vec![Expr::ident(MARKER_TARGET)],
        value: Expr::Call {
            func: Box::new(Expr::ident(func)),
            args: vec![Expr::str(name)],
        },
    }
}

fn as_marker<'a>(stmt: &'a Stmt, func: &str) -> Option<&'a str> {
    if let Stmt::Assign { targets, value } = stmt {
        if let [Expr::Ident(target)] = targets.as_slice() {
            if target != MARKER_TARGET {
                return None;
            }
            if let Expr::Call { func: callee, args } = value {
                if let (Expr::Ident(f), [Expr::Str(name)]) =
                    (callee.as_ref(), args.as_slice())
                {
                    if f == func {
                        return Some(name);
                    }
                }
            }
        }
    }
    None
}

impl Stmt {
    /// Build a `_ = LABEL("name")` marker statement.
    pub fn label_marker(name: &str) -> Stmt {
        marker(LABEL_FN, name)
    }

    /// Build a `_ = goto("name")` marker statement.
    pub fn goto_marker(name: &str) -> Stmt {
        marker(GOTO_FN, name)
    }

    /// Label name if this statement is a label marker.
    pub fn as_label_marker(&self) -> Option<&str> {
        as_marker(self, LABEL_FN)
    }

    /// Target label if this statement is a goto marker.
    pub fn as_goto_marker(&self) -> Option<&str> {
        as_marker(self, GOTO_FN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        let label = Stmt::label_marker("retry");
        assert_eq!(label.as_label_marker(), Some("retry"));
        assert_eq!(label.as_goto_marker(), None);

        let goto = Stmt::goto_marker("retry");
        assert_eq!(goto.as_goto_marker(), Some("retry"));
        assert_eq!(goto.as_label_marker(), None);
    }

    #[test]
    fn test_ordinary_assign_is_not_a_marker() {
        let stmt = Stmt::Assign {
            targets: vec![Expr::ident("x")],
            value: Expr::Int(1),
        };
        assert_eq!(stmt.as_label_marker(), None);
        assert_eq!(stmt.as_goto_marker(), None);
    }

    #[test]
    fn test_literal_bool() {
        assert_eq!(Expr::Int(0).as_literal_bool(), Some(false));
        assert_eq!(Expr::Int(3).as_literal_bool(), Some(true));
        assert_eq!(Expr::Bool(true).as_literal_bool(), Some(true));
        assert_eq!(Expr::ident("x").as_literal_bool(), None);
    }

    #[test]
    fn test_is_literal() {
        assert!(Expr::Int(4).is_literal());
        assert!(Expr::List(vec![Expr::Int(1), Expr::Str("a".into())])
            .is_literal());
        assert!(!Expr::List(vec![Expr::ident("x")]).is_literal());
        assert!(!Expr::ident("x").is_literal());
    }
}

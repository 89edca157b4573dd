//! Reference evaluator for the IR
//!
//! A small tree-walking evaluator used to check that transformed trees
//! still compute what the originals did: lowered dispatch loops, captured
//! (`nonlocal`) variables, and the `__unset`/`__unbound` fail-fast guard all
//! execute here. Top-level goto markers are honoured directly, so an
//! unlowered body and its lowered form can be run against each other.
//!
//! This is test infrastructure, not a language runtime: attributes, classes
//! and symbolic pointer calls are out of scope and fail loudly.

use crate::ir::{BinOp, CmpOp, Expr, LogicOp, Module, Stmt, UnOp};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    /// The not-yet-initialized sentinel bound to `__unset`.
    Unset,
    List(Rc<RefCell<Vec<Value>>>),
    Func(Rc<Closure>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b))
            | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Unset, Value::Unset) => true,
            (Value::List(a), Value::List(b)) => *a.borrow() == *b.borrow(),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A user function closed over its defining frame.
pub struct Closure {
    pub name: String,
    params: Vec<String>,
    body: Vec<Stmt>,
    env: Env,
}

// The defining frame can transitively contain this closure, so the debug
// form stays shallow instead of chasing the cycle.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Evaluation errors. [`EvalError::UninitializedCapture`] is the runtime
/// guard the lowering pass plants for captured variables read before any
/// assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UndefinedName(String),
    NotCallable(String),
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },
    BadOperand {
        op: String,
        value: String,
    },
    DivisionByZero,
    BadIndex(i64),
    UnknownLabel(String),
    UninitializedCapture(String),
    Unsupported(&'static str),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedName(name) => {
                write!(f, "undefined name '{}'", name)
            }
            EvalError::NotCallable(name) => {
                write!(f, "'{}' is not callable", name)
            }
            EvalError::ArgumentCount {
                name,
                expected,
                got,
            } => write!(
                f,
                "{}() takes {} arguments, got {}",
                name, expected, got
            ),
            EvalError::BadOperand { op, value } => {
                write!(f, "bad operand for {}: {}", op, value)
            }
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::BadIndex(i) => write!(f, "index {} out of range", i),
            EvalError::UnknownLabel(label) => {
                write!(f, "goto to unknown label '{}'", label)
            }
            EvalError::UninitializedCapture(name) => {
                write!(f, "captured variable '{}' read before assignment", name)
            }
            EvalError::Unsupported(what) => {
                write!(f, "unsupported construct: {}", what)
            }
        }
    }
}

impl std::error::Error for EvalError {}

pub type Env = Rc<Frame>;

/// One variable frame; frames chain through `parent` for closures.
#[derive(Debug)]
pub struct Frame {
    vars: RefCell<FxHashMap<String, Value>>,
    parent: Option<Env>,
}

impl Frame {
    fn root() -> Env {
        let frame = Frame {
            vars: RefCell::new(FxHashMap::default()),
            parent: None,
        };
        frame
            .vars
            .borrow_mut()
            .insert("__unset".to_string(), Value::Unset);
        Rc::new(frame)
    }

    fn child(parent: &Env) -> Env {
        Rc::new(Frame {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Read a name, walking the frame chain outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Store into the nearest ancestor frame already holding the name.
    fn assign_in_ancestors(&self, name: &str, value: Value) -> bool {
        let mut frame = self.parent.clone();
        while let Some(f) = frame {
            if f.vars.borrow().contains_key(name) {
                f.vars.borrow_mut().insert(name.to_string(), value);
                return true;
            }
            frame = f.parent.clone();
        }
        false
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
    Goto(String),
}

/// Execute a module's top-level statements and return the global frame.
pub fn run_module(module: &Module) -> Result<Env, EvalError> {
    let globals = Frame::root();
    let nonlocals = FxHashSet::default();
    match exec_list(&module.body, &globals, &nonlocals)? {
        Flow::Goto(label) => Err(EvalError::UnknownLabel(label)),
        _ => Ok(globals),
    }
}

/// Call a function defined in the given frame.
pub fn call_function(
    env: &Env,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    let value = env
        .lookup(name)
        .ok_or_else(|| EvalError::UndefinedName(name.to_string()))?;
    call_value(&value, args)
}

fn call_value(value: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let closure = match value {
        Value::Func(c) => c,
        other => {
            return Err(EvalError::NotCallable(format!("{:?}", other)));
        }
    };

    if closure.params.len() != args.len() {
        return Err(EvalError::ArgumentCount {
            name: closure.name.clone(),
            expected: closure.params.len(),
            got: args.len(),
        });
    }

    let frame = Frame::child(&closure.env);
    for (param, arg) in closure.params.iter().zip(args) {
        frame
            .vars
            .borrow_mut()
            .insert(param.clone(), arg);
    }

    // Names declared nonlocal assign through to enclosing frames.
    let mut nonlocals = FxHashSet::default();
    for stmt in &closure.body {
        if let Stmt::Nonlocal(names) = stmt {
            for name in names {
                nonlocals.insert(name.clone());
            }
        }
    }

    match exec_list(&closure.body, &frame, &nonlocals)? {
        Flow::Return(value) => Ok(value),
        Flow::Goto(label) => Err(EvalError::UnknownLabel(label)),
        _ => Ok(Value::None),
    }
}

/// Execute one statement list. A goto first looks for its label at this
/// level; unresolved jumps propagate to the enclosing list.
fn exec_list(
    stmts: &[Stmt],
    env: &Env,
    nonlocals: &FxHashSet<String>,
) -> Result<Flow, EvalError> {
    let mut index = 0;

    while index < stmts.len() {
        let flow = exec_stmt(&stmts[index], env, nonlocals)?;
        match flow {
            Flow::Normal => index += 1,
            Flow::Goto(label) => {
                match stmts
                    .iter()
                    .position(|s| s.as_label_marker() == Some(label.as_str()))
                {
                    Some(pos) => index = pos + 1,
                    None => return Ok(Flow::Goto(label)),
                }
            }
            other => return Ok(other),
        }
    }

    Ok(Flow::Normal)
}

fn exec_stmt(
    stmt: &Stmt,
    env: &Env,
    nonlocals: &FxHashSet<String>,
) -> Result<Flow, EvalError> {
    if stmt.as_label_marker().is_some() {
        return Ok(Flow::Normal);
    }
    if let Some(target) = stmt.as_goto_marker() {
        return Ok(Flow::Goto(target.to_string()));
    }

    match stmt {
        Stmt::Expr(e) => {
            eval_expr(e, env, nonlocals)?;
            Ok(Flow::Normal)
        }

        Stmt::Assign { targets, value } => {
            let value = eval_expr(value, env, nonlocals)?;
            for target in targets {
                store(target, value.clone(), env, nonlocals)?;
            }
            Ok(Flow::Normal)
        }

        Stmt::Decl { name, init, .. } => {
            let value = match init {
                Some(e) => eval_expr(e, env, nonlocals)?,
                None => Value::None,
            };
            assign_name(name, value, env, nonlocals);
            Ok(Flow::Normal)
        }

        Stmt::If { test, body, orelse } => {
            if truthy(&eval_expr(test, env, nonlocals)?) {
                exec_list(body, env, nonlocals)
            } else {
                exec_list(orelse, env, nonlocals)
            }
        }

        Stmt::While { test, body, orelse } => {
            loop {
                if !truthy(&eval_expr(test, env, nonlocals)?) {
                    return exec_list(orelse, env, nonlocals);
                }
                match exec_list(body, env, nonlocals)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => return Ok(Flow::Normal),
                    other => return Ok(other),
                }
            }
        }

        Stmt::Return(value) => {
            let value = match value {
                Some(e) => eval_expr(e, env, nonlocals)?,
                None => Value::None,
            };
            Ok(Flow::Return(value))
        }

        Stmt::Break => Ok(Flow::Break),
        Stmt::Continue => Ok(Flow::Continue),
        Stmt::Pass | Stmt::Nonlocal(_) => Ok(Flow::Normal),

        Stmt::Block(inner) => exec_list(inner, env, nonlocals),

        Stmt::FuncDef {
            name,
            params,
            body,
            ..
        } => {
            let closure = Closure {
                name: name.clone(),
                params: params.iter().map(|p| p.name.clone()).collect(),
                body: body.clone(),
                env: Rc::clone(env),
            };
            assign_name(name, Value::Func(Rc::new(closure)), env, nonlocals);
            Ok(Flow::Normal)
        }

        Stmt::MatchCase { .. } => Err(EvalError::Unsupported("case")),
        Stmt::ClassDef { .. } => Err(EvalError::Unsupported("class")),
    }
}

fn store(
    target: &Expr,
    value: Value,
    env: &Env,
    nonlocals: &FxHashSet<String>,
) -> Result<(), EvalError> {
    match target {
        Expr::Ident(name) => {
            assign_name(name, value, env, nonlocals);
            Ok(())
        }
        Expr::Subscript {
            value: base,
            index,
        } => {
            let base = eval_expr(base, env, nonlocals)?;
            let index = eval_expr(index, env, nonlocals)?;
            match (base, index) {
                (Value::List(items), Value::Int(i)) => {
                    let mut items = items.borrow_mut();
                    let pos = resolve_index(i, items.len())?;
                    items[pos] = value;
                    Ok(())
                }
                (base, _) => Err(EvalError::BadOperand {
                    op: "subscript store".to_string(),
                    value: format!("{:?}", base),
                }),
            }
        }
        other => Err(EvalError::BadOperand {
            op: "assignment target".to_string(),
            value: format!("{:?}", other),
        }),
    }
}

fn assign_name(
    name: &str,
    value: Value,
    env: &Env,
    nonlocals: &FxHashSet<String>,
) {
    if nonlocals.contains(name) && env.assign_in_ancestors(name, value.clone())
    {
        return;
    }
    env.vars.borrow_mut().insert(name.to_string(), value);
}

fn eval_expr(
    expr: &Expr,
    env: &Env,
    nonlocals: &FxHashSet<String>,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Ident(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedName(name.clone())),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::NoneLit => Ok(Value::None),

        Expr::Unary { op, operand } => {
            let v = eval_expr(operand, env, nonlocals)?;
            match (op, v) {
                (UnOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
                (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                (UnOp::Not, v) => Ok(Value::Bool(!truthy(&v))),
                (UnOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
                (op, v) => Err(EvalError::BadOperand {
                    op: format!("{:?}", op),
                    value: format!("{:?}", v),
                }),
            }
        }

        Expr::Binary { op, left, right } => {
            let l = eval_expr(left, env, nonlocals)?;
            let r = eval_expr(right, env, nonlocals)?;
            binary(*op, l, r)
        }

        Expr::Compare { left, op, right } => {
            let l = eval_expr(left, env, nonlocals)?;
            let r = eval_expr(right, env, nonlocals)?;
            compare(*op, l, r)
        }

        Expr::Logic { op, values } => {
            let mut last = Value::None;
            for (i, value) in values.iter().enumerate() {
                last = eval_expr(value, env, nonlocals)?;
                let t = truthy(&last);
                let short = match op {
                    LogicOp::And => !t,
                    LogicOp::Or => t,
                };
                if short && i + 1 < values.len() {
                    return Ok(last);
                }
            }
            Ok(last)
        }

        Expr::Ternary { test, body, orelse } => {
            if truthy(&eval_expr(test, env, nonlocals)?) {
                eval_expr(body, env, nonlocals)
            } else {
                eval_expr(orelse, env, nonlocals)
            }
        }

        Expr::Call { func, args } => {
            if let Expr::Ident(name) = func.as_ref() {
                if let Some(result) =
                    call_builtin(name, args, env, nonlocals)?
                {
                    return Ok(result);
                }
            }
            let callee = eval_expr(func, env, nonlocals)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env, nonlocals)?);
            }
            call_value(&callee, values)
        }

        Expr::Subscript { value, index } => {
            let base = eval_expr(value, env, nonlocals)?;
            let index = eval_expr(index, env, nonlocals)?;
            match (base, index) {
                (Value::List(items), Value::Int(i)) => {
                    let items = items.borrow();
                    let pos = resolve_index(i, items.len())?;
                    Ok(items[pos].clone())
                }
                (base, _) => Err(EvalError::BadOperand {
                    op: "subscript".to_string(),
                    value: format!("{:?}", base),
                }),
            }
        }

        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, env, nonlocals)?);
            }
            Ok(Value::list(values))
        }

        Expr::Cast(inner) => eval_expr(inner, env, nonlocals),

        Expr::Assign { target, value } => {
            let value = eval_expr(value, env, nonlocals)?;
            store(target, value.clone(), env, nonlocals)?;
            Ok(value)
        }

        Expr::Attribute { .. } => Err(EvalError::Unsupported("attribute")),
    }
}

/// Builtins the parser and lowering pass emit. Returns `Ok(None)` when the
/// name is not a builtin.
fn call_builtin(
    name: &str,
    args: &[Expr],
    env: &Env,
    nonlocals: &FxHashSet<String>,
) -> Result<Option<Value>, EvalError> {
    match name {
        "__unbound" => {
            let label = match args.first() {
                Some(Expr::Str(s)) => s.clone(),
                _ => String::new(),
            };
            Err(EvalError::UninitializedCapture(label))
        }
        "ref" | "deref" => {
            let arg = args.first().ok_or(EvalError::BadOperand {
                op: name.to_string(),
                value: "missing operand".to_string(),
            })?;
            Ok(Some(eval_expr(arg, env, nonlocals)?))
        }
        "inc" | "dec" | "postfix_inc" | "postfix_dec" => {
            let target = match args.first() {
                Some(Expr::Ident(n)) => n,
                other => {
                    return Err(EvalError::BadOperand {
                        op: name.to_string(),
                        value: format!("{:?}", other),
                    });
                }
            };
            let old = env
                .lookup(target)
                .ok_or_else(|| EvalError::UndefinedName(target.clone()))?;
            let delta = if name.ends_with("inc") { 1 } else { -1 };
            let new = binary(BinOp::Add, old.clone(), Value::Int(delta))?;
            assign_name(target, new.clone(), env, nonlocals);
            if name.starts_with("postfix") {
                Ok(Some(old))
            } else {
                Ok(Some(new))
            }
        }
        _ => Ok(None),
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    use BinOp::*;

    if let (Value::Str(a), Add, Value::Str(b)) = (&l, op, &r) {
        return Ok(Value::Str(format!("{}{}", a, b)));
    }

    match (l, r) {
        (Value::Int(a), Value::Int(b)) => match op {
            Add => Ok(Value::Int(a.wrapping_add(b))),
            Sub => Ok(Value::Int(a.wrapping_sub(b))),
            Mul => Ok(Value::Int(a.wrapping_mul(b))),
            Div => {
                if b == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_div(b)))
                }
            }
            Mod => {
                if b == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_rem(b)))
                }
            }
            Shl => Ok(Value::Int(a.wrapping_shl(b as u32))),
            Shr => Ok(Value::Int(a.wrapping_shr(b as u32))),
            BitAnd => Ok(Value::Int(a & b)),
            BitOr => Ok(Value::Int(a | b)),
            BitXor => Ok(Value::Int(a ^ b)),
        },
        (l, r) => {
            let (a, b) = match (&l, &r) {
                (Value::Float(a), Value::Float(b)) => (*a, *b),
                (Value::Int(a), Value::Float(b)) => (*a as f64, *b),
                (Value::Float(a), Value::Int(b)) => (*a, *b as f64),
                _ => {
                    return Err(EvalError::BadOperand {
                        op: format!("{:?}", op),
                        value: format!("{:?} and {:?}", l, r),
                    });
                }
            };
            match op {
                Add => Ok(Value::Float(a + b)),
                Sub => Ok(Value::Float(a - b)),
                Mul => Ok(Value::Float(a * b)),
                Div => {
                    if b == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                other => Err(EvalError::BadOperand {
                    op: format!("{:?}", other),
                    value: "float".to_string(),
                }),
            }
        }
    }
}

fn compare(op: CmpOp, l: Value, r: Value) -> Result<Value, EvalError> {
    let result = match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        ordering => {
            let cmp = match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                (Value::Int(a), Value::Float(b)) => {
                    (*a as f64).partial_cmp(b)
                }
                (Value::Float(a), Value::Int(b)) => {
                    a.partial_cmp(&(*b as f64))
                }
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => {
                    return Err(EvalError::BadOperand {
                        op: format!("{:?}", ordering),
                        value: format!("{:?} and {:?}", l, r),
                    });
                }
            };
            let cmp = cmp.ok_or(EvalError::BadOperand {
                op: format!("{:?}", ordering),
                value: "NaN".to_string(),
            })?;
            match ordering {
                CmpOp::Lt => cmp == std::cmp::Ordering::Less,
                CmpOp::Le => cmp != std::cmp::Ordering::Greater,
                CmpOp::Gt => cmp == std::cmp::Ordering::Greater,
                CmpOp::Ge => cmp != std::cmp::Ordering::Less,
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.borrow().is_empty(),
        Value::None | Value::Unset => false,
        Value::Func(_) => true,
    }
}

fn resolve_index(index: i64, len: usize) -> Result<usize, EvalError> {
    let resolved = if index < 0 {
        index + len as i64
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(EvalError::BadIndex(index));
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::parser::parse::{Parser, Setting};

    fn run(source: &str) -> Env {
        let tokens = tokenize(source);
        let module = Parser::new(&tokens, Setting::default()).parse().unwrap();
        run_module(&module).unwrap()
    }

    fn global_int(env: &Env, name: &str) -> i64 {
        env.lookup(name).unwrap().as_int().unwrap()
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        let env = run("x = 2 + 3 * 4;");
        assert_eq!(global_int(&env, "x"), 14);
    }

    #[test]
    fn test_while_loop() {
        let env = run("i = 0; total = 0; while (i < 5) { total = total + i; i = i + 1; }");
        assert_eq!(global_int(&env, "total"), 10);
    }

    #[test]
    fn test_for_loop_desugaring_runs() {
        let env = run("total = 0; for (i = 0; i < 4; i++) { total = total + 2; }");
        assert_eq!(global_int(&env, "total"), 8);
    }

    #[test]
    fn test_function_call_and_return() {
        let env = run("int add(int a, int b) { return a + b; } r = add(3, 4);");
        assert_eq!(global_int(&env, "r"), 7);
    }

    #[test]
    fn test_closure_nonlocal_mutation() {
        let module = Module::new(vec![
            Stmt::Assign {
                targets: vec![Expr::ident("n")],
                value: Expr::Int(0),
            },
            Stmt::FuncDef {
                name: "bump".into(),
                params: vec![],
                body: vec![
                    Stmt::Nonlocal(vec!["n".into()]),
                    Stmt::Assign {
                        targets: vec![Expr::ident("n")],
                        value: Expr::Binary {
                            op: BinOp::Add,
                            left: Box::new(Expr::ident("n")),
                            right: Box::new(Expr::Int(1)),
                        },
                    },
                ],
                ret_text: None,
            },
        ]);
        let env = run_module(&module).unwrap();
        call_function(&env, "bump", vec![]).unwrap();
        call_function(&env, "bump", vec![]).unwrap();
        assert_eq!(global_int(&env, "n"), 2);
    }

    #[test]
    fn test_goto_markers_execute_directly() {
        let env = run("i = 0; L: i = i + 1; if (i < 3) goto L;");
        assert_eq!(global_int(&env, "i"), 3);
    }

    #[test]
    fn test_unknown_label_fails() {
        let tokens = tokenize("goto nowhere;");
        let module = Parser::new(&tokens, Setting::default()).parse().unwrap();
        assert_eq!(
            run_module(&module).unwrap_err(),
            EvalError::UnknownLabel("nowhere".to_string())
        );
    }

    #[test]
    fn test_unbound_guard_raises() {
        let module = Module::new(vec![Stmt::Expr(Expr::Call {
            func: Box::new(Expr::ident("__unbound")),
            args: vec![Expr::str("v4")],
        })]);
        assert_eq!(
            run_module(&module).unwrap_err(),
            EvalError::UninitializedCapture("v4".to_string())
        );
    }

    #[test]
    fn test_unset_sentinel_compares_equal_to_itself() {
        let env = run("x = __unset; hit = 0; if (x == __unset) { hit = 1; }");
        assert_eq!(global_int(&env, "hit"), 1);
    }

    #[test]
    fn test_comma_expression_yields_last() {
        let env = run("x = (1, 2, 3);");
        assert_eq!(global_int(&env, "x"), 3);
    }

    #[test]
    fn test_switch_dispatch_semantics() {
        let env = run(
            "x = 2; r = 0; switch (x) { case 1: r = 10; break; case 2: r = 20; break; default: r = 99; }",
        );
        assert_eq!(global_int(&env, "r"), 20);
    }

    #[test]
    fn test_switch_fallthrough() {
        let env = run(
            "x = 1; r = 0; switch (x) { case 1: r = r + 1; case 2: r = r + 2; default: r = r + 4; }",
        );
        // Fallthrough accumulates every arm from the match down.
        assert_eq!(global_int(&env, "r"), 7);
    }

    #[test]
    fn test_division_by_zero() {
        let tokens = tokenize("x = 1 / 0;");
        let module = Parser::new(&tokens, Setting::default()).parse().unwrap();
        assert_eq!(run_module(&module).unwrap_err(), EvalError::DivisionByZero);
    }
}

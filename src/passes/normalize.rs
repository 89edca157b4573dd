//! Scope-aware identifier normalization
//!
//! Structure-preserving rename pass: callables, variables, and parameters
//! move to snake_case, class names to PascalCase, and nothing else about the
//! tree changes. A stack of per-scope rename maps (module, function, class)
//! drives resolution: reads walk the stack innermost-outward and names that
//! never resolve are left alone, since they belong to some outer world this
//! fragment cannot see.
//!
//! Defining names are recorded in the current scope before their bodies are
//! walked, so recursion and forward references inside the same scope pick up
//! the renamed spelling. `nonlocal` declarations retarget the enclosing
//! scope's map instead of the current one.
//!
//! Attribute renames are deliberately narrow: only accesses through the
//! enclosing method's first parameter (the self-like receiver) are renamed,
//! through the nearest class's attribute map. A field that happens to share
//! a name on some unrelated object is never touched.
//!
//! Both case conversions are no-ops on names already in their convention,
//! which makes the whole pass idempotent.

use crate::ir::{CasePattern, Expr, Module, Param, Stmt};
use rustc_hash::FxHashMap;

/// Normalize every identifier in the module.
pub fn normalize(module: Module) -> Module {
    let mut scopes = Scopes::new();
    let body = scopes.norm_stmts(module.body);
    Module::new(body)
}

/// Case-transition-aware snake_case conversion. Already-snake names pass
/// through unchanged, including embedded underscores.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1);

            let after_word = matches!(
                prev,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit()
            );
            let upper_run_ending = matches!(prev, Some(p) if p.is_ascii_uppercase())
                && matches!(next, Some(n) if n.is_ascii_lowercase());

            if after_word || upper_run_ending {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Capitalized-compound-word conversion for type-like names. Splits on
/// underscores and case transitions; leading underscores survive.
pub fn to_pascal_case(name: &str) -> String {
    let lead: String = name.chars().take_while(|&c| c == '_').collect();
    let rest = &name[lead.len()..];

    let chars: Vec<char> = rest.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1);
            let after_word = matches!(
                prev,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit()
            );
            let upper_run_ending = matches!(prev, Some(p) if p.is_ascii_uppercase())
                && matches!(next, Some(n) if n.is_ascii_lowercase());
            if after_word || upper_run_ending {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = lead;
    for word in words {
        let mut cs = word.chars();
        if let Some(first) = cs.next() {
            out.push(first.to_ascii_uppercase());
            for c in cs {
                out.push(c.to_ascii_lowercase());
            }
        }
    }
    out
}

struct ClassCtx {
    attrs: FxHashMap<String, String>,
    receiver: Option<String>,
}

struct Scopes {
    stack: Vec<FxHashMap<String, String>>,
    classes: Vec<ClassCtx>,
}

impl Scopes {
    fn new() -> Self {
        Scopes {
            stack: vec![FxHashMap::default()],
            classes: Vec::new(),
        }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        for scope in self.stack.iter().rev() {
            if let Some(renamed) = scope.get(name) {
                return Some(renamed.clone());
            }
        }
        None
    }

    /// Record a defining name in the current scope (reusing an existing
    /// mapping so redefinitions stay stable).
    fn define(&mut self, name: &str) -> String {
        if let Some(renamed) = self.stack.last().unwrap().get(name) {
            return renamed.clone();
        }
        let renamed = to_snake_case(name);
        self.stack
            .last_mut()
            .unwrap()
            .insert(name.to_string(), renamed.clone());
        renamed
    }

    /// Resolve an assignment target, defining it in the current scope when
    /// nothing up the stack knows it.
    fn target(&mut self, name: &str) -> String {
        match self.resolve(name) {
            Some(renamed) => renamed,
            None => self.define(name),
        }
    }

    /// `nonlocal` names bind in the enclosing scope, not the current one.
    fn nonlocal_target(&mut self, name: &str) -> String {
        let depth = self.stack.len();
        for scope in self.stack[..depth - 1].iter().rev() {
            if let Some(renamed) = scope.get(name) {
                return renamed.clone();
            }
        }
        let renamed = to_snake_case(name);
        let enclosing = depth.saturating_sub(2);
        self.stack[enclosing].insert(name.to_string(), renamed.clone());
        renamed
    }

    fn norm_stmts(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        stmts.into_iter().map(|s| self.norm_stmt(s)).collect()
    }

    fn norm_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Expr(e) => Stmt::Expr(self.norm_expr(e)),

            Stmt::Assign { targets, value } => {
                let value = self.norm_expr(value);
                let targets = targets
                    .into_iter()
                    .map(|t| match t {
                        Expr::Ident(name) => Expr::Ident(self.target(&name)),
                        other => self.norm_expr(other),
                    })
                    .collect();
                Stmt::Assign { targets, value }
            }

            Stmt::Decl {
                type_text,
                name,
                pointer_depth,
                dims,
                init,
            } => Stmt::Decl {
                type_text,
                name: self.target(&name),
                pointer_depth,
                dims: dims
                    .into_iter()
                    .map(|d| d.map(|e| self.norm_expr(e)))
                    .collect(),
                init: init.map(|e| self.norm_expr(e)),
            },

            Stmt::If { test, body, orelse } => Stmt::If {
                test: self.norm_expr(test),
                body: self.norm_stmts(body),
                orelse: self.norm_stmts(orelse),
            },
            Stmt::While { test, body, orelse } => Stmt::While {
                test: self.norm_expr(test),
                body: self.norm_stmts(body),
                orelse: self.norm_stmts(orelse),
            },
            Stmt::Return(value) => {
                Stmt::Return(value.map(|e| self.norm_expr(e)))
            }
            Stmt::Block(inner) => Stmt::Block(self.norm_stmts(inner)),
            Stmt::MatchCase { pattern, body } => Stmt::MatchCase {
                pattern: match pattern {
                    CasePattern::Values(values) => CasePattern::Values(
                        values
                            .into_iter()
                            .map(|e| self.norm_expr(e))
                            .collect(),
                    ),
                    CasePattern::Default => CasePattern::Default,
                },
                body: self.norm_stmts(body),
            },

            Stmt::FuncDef {
                name,
                params,
                body,
                ret_text,
            } => self.norm_funcdef(name, params, body, ret_text, false),

            Stmt::ClassDef { name, body } => {
                let renamed = match self.stack.last().unwrap().get(&name) {
                    Some(r) => r.clone(),
                    None => {
                        let r = to_pascal_case(&name);
                        self.stack
                            .last_mut()
                            .unwrap()
                            .insert(name.clone(), r.clone());
                        r
                    }
                };

                self.stack.push(FxHashMap::default());
                self.classes.push(ClassCtx {
                    attrs: FxHashMap::default(),
                    receiver: None,
                });

                let body = body
                    .into_iter()
                    .map(|s| match s {
                        Stmt::FuncDef {
                            name,
                            params,
                            body,
                            ret_text,
                        } => self.norm_funcdef(name, params, body, ret_text, true),
                        other => self.norm_stmt(other),
                    })
                    .collect();

                self.classes.pop();
                self.stack.pop();

                Stmt::ClassDef {
                    name: renamed,
                    body,
                }
            }

            Stmt::Nonlocal(names) => Stmt::Nonlocal(
                names.iter().map(|n| self.nonlocal_target(n)).collect(),
            ),

            other @ (Stmt::Break | Stmt::Continue | Stmt::Pass) => other,
        }
    }

    fn norm_funcdef(
        &mut self,
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        ret_text: Option<String>,
        is_method: bool,
    ) -> Stmt {
        // Record the name before descending so recursion resolves.
        let renamed = self.define(&name);

        self.stack.push(FxHashMap::default());
        let params: Vec<Param> = params
            .into_iter()
            .map(|p| Param {
                name: self.define(&p.name),
                type_text: p.type_text,
            })
            .collect();

        let saved_receiver = if is_method {
            let ctx = self.classes.last_mut().unwrap();
            let old = ctx.receiver.take();
            ctx.receiver = params.first().map(|p| p.name.clone());
            Some(old)
        } else {
            None
        };

        let body = self.norm_stmts(body);

        if let Some(old) = saved_receiver {
            self.classes.last_mut().unwrap().receiver = old;
        }
        self.stack.pop();

        Stmt::FuncDef {
            name: renamed,
            params,
            body,
            ret_text,
        }
    }

    fn norm_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Ident(name) => match self.resolve(&name) {
                Some(renamed) => Expr::Ident(renamed),
                None => Expr::Ident(name),
            },

            Expr::Assign { target, value } => {
                let value = self.norm_expr(*value);
                let target = match *target {
                    Expr::Ident(name) => Expr::Ident(self.target(&name)),
                    other => self.norm_expr(other),
                };
                Expr::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                }
            }

            Expr::Attribute { value, attr } => {
                let value = self.norm_expr(*value);
                let attr = if self.is_self_receiver(&value) {
                    let ctx = self.classes.last_mut().unwrap();
                    match ctx.attrs.get(&attr) {
                        Some(renamed) => renamed.clone(),
                        None => {
                            let renamed = to_snake_case(&attr);
                            ctx.attrs.insert(attr, renamed.clone());
                            renamed
                        }
                    }
                } else {
                    attr
                };
                Expr::Attribute {
                    value: Box::new(value),
                    attr,
                }
            }

            Expr::Unary { op, operand } => Expr::Unary {
                op,
                operand: Box::new(self.norm_expr(*operand)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(self.norm_expr(*left)),
                right: Box::new(self.norm_expr(*right)),
            },
            Expr::Compare { left, op, right } => Expr::Compare {
                left: Box::new(self.norm_expr(*left)),
                op,
                right: Box::new(self.norm_expr(*right)),
            },
            Expr::Logic { op, values } => Expr::Logic {
                op,
                values: values
                    .into_iter()
                    .map(|e| self.norm_expr(e))
                    .collect(),
            },
            Expr::Call { func, args } => Expr::Call {
                func: Box::new(self.norm_expr(*func)),
                args: args.into_iter().map(|e| self.norm_expr(e)).collect(),
            },
            Expr::Subscript { value, index } => Expr::Subscript {
                value: Box::new(self.norm_expr(*value)),
                index: Box::new(self.norm_expr(*index)),
            },
            Expr::Ternary { test, body, orelse } => Expr::Ternary {
                test: Box::new(self.norm_expr(*test)),
                body: Box::new(self.norm_expr(*body)),
                orelse: Box::new(self.norm_expr(*orelse)),
            },
            Expr::List(items) => Expr::List(
                items.into_iter().map(|e| self.norm_expr(e)).collect(),
            ),
            Expr::Cast(inner) => Expr::Cast(Box::new(self.norm_expr(*inner))),

            literal => literal,
        }
    }

    fn is_self_receiver(&self, value: &Expr) -> bool {
        if let (Expr::Ident(name), Some(ctx)) = (value, self.classes.last()) {
            ctx.receiver.as_deref() == Some(name.as_str())
        } else {
            false
        }
    }
}

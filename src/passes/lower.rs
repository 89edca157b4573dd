//! Goto/label lowering: unstructured jumps become a dispatch loop
//!
//! A body containing label/goto markers is rewritten into:
//!
//! ```text
//! <leading side-effect-free initializations>      (shared by all blocks)
//! <captured locals pre-initialized to __unset>
//! __goto_result = __unset
//! __goto_label = "start"
//! def __block_start(): ...                        (one callable per block)
//! def __block_L(): ...
//! while true:                                     (the dispatch loop)
//!     if __goto_label == "start": __goto_label = __block_start()
//!     elif __goto_label == "L":   __goto_label = __block_L()
//!     else: break
//! return __goto_result                            (function bodies only)
//! ```
//!
//! Each block callable returns the next label name, or the stop sentinel.
//! Inside a block, `goto L` becomes `return "L"` and a real `return e`
//! becomes a result-holder assignment followed by the stop sentinel, so
//! every real return funnels through the single dispatch exit.
//!
//! A label's block body is its continuation: the statements following it
//! through the end of every enclosing compound statement, threaded outward
//! (a label inside a loop body gets the loop itself appended, modeling the
//! fall-through back into the remaining iterations). Nested labels collapse
//! to a fixed point: any statement list is truncated at the first tracked
//! label marker and ends with a jump instead, so no trailing code is
//! duplicated under two blocks. The fixed point uses a single
//! did-anything-change flag; truncation only ever shortens a body, so the
//! loop terminates even on self- or mutually-referential label graphs.
//!
//! Locals touched by a block are captured with `nonlocal` so mutations are
//! visible across block invocations; a captured variable read before any
//! assignment inside its block gets a fail-fast `__unbound` guard instead of
//! silently reading an undefined value.

use crate::ir::{CmpOp, Expr, Module, Stmt};
use crate::passes::dce;
use rustc_hash::{FxHashMap, FxHashSet};

/// Dispatch variable holding the next label name.
pub const LABEL_VAR: &str = "__goto_label";
/// Shared holder for the function's real return value.
pub const RESULT_VAR: &str = "__goto_result";
/// Name bound to the uninitialized sentinel value.
pub const UNSET_VAR: &str = "__unset";
/// Return value meaning "stop dispatching".
pub const STOP_LABEL: &str = "__stop";
/// Dispatch key of the pre-label block.
pub const START_LABEL: &str = "start";
/// Fail-fast builtin raised when a captured variable is read unset.
pub const UNBOUND_FN: &str = "__unbound";

/// Name of the callable generated for a label's block.
pub fn block_fn_name(label: &str) -> String {
    format!("__block_{}", label)
}

/// Lower every function body (and the module body) containing goto/label
/// markers. Bodies without markers pass through untouched.
pub fn lower(module: Module) -> Module {
    let body: Vec<Stmt> = module.body.into_iter().map(lower_stmt).collect();
    Module::new(lower_body(body, false, &[]))
}

fn lower_stmt(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::FuncDef {
            name,
            params,
            body,
            ret_text,
        } => {
            let body: Vec<Stmt> = body.into_iter().map(lower_stmt).collect();
            let param_names: Vec<String> =
                params.iter().map(|p| p.name.clone()).collect();
            Stmt::FuncDef {
                name,
                params,
                body: lower_body(body, true, &param_names),
                ret_text,
            }
        }
        Stmt::ClassDef { name, body } => Stmt::ClassDef {
            name,
            body: body.into_iter().map(lower_stmt).collect(),
        },
        other => other,
    }
}

fn lower_body(
    body: Vec<Stmt>,
    is_function: bool,
    param_names: &[String],
) -> Vec<Stmt> {
    if !contains_markers(&body) {
        return body;
    }

    let mut labels = FxHashSet::default();
    collect_labels(&body, &mut labels);

    let mut blocks: FxHashMap<String, Vec<Stmt>> = FxHashMap::default();
    extract_blocks(&body, &[], &mut blocks);
    collapse_blocks(&mut blocks, &labels);

    // Locals of the original body; mutations to these must stay visible
    // across block invocations.
    let mut locals = FxHashSet::default();
    for name in param_names {
        locals.insert(name.clone());
    }
    collect_locals(&body, &mut locals);
    locals.insert(RESULT_VAR.to_string());

    // Shared leading run of simple initializations.
    let init_len = leading_init_len(&body);
    let leading: Vec<Stmt> = body[..init_len].to_vec();
    let start_source = {
        let mut changed = false;
        truncate_at_labels(body[init_len..].to_vec(), &labels, &mut changed)
    };

    let mut names: Vec<String> = labels
        .iter()
        .filter(|l| blocks.contains_key(l.as_str()))
        .cloned()
        .collect();
    names.sort();

    let mut defs = Vec::new();
    let mut captured_union: FxHashSet<String> = FxHashSet::default();

    let start_def =
        build_block_fn(START_LABEL, start_source, &labels, &locals, &mut captured_union);
    defs.push(start_def);
    for name in &names {
        let source = blocks.remove(name).unwrap_or_default();
        let def =
            build_block_fn(name, source, &labels, &locals, &mut captured_union);
        defs.push(def);
    }

    // Captured locals the leading inits do not cover start out unset, so
    // the fail-fast guards have something to test.
    let initialized: FxHashSet<&str> = leading
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Assign { targets, .. } => match targets.as_slice() {
                [Expr::Ident(name)] => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    let mut unset_names: Vec<&String> = captured_union
        .iter()
        .filter(|n| {
            n.as_str() != RESULT_VAR
                && !initialized.contains(n.as_str())
                && !param_names.contains(*n)
        })
        .collect();
    unset_names.sort();

    let mut out = leading;
    for name in unset_names {
        out.push(assign(name, Expr::ident(UNSET_VAR)));
    }
    out.push(assign(RESULT_VAR, Expr::ident(UNSET_VAR)));
    out.push(assign(LABEL_VAR, Expr::str(START_LABEL)));
    out.extend(defs);
    out.push(dispatch_loop(&names));
    if is_function {
        out.push(Stmt::Return(Some(Expr::ident(RESULT_VAR))));
    }

    out
}

fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        targets: vec![Expr::ident(name)],
        value,
    }
}

/// One block callable: nonlocal captures, unset guards, then the reified and
/// dead-code-eliminated body.
fn build_block_fn(
    label: &str,
    source: Vec<Stmt>,
    labels: &FxHashSet<String>,
    locals: &FxHashSet<String>,
    captured_union: &mut FxHashSet<String>,
) -> Stmt {
    let body = reify_block(source, labels);
    let body = dce::eliminate_body(body);

    let (touched, read_before) = scan_usage(&body);

    let mut captured: Vec<String> = touched
        .iter()
        .filter(|n| locals.contains(*n))
        .cloned()
        .collect();
    captured.sort();
    for name in &captured {
        captured_union.insert(name.clone());
    }

    let mut guards: Vec<String> = read_before
        .iter()
        .filter(|n| locals.contains(*n))
        .cloned()
        .collect();
    guards.sort();

    let mut fn_body = Vec::new();
    if !captured.is_empty() {
        fn_body.push(Stmt::Nonlocal(captured));
    }
    for name in guards {
        fn_body.push(Stmt::If {
            test: Expr::Compare {
                left: Box::new(Expr::Ident(name.clone())),
                op: CmpOp::Eq,
                right: Box::new(Expr::ident(UNSET_VAR)),
            },
            body: vec![Stmt::Expr(Expr::Call {
                func: Box::new(Expr::ident(UNBOUND_FN)),
                args: vec![Expr::Str(name)],
            })],
            orelse: Vec::new(),
        });
    }
    fn_body.extend(body);

    Stmt::FuncDef {
        name: block_fn_name(label),
        params: Vec::new(),
        body: fn_body,
        ret_text: None,
    }
}

/// The loop that keeps invoking block callables until the stop sentinel (or
/// an unknown label) comes back. `start` is checked first, then every label
/// in sorted order.
fn dispatch_loop(names: &[String]) -> Stmt {
    let mut chain = vec![Stmt::Break];
    for name in names.iter().rev() {
        chain = vec![dispatch_arm(name, chain)];
    }

    Stmt::While {
        test: Expr::Bool(true),
        body: vec![dispatch_arm(START_LABEL, chain)],
        orelse: Vec::new(),
    }
}

fn dispatch_arm(name: &str, orelse: Vec<Stmt>) -> Stmt {
    Stmt::If {
        test: Expr::Compare {
            left: Box::new(Expr::ident(LABEL_VAR)),
            op: CmpOp::Eq,
            right: Box::new(Expr::str(name)),
        },
        body: vec![assign(
            LABEL_VAR,
            Expr::Call {
                func: Box::new(Expr::Ident(block_fn_name(name))),
                args: Vec::new(),
            },
        )],
        orelse,
    }
}

// ===== marker discovery =====

fn contains_markers(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| {
        if stmt.as_label_marker().is_some() || stmt.as_goto_marker().is_some()
        {
            return true;
        }
        match stmt {
            Stmt::If { body, orelse, .. } | Stmt::While { body, orelse, .. } => {
                contains_markers(body) || contains_markers(orelse)
            }
            Stmt::Block(inner) => contains_markers(inner),
            Stmt::MatchCase { body, .. } => contains_markers(body),
            _ => false,
        }
    })
}

fn collect_labels(stmts: &[Stmt], labels: &mut FxHashSet<String>) {
    for stmt in stmts {
        if let Some(name) = stmt.as_label_marker() {
            labels.insert(name.to_string());
        }
        match stmt {
            Stmt::If { body, orelse, .. } | Stmt::While { body, orelse, .. } => {
                collect_labels(body, labels);
                collect_labels(orelse, labels);
            }
            Stmt::Block(inner) => collect_labels(inner, labels),
            Stmt::MatchCase { body, .. } => collect_labels(body, labels),
            _ => {}
        }
    }
}

// ===== continuation threading =====

/// For every label, record the statements following it through the end of
/// each enclosing compound statement. A loop body's continuation re-enters
/// the loop itself before the code after it.
fn extract_blocks(
    stmts: &[Stmt],
    continuation: &[Stmt],
    blocks: &mut FxHashMap<String, Vec<Stmt>>,
) {
    for (i, stmt) in stmts.iter().enumerate() {
        if let Some(name) = stmt.as_label_marker() {
            let mut code: Vec<Stmt> = stmts[i + 1..].to_vec();
            code.extend_from_slice(continuation);
            blocks.insert(name.to_string(), code);
        }

        let after = || {
            let mut rest: Vec<Stmt> = stmts[i + 1..].to_vec();
            rest.extend_from_slice(continuation);
            rest
        };

        match stmt {
            Stmt::If { body, orelse, .. } => {
                let rest = after();
                extract_blocks(body, &rest, blocks);
                extract_blocks(orelse, &rest, blocks);
            }
            Stmt::While { body, orelse, .. } => {
                let rest = after();
                let mut looped = vec![stmt.clone()];
                looped.extend_from_slice(&rest);
                extract_blocks(body, &looped, blocks);
                extract_blocks(orelse, &rest, blocks);
            }
            Stmt::Block(inner) => {
                let rest = after();
                extract_blocks(inner, &rest, blocks);
            }
            Stmt::MatchCase { body, .. } => {
                let rest = after();
                extract_blocks(body, &rest, blocks);
            }
            _ => {}
        }
    }
}

/// Collapse nested labels: every stored block is truncated at the first
/// tracked label marker, repeated until nothing changes.
fn collapse_blocks(
    blocks: &mut FxHashMap<String, Vec<Stmt>>,
    labels: &FxHashSet<String>,
) {
    let mut names: Vec<String> = blocks.keys().cloned().collect();
    names.sort();

    loop {
        let mut changed = false;
        for name in &names {
            if let Some(body) = blocks.remove(name) {
                let truncated = truncate_at_labels(body, labels, &mut changed);
                blocks.insert(name.clone(), truncated);
            }
        }
        if !changed {
            break;
        }
    }
}

/// Cut a statement list at the first tracked label marker, replacing the
/// tail with a jump to that label. Recurses into compound bodies.
fn truncate_at_labels(
    stmts: Vec<Stmt>,
    labels: &FxHashSet<String>,
    changed: &mut bool,
) -> Vec<Stmt> {
    let mut out = Vec::new();

    for stmt in stmts {
        if let Some(name) = stmt.as_label_marker() {
            if labels.contains(name) {
                out.push(Stmt::goto_marker(name));
                *changed = true;
                return out;
            }
        }

        out.push(match stmt {
            Stmt::If { test, body, orelse } => Stmt::If {
                test,
                body: truncate_at_labels(body, labels, changed),
                orelse: truncate_at_labels(orelse, labels, changed),
            },
            Stmt::While { test, body, orelse } => Stmt::While {
                test,
                body: truncate_at_labels(body, labels, changed),
                orelse: truncate_at_labels(orelse, labels, changed),
            },
            Stmt::Block(inner) => {
                Stmt::Block(truncate_at_labels(inner, labels, changed))
            }
            Stmt::MatchCase { pattern, body } => Stmt::MatchCase {
                pattern,
                body: truncate_at_labels(body, labels, changed),
            },
            other => other,
        });
    }

    out
}

// ===== block reification =====

/// Rewrite a block body into callable form: tracked gotos return the target
/// label, real returns store the result and return the stop sentinel, and a
/// fall-through off the end stops dispatch.
fn reify_block(stmts: Vec<Stmt>, labels: &FxHashSet<String>) -> Vec<Stmt> {
    let mut body = reify_list(stmts, labels);
    if !matches!(body.last(), Some(Stmt::Return(_))) {
        body.push(Stmt::Return(Some(Expr::str(STOP_LABEL))));
    }
    body
}

fn reify_list(stmts: Vec<Stmt>, labels: &FxHashSet<String>) -> Vec<Stmt> {
    let mut out = Vec::new();

    for stmt in stmts {
        if stmt.as_label_marker().is_some() {
            continue;
        }
        let goto_target = stmt.as_goto_marker().map(str::to_string);
        if let Some(target) = goto_target {
            if labels.contains(&target) {
                out.push(Stmt::Return(Some(Expr::Str(target))));
            } else {
                // Unknown target: leave the marker alone.
                out.push(stmt);
            }
            continue;
        }

        match stmt {
            Stmt::Return(Some(value)) => {
                out.push(assign(RESULT_VAR, value));
                out.push(Stmt::Return(Some(Expr::str(STOP_LABEL))));
            }
            Stmt::Return(None) => {
                out.push(Stmt::Return(Some(Expr::str(STOP_LABEL))));
            }
            Stmt::If { test, body, orelse } => out.push(Stmt::If {
                test,
                body: reify_list(body, labels),
                orelse: reify_list(orelse, labels),
            }),
            Stmt::While { test, body, orelse } => out.push(Stmt::While {
                test,
                body: reify_list(body, labels),
                orelse: reify_list(orelse, labels),
            }),
            Stmt::Block(inner) => {
                out.push(Stmt::Block(reify_list(inner, labels)))
            }
            Stmt::MatchCase { pattern, body } => out.push(Stmt::MatchCase {
                pattern,
                body: reify_list(body, labels),
            }),
            other => out.push(other),
        }
    }

    out
}

// ===== variable analysis =====

/// Names assigned anywhere in the body (declaration targets included).
fn collect_locals(stmts: &[Stmt], locals: &mut FxHashSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { targets, value } => {
                if stmt.as_label_marker().is_none()
                    && stmt.as_goto_marker().is_none()
                {
                    for target in targets {
                        if let Expr::Ident(name) = target {
                            locals.insert(name.clone());
                        }
                    }
                }
                collect_expr_targets(value, locals);
            }
            Stmt::Decl { name, init, .. } => {
                locals.insert(name.clone());
                if let Some(init) = init {
                    collect_expr_targets(init, locals);
                }
            }
            Stmt::Expr(e) | Stmt::Return(Some(e)) => {
                collect_expr_targets(e, locals)
            }
            Stmt::If { test, body, orelse }
            | Stmt::While { test, body, orelse } => {
                collect_expr_targets(test, locals);
                collect_locals(body, locals);
                collect_locals(orelse, locals);
            }
            Stmt::Block(inner) => collect_locals(inner, locals),
            Stmt::MatchCase { body, .. } => collect_locals(body, locals),
            _ => {}
        }
    }
}

/// Inline-assignment targets hidden inside expressions.
fn collect_expr_targets(expr: &Expr, locals: &mut FxHashSet<String>) {
    walk_expr(expr, &mut |e| {
        if let Expr::Assign { target, .. } = e {
            if let Expr::Ident(name) = target.as_ref() {
                locals.insert(name.clone());
            }
        }
    });
}

fn walk_expr(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    match expr {
        Expr::Unary { operand, .. } => walk_expr(operand, f),
        Expr::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Compare { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Logic { values, .. } | Expr::List(values) => {
            for v in values {
                walk_expr(v, f);
            }
        }
        Expr::Call { func, args } => {
            walk_expr(func, f);
            for a in args {
                walk_expr(a, f);
            }
        }
        Expr::Subscript { value, index } => {
            walk_expr(value, f);
            walk_expr(index, f);
        }
        Expr::Attribute { value, .. } => walk_expr(value, f),
        Expr::Ternary { test, body, orelse } => {
            walk_expr(test, f);
            walk_expr(body, f);
            walk_expr(orelse, f);
        }
        Expr::Cast(inner) => walk_expr(inner, f),
        Expr::Assign { target, value } => {
            walk_expr(target, f);
            walk_expr(value, f);
        }
        _ => {}
    }
}

/// Touched names and the subset that may be read before this block assigns
/// them. Branch analysis is conservative: only names assigned on every path
/// count as definitely assigned.
fn scan_usage(stmts: &[Stmt]) -> (FxHashSet<String>, FxHashSet<String>) {
    let mut touched = FxHashSet::default();
    let mut read_before = FxHashSet::default();
    let mut assigned = FxHashSet::default();
    scan_stmts(stmts, &mut assigned, &mut touched, &mut read_before);
    (touched, read_before)
}

fn scan_stmts(
    stmts: &[Stmt],
    assigned: &mut FxHashSet<String>,
    touched: &mut FxHashSet<String>,
    read_before: &mut FxHashSet<String>,
) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { targets, value } => {
                scan_expr(value, assigned, touched, read_before);
                for target in targets {
                    match target {
                        Expr::Ident(name) => {
                            touched.insert(name.clone());
                            assigned.insert(name.clone());
                        }
                        other => {
                            scan_expr(other, assigned, touched, read_before)
                        }
                    }
                }
            }
            Stmt::Decl { name, dims, init, .. } => {
                for dim in dims.iter().flatten() {
                    scan_expr(dim, assigned, touched, read_before);
                }
                if let Some(init) = init {
                    scan_expr(init, assigned, touched, read_before);
                }
                touched.insert(name.clone());
                assigned.insert(name.clone());
            }
            Stmt::Expr(e) | Stmt::Return(Some(e)) => {
                scan_expr(e, assigned, touched, read_before)
            }
            Stmt::If { test, body, orelse } => {
                scan_expr(test, assigned, touched, read_before);
                let mut then_assigned = assigned.clone();
                scan_stmts(body, &mut then_assigned, touched, read_before);
                let mut else_assigned = assigned.clone();
                scan_stmts(orelse, &mut else_assigned, touched, read_before);
                for name in then_assigned.intersection(&else_assigned) {
                    assigned.insert(name.clone());
                }
            }
            Stmt::While { test, body, orelse } => {
                scan_expr(test, assigned, touched, read_before);
                // The body may never run.
                let mut body_assigned = assigned.clone();
                scan_stmts(body, &mut body_assigned, touched, read_before);
                let mut orelse_assigned = assigned.clone();
                scan_stmts(orelse, &mut orelse_assigned, touched, read_before);
            }
            Stmt::Block(inner) => {
                scan_stmts(inner, assigned, touched, read_before)
            }
            Stmt::MatchCase { body, .. } => {
                let mut body_assigned = assigned.clone();
                scan_stmts(body, &mut body_assigned, touched, read_before);
            }
            _ => {}
        }
    }
}

fn scan_expr(
    expr: &Expr,
    assigned: &mut FxHashSet<String>,
    touched: &mut FxHashSet<String>,
    read_before: &mut FxHashSet<String>,
) {
    match expr {
        Expr::Ident(name) => {
            touched.insert(name.clone());
            if !assigned.contains(name) {
                read_before.insert(name.clone());
            }
        }
        Expr::Assign { target, value } => {
            scan_expr(value, assigned, touched, read_before);
            if let Expr::Ident(name) = target.as_ref() {
                touched.insert(name.clone());
                assigned.insert(name.clone());
            } else {
                scan_expr(target, assigned, touched, read_before);
            }
        }
        Expr::Call { func, args } => {
            // A bare callee name is a function reference, not a data read.
            if !matches!(func.as_ref(), Expr::Ident(_)) {
                scan_expr(func, assigned, touched, read_before);
            }
            for a in args {
                scan_expr(a, assigned, touched, read_before);
            }
        }
        Expr::Unary { operand, .. } => {
            scan_expr(operand, assigned, touched, read_before)
        }
        Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
            scan_expr(left, assigned, touched, read_before);
            scan_expr(right, assigned, touched, read_before);
        }
        Expr::Logic { values, .. } | Expr::List(values) => {
            for v in values {
                scan_expr(v, assigned, touched, read_before);
            }
        }
        Expr::Subscript { value, index } => {
            scan_expr(value, assigned, touched, read_before);
            scan_expr(index, assigned, touched, read_before);
        }
        Expr::Attribute { value, .. } => {
            scan_expr(value, assigned, touched, read_before)
        }
        Expr::Ternary { test, body, orelse } => {
            scan_expr(test, assigned, touched, read_before);
            scan_expr(body, assigned, touched, read_before);
            scan_expr(orelse, assigned, touched, read_before);
        }
        Expr::Cast(inner) => scan_expr(inner, assigned, touched, read_before),
        _ => {}
    }
}

/// Length of the leading run of side-effect-free simple initializations.
fn leading_init_len(body: &[Stmt]) -> usize {
    let mut len = 0;
    for stmt in body {
        match stmt {
            Stmt::Assign { targets, value }
                if targets.iter().all(|t| matches!(t, Expr::Ident(_)))
                    && value.is_literal() =>
            {
                len += 1;
            }
            _ => break,
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::parser::parse::{Parser, Setting};

    fn lowered(source: &str) -> Vec<Stmt> {
        let tokens = tokenize(source);
        let module = Parser::new(&tokens, Setting::default()).parse().unwrap();
        lower(module).body
    }

    fn find_def<'a>(body: &'a [Stmt], name: &str) -> &'a Vec<Stmt> {
        body.iter()
            .find_map(|stmt| match stmt {
                Stmt::FuncDef {
                    name: n, body: b, ..
                } if n == name => Some(b),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no def named {}", name))
    }

    #[test]
    fn test_no_markers_is_a_noop() {
        let body = lowered("x = 1; y = x + 1;");
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::Assign { .. }));
    }

    #[test]
    fn test_basic_lowering_shape() {
        let body = lowered("int i = 0; L: i = i + 1; if (i < 3) goto L;");

        // Leading init stays shared and top-level.
        assert_eq!(
            body[0],
            Stmt::Assign {
                targets: vec![Expr::ident("i")],
                value: Expr::Int(0),
            }
        );

        // Block callables for start and the label, plus the dispatch loop.
        find_def(&body, "__block_start");
        find_def(&body, "__block_L");
        assert!(body.iter().any(|s| matches!(s, Stmt::While { .. })));

        // No markers survive lowering.
        let text = format!("{:?}", body);
        assert!(!text.contains("LABEL"));
    }

    #[test]
    fn test_goto_becomes_label_return() {
        let body = lowered("L: x = 1; goto L;");
        let block = find_def(&body, "__block_L");
        assert!(block.contains(&Stmt::Return(Some(Expr::str("L")))));
    }

    #[test]
    fn test_real_return_funnels_through_result() {
        let body = lowered("int f() { L: x = 1; if (x) goto L; return x; }");
        match &body[0] {
            Stmt::FuncDef { body, .. } => {
                let block = find_def(body, "__block_L");
                assert!(block.iter().any(|s| matches!(
                    s,
                    Stmt::Assign { targets, .. }
                        if targets == &vec![Expr::ident(RESULT_VAR)]
                )));
                assert!(block
                    .contains(&Stmt::Return(Some(Expr::str(STOP_LABEL)))));
                // The function ends by returning the shared result.
                assert_eq!(
                    body.last(),
                    Some(&Stmt::Return(Some(Expr::ident(RESULT_VAR))))
                );
            }
            other => panic!("expected FuncDef, got {:?}", other),
        }
    }

    #[test]
    fn test_sequential_labels_collapse_without_duplication() {
        let body = lowered("A: x = 1; B: y = 2; goto A;");
        let block_a = find_def(&body, "__block_A");
        // A's continuation stops at B with a jump instead of duplicating
        // B's code.
        assert_eq!(
            block_a.last(),
            Some(&Stmt::Return(Some(Expr::str("B"))))
        );
        let block_b = find_def(&body, "__block_B");
        assert!(block_b.contains(&Stmt::Return(Some(Expr::str("A")))));
    }

    #[test]
    fn test_label_inside_loop_threads_the_loop_continuation() {
        let body = lowered("while (c) { L: x = x + 1; } done = 1;");
        let block = find_def(&body, "__block_L");
        // Falling out of the label's statements re-enters the loop.
        assert!(block.iter().any(|s| matches!(s, Stmt::While { .. })));
    }

    #[test]
    fn test_captured_locals_are_nonlocal() {
        let body = lowered("int i = 0; L: i = i + 1; if (i < 3) goto L;");
        let block = find_def(&body, "__block_L");
        match &block[0] {
            Stmt::Nonlocal(names) => assert!(names.contains(&"i".to_string())),
            other => panic!("expected Nonlocal first, got {:?}", other),
        }
    }

    #[test]
    fn test_read_before_assign_gets_unbound_guard() {
        // `y` is read in block L but only assigned in start.
        let body = lowered("y = f(); L: z = y + 1; goto L;");
        let block = find_def(&body, "__block_L");
        let text = format!("{:?}", block);
        assert!(text.contains(UNBOUND_FN));
        // And the variable starts out unset at the top level.
        assert!(body.contains(&Stmt::Assign {
            targets: vec![Expr::ident("y")],
            value: Expr::ident(UNSET_VAR),
        }));
    }

    #[test]
    fn test_self_referential_label_terminates() {
        let body = lowered("L: goto L;");
        let block = find_def(&body, "__block_L");
        assert_eq!(block.first(), Some(&Stmt::Return(Some(Expr::str("L")))));
    }

    #[test]
    fn test_mutually_referential_labels_terminate() {
        let body = lowered("A: goto B; B: goto A;");
        let block_a = find_def(&body, "__block_A");
        let block_b = find_def(&body, "__block_B");
        assert!(block_a.contains(&Stmt::Return(Some(Expr::str("B")))));
        assert!(block_b.contains(&Stmt::Return(Some(Expr::str("A")))));
    }

    #[test]
    fn test_dispatch_checks_start_then_sorted_labels() {
        let body = lowered("B: x = 1; A: y = 2; goto B;");
        let dispatch = body
            .iter()
            .find_map(|s| match s {
                Stmt::While { body, .. } => Some(body),
                _ => None,
            })
            .expect("dispatch loop");

        // start arm first, then A, then B, then break.
        let mut labels_in_order = Vec::new();
        let mut arm = &dispatch[0];
        loop {
            match arm {
                Stmt::If { test, orelse, .. } => {
                    if let Expr::Compare { right, .. } = test {
                        if let Expr::Str(s) = right.as_ref() {
                            labels_in_order.push(s.clone());
                        }
                    }
                    if orelse.len() == 1 {
                        arm = &orelse[0];
                        if matches!(arm, Stmt::Break) {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        assert_eq!(labels_in_order, vec!["start", "A", "B"]);
    }

    #[test]
    fn test_block_bodies_are_dead_code_eliminated() {
        // The statement after the unconditional goto is dead inside start.
        let body = lowered("goto L; x = 99; L: y = 1;");
        let start = find_def(&body, "__block_start");
        let text = format!("{:?}", start);
        assert!(!text.contains("99"));
    }
}

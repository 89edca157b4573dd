//! Control-flow-graph-based dead-code elimination
//!
//! Two cooperating rewrites over every statement list:
//!
//! 1. Literal-condition folding: `if (true) {A} else {B}` becomes `A`,
//!    `if (false) {...} else {B}` becomes `B` (or a no-op without an else),
//!    and `while (false) {...}` becomes its orelse tail. Only literal
//!    boolean/integer conditions fold; general expressions are never
//!    evaluated.
//! 2. Reachability sweep: build the [`Graph`] for the folded list, keep only
//!    statements that belong to a block reachable from the entry, and
//!    recurse into surviving nested bodies. The sweep replays the builder's
//!    preorder numbering, so the two never disagree about which statement an
//!    id names.
//!
//! A statement list that had statements but lost them all becomes a single
//! no-op placeholder, which keeps downstream passes structurally simple.
//! The whole pass is idempotent.

use crate::ir::{Module, Stmt};
use crate::passes::cfg::{Graph, StmtId};
use rustc_hash::FxHashSet;

/// Remove unreachable statements and fold constant-condition branches over
/// the whole tree.
pub fn eliminate(module: Module) -> Module {
    Module::new(eliminate_body(module.body))
}

/// Clean one statement list. Exposed so goto lowering can run it over each
/// generated block body.
pub fn eliminate_body(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let had_statements = !stmts.is_empty();

    let folded = fold_list(stmts);
    let graph = Graph::build(&folded);
    let live = graph.live_statements();

    let mut counter = 0;
    let kept = sweep_list(folded, &mut counter, &live);

    if kept.is_empty() && had_statements {
        vec![Stmt::Pass]
    } else {
        kept
    }
}

fn fold_list(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().flat_map(fold_stmt).collect()
}

fn fold_stmt(stmt: Stmt) -> Vec<Stmt> {
    match stmt {
        Stmt::If { test, body, orelse } => match test.as_literal_bool() {
            Some(true) => non_empty(fold_list(body)),
            Some(false) => {
                if orelse.is_empty() {
                    vec![Stmt::Pass]
                } else {
                    non_empty(fold_list(orelse))
                }
            }
            None => vec![Stmt::If {
                test,
                body: fold_list(body),
                orelse: fold_list(orelse),
            }],
        },

        Stmt::While { test, body, orelse } => {
            if test.as_literal_bool() == Some(false) {
                if orelse.is_empty() {
                    return vec![Stmt::Pass];
                }
                return non_empty(fold_list(orelse));
            }
            vec![Stmt::While {
                test,
                body: fold_list(body),
                orelse: fold_list(orelse),
            }]
        }

        Stmt::Block(inner) => vec![Stmt::Block(fold_list(inner))],

        Stmt::MatchCase { pattern, body } => vec![Stmt::MatchCase {
            pattern,
            body: fold_list(body),
        }],

        // Function and class bodies fold when their own list is cleaned.
        other => vec![other],
    }
}

fn non_empty(stmts: Vec<Stmt>) -> Vec<Stmt> {
    if stmts.is_empty() {
        vec![Stmt::Pass]
    } else {
        stmts
    }
}

/// Keep statements in live blocks, replaying the graph builder's preorder
/// numbering. Dead statements still consume ids for themselves and their
/// children so the walk stays aligned.
fn sweep_list(
    stmts: Vec<Stmt>,
    counter: &mut StmtId,
    live: &FxHashSet<StmtId>,
) -> Vec<Stmt> {
    let mut out = Vec::new();

    for stmt in stmts {
        let id = *counter;
        *counter += 1;
        let alive = live.contains(&id);

        let rebuilt = match stmt {
            Stmt::If { test, body, orelse } => {
                let body = sweep_nested(body, counter, live);
                let orelse_empty = orelse.is_empty();
                let orelse = sweep_list(orelse, counter, live);
                let orelse = if orelse.is_empty() && !orelse_empty {
                    // A fully dead else arm disappears entirely.
                    Vec::new()
                } else {
                    orelse
                };
                Stmt::If { test, body, orelse }
            }
            Stmt::While { test, body, orelse } => Stmt::While {
                test,
                body: sweep_nested(body, counter, live),
                orelse: sweep_list(orelse, counter, live),
            },
            Stmt::Block(inner) => {
                Stmt::Block(sweep_nested(inner, counter, live))
            }
            Stmt::MatchCase { pattern, body } => Stmt::MatchCase {
                pattern,
                body: sweep_nested(body, counter, live),
            },
            Stmt::FuncDef {
                name,
                params,
                body,
                ret_text,
            } => {
                // Function bodies are separate lists with their own graphs.
                let body = if alive { eliminate_body(body) } else { body };
                Stmt::FuncDef {
                    name,
                    params,
                    body,
                    ret_text,
                }
            }
            Stmt::ClassDef { name, body } => {
                let body = if alive { eliminate_body(body) } else { body };
                Stmt::ClassDef { name, body }
            }
            other => other,
        };

        if alive {
            out.push(rebuilt);
        }
    }

    out
}

fn sweep_nested(
    stmts: Vec<Stmt>,
    counter: &mut StmtId,
    live: &FxHashSet<StmtId>,
) -> Vec<Stmt> {
    let had_statements = !stmts.is_empty();
    let kept = sweep_list(stmts, counter, live);
    if kept.is_empty() && had_statements {
        vec![Stmt::Pass]
    } else {
        kept
    }
}

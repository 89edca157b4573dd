//! # Introduction
//!
//! liftc turns token streams from C-like source fragments (typically
//! decompiler output) into a tree-shaped IR in a higher-level scripting
//! dialect, then runs structural clean-up passes so the result reads as
//! hand-written logic.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → raw IR → Goto Lowering → Dead-Code
//!   Elimination → Identifier Normalization → cleaned IR
//! ```
//!
//! 1. [`parser`] — tokenizes the fragment and builds the raw IR: recursive
//!    descent for statements, precedence climbing for expressions.
//! 2. [`passes::lower`] — rewrites goto/label control flow into an explicit
//!    dispatch loop of extracted blocks, dead-code-eliminating each block.
//! 3. [`passes::dce`] — whole-tree unreachable-statement removal and
//!    constant-branch folding over a per-list control-flow graph.
//! 4. [`passes::normalize`] — scope-aware renaming to one convention for
//!    callables/variables and another for type-like names.
//! 5. [`emit`] — renders the cleaned tree back to dialect text; [`eval`] is
//!    a reference evaluator used by the test suites.
//!
//! The pipeline is synchronous and single-threaded; every pass consumes its
//! input tree by value and returns a new one. Fatal errors abort the whole
//! run for that input — there is no partial-result mode.
//!
//! ## Entry points
//!
//! ```
//! use liftc::{parse_clean, parser::lexer::tokenize, Setting};
//!
//! let tokens = tokenize("int i = 0; L: i = i + 1; if (i < 3) goto L;");
//! let module = parse_clean(&tokens, &Setting::default()).unwrap();
//! assert!(!module.body.is_empty());
//! ```

pub mod emit;
pub mod eval;
pub mod ir;
pub mod parser;
pub mod passes;

pub use crate::ir::Module;
pub use crate::parser::parse::{ParseError, Parser, Setting};

use crate::parser::lexer::Token;

/// Parse a token stream into the raw IR with no clean-up passes applied.
pub fn parse_raw(tokens: &[Token]) -> Result<Module, ParseError> {
    Parser::new(tokens, Setting::default()).parse()
}

/// Parse a token stream and run the full clean-up pipeline: goto lowering,
/// dead-code elimination, identifier normalization.
pub fn parse_clean(
    tokens: &[Token],
    setting: &Setting,
) -> Result<Module, ParseError> {
    let module = Parser::new(tokens, *setting).parse()?;
    let module = passes::lower::lower(module);
    let module = passes::dce::eliminate(module);
    Ok(passes::normalize::normalize(module))
}

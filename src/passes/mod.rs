//! IR clean-up passes
//!
//! Pure tree-to-tree transforms, run in a fixed order because each depends
//! on invariants the previous one establishes:
//!
//! 1. [`lower`] — goto/label lowering must see the raw markers the parser
//!    emitted, before anything prunes them.
//! 2. [`dce`] — whole-tree dead-code elimination over the lowered tree
//!    (lowering also re-invokes it per generated block).
//! 3. [`normalize`] — identifier normalization runs last so the renamed
//!    text reflects the final structure.
//!
//! Every pass consumes its input `Module` by value and returns a new one;
//! no pass-local state outlives a call, so pipelines are freely reusable.
//!
//! [`cfg`] is the shared control-flow-graph builder used by [`dce`].

pub mod cfg;
pub mod dce;
pub mod lower;
pub mod normalize;

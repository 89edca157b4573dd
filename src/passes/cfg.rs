//! Control-flow graph construction over one statement list
//!
//! [`Graph::build`] walks a statement list, opening new blocks at branch,
//! loop, and match boundaries and wiring successor/predecessor edges. The
//! graph is transient: the dead-code eliminator builds one per statement
//! list, computes reachability, and discards it. Blocks never persist into
//! the IR.
//!
//! Statements are identified by [`StmtId`]s from a deterministic preorder
//! walk: each statement takes the next id, then its child lists are numbered
//! in order (`If`: body, orelse; `While`: body, orelse; `Block`: inner;
//! `MatchCase`: body). Function and class bodies are opaque here: they are
//! separate statement lists with their own graphs. The eliminator's sweep
//! replays the same walk, so ids agree without the graph holding statement
//! clones.
//!
//! Constant-boolean `if`/`while` tests route control flow through the
//! statically-taken branch only: the untaken branch's statements are
//! numbered but belong to no block, which makes them dead by construction.

use crate::ir::Stmt;
use rustc_hash::FxHashSet;

pub type BlockId = usize;
pub type StmtId = usize;

/// What kind of boundary opened the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Normal,
    Conditional,
    Loop,
    Exception,
}

/// A maximal straight-line run of statements with one entry and one exit.
#[derive(Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub statements: Vec<StmtId>,
    pub successors: FxHashSet<BlockId>,
    pub predecessors: FxHashSet<BlockId>,
    pub kind: BlockKind,
    pub is_entry: bool,
    pub is_exit: bool,
    /// Last statement is `return`, `break`, or `continue`.
    pub terminates: bool,
}

impl BasicBlock {
    fn new(id: BlockId, kind: BlockKind) -> Self {
        BasicBlock {
            id,
            statements: Vec::new(),
            successors: FxHashSet::default(),
            predecessors: FxHashSet::default(),
            kind,
            is_entry: false,
            is_exit: false,
            terminates: false,
        }
    }
}

/// All blocks for one statement list, with entry and exit ids.
#[derive(Debug)]
pub struct Graph {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub exit: BlockId,
}

impl Graph {
    /// Build the graph for one statement list.
    pub fn build(stmts: &[Stmt]) -> Graph {
        let mut builder = Builder::new();
        builder.walk_list(stmts);
        builder.finish()
    }

    /// Blocks reachable from the entry block by successor traversal.
    pub fn reachable_blocks(&self) -> FxHashSet<BlockId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![self.entry];

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for &succ in &self.blocks[id].successors {
                if !seen.contains(&succ) {
                    stack.push(succ);
                }
            }
        }

        seen
    }

    /// Statement ids belonging to any reachable block.
    pub fn live_statements(&self) -> FxHashSet<StmtId> {
        let mut live = FxHashSet::default();
        for &id in &self.reachable_blocks() {
            live.extend(self.blocks[id].statements.iter().copied());
        }
        live
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
    entry: BlockId,
    exit: BlockId,
    current: Option<BlockId>,
    /// (header, after-loop) ids for `continue`/`break` targets.
    loops: Vec<(BlockId, BlockId)>,
    next_stmt: StmtId,
}

impl Builder {
    fn new() -> Self {
        let mut blocks = Vec::new();
        blocks.push(BasicBlock::new(0, BlockKind::Normal));
        blocks[0].is_entry = true;
        blocks.push(BasicBlock::new(1, BlockKind::Normal));
        blocks[1].is_exit = true;

        Builder {
            blocks,
            entry: 0,
            exit: 1,
            current: Some(0),
            loops: Vec::new(),
            next_stmt: 0,
        }
    }

    fn finish(mut self) -> Graph {
        if let Some(cur) = self.current {
            self.edge(cur, self.exit);
        }
        Graph {
            blocks: self.blocks,
            entry: self.entry,
            exit: self.exit,
        }
    }

    fn new_block(&mut self, kind: BlockKind) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock::new(id, kind));
        id
    }

    fn edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from].successors.insert(to);
        self.blocks[to].predecessors.insert(from);
    }

    /// Current block, opening a fresh (initially unreachable) one if the
    /// previous block was closed by a terminator.
    fn ensure_current(&mut self) -> BlockId {
        match self.current {
            Some(id) => id,
            None => {
                let id = self.new_block(BlockKind::Normal);
                self.current = Some(id);
                id
            }
        }
    }

    fn take_id(&mut self) -> StmtId {
        let id = self.next_stmt;
        self.next_stmt += 1;
        id
    }

    fn walk_list(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        let id = self.take_id();

        match stmt {
            Stmt::Return(_) => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.blocks[b].terminates = true;
                self.edge(b, self.exit);
                self.current = None;
            }
            Stmt::Break => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.blocks[b].terminates = true;
                if let Some(&(_, after)) = self.loops.last() {
                    self.edge(b, after);
                }
                self.current = None;
            }
            Stmt::Continue => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.blocks[b].terminates = true;
                if let Some(&(header, _)) = self.loops.last() {
                    self.edge(b, header);
                }
                self.current = None;
            }

            Stmt::If { test, body, orelse } => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.blocks[b].kind = BlockKind::Conditional;
                self.current = None;

                match test.as_literal_bool() {
                    Some(true) => {
                        let then_entry = self.new_block(BlockKind::Normal);
                        self.edge(b, then_entry);
                        self.current = Some(then_entry);
                        self.walk_list(body);
                        let tail = self.current;
                        self.number_only(orelse);

                        let join = self.new_block(BlockKind::Normal);
                        if let Some(t) = tail {
                            self.edge(t, join);
                        }
                        self.current = Some(join);
                    }
                    Some(false) => {
                        self.number_only(body);
                        let join = self.new_block(BlockKind::Normal);
                        if orelse.is_empty() {
                            self.edge(b, join);
                        } else {
                            let else_entry = self.new_block(BlockKind::Normal);
                            self.edge(b, else_entry);
                            self.current = Some(else_entry);
                            self.walk_list(orelse);
                            if let Some(t) = self.current {
                                self.edge(t, join);
                            }
                        }
                        self.current = Some(join);
                    }
                    None => {
                        let then_entry = self.new_block(BlockKind::Normal);
                        self.edge(b, then_entry);
                        self.current = Some(then_entry);
                        self.walk_list(body);
                        let then_tail = self.current;

                        let else_tail = if orelse.is_empty() {
                            None
                        } else {
                            let else_entry = self.new_block(BlockKind::Normal);
                            self.edge(b, else_entry);
                            self.current = Some(else_entry);
                            self.walk_list(orelse);
                            self.current
                        };

                        let join = self.new_block(BlockKind::Normal);
                        if let Some(t) = then_tail {
                            self.edge(t, join);
                        }
                        if orelse.is_empty() {
                            self.edge(b, join);
                        } else if let Some(t) = else_tail {
                            self.edge(t, join);
                        }
                        self.current = Some(join);
                    }
                }
            }

            Stmt::While { test, body, orelse } => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.current = None;

                let header = self.new_block(BlockKind::Loop);
                self.edge(b, header);
                let after = self.new_block(BlockKind::Normal);

                match test.as_literal_bool() {
                    Some(false) => {
                        self.number_only(body);
                        if orelse.is_empty() {
                            self.edge(header, after);
                        } else {
                            let oe = self.new_block(BlockKind::Normal);
                            self.edge(header, oe);
                            self.current = Some(oe);
                            self.walk_list(orelse);
                            if let Some(t) = self.current {
                                self.edge(t, after);
                            }
                        }
                    }
                    literal => {
                        let body_entry = self.new_block(BlockKind::Normal);
                        self.edge(header, body_entry);
                        self.loops.push((header, after));
                        self.current = Some(body_entry);
                        self.walk_list(body);
                        if let Some(t) = self.current {
                            self.edge(t, header);
                        }
                        self.loops.pop();

                        if literal == Some(true) {
                            // No normal exit: the orelse never runs.
                            self.number_only(orelse);
                        } else if orelse.is_empty() {
                            self.edge(header, after);
                        } else {
                            let oe = self.new_block(BlockKind::Normal);
                            self.edge(header, oe);
                            self.current = Some(oe);
                            self.walk_list(orelse);
                            if let Some(t) = self.current {
                                self.edge(t, after);
                            }
                        }
                    }
                }

                self.current = Some(after);
            }

            Stmt::Block(inner) => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.walk_list(inner);
            }

            Stmt::MatchCase { body, .. } => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
                self.blocks[b].kind = BlockKind::Conditional;
                self.current = None;

                let body_entry = self.new_block(BlockKind::Normal);
                self.edge(b, body_entry);
                self.current = Some(body_entry);
                self.walk_list(body);
                let tail = self.current;

                let join = self.new_block(BlockKind::Normal);
                self.edge(b, join);
                if let Some(t) = tail {
                    self.edge(t, join);
                }
                self.current = Some(join);
            }

            // Function and class bodies are separate statement lists.
            _ => {
                let b = self.ensure_current();
                self.blocks[b].statements.push(id);
            }
        }
    }

    /// Number a statement list (and its nested lists) without assigning the
    /// statements to any block. Used for statically-untaken branches.
    fn number_only(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.take_id();
            match stmt {
                Stmt::If { body, orelse, .. }
                | Stmt::While { body, orelse, .. } => {
                    self.number_only(body);
                    self.number_only(orelse);
                }
                Stmt::Block(inner) => self.number_only(inner),
                Stmt::MatchCase { body, .. } => self.number_only(body),
                _ => {}
            }
        }
    }
}

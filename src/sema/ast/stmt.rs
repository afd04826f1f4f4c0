use crate::sema::Span;

use super::{ExprId, VarId};

/// Handle into the [`StmtArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StmtId(u32);

impl StmtId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statement nodes.  The engine walks these to infer implicit attributes, to
/// match canonical loops, and to enforce the break / exception body
/// restrictions; it never executes or lowers them.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expr(ExprId),
    /// A declaration statement `ty var = init`; the canonical-loop init form
    /// `integer-type var = lb` arrives as this.
    Decl { var: VarId, init: Option<ExprId> },
    Compound(Vec<StmtId>),
    If {
        cond: ExprId,
        then: StmtId,
        otherwise: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        inc: Option<ExprId>,
        body: Option<StmtId>,
    },
    While { cond: ExprId, body: StmtId },
    DoWhile { body: StmtId, cond: ExprId },
    Switch { cond: ExprId, body: StmtId },
    Break,
    Continue,
    Return(Option<ExprId>),
    /// A statement wrapped by an attribute specifier; adds no real nesting.
    Attributed(StmtId),
    Try { body: StmtId, handlers: Vec<StmtId> },
    Catch(StmtId),
    Throw(Option<ExprId>),
    /// A nested pragma directive with its associated statement.  Body walks
    /// do not descend through these; the nested directive runs its own
    /// analysis.
    Directive(Option<StmtId>),
    Empty,
}

#[derive(Debug, Default)]
pub struct StmtArena {
    stmts: Vec<(Stmt, Span)>,
}

impl StmtArena {
    pub fn new() -> StmtArena {
        StmtArena { stmts: vec![] }
    }

    pub fn add(&mut self, stmt: Stmt, span: Span) -> StmtId {
        self.stmts.push((stmt, span));
        StmtId(self.stmts.len() as u32 - 1)
    }

    pub fn get(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()].0
    }

    pub fn span(&self, id: StmtId) -> Span {
        self.stmts[id.index()].1
    }
}

use crate::sema::Span;
use crate::{StringId, StringTable};

use super::{
    ClassTable, Expr, ExprArena, ExprId, StmtArena, Ty, TyId, TyTable, VarTable,
};

/// Handle into the declare-reduction registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReductionDeclId(u32);

impl ReductionDeclId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A user-declared reduction combiner: `declare reduction(name : ty : ...)`.
/// The combiner itself lives in the host AST; the engine only needs its
/// identity and operand type to resolve `reduction(name : var)` clauses.
#[derive(Clone, Debug)]
pub struct ReductionDecl {
    pub name: StringId,
    pub ty: TyId,
    pub decl_span: Span,
}

/// Everything the engine reads from, and appends to, the host compilation
/// unit: interned strings, type and class tables, the variable table, the
/// lexical scope tree, the statement/expression arenas, and the
/// declare-reduction registry.  All of it is id-indexed; clause nodes and
/// loop descriptors store ids, never references.
#[derive(Debug, Default)]
pub struct AstContext {
    pub strings: StringTable,
    pub tys: TyTable,
    pub classes: ClassTable,
    pub vars: VarTable,
    pub scopes: super::ScopeTree,
    pub exprs: ExprArena,
    pub stmts: StmtArena,
    reductions: Vec<ReductionDecl>,
}

impl AstContext {
    pub fn new() -> AstContext {
        AstContext::default()
    }

    pub fn intern(&self, s: &str) -> StringId {
        self.strings.insert(s.into())
    }

    pub fn declare_reduction(&mut self, name: StringId, ty: TyId, span: Span) -> ReductionDeclId {
        self.reductions.push(ReductionDecl {
            name,
            ty,
            decl_span: span,
        });
        ReductionDeclId(self.reductions.len() as u32 - 1)
    }

    pub fn reduction(&self, id: ReductionDeclId) -> &ReductionDecl {
        &self.reductions[id.index()]
    }

    /// All registered combiners with the given name, in declaration order.
    pub fn reductions_named(&self, name: StringId) -> Vec<ReductionDeclId> {
        self.reductions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.name == name)
            .map(|(i, _)| ReductionDeclId(i as u32))
            .collect()
    }

    /// Shorthand used throughout: the unqualified canonical type of an
    /// expression.
    pub fn expr_ty(&self, e: ExprId) -> TyId {
        self.tys.non_reference(self.exprs.ty(e))
    }

    pub fn int_ty(&mut self) -> TyId {
        self.tys.add(Ty::Int)
    }

    pub fn uint_ty(&mut self) -> TyId {
        self.tys.add(Ty::UInt)
    }

    pub fn bool_ty(&mut self) -> TyId {
        self.tys.add(Ty::Bool)
    }

    pub fn int_literal(&mut self, value: i64, span: Span) -> ExprId {
        let ty = self.int_ty();
        self.exprs.add(Expr::IntLit(value), ty, span)
    }
}

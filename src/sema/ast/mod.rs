//! The host-AST facade consumed by the semantic engine.  The real front end
//! owns parsing and name lookup; what the engine sees is a set of
//! arena-indexed tables: variables, class layouts, lexical scopes, statements
//! and expressions.  Everything is referenced by copyable IDs so that regions
//! and clause nodes never own pieces of the tree.

mod context;
mod expr;
mod kinds;
mod stmt;
mod ty;
mod var;

pub use context::{AstContext, ReductionDecl, ReductionDeclId};
pub use expr::{BinOp, Callee, Expr, ExprArena, ExprId, UnaryOp};
pub use kinds::{
    ClauseKind, DefaultKind, DependType, DirectiveKind, ReductionOp, ScheduleKind,
};
pub use stmt::{Stmt, StmtArena, StmtId};
pub use ty::{ClassId, ClassInfo, ClassTable, MemberFn, SpecialMember, Ty, TyId, TyTable};
pub use var::{ScopeId, ScopeTree, StorageClass, Var, VarId, VarTable};

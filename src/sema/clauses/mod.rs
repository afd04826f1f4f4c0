/*
 * Clause validation.  Each clause kind gets one validator: it receives the
 * raw argument list the parser produced, enforces the clause's semantic
 * constraints entry by entry, and produces a normalized clause node holding
 * the surviving entries plus whatever helper expressions code generation
 * needs.  Rejected entries are dropped with a diagnostic while the rest of
 * the list continues; a clause whose surviving list is empty produces no
 * clause node at all.
 */
mod copy;
mod depend;
mod dsa;
mod reduction;
mod sched;
mod simd;

pub(crate) use copy::{on_copyin, on_copyprivate};
pub(crate) use depend::on_depend;
pub(crate) use dsa::{on_firstprivate, on_lastprivate, on_private, on_shared};
pub(crate) use reduction::on_reduction;
pub(crate) use sched::{on_default, on_schedule, on_single_expr};
pub(crate) use simd::{on_aligned, on_linear, on_var_list_only};

use crate::StringId;

use super::ast::{
    ClauseKind, DefaultKind, DependType, ExprId, ReductionOp, ScheduleKind, SpecialMember, VarId,
};
use super::diag::{DiagKind, Reporter};
use super::engine::Sema;
use super::resolve::DsaVarData;
use super::Span;

/// One entry of a validated `depend` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct DependItem {
    pub expr: ExprId,
    /// Byte extent of the dependency, when computable.
    pub size: Option<ExprId>,
    /// Synthesized stride counters for the inner array-section dimensions.
    pub indices: Vec<ExprId>,
    /// Section lengths paired with `indices`.
    pub lengths: Vec<ExprId>,
}

/// A validated clause node.  Helper vectors run parallel to `vars`; entries
/// deferred to template instantiation hold `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Private {
        vars: Vec<ExprId>,
        default_inits: Vec<Option<ExprId>>,
    },
    Firstprivate {
        vars: Vec<ExprId>,
        pseudo_vars: Vec<Option<ExprId>>,
        inits: Vec<Option<ExprId>>,
    },
    Lastprivate {
        vars: Vec<ExprId>,
        pseudo_vars1: Vec<Option<ExprId>>,
        pseudo_vars2: Vec<Option<ExprId>>,
        assignments: Vec<Option<ExprId>>,
        /// Filled by directive-exit finalization: default initializers for
        /// entries whose private copy needs construction.
        default_inits: Vec<Option<ExprId>>,
    },
    Shared {
        vars: Vec<ExprId>,
    },
    Reduction {
        op: ReductionOp,
        op_name: Option<StringId>,
        vars: Vec<ExprId>,
        combiners: Vec<Option<ExprId>>,
        helper_params1: Vec<Option<ExprId>>,
        helper_params2: Vec<Option<ExprId>>,
        default_inits: Vec<Option<ExprId>>,
    },
    Linear {
        vars: Vec<ExprId>,
        step: Option<ExprId>,
    },
    Aligned {
        vars: Vec<ExprId>,
        alignment: Option<ExprId>,
    },
    Copyin {
        vars: Vec<ExprId>,
        pseudo_vars1: Vec<Option<ExprId>>,
        pseudo_vars2: Vec<Option<ExprId>>,
        assignments: Vec<Option<ExprId>>,
    },
    Copyprivate {
        vars: Vec<ExprId>,
        pseudo_vars1: Vec<Option<ExprId>>,
        pseudo_vars2: Vec<Option<ExprId>>,
        assignments: Vec<Option<ExprId>>,
    },
    Flush {
        vars: Vec<ExprId>,
    },
    Uniform {
        vars: Vec<ExprId>,
    },
    Depend {
        dep_type: DependType,
        items: Vec<DependItem>,
        /// Total number of runtime dependency slots the items expand to.
        counter: ExprId,
    },
    Default(DefaultKind),
    If(ExprId),
    Final(ExprId),
    NumThreads(ExprId),
    Collapse(ExprId),
    Safelen(ExprId),
    Simdlen(ExprId),
    Schedule {
        sched: ScheduleKind,
        chunk: Option<ExprId>,
    },
    DistSchedule {
        sched: ScheduleKind,
        chunk: Option<ExprId>,
    },
    Ordered,
    Nowait,
    Untied,
    Mergeable,
}

impl Clause {
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Private { .. } => ClauseKind::Private,
            Clause::Firstprivate { .. } => ClauseKind::Firstprivate,
            Clause::Lastprivate { .. } => ClauseKind::Lastprivate,
            Clause::Shared { .. } => ClauseKind::Shared,
            Clause::Reduction { .. } => ClauseKind::Reduction,
            Clause::Linear { .. } => ClauseKind::Linear,
            Clause::Aligned { .. } => ClauseKind::Aligned,
            Clause::Copyin { .. } => ClauseKind::Copyin,
            Clause::Copyprivate { .. } => ClauseKind::Copyprivate,
            Clause::Flush { .. } => ClauseKind::Flush,
            Clause::Uniform { .. } => ClauseKind::Uniform,
            Clause::Depend { .. } => ClauseKind::Depend,
            Clause::Default(_) => ClauseKind::Default,
            Clause::If(_) => ClauseKind::If,
            Clause::Final(_) => ClauseKind::Final,
            Clause::NumThreads(_) => ClauseKind::NumThreads,
            Clause::Collapse(_) => ClauseKind::Collapse,
            Clause::Safelen(_) => ClauseKind::Safelen,
            Clause::Simdlen(_) => ClauseKind::Simdlen,
            Clause::Schedule { .. } => ClauseKind::Schedule,
            Clause::DistSchedule { .. } => ClauseKind::DistSchedule,
            Clause::Ordered => ClauseKind::Ordered,
            Clause::Nowait => ClauseKind::Nowait,
            Clause::Untied => ClauseKind::Untied,
            Clause::Mergeable => ClauseKind::Mergeable,
        }
    }
}

/// The raw clause as the parser hands it over: kind plus unvalidated
/// arguments.  Routing to the matching validator happens in
/// [`Sema::process_clause`](super::engine::Sema::process_clause).
#[derive(Clone, Debug)]
pub enum ClauseSpec {
    /// private, firstprivate, lastprivate, shared, copyin, copyprivate,
    /// flush, uniform.
    VarList { kind: ClauseKind, vars: Vec<ExprId> },
    Reduction {
        op: ReductionOp,
        op_name: Option<StringId>,
        vars: Vec<ExprId>,
    },
    Linear {
        vars: Vec<ExprId>,
        step: Option<ExprId>,
    },
    Aligned {
        vars: Vec<ExprId>,
        alignment: Option<ExprId>,
    },
    Depend {
        dep_type: DependType,
        items: Vec<ExprId>,
    },
    Default(DefaultKind),
    /// if, final, num_threads, collapse, safelen, simdlen.
    SingleExpr { kind: ClauseKind, expr: ExprId },
    Schedule {
        kind: ClauseKind,
        sched: ScheduleKind,
        chunk: Option<ExprId>,
    },
    /// ordered, nowait, untied, mergeable.
    Flag(ClauseKind),
}

/// A list item must be a variable name, not a field or array-element
/// access.  Returns the variable on success; reports otherwise.
pub(super) fn expect_var_name<R: Reporter>(
    sema: &mut Sema<R>,
    e: ExprId,
    span: Span,
) -> Option<VarId> {
    match sema.ctx.exprs.as_var_ref(e) {
        Some(v) => Some(v),
        None => {
            sema.diag(DiagKind::ExpectedVarName, span);
            None
        }
    }
}

/// Entries whose analysis must wait for template instantiation pass through
/// every validator untouched.
pub(super) fn is_dependent_entry<R: Reporter>(sema: &Sema<R>, e: ExprId) -> bool {
    use super::ast::Expr;
    if matches!(sema.ctx.exprs.get(e), Expr::DependentName) {
        return true;
    }
    sema.ctx.tys.is_dependent(sema.ctx.exprs.ty(e))
}

/// The note half of a two-part attribute-conflict diagnostic: cite the prior
/// explicit reference when one exists, else the declaration as the
/// predetermination site.
pub(super) fn note_prev_dsa<R: Reporter>(sema: &mut Sema<R>, prev: &DsaVarData, var: VarId) {
    match prev.ref_site {
        Some(site) => sema.diag(DiagKind::NoteExplicitDsa(prev.attr), site),
        None => {
            let decl = sema.ctx.vars.get(var).decl_span;
            sema.diag(DiagKind::NotePredeterminedDsa(prev.attr), decl);
        }
    }
}

/// Cites the variable's declaration after a per-entry rejection.
pub(super) fn note_decl<R: Reporter>(sema: &mut Sema<R>, var: VarId) {
    let decl = sema.ctx.vars.get(var).decl_span;
    sema.diag(DiagKind::NoteDefinedHere(var), decl);
}

/// A variable in a by-value-duplicating clause must not have an incomplete
/// type.  True when the entry survives.
pub(super) fn require_complete<R: Reporter>(
    sema: &mut Sema<R>,
    clause: ClauseKind,
    var: VarId,
    span: Span,
) -> bool {
    let ty = sema.ctx.vars.get(var).ty;
    if sema.ctx.tys.is_incomplete(ty) {
        sema.diag(DiagKind::IncompleteType(clause, var), span);
        return false;
    }
    true
}

/// A variable in a by-value-duplicating clause must not have a reference
/// type.  True when the entry survives.
pub(super) fn reject_reference<R: Reporter>(
    sema: &mut Sema<R>,
    clause: ClauseKind,
    var: VarId,
    span: Span,
) -> bool {
    let ty = sema.ctx.vars.get(var).ty;
    if sema.ctx.tys.is_reference(ty) {
        sema.diag(DiagKind::RefTypeArg(clause, var), span);
        note_decl(sema, var);
        return false;
    }
    true
}

/// For class-typed operands the clause's required special member function
/// must be accessible and non-deleted.  The diagnostic names both the
/// variable and its class.  True when the member is usable or the type is
/// not a class.
pub(super) fn require_member<R: Reporter>(
    sema: &mut Sema<R>,
    clause: ClauseKind,
    member: SpecialMember,
    var: VarId,
    span: Span,
) -> bool {
    let elem = sema.ctx.tys.array_element(sema.ctx.vars.get(var).ty);
    let class = match sema.ctx.tys.as_class(elem) {
        Some(c) => c,
        None => return true,
    };
    let fun = sema.ctx.classes.member(class, member);
    // A missing destructor is trivial and therefore fine; every other
    // required member must exist.
    let usable = if member == SpecialMember::Destructor {
        fun == super::ast::MemberFn::Missing || fun.is_usable()
    } else {
        fun.is_usable()
    };
    if !usable {
        sema.diag(
            DiagKind::RequiredMethod {
                clause,
                member,
                var,
            },
            span,
        );
        note_decl(sema, var);
        let class_span = sema.ctx.classes.get(class).decl_span;
        sema.diag(DiagKind::NoteClassDeclaredHere(class), class_span);
        return false;
    }
    true
}

//! Validators for the expression-argument clauses: schedule, dist_schedule,
//! num_threads, if, final, collapse, safelen, simdlen, and the default
//! clause.  Integral arguments go through a contextual implicit conversion
//! (exactly one viable conversion function), positivity is enforced where
//! the clause demands it, and non-constant arguments are hoisted into a
//! synthesized file-scope variable whose initializing assignment is queued
//! for emission immediately before the directive.

use log::debug;

use super::super::ast::{ClauseKind, DefaultKind, Expr, ExprId, ScheduleKind};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::Clause;

/// Contextual implicit conversion of a clause argument to an integral type.
/// An integral (or dependent) argument passes through; a class argument must
/// offer exactly one conversion function to an integral type, which is
/// applied; anything else is rejected with the appropriate diagnostic.
fn convert_to_integral<R: Reporter>(sema: &mut Sema<R>, e: ExprId) -> Option<ExprId> {
    let eloc = sema.ctx.exprs.span(e);
    let ty = sema.ctx.tys.non_reference(sema.ctx.exprs.ty(e));
    if sema.ctx.tys.is_integer(ty) || sema.ctx.tys.is_dependent(ty) {
        return Some(e);
    }
    if sema.ctx.tys.is_incomplete(ty) {
        sema.diag(DiagKind::IncompleteClassType, eloc);
        return None;
    }
    if let Some(class) = sema.ctx.tys.as_class(ty) {
        let targets: Vec<_> = sema
            .ctx
            .classes
            .get(class)
            .conversions
            .iter()
            .copied()
            .filter(|t| sema.ctx.tys.is_integer(*t))
            .collect();
        return match targets.len() {
            0 => {
                sema.diag(DiagKind::StatementRequiresInteger, eloc);
                None
            }
            1 => Some(sema.ctx.exprs.add(Expr::Cast(e), targets[0], eloc)),
            _ => {
                sema.diag(DiagKind::MultipleConversions, eloc);
                None
            }
        };
    }
    sema.diag(DiagKind::StatementRequiresInteger, eloc);
    None
}

/// Hoists a non-constant clause argument into a synthesized file-scope
/// variable.  The assignment `hidden = arg` is queued for emission before
/// the directive so instrumentation sees the effective value and code
/// generation reads a simple variable.
fn hoist_if_not_constant<R: Reporter>(
    sema: &mut Sema<R>,
    clause: ClauseKind,
    e: ExprId,
) -> ExprId {
    if sema.ctx.is_evaluatable(e) {
        return e;
    }
    let eloc = sema.ctx.exprs.span(e);
    let ty = sema.ctx.tys.non_reference(sema.ctx.exprs.ty(e));
    let ty = sema.ctx.tys.unqualified(ty);
    let name = format!(".omp.{}.var.", clause);
    let hidden = sema.synthesize_var(&name, ty);
    let hidden_ref = sema.ctx.build_var_ref(hidden, eloc);
    let assign = sema.ctx.build_assign(hidden_ref, e, eloc);
    let assign = sema.ctx.build_to_void(assign, eloc);
    sema.queue_pre_stmt(assign);
    debug!("hoisted non-constant {} argument", clause);
    hidden_ref
}

pub(crate) fn on_default<R: Reporter>(
    sema: &mut Sema<R>,
    kind: DefaultKind,
    span: Span,
) -> Option<Clause> {
    match kind {
        DefaultKind::Unknown => {
            sema.diag(DiagKind::UnexpectedClauseValue(ClauseKind::Default), span);
            None
        }
        DefaultKind::None => {
            sema.stack.set_default_none();
            Some(Clause::Default(kind))
        }
        DefaultKind::Shared => {
            sema.stack.set_default_shared();
            Some(Clause::Default(kind))
        }
    }
}

pub(crate) fn on_schedule<R: Reporter>(
    sema: &mut Sema<R>,
    kind: ClauseKind,
    sched: ScheduleKind,
    chunk: Option<ExprId>,
    span: Span,
) -> Option<Clause> {
    // dist_schedule accepts only static; schedule accepts every kind but
    // unknown.
    let kind_ok = match kind {
        ClauseKind::Schedule => sched != ScheduleKind::Unknown,
        ClauseKind::DistSchedule => sched == ScheduleKind::Static,
        _ => panic!("not a schedule clause: {}", kind),
    };
    if !kind_ok {
        sema.diag(DiagKind::UnexpectedClauseValue(kind), span);
        return None;
    }

    let mut value = match chunk {
        Some(chunk) => {
            let dependent = sema.ctx.tys.is_dependent(sema.ctx.exprs.ty(chunk));
            if dependent {
                Some(chunk)
            } else {
                let converted = convert_to_integral(sema, chunk)?;
                if let Some(v) = sema.ctx.eval_const(converted) {
                    if v <= 0 {
                        let cloc = sema.ctx.exprs.span(chunk);
                        sema.diag(DiagKind::NegativeExpressionInClause(kind), cloc);
                        return None;
                    }
                }
                Some(converted)
            }
        }
        None => {
            // dynamic and guided default to a chunk size of 1.
            if kind == ClauseKind::Schedule
                && matches!(sched, ScheduleKind::Dynamic | ScheduleKind::Guided)
            {
                Some(sema.ctx.int_literal(1, span))
            } else {
                None
            }
        }
    };
    if let Some(v) = value {
        value = Some(hoist_if_not_constant(sema, kind, v));
    }

    match kind {
        ClauseKind::Schedule => Some(Clause::Schedule {
            sched,
            chunk: value,
        }),
        _ => Some(Clause::DistSchedule {
            sched,
            chunk: value,
        }),
    }
}

/// if, final, num_threads, collapse, safelen, simdlen.
pub(crate) fn on_single_expr<R: Reporter>(
    sema: &mut Sema<R>,
    kind: ClauseKind,
    expr: ExprId,
    _span: Span,
) -> Option<Clause> {
    let eloc = sema.ctx.exprs.span(expr);
    let dependent = sema.ctx.tys.is_dependent(sema.ctx.exprs.ty(expr));
    match kind {
        ClauseKind::If | ClauseKind::Final => {
            if dependent {
                return Some(match kind {
                    ClauseKind::If => Clause::If(expr),
                    _ => Clause::Final(expr),
                });
            }
            // Boolean-context conversion: any scalar will do.
            let ty = sema.ctx.tys.non_reference(sema.ctx.exprs.ty(expr));
            if !sema.ctx.tys.is_scalar(ty) {
                sema.diag(DiagKind::StatementRequiresInteger, eloc);
                return None;
            }
            let value = hoist_if_not_constant(sema, kind, expr);
            Some(match kind {
                ClauseKind::If => Clause::If(value),
                _ => Clause::Final(value),
            })
        }
        ClauseKind::NumThreads => {
            if dependent {
                return Some(Clause::NumThreads(expr));
            }
            let converted = convert_to_integral(sema, expr)?;
            if let Some(v) = sema.ctx.eval_const(converted) {
                if v <= 0 {
                    sema.diag(DiagKind::NegativeExpressionInClause(kind), eloc);
                    return None;
                }
            }
            let value = hoist_if_not_constant(sema, kind, converted);
            Some(Clause::NumThreads(value))
        }
        ClauseKind::Collapse | ClauseKind::Safelen | ClauseKind::Simdlen => {
            // These feed directly into loop normalization and
            // vectorization; the argument must be a strictly positive
            // compile-time constant.
            if dependent {
                return Some(match kind {
                    ClauseKind::Collapse => Clause::Collapse(expr),
                    ClauseKind::Safelen => Clause::Safelen(expr),
                    _ => Clause::Simdlen(expr),
                });
            }
            let converted = convert_to_integral(sema, expr)?;
            match sema.ctx.eval_const(converted) {
                Some(v) if v > 0 => (),
                Some(_) => {
                    sema.diag(DiagKind::NegativeExpressionInClause(kind), eloc);
                    return None;
                }
                None => {
                    sema.diag(DiagKind::NotConstantExpression(kind), eloc);
                    return None;
                }
            }
            Some(match kind {
                ClauseKind::Collapse => Clause::Collapse(converted),
                ClauseKind::Safelen => Clause::Safelen(converted),
                _ => Clause::Simdlen(converted),
            })
        }
        _ => panic!("not a single-expression clause: {}", kind),
    }
}

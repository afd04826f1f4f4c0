//! Validators for the simd-oriented clauses (linear, aligned) and for the
//! bare variable-list clauses (flush, uniform) that carry no semantic
//! constraint beyond naming variables.

use super::super::ast::{ClauseKind, ExprId};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::{expect_var_name, is_dependent_entry, note_decl, Clause};

pub(crate) fn on_linear<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    step: Option<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // A list item cannot appear in more than one linear clause or in any
        // other data-sharing clause together with linear.
        let prev = sema.top_dsa(var);
        if prev.ref_site.is_some()
            && matches!(
                prev.attr,
                ClauseKind::Linear
                    | ClauseKind::Private
                    | ClauseKind::Lastprivate
                    | ClauseKind::Reduction
            )
        {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Linear,
                },
                eloc,
            );
            if let Some(site) = prev.ref_site {
                sema.diag(DiagKind::NoteExplicitDsa(prev.attr), site);
            }
            continue;
        }

        let vty = sema.ctx.vars.get(var).ty;
        if sema.ctx.tys.is_incomplete(vty) {
            sema.diag(DiagKind::IncompleteType(ClauseKind::Linear, var), eloc);
            continue;
        }
        if sema.ctx.tys.is_reference(vty) {
            sema.diag(DiagKind::RefTypeArg(ClauseKind::Linear, var), eloc);
            note_decl(sema, var);
            continue;
        }
        let canon = sema.ctx.tys.non_reference(vty);
        if sema.ctx.tys.is_const(canon) {
            sema.diag(DiagKind::ConstVariable(ClauseKind::Linear, var), eloc);
            note_decl(sema, var);
            continue;
        }

        // A linear item must be of integral or pointer type.
        if !sema.ctx.tys.is_dependent(canon)
            && !sema.ctx.tys.is_integer(canon)
            && !sema.ctx.tys.is_pointer(canon)
        {
            sema.diag(DiagKind::ExpectedIntOrPtr, eloc);
            continue;
        }

        sema.add_dsa(var, Some(eloc), ClauseKind::Linear);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }

    // The step must be a non-zero integer when it is statically known.
    if let Some(step) = step {
        if let Some(v) = sema.ctx.eval_const(step) {
            if v == 0 {
                let sloc = sema.ctx.exprs.span(step);
                sema.diag(DiagKind::ZeroLinearStep, sloc);
                return None;
            }
        }
    }

    Some(Clause::Linear { vars, step })
}

pub(crate) fn on_aligned<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    alignment: Option<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // The type of an aligned item must be array or pointer, possibly
        // behind a reference.
        let canon = sema.ctx.tys.non_reference(sema.ctx.vars.get(var).ty);
        if !sema.ctx.tys.is_dependent(canon)
            && !sema.ctx.tys.is_array(canon)
            && !sema.ctx.tys.is_pointer(canon)
        {
            sema.diag(DiagKind::ExpectedArrayOrPtr, eloc);
            continue;
        }

        // A list item cannot appear in more than one aligned clause; the
        // uniqueness registry is separate from the data-sharing map.
        if let Err(prev) = sema.stack.add_unique_aligned(var, eloc) {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: ClauseKind::Aligned,
                    clause: ClauseKind::Aligned,
                },
                eloc,
            );
            sema.diag(DiagKind::NoteExplicitDsa(ClauseKind::Aligned), prev);
            continue;
        }

        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }

    // The alignment parameter must be a constant positive integer
    // expression.
    if let Some(alignment) = alignment {
        let aloc = sema.ctx.exprs.span(alignment);
        match sema.ctx.eval_const(alignment) {
            Some(v) if v > 0 => (),
            Some(_) => {
                sema.diag(DiagKind::NegativeExpressionInClause(ClauseKind::Aligned), aloc);
                return None;
            }
            None => {
                sema.diag(DiagKind::NotConstantExpression(ClauseKind::Aligned), aloc);
                return None;
            }
        }
    }

    Some(Clause::Aligned { vars, alignment })
}

/// flush and uniform accept any variable references; entries that are not
/// variable references are silently dropped, dependent entries are deferred.
pub(crate) fn on_var_list_only<R: Reporter>(
    sema: &mut Sema<R>,
    kind: ClauseKind,
    raw_vars: Vec<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    for item in raw_vars {
        if is_dependent_entry(sema, item) {
            vars.push(item);
            continue;
        }
        if sema.ctx.exprs.as_var_ref(item).is_some() {
            vars.push(item);
        }
    }

    if vars.is_empty() {
        return None;
    }
    match kind {
        ClauseKind::Flush => Some(Clause::Flush { vars }),
        ClauseKind::Uniform => Some(Clause::Uniform { vars }),
        _ => panic!("not a bare variable-list clause: {}", kind),
    }
}

//! Validators for copyin and copyprivate: both move values between the
//! threadprivate/private copies of the listed variables, so both demand a
//! usable copy assignment operator and synthesize a proxy-variable pair plus
//! the assignment expression code generation replays per thread.

use super::super::ast::{ClauseKind, ExprId, SpecialMember};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::{expect_var_name, is_dependent_entry, note_prev_dsa, require_member, Clause};

/// Builds the `.copyin.` proxy pair and `proxy1 = proxy2` assignment.
fn synthesize_copy_pair<R: Reporter>(
    sema: &mut Sema<R>,
    elem: super::super::ast::TyId,
    eloc: Span,
) -> (ExprId, ExprId, ExprId) {
    let pseudo1 = sema.synthesize_var(".copyin.", elem);
    let pseudo1_ref = sema.ctx.build_var_ref(pseudo1, eloc);
    let pseudo2 = sema.synthesize_var(".copyin.", elem);
    let pseudo2_ref = sema.ctx.build_var_ref(pseudo2, eloc);
    let assign = sema.ctx.build_assign(pseudo1_ref, pseudo2_ref, eloc);
    let assign = sema.ctx.build_to_void(assign, eloc);
    (pseudo1_ref, pseudo2_ref, assign)
}

pub(crate) fn on_copyin<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    let mut pseudo_vars1 = vec![];
    let mut pseudo_vars2 = vec![];
    let mut assignments = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            pseudo_vars1.push(None);
            pseudo_vars2.push(None);
            assignments.push(None);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // A list item that appears in a copyin clause must be threadprivate.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Threadprivate && prev.attr != ClauseKind::Copyin {
            sema.diag(DiagKind::RequiredThreadprivate(ClauseKind::Copyin), eloc);
            continue;
        }

        // A class-typed item requires an accessible, unambiguous copy
        // assignment operator.
        if !require_member(sema, ClauseKind::Copyin, SpecialMember::CopyAssignment, var, eloc) {
            continue;
        }

        let vty = sema.ctx.vars.get(var).ty;
        let is_array = sema.ctx.tys.is_array(vty);
        let elem = sema.ctx.tys.array_element(vty);
        let elem = sema.ctx.tys.unqualified(elem);
        let trivially_copyable = match sema.ctx.tys.as_class(elem) {
            Some(c) => sema.ctx.classes.get(c).trivially_copyable,
            None => true,
        };

        let pseudo1 = sema.synthesize_var(".copyin.", elem);
        let pseudo1_ref = sema.ctx.build_var_ref(pseudo1, eloc);
        if !trivially_copyable || is_array {
            let pseudo2 = sema.synthesize_var(".copyin.", elem);
            let pseudo2_ref = sema.ctx.build_var_ref(pseudo2, eloc);
            let assign = sema.ctx.build_assign(pseudo1_ref, pseudo2_ref, eloc);
            let assign = sema.ctx.build_to_void(assign, eloc);
            pseudo_vars2.push(Some(pseudo2_ref));
            assignments.push(Some(assign));
        } else {
            pseudo_vars2.push(None);
            assignments.push(None);
        }
        pseudo_vars1.push(Some(pseudo1_ref));

        sema.add_dsa(var, Some(eloc), ClauseKind::Copyin);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    Some(Clause::Copyin {
        vars,
        pseudo_vars1,
        pseudo_vars2,
        assignments,
    })
}

pub(crate) fn on_copyprivate<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    let mut pseudo_vars1 = vec![];
    let mut pseudo_vars2 = vec![];
    let mut assignments = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            pseudo_vars1.push(None);
            pseudo_vars2.push(None);
            assignments.push(None);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // A list item may not also appear in a private or firstprivate
        // clause on the single construct; predetermined private without an
        // explicit listing is tolerated.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Threadprivate
            && prev.attr != ClauseKind::Copyprivate
            && prev.attr != ClauseKind::Unknown
            && !(prev.attr == ClauseKind::Private && prev.ref_site.is_none())
        {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Copyprivate,
                },
                eloc,
            );
            note_prev_dsa(sema, &prev, var);
            continue;
        }

        // All list items must be threadprivate or private in the enclosing
        // context; a variable that is implicitly shared there cannot be
        // broadcast.
        if prev.attr == ClauseKind::Unknown {
            let implicit = sema.implicit_dsa(var);
            if implicit.attr == ClauseKind::Shared {
                sema.diag(
                    DiagKind::RequiredAccess {
                        clause: ClauseKind::Copyprivate,
                        required: ClauseKind::Private,
                    },
                    eloc,
                );
                if let Some(site) = implicit.ref_site {
                    sema.diag(DiagKind::NoteExplicitDsa(implicit.attr), site);
                }
                continue;
            }
        }

        if !require_member(
            sema,
            ClauseKind::Copyprivate,
            SpecialMember::CopyAssignment,
            var,
            eloc,
        ) {
            continue;
        }

        let elem = sema.ctx.tys.array_element(sema.ctx.vars.get(var).ty);
        let elem = sema.ctx.tys.unqualified(elem);
        let (p1, p2, assign) = synthesize_copy_pair(sema, elem, eloc);
        pseudo_vars1.push(Some(p1));
        pseudo_vars2.push(Some(p2));
        assignments.push(Some(assign));

        sema.add_dsa(var, Some(eloc), ClauseKind::Copyprivate);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    Some(Clause::Copyprivate {
        vars,
        pseudo_vars1,
        pseudo_vars2,
        assignments,
    })
}

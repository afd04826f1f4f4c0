//! Validators for the four core data-sharing clauses: private,
//! firstprivate, lastprivate and shared.

use log::debug;

use super::super::ast::{ClauseKind, DirectiveKind, Expr, ExprId, SpecialMember};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::{
    expect_var_name, is_dependent_entry, note_prev_dsa, reject_reference, require_complete,
    require_member, Clause,
};

/// Directives on which a firstprivate/lastprivate/reduction list item must
/// be implicitly shared in the binding parallel region.
fn requires_shared_in_parallel(dir: DirectiveKind) -> bool {
    matches!(
        dir,
        DirectiveKind::For
            | DirectiveKind::Sections
            | DirectiveKind::ParallelFor
            | DirectiveKind::ParallelForSimd
            | DirectiveKind::ParallelSections
    )
}

pub(crate) fn on_private<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    let mut default_inits = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            default_inits.push(None);
            continue;
        }

        // A list item is a variable name; a variable that is part of another
        // variable cannot appear in a private clause.
        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // A variable in a private clause must not have an incomplete type or
        // a reference type.
        if !require_complete(sema, ClauseKind::Private, var, eloc) {
            continue;
        }
        if !reject_reference(sema, ClauseKind::Private, var, eloc) {
            continue;
        }

        // Variables with predetermined attributes may not be listed except
        // where an exception overrides them; private has no exceptions.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Unknown && prev.attr != ClauseKind::Private {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Private,
                },
                eloc,
            );
            note_prev_dsa(sema, &prev, var);
            continue;
        }

        // A class-typed item requires an accessible, unambiguous default
        // constructor and a usable destructor.
        if !require_member(sema, ClauseKind::Private, SpecialMember::DefaultConstructor, var, eloc)
        {
            continue;
        }
        if !require_member(sema, ClauseKind::Private, SpecialMember::Destructor, var, eloc) {
            continue;
        }

        // Synthesize the default initializer for the private copy.
        let elem = sema.ctx.tys.array_element(sema.ctx.vars.get(var).ty);
        let elem = sema.ctx.tys.unqualified(elem);
        let init = if sema.ctx.tys.as_class(elem).is_some() {
            Some(sema.ctx.exprs.add(Expr::Construct { ty: elem, arg: None }, elem, eloc))
        } else {
            None
        };
        default_inits.push(init);

        sema.add_dsa(var, Some(eloc), ClauseKind::Private);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    Some(Clause::Private {
        vars,
        default_inits,
    })
}

/// `clause_span` is absent when the clause is synthesized from the implicit
/// firstprivate attributes of a task region, which relaxes the conflict
/// reporting for attributes that were never explicitly listed.
pub(crate) fn on_firstprivate<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
    clause_span: Option<Span>,
) -> Option<Clause> {
    let mut vars = vec![];
    let mut pseudo_vars = vec![];
    let mut inits = vec![];
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            pseudo_vars.push(None);
            inits.push(None);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };
        if !require_complete(sema, ClauseKind::Firstprivate, var, eloc) {
            continue;
        }
        if !reject_reference(sema, ClauseKind::Firstprivate, var, eloc) {
            continue;
        }

        let vty = sema.ctx.vars.get(var).ty;
        let is_constant = sema.ctx.tys.is_const(sema.ctx.tys.non_reference(vty));
        let is_array = sema.ctx.tys.is_array(vty);

        // Variables with const-qualified type having no mutable member, and
        // static data members, may be listed in a firstprivate clause even
        // though they are predetermined shared.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Unknown
            && prev.attr != ClauseKind::Firstprivate
            && prev.attr != ClauseKind::Lastprivate
            && !(prev.attr == ClauseKind::Shared
                && prev.ref_site.is_none()
                && (is_constant || sema.ctx.vars.get(var).is_static_member))
        {
            let curr_dir = sema.stack.current_directive();
            if (curr_dir != DirectiveKind::Task || prev.ref_site.is_some())
                && clause_span.is_some()
            {
                sema.diag(
                    DiagKind::WrongDsa {
                        prev: prev.attr,
                        clause: ClauseKind::Firstprivate,
                    },
                    eloc,
                );
                note_prev_dsa(sema, &prev, var);
                continue;
            }
        }

        // A list item that is private within the binding parallel region, or
        // reduction-bound there, may not appear in firstprivate on a
        // worksharing or task construct.
        let curr_dir = sema.stack.current_directive();
        let implicit = sema.implicit_dsa(var);
        let task_reduction = curr_dir == DirectiveKind::Task
            && sema
                .has_dsa(var, ClauseKind::Reduction, Some(DirectiveKind::Parallel))
                .is_some();
        if (implicit.attr != ClauseKind::Shared && requires_shared_in_parallel(curr_dir))
            || task_reduction
        {
            if implicit.attr == ClauseKind::Unknown {
                sema.diag(
                    DiagKind::RequiredAccess {
                        clause: ClauseKind::Firstprivate,
                        required: ClauseKind::Shared,
                    },
                    eloc,
                );
                continue;
            }
            if implicit.directive == DirectiveKind::Unknown {
                sema.diag(
                    DiagKind::WrongDsa {
                        prev: implicit.attr,
                        clause: ClauseKind::Firstprivate,
                    },
                    eloc,
                );
                if let Some(site) = implicit.ref_site {
                    sema.diag(DiagKind::NoteExplicitDsa(implicit.attr), site);
                }
                continue;
            }
            // An identical firstprivate listing inherited from the binding
            // parallel region of a worksharing construct is tolerated.
            let inherited = implicit.attr == ClauseKind::Firstprivate
                && implicit.directive == DirectiveKind::Parallel
                && matches!(curr_dir, DirectiveKind::For | DirectiveKind::Sections)
                && implicit.ref_site == Some(eloc);
            if !inherited {
                sema.diag(
                    DiagKind::DsaWithDirectives {
                        prev: implicit.attr,
                        prev_dir: implicit.directive,
                        clause: ClauseKind::Firstprivate,
                        dir: curr_dir,
                    },
                    eloc,
                );
                if let Some(site) = implicit.ref_site {
                    sema.diag(DiagKind::NoteExplicitDsa(implicit.attr), site);
                }
                continue;
            }
        }

        // A class-typed item requires an accessible, unambiguous copy
        // constructor and a usable destructor.
        if !require_member(
            sema,
            ClauseKind::Firstprivate,
            SpecialMember::CopyConstructor,
            var,
            eloc,
        ) {
            continue;
        }
        if !require_member(sema, ClauseKind::Firstprivate, SpecialMember::Destructor, var, eloc) {
            continue;
        }

        // Non-trivially-copyable classes and arrays get a staging pseudo
        // variable plus a copy-construction initializer; everything else is
        // copied bitwise by the runtime.
        let elem = sema.ctx.tys.array_element(vty);
        let elem = sema.ctx.tys.unqualified(elem);
        let trivially_copyable = match sema.ctx.tys.as_class(elem) {
            Some(c) => sema.ctx.classes.get(c).trivially_copyable,
            None => true,
        };
        if !trivially_copyable || is_array {
            let pseudo = sema.synthesize_var(".firstprivate.", elem);
            let pseudo_ref = sema.ctx.build_var_ref(pseudo, eloc);
            let init = sema.ctx.exprs.add(
                Expr::Construct {
                    ty: elem,
                    arg: Some(pseudo_ref),
                },
                elem,
                eloc,
            );
            pseudo_vars.push(Some(pseudo_ref));
            inits.push(Some(init));
        } else {
            pseudo_vars.push(None);
            inits.push(None);
        }

        sema.add_dsa(var, Some(eloc), ClauseKind::Firstprivate);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    Some(Clause::Firstprivate {
        vars,
        pseudo_vars,
        inits,
    })
}

pub(crate) fn on_lastprivate<R: Reporter>(
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
        if !require_complete(sema, ClauseKind::Lastprivate, var, eloc) {
            continue;
        }
        if !reject_reference(sema, ClauseKind::Lastprivate, var, eloc) {
            continue;
        }

        // If a list item appears in both firstprivate and lastprivate
        // clauses, the lastprivate update occurs after the firstprivate
        // initialization; re-listing is allowed for exactly those two.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Unknown
            && prev.attr != ClauseKind::Firstprivate
            && prev.attr != ClauseKind::Lastprivate
        {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Lastprivate,
                },
                eloc,
            );
            note_prev_dsa(sema, &prev, var);
            continue;
        }
        let is_not_firstprivate = prev.attr != ClauseKind::Firstprivate;

        // A list item that is private within the binding parallel region
        // must not appear in lastprivate on a worksharing construct.
        let curr_dir = sema.stack.current_directive();
        let implicit = sema.implicit_dsa(var);
        if implicit.attr != ClauseKind::Shared && requires_shared_in_parallel(curr_dir) {
            if implicit.attr == ClauseKind::Unknown {
                sema.diag(
                    DiagKind::RequiredAccess {
                        clause: ClauseKind::Lastprivate,
                        required: ClauseKind::Shared,
                    },
                    eloc,
                );
            } else if implicit.directive == DirectiveKind::Unknown {
                sema.diag(
                    DiagKind::WrongDsa {
                        prev: implicit.attr,
                        clause: ClauseKind::Lastprivate,
                    },
                    eloc,
                );
            } else {
                sema.diag(
                    DiagKind::DsaWithDirectives {
                        prev: implicit.attr,
                        prev_dir: implicit.directive,
                        clause: ClauseKind::Lastprivate,
                        dir: curr_dir,
                    },
                    eloc,
                );
            }
            if let Some(site) = implicit.ref_site {
                sema.diag(DiagKind::NoteExplicitDsa(implicit.attr), site);
            }
            continue;
        }

        // A class-typed item requires an accessible, unambiguous copy
        // assignment operator and a usable destructor.
        if !require_member(
            sema,
            ClauseKind::Lastprivate,
            SpecialMember::CopyAssignment,
            var,
            eloc,
        ) {
            continue;
        }
        if !require_member(sema, ClauseKind::Lastprivate, SpecialMember::Destructor, var, eloc) {
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

        let pseudo1 = sema.synthesize_var(".lastprivate.", elem);
        let pseudo1_ref = sema.ctx.build_var_ref(pseudo1, eloc);
        if !trivially_copyable || is_array {
            let pseudo2 = sema.synthesize_var(".lastprivate.", elem);
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

        if is_not_firstprivate {
            sema.add_dsa(var, Some(eloc), ClauseKind::Lastprivate);
        }
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    debug!("lastprivate clause accepted {} items", vars.len());
    Some(Clause::Lastprivate {
        default_inits: vec![None; vars.len()],
        vars,
        pseudo_vars1,
        pseudo_vars2,
        assignments,
    })
}

pub(crate) fn on_shared<R: Reporter>(
    sema: &mut Sema<R>,
    raw_vars: Vec<ExprId>,
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

        // Only an explicit conflicting listing blocks shared; predetermined
        // attributes without a reference site do not.
        let prev = sema.top_dsa(var);
        if prev.attr != ClauseKind::Unknown
            && prev.attr != ClauseKind::Shared
            && prev.ref_site.is_some()
        {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Shared,
                },
                eloc,
            );
            note_prev_dsa(sema, &prev, var);
            continue;
        }

        sema.add_dsa(var, Some(eloc), ClauseKind::Shared);
        vars.push(item);
    }

    if vars.is_empty() {
        return None;
    }
    Some(Clause::Shared { vars })
}

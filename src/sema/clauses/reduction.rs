//! The reduction clause validator.  Resolves the reduction operator (a
//! built-in combiner or a user-declared one looked up by name and operand
//! type), checks the usual list-item constraints, and synthesizes the
//! pointer proxy parameters plus the in-place combiner expression code
//! generation calls per thread pair.

use log::debug;

use crate::StringId;

use super::super::ast::{
    BinOp, Callee, ClauseKind, DirectiveKind, Expr, ExprId, ReductionDeclId, ReductionOp,
    SpecialMember, Ty, UnaryOp,
};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::{expect_var_name, is_dependent_entry, note_decl, note_prev_dsa, Clause};

/// Looks up a user-declared combiner for the operand type.  Exact type
/// matches are preferred; a derived-class operand falls back to a combiner
/// declared for one of its bases.  Several surviving candidates are
/// ambiguous: the ambiguity is diagnosed and the last candidate is used so
/// analysis can continue.
fn find_reduction_decl<R: Reporter>(
    sema: &mut Sema<R>,
    name: StringId,
    operand_ty: super::super::ast::TyId,
    span: Span,
) -> Option<ReductionDeclId> {
    let candidates = sema.ctx.reductions_named(name);
    let mut found: Vec<ReductionDeclId> = candidates
        .iter()
        .copied()
        .filter(|id| {
            let decl_ty = sema.ctx.reduction(*id).ty;
            sema.ctx.tys.same_unqualified(decl_ty, operand_ty)
        })
        .collect();
    if found.is_empty() {
        let operand_class = sema.ctx.tys.as_class(operand_ty);
        found = candidates
            .iter()
            .copied()
            .filter(|id| {
                let decl_ty = sema.ctx.reduction(*id).ty;
                match (operand_class, sema.ctx.tys.as_class(decl_ty)) {
                    (Some(derived), Some(base)) => sema.ctx.classes.is_derived_from(derived, base),
                    _ => false,
                }
            })
            .collect();
    }
    if found.len() > 1 {
        sema.diag(DiagKind::AmbiguousReference(name), span);
        for id in &found {
            let decl_span = sema.ctx.reduction(*id).decl_span;
            sema.diag(DiagKind::NoteAmbiguousCandidate(name), decl_span);
        }
    }
    found.last().copied()
}

/// The compound-assignment operator a built-in reduction lowers to.  Min,
/// max and the logical operators need extra wrapping and are handled at the
/// combiner-building site.
fn builtin_bin_op(op: ReductionOp) -> Option<BinOp> {
    match op {
        ReductionOp::Add => Some(BinOp::Add),
        ReductionOp::Mult => Some(BinOp::Mul),
        ReductionOp::Sub => Some(BinOp::Sub),
        ReductionOp::BitAnd => Some(BinOp::BitAnd),
        ReductionOp::BitOr => Some(BinOp::BitOr),
        ReductionOp::BitXor => Some(BinOp::BitXor),
        _ => None,
    }
}

pub(crate) fn on_reduction<R: Reporter>(
    sema: &mut Sema<R>,
    op: ReductionOp,
    op_name: Option<StringId>,
    raw_vars: Vec<ExprId>,
    _span: Span,
) -> Option<Clause> {
    let mut vars = vec![];
    let mut combiners = vec![];
    let mut helper_params1 = vec![];
    let mut helper_params2 = vec![];
    let mut default_inits = vec![];
    let mut resolved_op = op;
    for item in raw_vars {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            vars.push(item);
            combiners.push(None);
            helper_params1.push(None);
            helper_params2.push(None);
            default_inits.push(None);
            continue;
        }

        let var = match expect_var_name(sema, item, eloc) {
            Some(v) => v,
            None => continue,
        };

        // Aggregate and incomplete types may not appear in a reduction
        // clause; neither may const-qualified items.
        let vty = sema.ctx.vars.get(var).ty;
        if sema.ctx.tys.is_incomplete(vty) {
            sema.diag(DiagKind::IncompleteType(ClauseKind::Reduction, var), eloc);
            continue;
        }
        let canon = sema.ctx.tys.non_reference(vty);
        if sema.ctx.tys.is_array(canon) {
            sema.diag(DiagKind::ArrayTypeArg(ClauseKind::Reduction, var), eloc);
            note_decl(sema, var);
            continue;
        }
        if sema.ctx.tys.is_const(canon) {
            sema.diag(DiagKind::ConstVariable(ClauseKind::Reduction, var), eloc);
            note_decl(sema, var);
            continue;
        }

        // min and max require an arithmetic operand type.
        if matches!(op, ReductionOp::Min | ReductionOp::Max)
            && !sema.ctx.tys.is_arithmetic(canon)
            && !sema.ctx.tys.is_dependent(canon)
        {
            sema.diag(
                DiagKind::NotArithmeticTypeArg(ClauseKind::Reduction, var),
                eloc,
            );
            note_decl(sema, var);
            continue;
        }

        // A list item can appear only once in the reduction clauses of a
        // directive, and may not carry any other explicit attribute.
        let prev = sema.top_dsa(var);
        if prev.attr == ClauseKind::Reduction {
            sema.diag(DiagKind::OnceReferenced(ClauseKind::Reduction), eloc);
            if let Some(site) = prev.ref_site {
                sema.diag(DiagKind::NoteReferenced, site);
            }
        } else if prev.attr != ClauseKind::Unknown {
            sema.diag(
                DiagKind::WrongDsa {
                    prev: prev.attr,
                    clause: ClauseKind::Reduction,
                },
                eloc,
            );
            note_prev_dsa(sema, &prev, var);
            continue;
        }

        // A list item on a worksharing construct must be shared in the
        // binding parallel region.
        let curr_dir = sema.stack.current_directive();
        let implicit = sema.implicit_dsa(var);
        if implicit.attr != ClauseKind::Shared
            && matches!(
                curr_dir,
                DirectiveKind::For
                    | DirectiveKind::Sections
                    | DirectiveKind::ParallelFor
                    | DirectiveKind::ParallelForSimd
                    | DirectiveKind::ParallelSections
            )
        {
            if implicit.attr == ClauseKind::Unknown {
                sema.diag(
                    DiagKind::RequiredAccess {
                        clause: ClauseKind::Reduction,
                        required: ClauseKind::Shared,
                    },
                    eloc,
                );
            } else if implicit.directive == DirectiveKind::Unknown {
                sema.diag(
                    DiagKind::WrongDsa {
                        prev: implicit.attr,
                        clause: ClauseKind::Reduction,
                    },
                    eloc,
                );
            } else {
                sema.diag(
                    DiagKind::DsaWithDirectives {
                        prev: implicit.attr,
                        prev_dir: implicit.directive,
                        clause: ClauseKind::Reduction,
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

        // Try a user-declared combiner first; an explicit custom operator
        // with no declaration for the type rejects the entry.
        let unqual = sema.ctx.tys.unqualified(canon);
        let decl = match op_name {
            Some(name) => find_reduction_decl(sema, name, unqual, eloc),
            None => None,
        };
        if op == ReductionOp::Custom && decl.is_none() {
            let name = op_name.expect("custom reduction operator must carry a name");
            sema.diag(DiagKind::UnknownReductionIdentifier(name), eloc);
            continue;
        }

        // The pointer proxy parameters both the custom and the built-in
        // combiner are invoked through.
        let ptr_ty = sema.ctx.tys.add(Ty::Pointer(unqual));
        let p1 = sema.synthesize_var(".ptr1.", ptr_ty);
        let p2 = sema.synthesize_var(".ptr2.", ptr_ty);
        let p1_ref = sema.ctx.build_var_ref(p1, eloc);
        let p2_ref = sema.ctx.build_var_ref(p2, eloc);

        if let Some(decl) = decl {
            resolved_op = ReductionOp::Custom;
            let combine = sema.ctx.build_call(
                Callee::Combiner(decl),
                vec![p1_ref, p2_ref],
                unqual,
                eloc,
            );
            let init = sema
                .ctx
                .build_call(Callee::Initializer(decl), vec![], unqual, eloc);
            vars.push(item);
            combiners.push(Some(combine));
            helper_params1.push(Some(p1_ref));
            helper_params2.push(Some(p2_ref));
            default_inits.push(Some(init));
        } else {
            // Bitwise operators reject floating operands.
            if matches!(
                op,
                ReductionOp::BitAnd | ReductionOp::BitOr | ReductionOp::BitXor
            ) && sema.ctx.tys.is_floating(canon)
            {
                sema.diag(DiagKind::FloatingTypeArg(var), eloc);
                note_decl(sema, var);
                continue;
            }

            let d1 = match sema.ctx.build_unary(UnaryOp::Deref, p1_ref, eloc) {
                Some(e) => e,
                None => continue,
            };
            let d2 = match sema.ctx.build_unary(UnaryOp::Deref, p2_ref, eloc) {
                Some(e) => e,
                None => continue,
            };
            // The in-place combiner: `*lhs op= *rhs`, with subtraction
            // accumulating additively, logical and min/max operators wrapped
            // into an assignment of the combined value.
            let combine = match op {
                ReductionOp::And | ReductionOp::Or => {
                    let bin = if op == ReductionOp::And {
                        BinOp::And
                    } else {
                        BinOp::Or
                    };
                    sema.ctx
                        .build_bin_op(bin, d1, d2, eloc)
                        .map(|logic| sema.ctx.build_assign(d1, logic, eloc))
                }
                ReductionOp::Min | ReductionOp::Max => {
                    let bin = if op == ReductionOp::Min {
                        BinOp::Lt
                    } else {
                        BinOp::Gt
                    };
                    sema.ctx
                        .build_bin_op(bin, d1, d2, eloc)
                        .and_then(|cmp| sema.ctx.build_conditional(cmp, d1, d2, eloc))
                        .map(|sel| sema.ctx.build_assign(d1, sel, eloc))
                }
                _ => {
                    let mut bin = builtin_bin_op(op).expect("built-in reduction operator");
                    if bin == BinOp::Sub {
                        bin = BinOp::Add;
                    }
                    sema.ctx.build_compound_assign(bin, d1, d2, eloc)
                }
            };
            let combine = match combine {
                Some(e) => sema.ctx.build_to_void(e, eloc),
                None => continue,
            };

            // Class-typed operands of a built-in combiner still need a
            // usable default constructor and destructor for the private
            // copy.
            let class = sema.ctx.tys.as_class(unqual);
            if class.is_some() {
                if !super::require_member(
                    sema,
                    ClauseKind::Reduction,
                    SpecialMember::DefaultConstructor,
                    var,
                    eloc,
                ) {
                    continue;
                }
                if !super::require_member(
                    sema,
                    ClauseKind::Reduction,
                    SpecialMember::Destructor,
                    var,
                    eloc,
                ) {
                    continue;
                }
            }
            let init = if class.is_some() {
                Some(
                    sema.ctx
                        .exprs
                        .add(Expr::Construct { ty: unqual, arg: None }, unqual, eloc),
                )
            } else {
                None
            };

            vars.push(item);
            combiners.push(Some(combine));
            helper_params1.push(Some(p1_ref));
            helper_params2.push(Some(p2_ref));
            default_inits.push(init);
        }
        sema.add_dsa(var, Some(eloc), ClauseKind::Reduction);
    }

    if vars.is_empty() {
        return None;
    }
    debug!(
        "reduction({}) clause accepted {} items",
        resolved_op,
        vars.len()
    );
    Some(Clause::Reduction {
        op: resolved_op,
        op_name,
        vars,
        combiners,
        helper_params1,
        helper_params2,
        default_inits,
    })
}

//! The depend clause validator.  Unlike every other variable-list clause,
//! depend also accepts array elements and array sections.  Each section
//! entry gets a synthesized stride counter and a flattened per-dimension
//! access expression so the runtime can enumerate the addresses the
//! dependency covers; the clause carries a total slot counter summing the
//! expansion of every item.

use super::super::ast::{BinOp, Expr, ExprId};
use super::super::diag::{DiagKind, Reporter};
use super::super::engine::Sema;
use super::super::Span;
use super::{is_dependent_entry, Clause, DependItem};
use crate::sema::ast::DependType;

/// The decomposition of one depend item: the base variable, and one entry
/// per subscript from outermost to innermost.
struct SubscriptChain {
    sections: Vec<(ExprId, Option<(ExprId, ExprId)>)>,
}

/// Walks an `ArrayIndex`/`Section` chain down to its base.  Returns `None`
/// when the base is not a plain variable reference.
fn decompose<R: Reporter>(sema: &Sema<R>, e: ExprId) -> Option<SubscriptChain> {
    let mut sections = vec![];
    let mut cur = e;
    loop {
        match sema.ctx.exprs.get(cur) {
            Expr::ArrayIndex(base, index) => {
                sections.push((*index, None));
                cur = *base;
            }
            Expr::Section {
                base,
                lower,
                length,
                ..
            } => {
                sections.push((cur, Some((*lower, *length))));
                cur = *base;
            }
            Expr::VarRef(_) => {
                // Kept in visit order: the innermost (contiguous) subscript
                // first, outer dimensions after it.
                return Some(SubscriptChain { sections });
            }
            _ => return None,
        }
    }
}

pub(crate) fn on_depend<R: Reporter>(
    sema: &mut Sema<R>,
    dep_type: DependType,
    raw_items: Vec<ExprId>,
    span: Span,
) -> Option<Clause> {
    let mut items: Vec<DependItem> = vec![];
    let mut simple_count: i64 = 0;
    let mut section_counter: Option<ExprId> = None;
    for item in raw_items {
        let eloc = sema.ctx.exprs.span(item);
        if is_dependent_entry(sema, item) {
            items.push(DependItem {
                expr: item,
                size: None,
                indices: vec![],
                lengths: vec![],
            });
            continue;
        }

        // A plain variable reference is a one-slot address dependency.
        if sema.ctx.exprs.as_var_ref(item).is_some() {
            let ty = sema.ctx.exprs.ty(item);
            let size = sema.ctx.build_sizeof(ty, eloc);
            simple_count += 1;
            items.push(DependItem {
                expr: item,
                size: Some(size),
                indices: vec![],
                lengths: vec![],
            });
            continue;
        }

        // Otherwise the item must be an array element or array section over
        // a named variable.
        let chain = match decompose(sema, item) {
            Some(c) => c,
            None => {
                if matches!(sema.ctx.exprs.get(item), Expr::IntLit(_)) {
                    sema.diag(DiagKind::DependArgNotLvalue, eloc);
                } else {
                    sema.diag(DiagKind::ExpectedVarNameOrArrayItem, eloc);
                }
                continue;
            }
        };

        let elem_ty = sema.ctx.exprs.ty(item);
        let mut size = sema.ctx.build_sizeof(elem_ty, eloc);
        let mut indices = vec![];
        let mut lengths = vec![];
        let mut bad_length = false;
        let mut first_section = true;
        for (section, bounds) in &chain.sections {
            let (lower, length) = match bounds {
                Some(b) => *b,
                None => continue,
            };
            // A zero-length or negative-length array section cannot describe
            // a dependency.
            if let Some(v) = sema.ctx.eval_const(length) {
                if v <= 0 {
                    let sloc = sema.ctx.exprs.span(length);
                    sema.diag(DiagKind::ArraySectionLengthNotPositive, sloc);
                    bad_length = true;
                    break;
                }
            }
            if first_section {
                // The outermost section folds into the byte extent.
                first_section = false;
                size = match sema.ctx.build_bin_op(BinOp::Mul, size, length, eloc) {
                    Some(s) => s,
                    None => break,
                };
                if let Expr::Section { index, .. } = sema.ctx.exprs.get_mut(*section) {
                    *index = Some(lower);
                }
            } else {
                // Inner sections iterate through a synthesized counter; the
                // access expression recovers the dimension index as
                // `lower + counter`.
                let int = sema.ctx.int_ty();
                let counter = sema.synthesize_var(".depend.i", int);
                let counter_ref = sema.ctx.build_var_ref(counter, eloc);
                let access = match sema.ctx.build_bin_op(BinOp::Add, lower, counter_ref, eloc) {
                    Some(a) => a,
                    None => break,
                };
                if let Expr::Section { index, .. } = sema.ctx.exprs.get_mut(*section) {
                    *index = Some(access);
                }
                indices.push(counter_ref);
                lengths.push(length);
            }
        }
        if bad_length {
            continue;
        }

        // Accumulate this item's slot count: the product of its inner
        // section lengths.
        if !lengths.is_empty() {
            let mut product = lengths[0];
            let mut ok = true;
            for l in &lengths[1..] {
                match sema.ctx.build_bin_op(BinOp::Mul, *l, product, eloc) {
                    Some(p) => product = p,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            section_counter = Some(match section_counter {
                Some(acc) => sema
                    .ctx
                    .build_bin_op(BinOp::Add, acc, product, eloc)
                    .unwrap_or(acc),
                None => product,
            });
        } else {
            simple_count += 1;
        }
        items.push(DependItem {
            expr: item,
            size: Some(size),
            indices,
            lengths,
        });
    }

    if items.is_empty() {
        return None;
    }

    // The total number of dependency slots: every simple address plus the
    // expansion of every sectioned item.
    let simple = sema.ctx.int_literal(simple_count, span);
    let counter = match section_counter {
        Some(sec) => sema
            .ctx
            .build_bin_op(BinOp::Add, sec, simple, span)
            .unwrap_or(simple),
        None => simple,
    };
    let size_ty = sema.ctx.uint_ty();
    let counter = sema.ctx.exprs.add(Expr::Cast(counter), size_ty, span);

    Some(Clause::Depend {
        dep_type,
        items,
        counter,
    })
}

/*
 * Canonical loop form recognition and collapse expansion.
 *
 * A loop-bearing directive requires its associated statement to match
 *
 *     for (var = lb; var relop b; incr-expr) structured-block
 *
 * per nesting level requested by collapse(N).  Recognition extracts the
 * induction variable, bounds, step, comparison direction and strictness,
 * predetermines the variable private, and assembles a closed-form trip
 * count.  For collapse(N) > 1 the per-level counts multiply into a single
 * flattened iteration space driven by one synthesized counter; per-level
 * index recovery expressions are built innermost-first by repeated div/mod
 * against cumulative products of the inner trip counts.
 */

use std::collections::HashSet;

use log::debug;

use super::ast::{BinOp, ClauseKind, DirectiveKind, Expr, ExprId, StmtId, UnaryOp, VarId};
use super::diag::{DiagKind, Reporter};
use super::engine::Sema;
use super::{SemaError, Span};

/// One recognized canonical loop level.
#[derive(Clone, Debug)]
pub struct CanonicalLoop {
    pub var: VarId,
    /// A reference to the induction variable, reused by the recovery
    /// expressions.
    pub var_ref: ExprId,
    pub init: ExprId,
    pub bound: ExprId,
    pub step: ExprId,
    pub is_less: bool,
    pub is_strict: bool,
    /// `(|b - lb| - strict + step) / step`; absent when any operand type is
    /// dependent and the arithmetic is deferred.
    pub trip_count: Option<ExprId>,
    /// The direction the recovery expressions advance the variable in.
    pub update_op: BinOp,
}

/// The flattened iteration space attached to a loop-bearing directive.
/// Every expression is absent when a dependent type deferred the
/// arithmetic.
#[derive(Clone, Debug)]
pub struct CollapsedLoop {
    /// Reference to the synthesized flattened counter.
    pub counter: Option<ExprId>,
    /// Product of the per-level trip counts.
    pub flat_count: Option<ExprId>,
    /// `flat_count - 1`: the inclusive bound code generation iterates to.
    pub last: Option<ExprId>,
    /// Comma chain of per-level (reset, advance) pairs recovering each
    /// induction variable from the counter.
    pub update: Option<ExprId>,
    /// Comma chain computing every level's final value after the loop.
    pub fini: Option<ExprId>,
    /// References to the per-level induction variables, outermost first.
    pub level_vars: Vec<ExprId>,
}

/// Searches a statement tree for a `break` that would leave the associated
/// loop.  Inner loops and switches keep their breaks.
fn find_break<R: Reporter>(sema: &Sema<R>, stmt: StmtId) -> Option<Span> {
    use super::ast::Stmt;
    match sema.ctx.stmts.get(stmt) {
        Stmt::Break => Some(sema.ctx.stmts.span(stmt)),
        Stmt::For { .. } | Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::Switch { .. } => None,
        Stmt::Compound(children) => children.iter().find_map(|c| find_break(sema, *c)),
        Stmt::If {
            then, otherwise, ..
        } => find_break(sema, *then).or_else(|| otherwise.and_then(|e| find_break(sema, e))),
        Stmt::Attributed(inner) | Stmt::Catch(inner) => find_break(sema, *inner),
        Stmt::Try { body, handlers } => {
            find_break(sema, *body).or_else(|| handlers.iter().find_map(|h| find_break(sema, *h)))
        }
        _ => None,
    }
}

/// Searches a statement tree for any exception construct; simd-family
/// regions may not contain one.
fn find_eh<R: Reporter>(sema: &Sema<R>, stmt: StmtId) -> Option<Span> {
    use super::ast::Stmt;
    match sema.ctx.stmts.get(stmt) {
        Stmt::Try { .. } | Stmt::Catch(_) | Stmt::Throw(_) => Some(sema.ctx.stmts.span(stmt)),
        Stmt::Compound(children) => children.iter().find_map(|c| find_eh(sema, *c)),
        Stmt::If {
            then, otherwise, ..
        } => find_eh(sema, *then).or_else(|| otherwise.and_then(|e| find_eh(sema, e))),
        Stmt::For { body, .. } => body.and_then(|b| find_eh(sema, b)),
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Switch { body, .. } => {
            find_eh(sema, *body)
        }
        Stmt::Attributed(inner) => find_eh(sema, *inner),
        _ => None,
    }
}

/// Collects every variable an expression reads.
fn collect_vars<R: Reporter>(sema: &Sema<R>, e: ExprId, out: &mut HashSet<VarId>) {
    match sema.ctx.exprs.get(e).clone() {
        Expr::VarRef(v) => {
            out.insert(v);
        }
        Expr::Unary(_, a) | Expr::ToVoid(a) | Expr::Cast(a) => collect_vars(sema, a, out),
        Expr::Binary(_, l, r)
        | Expr::Assign(l, r)
        | Expr::CompoundAssign(_, l, r)
        | Expr::Comma(l, r)
        | Expr::ArrayIndex(l, r) => {
            collect_vars(sema, l, out);
            collect_vars(sema, r, out);
        }
        Expr::IncDec { arg, .. } => collect_vars(sema, arg, out),
        Expr::Conditional(c, t, f) => {
            collect_vars(sema, c, out);
            collect_vars(sema, t, out);
            collect_vars(sema, f, out);
        }
        Expr::Call(_, args) => {
            for a in args {
                collect_vars(sema, a, out);
            }
        }
        Expr::Section { base, lower, length, .. } => {
            collect_vars(sema, base, out);
            collect_vars(sema, lower, out);
            collect_vars(sema, length, out);
        }
        Expr::Construct { arg: Some(a), .. } => collect_vars(sema, a, out),
        _ => (),
    }
}

/// Finds a write to any of `vars` inside the loop body: assignment,
/// compound assignment, or increment/decrement whose target is one of them.
fn find_mutation<R: Reporter>(
    sema: &Sema<R>,
    stmt: StmtId,
    vars: &HashSet<VarId>,
) -> Option<(VarId, Span)> {
    use super::ast::Stmt;
    fn expr_mutation<R: Reporter>(
        sema: &Sema<R>,
        e: ExprId,
        vars: &HashSet<VarId>,
    ) -> Option<(VarId, Span)> {
        match sema.ctx.exprs.get(e).clone() {
            Expr::Assign(lhs, rhs) | Expr::CompoundAssign(_, lhs, rhs) => {
                if let Some(v) = sema.ctx.exprs.as_var_ref(lhs) {
                    if vars.contains(&v) {
                        return Some((v, sema.ctx.exprs.span(e)));
                    }
                }
                expr_mutation(sema, rhs, vars)
            }
            Expr::IncDec { arg, .. } => {
                if let Some(v) = sema.ctx.exprs.as_var_ref(arg) {
                    if vars.contains(&v) {
                        return Some((v, sema.ctx.exprs.span(e)));
                    }
                }
                None
            }
            Expr::Binary(_, l, r) | Expr::Comma(l, r) => {
                expr_mutation(sema, l, vars).or_else(|| expr_mutation(sema, r, vars))
            }
            Expr::Unary(_, a) | Expr::ToVoid(a) | Expr::Cast(a) => expr_mutation(sema, a, vars),
            Expr::Conditional(c, t, f) => expr_mutation(sema, c, vars)
                .or_else(|| expr_mutation(sema, t, vars))
                .or_else(|| expr_mutation(sema, f, vars)),
            _ => None,
        }
    }
    match sema.ctx.stmts.get(stmt).clone() {
        Stmt::Expr(e) => expr_mutation(sema, e, vars),
        Stmt::Decl { init: Some(e), .. } => expr_mutation(sema, e, vars),
        Stmt::Compound(children) => children.iter().find_map(|c| find_mutation(sema, *c, vars)),
        Stmt::If {
            cond,
            then,
            otherwise,
        } => expr_mutation(sema, cond, vars)
            .or_else(|| find_mutation(sema, then, vars))
            .or_else(|| otherwise.and_then(|e| find_mutation(sema, e, vars))),
        Stmt::For {
            init,
            cond,
            inc,
            body,
        } => init
            .and_then(|s| find_mutation(sema, s, vars))
            .or_else(|| cond.and_then(|e| expr_mutation(sema, e, vars)))
            .or_else(|| inc.and_then(|e| expr_mutation(sema, e, vars)))
            .or_else(|| body.and_then(|b| find_mutation(sema, b, vars))),
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            expr_mutation(sema, cond, vars).or_else(|| find_mutation(sema, body, vars))
        }
        Stmt::Switch { cond, body } => {
            expr_mutation(sema, cond, vars).or_else(|| find_mutation(sema, body, vars))
        }
        Stmt::Attributed(inner) | Stmt::Catch(inner) => find_mutation(sema, inner, vars),
        Stmt::Try { body, handlers } => find_mutation(sema, body, vars)
            .or_else(|| handlers.iter().find_map(|h| find_mutation(sema, *h, vars))),
        _ => None,
    }
}

/// Matches the init statement: `var = lb`, a declaration with initializer,
/// or a single-argument copy construction for iterator-typed variables.
fn match_init<R: Reporter>(sema: &Sema<R>, init: StmtId) -> Option<(VarId, ExprId)> {
    use super::ast::Stmt;
    match sema.ctx.stmts.get(init) {
        Stmt::Expr(e) => match sema.ctx.exprs.get(*e) {
            Expr::Assign(lhs, rhs) => sema.ctx.exprs.as_var_ref(*lhs).map(|v| (v, *rhs)),
            _ => None,
        },
        Stmt::Decl {
            var,
            init: Some(rhs),
        } => {
            let value = match sema.ctx.exprs.get(*rhs) {
                Expr::Construct { arg: Some(a), .. } => *a,
                _ => *rhs,
            };
            Some((*var, value))
        }
        _ => None,
    }
}

/// Matches the test expression: `var relop b` or `b relop var`, extracting
/// the bound, direction and strictness.
fn match_test<R: Reporter>(
    sema: &Sema<R>,
    var: VarId,
    cond: ExprId,
) -> Option<(ExprId, bool, bool)> {
    let (op, l, r) = match sema.ctx.exprs.get(cond) {
        Expr::Binary(op, l, r) if op.is_relational() => (*op, *l, *r),
        _ => return None,
    };
    let strict = matches!(op, BinOp::Lt | BinOp::Gt);
    if sema.ctx.exprs.as_var_ref(l) == Some(var) {
        let is_less = matches!(op, BinOp::Lt | BinOp::Le);
        return Some((r, is_less, strict));
    }
    if sema.ctx.exprs.as_var_ref(r) == Some(var) {
        let is_less = matches!(op, BinOp::Gt | BinOp::Ge);
        return Some((l, is_less, strict));
    }
    None
}

/// Matches the increment expression and extracts the step.  Returns the
/// step and whether its direction agrees with the test's direction.
fn match_incr<R: Reporter>(
    sema: &mut Sema<R>,
    var: VarId,
    inc: ExprId,
    is_less: bool,
) -> Option<(ExprId, bool)> {
    let eloc = sema.ctx.exprs.span(inc);
    match sema.ctx.exprs.get(inc).clone() {
        Expr::IncDec { arg, is_inc, .. } => {
            if sema.ctx.exprs.as_var_ref(arg) != Some(var) {
                return None;
            }
            let compatible = (is_less && is_inc) || (!is_less && !is_inc);
            let step = if !compatible && is_less {
                sema.ctx.int_literal(-1, eloc)
            } else {
                sema.ctx.int_literal(1, eloc)
            };
            Some((step, compatible))
        }
        Expr::CompoundAssign(op, lhs, rhs) if op.is_additive() => {
            if sema.ctx.exprs.as_var_ref(lhs) != Some(var) {
                return None;
            }
            let compatible = (is_less && op == BinOp::Add) || (!is_less && op == BinOp::Sub);
            Some((rhs, compatible))
        }
        Expr::Assign(lhs, rhs) => {
            if sema.ctx.exprs.as_var_ref(lhs) != Some(var) {
                return None;
            }
            match sema.ctx.exprs.get(rhs).clone() {
                // var = var + incr | var = incr + var
                Expr::Binary(BinOp::Add, a, b) => {
                    let step = if sema.ctx.exprs.as_var_ref(a) == Some(var) {
                        Some(b)
                    } else if sema.ctx.exprs.as_var_ref(b) == Some(var) {
                        Some(a)
                    } else {
                        None
                    };
                    step.map(|s| (s, is_less))
                }
                // var = var - incr
                Expr::Binary(BinOp::Sub, a, b) => {
                    if sema.ctx.exprs.as_var_ref(a) == Some(var) {
                        Some((b, !is_less))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Recognizes one canonical loop level.  Reports every violation it finds
/// and returns `Err` if any was fatal; a successful recognition
/// predetermines the loop variable private.
fn canonical_loop<R: Reporter>(
    sema: &mut Sema<R>,
    kind: DirectiveKind,
    stmt: StmtId,
) -> Result<CanonicalLoop, ()> {
    use super::ast::Stmt;
    let sloc = sema.ctx.stmts.span(stmt);
    let (init, cond, inc, body) = match sema.ctx.stmts.get(stmt) {
        Stmt::For {
            init,
            cond,
            inc,
            body,
        } => (*init, *cond, *inc, *body),
        _ => {
            sema.diag(DiagKind::NotAForStatement(kind), sloc);
            return Err(());
        }
    };
    if body.is_none() {
        sema.diag(DiagKind::DirectiveNonBlock(kind), sloc);
        return Err(());
    }

    // init-expr: var = lb, for an integer, pointer, or random-access
    // iterator typed variable.
    let (var, init_value) = match init.and_then(|i| match_init(sema, i)) {
        Some(found) => found,
        None => {
            sema.diag(DiagKind::NotCanonicalFor(0), sloc);
            return Err(());
        }
    };
    let init_loc = init.map(|i| sema.ctx.stmts.span(i)).unwrap_or(sloc);

    // The loop iteration variable may be listed in a private or lastprivate
    // clause; any other explicit attribute is an error.  A threadprivate
    // variable is tolerated without forcing predetermination.
    let mut has_errors = false;
    let prev = sema.top_dsa(var);
    if prev.attr == ClauseKind::Threadprivate {
        // Tolerated.
    } else if prev.attr != ClauseKind::Unknown
        && prev.attr != ClauseKind::Private
        && prev.attr != ClauseKind::Lastprivate
    {
        sema.diag(DiagKind::LoopVarDsa(prev.attr), init_loc);
        match prev.ref_site {
            Some(site) => sema.diag(DiagKind::NoteExplicitDsa(prev.attr), site),
            None => {
                let decl = sema.ctx.vars.get(var).decl_span;
                sema.diag(DiagKind::NotePredeterminedDsa(prev.attr), decl);
            }
        }
        has_errors = true;
    } else {
        // The loop iteration variable of a for or parallel for construct is
        // private; a combined directive predetermines it in the parent
        // region too.
        sema.add_dsa(var, None, ClauseKind::Private);
        if sema.stack.current_directive() == DirectiveKind::ParallelFor {
            sema.add_parent_dsa(var, None, ClauseKind::Private);
        }
    }

    let var_ty = sema.ctx.tys.non_reference(sema.ctx.vars.get(var).ty);
    if !sema.ctx.tys.is_integer(var_ty)
        && !sema.ctx.tys.is_pointer(var_ty)
        && !sema.ctx.tys.is_overloadable(var_ty)
        && !sema.ctx.tys.is_dependent(var_ty)
    {
        sema.diag(DiagKind::ForVariableType, init_loc);
        has_errors = true;
    }

    // test-expr: var relational-op b, either side.
    let test = cond.and_then(|c| match_test(sema, var, c));
    if test.is_none() {
        sema.diag(DiagKind::NotCanonicalFor(1), sloc);
        has_errors = true;
    }
    let (bound, is_less, is_strict) = test.unwrap_or((init_value, true, true));

    // incr-expr: ++/--, +=/-=, or var = var +- step.
    let incr = inc.and_then(|i| match_incr(sema, var, i, is_less));
    if incr.is_none() {
        sema.diag(DiagKind::NotCanonicalFor(2), sloc);
        has_errors = true;
    }
    let (mut step, compatible) = incr.unwrap_or((init_value, true));

    // incr must be a loop-invariant integer expression.
    let step_ty = sema.ctx.exprs.ty(step);
    if !sema.ctx.tys.is_integer(step_ty) && !sema.ctx.tys.is_dependent(step_ty) {
        let step_loc = sema.ctx.exprs.span(step);
        sema.diag(DiagKind::ForIncrNotInteger, step_loc);
        has_errors = true;
    }

    // A decreasing test with an incrementing step (or vice versa) is an
    // error unless the step is a compatible signed constant, in which case
    // it is negated to restore consistency.
    if inc.is_some() && test.is_some() && incr.is_some() && !compatible {
        let step_val = sema.ctx.eval_const(step);
        let is_const = step_val.is_some();
        let is_const_neg = matches!(step_val, Some(v) if v < 0);
        let is_signed = sema.ctx.tys.is_signed_integer(step_ty);
        if (is_less && is_const && is_const_neg)
            || (!is_less && ((is_const && !is_const_neg) || (!is_const && !is_signed)))
        {
            let iloc = inc.map(|i| sema.ctx.exprs.span(i)).unwrap_or(sloc);
            sema.diag(DiagKind::ForIncrNotCompatible { var, is_less }, iloc);
            has_errors = true;
        } else {
            let step_loc = sema.ctx.exprs.span(step);
            step = sema
                .ctx
                .build_unary(UnaryOp::Minus, step, step_loc)
                .ok_or(())?;
        }
    }

    // lb, b and incr must be loop invariant: a mutation of any variable
    // they read inside the loop body invalidates the trip count.
    if let Some(body_id) = body {
        let mut referenced = HashSet::new();
        collect_vars(sema, init_value, &mut referenced);
        collect_vars(sema, bound, &mut referenced);
        collect_vars(sema, step, &mut referenced);
        referenced.remove(&var);
        if let Some((mutated, site)) = find_mutation(sema, body_id, &referenced) {
            sema.diag(DiagKind::LoopBoundNotInvariant(mutated), site);
            has_errors = true;
        }
    }

    if has_errors {
        return Err(());
    }

    // Assemble the trip count: distance between bound and init, minus one
    // for a strict comparison, plus the step, divided by the step.  A
    // dependent operand defers the arithmetic without failing recognition.
    let step_ty = sema.ctx.exprs.ty(step);
    let bound_ty = sema.ctx.exprs.ty(bound);
    let init_ty = sema.ctx.exprs.ty(init_value);
    let var_ref = sema.ctx.build_var_ref(var, init_loc);
    let update_op = if is_less { BinOp::Add } else { BinOp::Sub };
    if sema.ctx.tys.is_dependent(step_ty)
        || sema.ctx.tys.is_dependent(bound_ty)
        || sema.ctx.tys.is_dependent(init_ty)
    {
        return Ok(CanonicalLoop {
            var,
            var_ref,
            init: init_value,
            bound,
            step,
            is_less,
            is_strict,
            trip_count: None,
            update_op,
        });
    }

    let diff = if sema.ctx.tys.is_overloadable(var_ty) {
        // Random-access iterators go through the distance computation the
        // host library provides.
        let (from, to) = if is_less {
            (init_value, bound)
        } else {
            (bound, init_value)
        };
        match sema.ctx.build_distance(from, to, init_loc) {
            Some(d) => Some(d),
            None => {
                let vloc = sema.ctx.vars.get(var).decl_span;
                sema.diag(DiagKind::TypeNotRandomAccessIterator(var), vloc);
                return Err(());
            }
        }
    } else {
        let (hi, lo) = if is_less {
            (bound, init_value)
        } else {
            (init_value, bound)
        };
        sema.ctx.build_bin_op(BinOp::Sub, hi, lo, init_loc)
    };
    let diff = diff.and_then(|d| {
        if is_strict {
            let one = sema.ctx.int_literal(1, init_loc);
            sema.ctx.build_bin_op(BinOp::Sub, d, one, init_loc)
        } else {
            Some(d)
        }
    });
    let diff = diff.and_then(|d| sema.ctx.build_bin_op(BinOp::Add, d, step, init_loc));
    let diff = diff.and_then(|d| sema.ctx.build_bin_op(BinOp::Div, d, step, init_loc));
    let trip_count = match diff {
        Some(d) if sema.ctx.tys.is_integer(sema.ctx.exprs.ty(d)) => d,
        Some(d) if sema.ctx.tys.is_dependent(sema.ctx.exprs.ty(d)) => d,
        _ => {
            sema.diag(DiagKind::ForWrongCount, sloc);
            return Err(());
        }
    };

    Ok(CanonicalLoop {
        var,
        var_ref,
        init: init_value,
        bound,
        step,
        is_less,
        is_strict,
        trip_count: Some(trip_count),
        update_op,
    })
}

/// Unwraps attribute wrappers and single-statement compounds that do not
/// add real nesting between collapsed levels.
fn skip_containers<R: Reporter>(sema: &Sema<R>, mut stmt: Option<StmtId>) -> Option<StmtId> {
    use super::ast::Stmt;
    loop {
        match stmt {
            Some(s) => match sema.ctx.stmts.get(s) {
                Stmt::Attributed(inner) => stmt = Some(*inner),
                Stmt::Compound(children) if children.len() == 1 => stmt = Some(children[0]),
                _ => return stmt,
            },
            None => return None,
        }
    }
}

/// Recognizes the canonical loop nest associated with a loop-bearing
/// directive and builds the flattened iteration space.  `collapse_count`
/// comes from the validated collapse clause, defaulting to one level.
pub(crate) fn collapse_loop<R: Reporter>(
    sema: &mut Sema<R>,
    kind: DirectiveKind,
    collapse_count: u64,
    stmt: Option<StmtId>,
    span: Span,
) -> Result<CollapsedLoop, SemaError> {
    let fail = || SemaError::LoopNormalizationFailed(kind);

    let mut levels: Vec<CanonicalLoop> = vec![];
    let mut cur = skip_containers(sema, stmt);
    let mut skip_expr_count = false;
    for _ in 0..collapse_count.max(1) {
        let level_stmt = match cur {
            Some(s) => s,
            None => {
                sema.diag(DiagKind::NotAForStatement(kind), span);
                return Err(fail());
            }
        };
        let level = canonical_loop(sema, kind, level_stmt).map_err(|_| fail())?;
        if level.trip_count.is_none() {
            skip_expr_count = true;
        }
        let body = match sema.ctx.stmts.get(level_stmt) {
            super::ast::Stmt::For { body, .. } => *body,
            _ => None,
        };
        levels.push(level);
        cur = skip_containers(sema, body);
    }

    // The flattened body may not break out of the collapsed nest; simd
    // regions may not raise exceptions anywhere in the body.
    if let Some(body) = cur {
        if let Some(bloc) = find_break(sema, body) {
            sema.diag(DiagKind::ForCannotBreak(kind), bloc);
            return Err(fail());
        }
        if kind.is_simd() {
            if let Some(bloc) = find_eh(sema, body) {
                sema.diag(DiagKind::ForCannotHaveEh(kind), bloc);
                return Err(fail());
            }
        }
    }

    let level_vars: Vec<ExprId> = levels.iter().map(|l| l.var_ref).collect();
    if skip_expr_count {
        return Ok(CollapsedLoop {
            counter: None,
            flat_count: None,
            last: None,
            update: None,
            fini: None,
            level_vars,
        });
    }

    let n = levels.len();
    let ends: Vec<ExprId> = levels.iter().map(|l| l.trip_count.unwrap()).collect();

    // Flattened count: the product of every level's trip count.
    let mut flat = ends[0];
    for end in ends.iter().skip(1) {
        flat = sema
            .ctx
            .build_bin_op(BinOp::Mul, *end, flat, span)
            .ok_or_else(fail)?;
    }

    // The synthesized counter variable driving the whole nest.
    let counter_ty = sema.ctx.exprs.ty(flat);
    let counter_var = sema.synthesize_var(".omp.iv.", counter_ty);
    let counter = sema.ctx.build_var_ref(counter_var, span);

    let one = sema.ctx.int_literal(1, span);
    let last = sema
        .ctx
        .build_bin_op(BinOp::Sub, flat, one, span)
        .ok_or_else(fail)?;

    // Recovery expressions are built innermost-first: the counter modulo
    // the innermost count selects that level directly; each outward level
    // divides by the cumulative product of the counts inside it.
    let mut update: Option<ExprId> = None;
    let mut fini: Option<ExprId> = None;
    let mut div: Option<ExprId> = None;
    for i in (0..n).rev() {
        let level = &levels[i];
        let var_ref = level.var_ref;
        let init = level.init;
        let step = level.step;
        let end = ends[i];
        let op = level.update_op;

        let scaled = match div {
            None => counter,
            Some(d) => sema
                .ctx
                .build_bin_op(BinOp::Div, counter, d, span)
                .ok_or_else(fail)?,
        };
        let rem = sema
            .ctx
            .build_bin_op(BinOp::Rem, scaled, end, span)
            .ok_or_else(fail)?;
        let advance = sema
            .ctx
            .build_bin_op(BinOp::Mul, rem, step, span)
            .ok_or_else(fail)?;

        // update: reset the level variable, then advance it by the
        // recovered amount.
        let reset = sema.ctx.build_assign(var_ref, init, span);
        let reset = sema.ctx.build_to_void(reset, span);
        let bump = sema
            .ctx
            .build_compound_assign(op, var_ref, advance, span)
            .ok_or_else(fail)?;
        let bump = sema.ctx.build_to_void(bump, span);
        let pair = sema.ctx.build_comma(reset, bump, span);
        update = Some(match update {
            None => pair,
            Some(u) => sema.ctx.build_comma(u, pair, span),
        });

        // fini: the level variable's value after the full iteration space
        // has been walked.
        let f_reset = sema.ctx.build_assign(var_ref, init, span);
        let f_reset = sema.ctx.build_to_void(f_reset, span);
        let total = sema
            .ctx
            .build_bin_op(BinOp::Mul, end, step, span)
            .ok_or_else(fail)?;
        let f_bump = sema
            .ctx
            .build_compound_assign(op, var_ref, total, span)
            .ok_or_else(fail)?;
        let f_bump = sema.ctx.build_to_void(f_bump, span);
        let f_pair = sema.ctx.build_comma(f_reset, f_bump, span);
        fini = Some(match fini {
            None => f_pair,
            Some(f) => sema.ctx.build_comma(f, f_pair, span),
        });

        div = Some(match div {
            None => end,
            Some(d) => sema
                .ctx
                .build_bin_op(BinOp::Mul, d, end, span)
                .ok_or_else(fail)?,
        });
    }

    let update = update.map(|u| sema.ctx.build_to_void(u, span));
    let fini = fini.map(|f| sema.ctx.build_to_void(f, span));
    debug!("collapsed {} loop levels for {}", n, kind);

    Ok(CollapsedLoop {
        counter: Some(counter),
        flat_count: Some(flat),
        last: Some(last),
        update,
        fini,
        level_vars,
    })
}

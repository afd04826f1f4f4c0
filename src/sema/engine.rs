/*
 * The directive protocol.  The external parser drives semantic analysis of
 * one directive through three calls:
 *
 *   begin_directive  - pushes the region, propagates combined-directive
 *                      flags, checks nesting legality
 *   process_clause   - routes each raw clause to its validator, recording
 *                      the surviving clause on the region
 *   end_directive    - runs the body reference check (implicit attributes,
 *                      default(none) violations), normalizes the loop nest
 *                      of loop-bearing directives, finalizes lastprivate
 *                      initializers, pops the region, and produces the
 *                      directive node
 *
 * A fatal failure at any step reports its diagnostics and returns an error;
 * the caller elides the statement and continues with the rest of the
 * translation unit.
 */

use log::debug;
use stdext::function_name;

use crate::StringId;

use super::ast::{
    AstContext, ClauseKind, DirectiveKind, Expr, ExprId, ScopeId, SpecialMember, StmtId, TyId,
    VarId,
};
use super::clauses::{self, Clause, ClauseSpec};
use super::diag::{DiagKind, Diagnostic, Reporter};
use super::loops::{collapse_loop, CollapsedLoop};
use super::nesting::check_nesting;
use super::resolve::{DsaVarData, Resolver};
use super::stack::{DefaultPolicy, DsaStack};
use super::{CompilerError, SemaError, SemaResult, Span};

/// A fully analyzed directive: the validated clauses (explicit plus
/// synthesized implicit ones), the associated statement, the flattened loop
/// descriptor for loop-bearing kinds, and any statements queued for
/// emission immediately before the directive.
#[derive(Clone, Debug)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub name: Option<StringId>,
    pub clauses: Vec<Clause>,
    pub body: Option<StmtId>,
    pub loop_info: Option<CollapsedLoop>,
    pub pre_stmts: Vec<ExprId>,
}

pub struct Sema<R: Reporter> {
    pub ctx: AstContext,
    pub(crate) stack: DsaStack,
    pub(crate) reporter: R,
    /// Statements to emit before the directive under analysis (hoisted
    /// clause arguments).
    pending_stmts: Vec<ExprId>,
    /// Validated clauses per open region, parallel to the region stack.
    clause_lists: Vec<Vec<Clause>>,
    error_found: bool,
}

impl<R: Reporter> Sema<R> {
    pub fn new(ctx: AstContext, reporter: R) -> Sema<R> {
        Sema {
            ctx,
            stack: DsaStack::new(),
            reporter,
            pending_stmts: vec![],
            clause_lists: vec![],
            error_found: false,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Whether any error diagnostic was reported; per-entry recovery keeps
    /// analysis going but the compilation must still be marked failed.
    pub fn error_found(&self) -> bool {
        self.error_found
    }

    pub(crate) fn diag(&mut self, kind: DiagKind, span: Span) {
        if !kind.is_note() {
            self.error_found = true;
        }
        self.reporter.report(Diagnostic { kind, span });
    }

    pub(crate) fn synthesize_var(&mut self, name: &str, ty: TyId) -> VarId {
        let id = self.ctx.intern(name);
        self.ctx.vars.synthesize(id, ty)
    }

    pub(crate) fn queue_pre_stmt(&mut self, stmt: ExprId) {
        self.pending_stmts.push(stmt);
    }

    pub(crate) fn top_dsa(&self, var: VarId) -> DsaVarData {
        Resolver::new(&self.stack, &self.ctx).top_dsa(var)
    }

    pub(crate) fn implicit_dsa(&self, var: VarId) -> DsaVarData {
        Resolver::new(&self.stack, &self.ctx).implicit_dsa(var)
    }

    pub(crate) fn has_dsa(
        &self,
        var: VarId,
        attr: ClauseKind,
        directive: Option<DirectiveKind>,
    ) -> Option<Option<Span>> {
        Resolver::new(&self.stack, &self.ctx).has_dsa(var, attr, directive)
    }

    pub(crate) fn has_innermost_dsa(
        &self,
        var: VarId,
        attr: ClauseKind,
        directive: DirectiveKind,
    ) -> Option<Option<Span>> {
        Resolver::new(&self.stack, &self.ctx).has_innermost_dsa(var, attr, directive)
    }

    pub(crate) fn add_dsa(&mut self, var: VarId, ref_site: Option<Span>, attr: ClauseKind) {
        self.stack.add_dsa(var, ref_site, attr);
    }

    pub(crate) fn add_parent_dsa(&mut self, var: VarId, ref_site: Option<Span>, attr: ClauseKind) {
        self.stack.add_parent_dsa(var, ref_site, attr);
    }

    /// Whether analysis is currently inside a region of the given kind.
    pub fn has_region(&self, kind: DirectiveKind) -> bool {
        self.stack.has_directive(kind)
    }

    /// Enters a directive region.  Pushes the region, checks nesting
    /// legality against the enclosing state, and propagates the pending
    /// ordered/nowait flags a combined directive inherits from its parent.
    /// On a nesting violation the region is unwound and the caller must
    /// not process clauses or call [`Sema::end_directive`].
    pub fn begin_directive(
        &mut self,
        kind: DirectiveKind,
        name: Option<StringId>,
        scope: Option<ScopeId>,
        span: Span,
    ) -> SemaResult<()> {
        debug!("{} <- {}", function_name!(), kind);
        self.stack.push(kind, name, scope);

        if let Err(e) = check_nesting(&self.stack, kind, name, span, &mut self.reporter) {
            self.error_found = true;
            self.stack.pop();
            return Err(CompilerError::new(span, e));
        }

        // Flag propagation happens exactly once, at push time, and clears
        // the parent's pending flag so deeper directives never see it.
        if matches!(
            kind,
            DirectiveKind::ParallelFor | DirectiveKind::ParallelForSimd
        ) && self.stack.is_parent_ordered()
        {
            self.stack.set_ordered();
            self.stack.clear_parent_ordered();
        }
        if matches!(
            kind,
            DirectiveKind::ParallelFor
                | DirectiveKind::ParallelSections
                | DirectiveKind::ParallelForSimd
        ) && self.stack.is_parent_nowait()
        {
            self.stack.set_nowait();
            self.stack.clear_parent_nowait();
        }

        self.clause_lists.push(vec![]);
        Ok(())
    }

    /// Routes one raw clause to its validator.  Returns the validated
    /// clause, or `None` when every list entry was rejected (the clause is
    /// dropped entirely: downstream consumers never see an empty clause).
    pub fn process_clause(&mut self, spec: ClauseSpec, span: Span) -> Option<Clause> {
        debug!("{} <- {:?}", function_name!(), spec);
        let clause = match spec {
            ClauseSpec::VarList { kind, vars } => match kind {
                ClauseKind::Private => clauses::on_private(self, vars, span),
                ClauseKind::Firstprivate => clauses::on_firstprivate(self, vars, Some(span)),
                ClauseKind::Lastprivate => clauses::on_lastprivate(self, vars, span),
                ClauseKind::Shared => clauses::on_shared(self, vars, span),
                ClauseKind::Copyin => clauses::on_copyin(self, vars, span),
                ClauseKind::Copyprivate => clauses::on_copyprivate(self, vars, span),
                ClauseKind::Flush | ClauseKind::Uniform => {
                    clauses::on_var_list_only(self, kind, vars, span)
                }
                _ => panic!("not a variable-list clause: {}", kind),
            },
            ClauseSpec::Reduction { op, op_name, vars } => {
                clauses::on_reduction(self, op, op_name, vars, span)
            }
            ClauseSpec::Linear { vars, step } => clauses::on_linear(self, vars, step, span),
            ClauseSpec::Aligned { vars, alignment } => {
                clauses::on_aligned(self, vars, alignment, span)
            }
            ClauseSpec::Depend { dep_type, items } => {
                clauses::on_depend(self, dep_type, items, span)
            }
            ClauseSpec::Default(kind) => clauses::on_default(self, kind, span),
            ClauseSpec::SingleExpr { kind, expr } => {
                clauses::on_single_expr(self, kind, expr, span)
            }
            ClauseSpec::Schedule { kind, sched, chunk } => {
                clauses::on_schedule(self, kind, sched, chunk, span)
            }
            ClauseSpec::Flag(kind) => match kind {
                ClauseKind::Ordered => {
                    self.stack.set_ordered();
                    Some(Clause::Ordered)
                }
                ClauseKind::Nowait => {
                    self.stack.set_nowait();
                    Some(Clause::Nowait)
                }
                ClauseKind::Untied => Some(Clause::Untied),
                ClauseKind::Mergeable => Some(Clause::Mergeable),
                _ => panic!("not a flag clause: {}", kind),
            },
        };
        if let Some(c) = clause {
            self.clause_lists
                .last_mut()
                .expect("process_clause outside a directive")
                .push(c.clone());
            Some(c)
        } else {
            None
        }
    }

    /// The implicit-attribute query used by external body-traversal passes:
    /// resolves the attribute the variable would carry in the current
    /// region without mutating any state.
    pub fn query_implicit_attribute(&self, var: VarId) -> DsaVarData {
        self.implicit_dsa(var)
    }

    /// Exits the directive region.  Runs the body reference check, loop
    /// normalization for loop-bearing kinds, and lastprivate finalization,
    /// then pops the region and produces the directive node.
    pub fn end_directive(&mut self, body: Option<StmtId>, span: Span) -> SemaResult<Directive> {
        let kind = self.stack.current_directive();
        let name = self.stack.frames().last().unwrap().name();
        let mut clauses = self
            .clause_lists
            .pop()
            .expect("end_directive without begin_directive");
        let mut error_found = false;

        // Check data-sharing attributes for every variable referenced in
        // the region body, synthesizing the implicit firstprivate clause
        // task constructs require.
        if !kind.is_standalone() {
            if let Some(body) = body {
                let mut checker = BodyRefChecker {
                    implicit_firstprivate: vec![],
                    error_found: false,
                };
                self.check_body_stmt(&mut checker, kind, body);
                if checker.error_found {
                    self.finish_region();
                    return Err(CompilerError::new(span, SemaError::RegionBodyInvalid(kind)));
                }
                if !checker.implicit_firstprivate.is_empty() {
                    let wanted = checker.implicit_firstprivate.len();
                    match clauses::on_firstprivate(self, checker.implicit_firstprivate, None) {
                        Some(implicit) => {
                            if let Clause::Firstprivate { vars, .. } = &implicit {
                                if vars.len() != wanted {
                                    error_found = true;
                                }
                            }
                            clauses.insert(0, implicit);
                        }
                        None => error_found = true,
                    }
                }
            }
        }

        // Normalize the associated loop nest.
        let loop_info = if kind.is_loop_bearing() {
            let collapse_count = clauses
                .iter()
                .find_map(|c| match c {
                    Clause::Collapse(e) => self.ctx.eval_const(*e),
                    _ => None,
                })
                .unwrap_or(1) as u64;
            match collapse_loop(self, kind, collapse_count, body, span) {
                Ok(info) => Some(info),
                Err(e) => {
                    self.finish_region();
                    return Err(CompilerError::new(span, e));
                }
            }
        } else {
            None
        };

        // A class-typed lastprivate item needs a default-constructed
        // private copy unless it is also firstprivate; the initializers are
        // built now that every clause of the directive has been seen.
        self.finalize_lastprivate(kind, &mut clauses);

        let pre_stmts = std::mem::take(&mut self.pending_stmts);
        self.finish_region();

        if error_found {
            return Err(CompilerError::new(
                span,
                SemaError::ImplicitClauseFailed(kind),
            ));
        }

        debug!("directive {} analyzed with {} clauses", kind, clauses.len());
        Ok(Directive {
            kind,
            name,
            clauses,
            body,
            loop_info,
            pre_stmts,
        })
    }

    fn finish_region(&mut self) {
        self.pending_stmts.clear();
        self.stack.pop();
    }

    /// Registers the variables of a `threadprivate` directive on the
    /// sentinel region.  Returns the accepted subset.
    pub fn act_on_threadprivate(&mut self, raw_vars: Vec<ExprId>) -> Vec<ExprId> {
        let mut vars = vec![];
        for item in raw_vars {
            let eloc = self.ctx.exprs.span(item);
            let var = match self.ctx.exprs.as_var_ref(item) {
                Some(v) => v,
                None => {
                    self.diag(DiagKind::ExpectedVarName, eloc);
                    continue;
                }
            };
            // Only variables with static storage duration can be made
            // threadprivate.
            let v = self.ctx.vars.get(var);
            if !v.is_global && !v.is_static_local && !v.is_static_member {
                self.diag(DiagKind::ExpectedGlobalOrStaticVar(var), eloc);
                continue;
            }
            self.stack
                .add_dsa(var, Some(eloc), ClauseKind::Threadprivate);
            vars.push(item);
        }
        vars
    }

    /// Walks a region body statement, checking each variable reference.
    /// Nested directives are not descended into: they run their own
    /// analysis.
    fn check_body_stmt(&mut self, checker: &mut BodyRefChecker, kind: DirectiveKind, stmt: StmtId) {
        use super::ast::Stmt;
        match self.ctx.stmts.get(stmt).clone() {
            Stmt::Expr(e) => self.check_body_expr(checker, kind, e),
            Stmt::Decl { init: Some(e), .. } => self.check_body_expr(checker, kind, e),
            Stmt::Decl { init: None, .. } => (),
            Stmt::Compound(children) => {
                for c in children {
                    self.check_body_stmt(checker, kind, c);
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.check_body_expr(checker, kind, cond);
                self.check_body_stmt(checker, kind, then);
                if let Some(e) = otherwise {
                    self.check_body_stmt(checker, kind, e);
                }
            }
            Stmt::For {
                init,
                cond,
                inc,
                body,
            } => {
                if let Some(s) = init {
                    self.check_body_stmt(checker, kind, s);
                }
                if let Some(e) = cond {
                    self.check_body_expr(checker, kind, e);
                }
                if let Some(e) = inc {
                    self.check_body_expr(checker, kind, e);
                }
                if let Some(b) = body {
                    self.check_body_stmt(checker, kind, b);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.check_body_expr(checker, kind, cond);
                self.check_body_stmt(checker, kind, body);
            }
            Stmt::Switch { cond, body } => {
                self.check_body_expr(checker, kind, cond);
                self.check_body_stmt(checker, kind, body);
            }
            Stmt::Return(Some(e)) | Stmt::Throw(Some(e)) => {
                self.check_body_expr(checker, kind, e)
            }
            Stmt::Attributed(inner) | Stmt::Catch(inner) => {
                self.check_body_stmt(checker, kind, inner)
            }
            Stmt::Try { body, handlers } => {
                self.check_body_stmt(checker, kind, body);
                for h in handlers {
                    self.check_body_stmt(checker, kind, h);
                }
            }
            Stmt::Directive(_) => (),
            _ => (),
        }
    }

    fn check_body_expr(&mut self, checker: &mut BodyRefChecker, kind: DirectiveKind, e: ExprId) {
        match self.ctx.exprs.get(e).clone() {
            Expr::VarRef(var) => self.check_body_var(checker, kind, var, e),
            Expr::Unary(_, a) | Expr::ToVoid(a) | Expr::Cast(a) => {
                self.check_body_expr(checker, kind, a)
            }
            Expr::Binary(_, l, r)
            | Expr::Assign(l, r)
            | Expr::CompoundAssign(_, l, r)
            | Expr::Comma(l, r)
            | Expr::ArrayIndex(l, r) => {
                self.check_body_expr(checker, kind, l);
                self.check_body_expr(checker, kind, r);
            }
            Expr::IncDec { arg, .. } => self.check_body_expr(checker, kind, arg),
            Expr::Conditional(c, t, f) => {
                self.check_body_expr(checker, kind, c);
                self.check_body_expr(checker, kind, t);
                self.check_body_expr(checker, kind, f);
            }
            Expr::Call(_, args) => {
                for a in args {
                    self.check_body_expr(checker, kind, a);
                }
            }
            Expr::Section {
                base,
                lower,
                length,
                ..
            } => {
                self.check_body_expr(checker, kind, base);
                self.check_body_expr(checker, kind, lower);
                self.check_body_expr(checker, kind, length);
            }
            Expr::Construct { arg: Some(a), .. } => self.check_body_expr(checker, kind, a),
            _ => (),
        }
    }

    fn check_body_var(
        &mut self,
        checker: &mut BodyRefChecker,
        kind: DirectiveKind,
        var: VarId,
        e: ExprId,
    ) {
        let v = self.ctx.vars.get(var);
        if v.is_synthetic {
            return;
        }
        // Variables declared inside the region body are not captured by the
        // region and need no attribute.
        if let (Some(var_scope), Some(region_scope)) = (v.scope, self.stack.cur_scope()) {
            if v.is_local() && self.ctx.scopes.is_within(var_scope, region_scope) {
                return;
            }
        }

        let eloc = self.ctx.exprs.span(e);
        let top = self.top_dsa(var);

        // default(none) requires that every variable referenced in the
        // construct without a predetermined attribute be listed explicitly
        // in a data-sharing clause.
        if top.attr == ClauseKind::Unknown
            && self.stack.default_attr() == DefaultPolicy::None
            && matches!(kind, DirectiveKind::Parallel | DirectiveKind::Task)
        {
            checker.error_found = true;
            self.diag(DiagKind::NoDsaForVariable(var), eloc);
            return;
        }

        // A list item of a reduction clause on the innermost enclosing
        // worksharing or parallel construct may not be accessed in an
        // explicit task.
        if kind == DirectiveKind::Task {
            let reduction_site = [
                DirectiveKind::For,
                DirectiveKind::Sections,
                DirectiveKind::Parallel,
                DirectiveKind::ParallelFor,
                DirectiveKind::ParallelForSimd,
                DirectiveKind::ParallelSections,
            ]
            .iter()
            .find_map(|d| self.has_innermost_dsa(var, ClauseKind::Reduction, *d));
            if let Some(prev) = reduction_site {
                checker.error_found = true;
                self.diag(DiagKind::ReductionInTask, eloc);
                if let Some(site) = prev {
                    self.diag(DiagKind::NoteExplicitDsa(ClauseKind::Reduction), site);
                }
                return;
            }
        }

        // Implicit attributes for task: anything not shared in the
        // enclosing context becomes firstprivate.
        if kind == DirectiveKind::Task && top.attr == ClauseKind::Unknown {
            let implicit = self.implicit_dsa(var);
            if implicit.attr != ClauseKind::Shared {
                checker.implicit_firstprivate.push(e);
            }
        }
    }

    /// Directive-exit finalization for lastprivate: build the default
    /// initializer of each entry's private copy, unless the item is also
    /// firstprivate (its copy is copy-constructed instead).
    fn finalize_lastprivate(&mut self, kind: DirectiveKind, clause_list: &mut [Clause]) {
        for clause in clause_list.iter_mut() {
            let (vars, default_inits) = match clause {
                Clause::Lastprivate {
                    vars,
                    default_inits,
                    ..
                } => (vars.clone(), default_inits),
                _ => continue,
            };
            for (i, item) in vars.iter().enumerate() {
                let var = match self.ctx.exprs.as_var_ref(*item) {
                    Some(v) => v,
                    None => continue,
                };
                let vty = self.ctx.vars.get(var).ty;
                if self.ctx.tys.is_dependent(vty) {
                    continue;
                }
                let top = self.top_dsa(var);
                let combined_lastprivate = matches!(
                    kind,
                    DirectiveKind::ParallelFor | DirectiveKind::ParallelForSimd
                ) && self
                    .has_innermost_dsa(var, ClauseKind::Lastprivate, DirectiveKind::Parallel)
                    .is_some();
                if top.attr != ClauseKind::Lastprivate && !combined_lastprivate {
                    continue;
                }
                let eloc = self.ctx.exprs.span(*item);
                let elem = self.ctx.tys.array_element(vty);
                let elem = self.ctx.tys.unqualified(elem);
                if self.ctx.tys.as_class(elem).is_some() {
                    if !clauses::require_member(
                        self,
                        ClauseKind::Lastprivate,
                        SpecialMember::DefaultConstructor,
                        var,
                        eloc,
                    ) {
                        continue;
                    }
                    let init =
                        self.ctx
                            .exprs
                            .add(Expr::Construct { ty: elem, arg: None }, elem, eloc);
                    default_inits[i] = Some(init);
                }
            }
        }
    }
}

/// Accumulated results of the body reference walk.
struct BodyRefChecker {
    implicit_firstprivate: Vec<ExprId>,
    error_found: bool,
}

#[cfg(test)]
mod engine_tests {
    use crate::sema::ast::{ClauseKind, DefaultKind, DirectiveKind, MemberFn, Stmt};
    use crate::sema::clauses::{Clause, ClauseSpec};
    use crate::sema::diag::DiagKind;
    use crate::sema::tests::fixture::Fixture;

    /// A body consisting of a single read of the variable.
    fn read_body(f: &mut Fixture, var: crate::sema::ast::VarId) -> crate::sema::ast::StmtId {
        let var_ref = f.var_ref(var);
        let read = f.stmt(Stmt::Expr(var_ref));
        let pad = f.stmt(Stmt::Empty);
        f.stmt(Stmt::Compound(vec![read, pad]))
    }

    #[test]
    fn test_default_none_flags_unlisted_variable() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let cspan = f.span();
        f.sema
            .process_clause(ClauseSpec::Default(DefaultKind::None), cspan)
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        assert!(f.sema.end_directive(Some(body), span).is_err());
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::NoDsaForVariable(_))));
    }

    #[test]
    fn test_default_shared_needs_no_listing() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let cspan = f.span();
        f.sema
            .process_clause(ClauseSpec::Default(DefaultKind::Shared), cspan)
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        assert!(f.sema.end_directive(Some(body), span).is_ok());
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_default_none_with_explicit_listing_is_clean() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let cspan = f.span();
        f.sema
            .process_clause(ClauseSpec::Default(DefaultKind::None), cspan)
            .unwrap();
        let x_listed = f.var_ref(x);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Private,
                    vars: vec![x_listed],
                },
                cspan,
            )
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        assert!(f.sema.end_directive(Some(body), span).is_ok());
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_task_synthesizes_implicit_firstprivate() {
        // A variable that is not shared in the enclosing context becomes
        // implicitly firstprivate on the task.
        let mut f = Fixture::new();
        let x = f.global_int("x");
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let x_priv = f.var_ref(x);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Private,
                    vars: vec![x_priv],
                },
                cspan,
            )
            .unwrap();
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Task, None, None, span)
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        let directive = f.sema.end_directive(Some(body), span).unwrap();
        let implicit = directive
            .clauses
            .iter()
            .find(|c| c.kind() == ClauseKind::Firstprivate);
        assert!(matches!(
            implicit,
            Some(Clause::Firstprivate { vars, .. }) if vars.len() == 1
        ));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_task_shared_variable_stays_unlisted() {
        // A variable shared in the enclosing context needs no implicit
        // clause on the task.
        let mut f = Fixture::new();
        let x = f.global_int("x");
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let x_shared = f.var_ref(x);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Shared,
                    vars: vec![x_shared],
                },
                cspan,
            )
            .unwrap();
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Task, None, None, span)
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        let directive = f.sema.end_directive(Some(body), span).unwrap();
        assert!(directive
            .clauses
            .iter()
            .all(|c| c.kind() != ClauseKind::Firstprivate));
    }

    #[test]
    fn test_reduction_variable_in_task_is_rejected() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let x_red = f.var_ref(x);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::Reduction {
                    op: crate::sema::ast::ReductionOp::Add,
                    op_name: None,
                    vars: vec![x_red],
                },
                cspan,
            )
            .unwrap();
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Task, None, None, span)
            .unwrap();
        let body = read_body(&mut f, x);
        let span = f.span();
        assert!(f.sema.end_directive(Some(body), span).is_err());
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::ReductionInTask)));
    }

    #[test]
    fn test_lastprivate_finalization_builds_default_init() {
        let mut f = Fixture::new();
        let ty = f.class_ty("Widget");
        let w = f.global("w", ty);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let w_ref = f.var_ref(w);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Lastprivate,
                    vars: vec![w_ref],
                },
                cspan,
            )
            .unwrap();
        let body = f.empty_body();
        let span = f.span();
        let directive = f.sema.end_directive(Some(body), span).unwrap();
        let lp = directive
            .clauses
            .iter()
            .find(|c| c.kind() == ClauseKind::Lastprivate)
            .unwrap();
        match lp {
            Clause::Lastprivate { default_inits, .. } => {
                assert!(default_inits[0].is_some());
            }
            _ => unreachable!(),
        }
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_lastprivate_finalization_requires_default_constructor() {
        let mut f = Fixture::new();
        let ty = f.class_ty_with("Widget", |c| c.default_ctor = MemberFn::Inaccessible);
        let w = f.global("w", ty);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let w_ref = f.var_ref(w);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Lastprivate,
                    vars: vec![w_ref],
                },
                cspan,
            )
            .unwrap();
        let body = f.empty_body();
        let span = f.span();
        let directive = f.sema.end_directive(Some(body), span).unwrap();
        match directive
            .clauses
            .iter()
            .find(|c| c.kind() == ClauseKind::Lastprivate)
            .unwrap()
        {
            Clause::Lastprivate { default_inits, .. } => assert!(default_inits[0].is_none()),
            _ => unreachable!(),
        }
        assert!(f.sema.reporter().has_kind(|k| matches!(
            k,
            DiagKind::RequiredMethod {
                clause: ClauseKind::Lastprivate,
                ..
            }
        )));
    }

    #[test]
    fn test_firstprivate_lastprivate_skips_default_init() {
        // An item in both clauses is copy-constructed, never
        // default-constructed.
        let mut f = Fixture::new();
        let ty = f.class_ty("Widget");
        let w = f.global("w", ty);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let w_fp = f.var_ref(w);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Firstprivate,
                    vars: vec![w_fp],
                },
                cspan,
            )
            .unwrap();
        let w_lp = f.var_ref(w);
        let cspan = f.span();
        f.sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Lastprivate,
                    vars: vec![w_lp],
                },
                cspan,
            )
            .unwrap();
        let body = f.empty_body();
        let span = f.span();
        let directive = f.sema.end_directive(Some(body), span).unwrap();
        match directive
            .clauses
            .iter()
            .find(|c| c.kind() == ClauseKind::Lastprivate)
            .unwrap()
        {
            Clause::Lastprivate { default_inits, .. } => assert!(default_inits[0].is_none()),
            _ => unreachable!(),
        }
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_threadprivate_rejects_automatic_local() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        let item = f.var_ref(x);
        let accepted = f.sema.act_on_threadprivate(vec![item]);
        assert!(accepted.is_empty());
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::ExpectedGlobalOrStaticVar(_))));
    }

    #[test]
    fn test_nested_directive_body_is_not_walked() {
        // The body walker does not descend into nested directives; their
        // variables are analyzed by their own region.
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        let cspan = f.span();
        f.sema
            .process_clause(ClauseSpec::Default(DefaultKind::None), cspan)
            .unwrap();
        let x_ref = f.var_ref(x);
        let read = f.stmt(Stmt::Expr(x_ref));
        let nested = f.stmt(Stmt::Directive(Some(read)));
        let pad = f.stmt(Stmt::Empty);
        let body = f.stmt(Stmt::Compound(vec![nested, pad]));
        let span = f.span();
        assert!(f.sema.end_directive(Some(body), span).is_ok());
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_error_found_is_sticky() {
        let mut f = Fixture::new();
        let span = f.span();
        f.sema
            .begin_directive(DirectiveKind::Parallel, None, None, span)
            .unwrap();
        assert!(!f.sema.error_found());
        let lit = f.int_lit(3);
        let cspan = f.span();
        // A literal is not a variable name.
        assert!(f
            .sema
            .process_clause(
                ClauseSpec::VarList {
                    kind: ClauseKind::Private,
                    vars: vec![lit]
                },
                cspan
            )
            .is_none());
        assert!(f.sema.error_found());
        let body = f.empty_body();
        let span = f.span();
        // Per-entry recovery: the directive itself still completes.
        assert!(f.sema.end_directive(Some(body), span).is_ok());
        assert!(f.sema.error_found());
    }
}

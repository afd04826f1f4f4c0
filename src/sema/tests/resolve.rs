#[cfg(test)]
mod resolve_tests {
    use crate::sema::ast::{ClauseKind, DirectiveKind, Ty};
    use crate::sema::resolve::Resolver;
    use crate::sema::tests::fixture::Fixture;
    use crate::sema::Span;

    #[test]
    fn test_global_resolves_shared_at_sentinel() {
        let mut f = Fixture::new();
        let g = f.global_int("g");
        f.sema.stack.push(DirectiveKind::For, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        let data = r.implicit_dsa(g);
        assert_eq!(data.attr, ClauseKind::Shared);
    }

    #[test]
    fn test_explicit_binding_wins_over_default_none() {
        // Bind x explicitly as firstprivate in a region nested inside a
        // default(none) region: resolution returns the explicit binding
        // immediately, with no further ascent and no unresolved result.
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.set_default_none();
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema
            .stack
            .add_dsa(x, Some(Span::at(7)), ClauseKind::Firstprivate);
        f.sema.stack.push(DirectiveKind::Task, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        let data = r.implicit_dsa(x);
        assert_eq!(data.attr, ClauseKind::Firstprivate);
        assert_eq!(data.ref_site, Some(Span::at(7)));
    }

    #[test]
    fn test_default_none_leaves_unresolved() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.set_default_none();
        f.sema.stack.push(DirectiveKind::Task, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        // The walk starting at the parent region stops at default(none)
        // with no attribute.
        assert_eq!(r.implicit_dsa(x).attr, ClauseKind::Unknown);
    }

    #[test]
    fn test_default_shared_resolves_shared() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.set_default_shared();
        f.sema.stack.push(DirectiveKind::Task, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.implicit_dsa(x).attr, ClauseKind::Shared);
    }

    #[test]
    fn test_parallel_unspecified_default_is_shared() {
        let mut f = Fixture::new();
        let scope = f.fn_scope;
        let x = f.local_int("x", scope);
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.push(DirectiveKind::For, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.implicit_dsa(x).attr, ClauseKind::Shared);
    }

    #[test]
    fn test_task_shared_through_parallel() {
        // A variable explicitly shared on the enclosing parallel region
        // stays shared inside an unclaused task.
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.add_dsa(x, Some(Span::at(3)), ClauseKind::Shared);
        f.sema.stack.push(DirectiveKind::Task, None, None);
        f.sema.stack.push(DirectiveKind::For, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        let data = r.implicit_dsa(x);
        assert_eq!(data.attr, ClauseKind::Shared);
    }

    #[test]
    fn test_task_nonshared_becomes_firstprivate() {
        // A variable private on the enclosing parallel region is
        // firstprivate inside the task.
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.add_dsa(x, Some(Span::at(3)), ClauseKind::Private);
        f.sema.stack.push(DirectiveKind::Task, None, None);
        f.sema.stack.push(DirectiveKind::For, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        let data = r.implicit_dsa(x);
        assert_eq!(data.attr, ClauseKind::Firstprivate);
        assert_eq!(data.directive, DirectiveKind::Task);
    }

    #[test]
    fn test_region_local_automatic_is_private() {
        let mut f = Fixture::new();
        let outer = f.fn_scope;
        let region_scope = f.child_scope(outer);
        let inner = f.child_scope(region_scope);
        let x = f.local_int("x", inner);
        f.sema
            .stack
            .push(DirectiveKind::Parallel, None, Some(region_scope));
        f.sema.stack.push(DirectiveKind::For, None, Some(inner));
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.implicit_dsa(x).attr, ClauseKind::Private);
    }

    #[test]
    fn test_const_without_mutable_members_is_shared() {
        let mut f = Fixture::new();
        let int = f.int_ty();
        let const_int = f.sema.ctx.tys.add_const(crate::sema::ast::Ty::Int);
        let _ = int;
        let c = f.global("c", const_int);
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.top_dsa(c).attr, ClauseKind::Shared);
    }

    #[test]
    fn test_const_shared_firstprivate_exception() {
        // Once the const variable is explicitly firstprivate somewhere on
        // the stack, predetermination backs off so the listing stands.
        let mut f = Fixture::new();
        let const_int = f.sema.ctx.tys.add_const(Ty::Int);
        let c = f.global("c", const_int);
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema
            .stack
            .add_dsa(c, Some(Span::at(9)), ClauseKind::Firstprivate);
        f.sema.stack.push(DirectiveKind::For, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.top_dsa(c).attr, ClauseKind::Unknown);
    }

    #[test]
    fn test_tls_variable_is_threadprivate() {
        let mut f = Fixture::new();
        let int = f.int_ty();
        let name = f.sema.ctx.intern("t");
        let decl_span = f.span();
        let t = f.sema.ctx.vars.add(crate::sema::ast::Var {
            name,
            ty: int,
            storage: crate::sema::ast::StorageClass::Static,
            scope: None,
            decl_span,
            is_global: true,
            is_static_local: false,
            is_static_member: false,
            is_tls: true,
            is_synthetic: false,
        });
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(r.top_dsa(t).attr, ClauseKind::Threadprivate);
    }

    #[test]
    fn test_has_dsa_skips_current_region() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema
            .stack
            .add_dsa(x, Some(Span::at(4)), ClauseKind::Reduction);
        f.sema.stack.push(DirectiveKind::Task, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        assert_eq!(
            r.has_dsa(x, ClauseKind::Reduction, Some(DirectiveKind::Parallel)),
            Some(Some(Span::at(4)))
        );
        assert_eq!(r.has_dsa(x, ClauseKind::Reduction, Some(DirectiveKind::For)), None);
    }

    #[test]
    fn test_has_innermost_dsa_checks_nearest_region_only() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema
            .stack
            .add_dsa(x, Some(Span::at(4)), ClauseKind::Reduction);
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.push(DirectiveKind::Task, None, None);
        let r = Resolver::new(&f.sema.stack, &f.sema.ctx);
        // The nearest parallel region has no reduction binding; the scan
        // must not continue to the outer one.
        assert_eq!(
            r.has_innermost_dsa(x, ClauseKind::Reduction, DirectiveKind::Parallel),
            None
        );
    }
}

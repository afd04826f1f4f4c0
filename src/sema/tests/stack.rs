#[cfg(test)]
mod stack_tests {
    use crate::sema::ast::{ClauseKind, DirectiveKind};
    use crate::sema::stack::{DefaultPolicy, DsaStack};
    use crate::sema::tests::fixture::Fixture;
    use crate::sema::Span;

    #[test]
    fn test_new_stack_has_only_sentinel() {
        let stack = DsaStack::new();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current_directive(), DirectiveKind::Unknown);
        assert_eq!(stack.parent_directive(), DirectiveKind::Unknown);
    }

    #[test]
    fn test_push_pop_directives() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Parallel, None, None);
        stack.push(DirectiveKind::For, None, None);
        assert_eq!(stack.current_directive(), DirectiveKind::For);
        assert_eq!(stack.parent_directive(), DirectiveKind::Parallel);
        stack.pop();
        assert_eq!(stack.current_directive(), DirectiveKind::Parallel);
        stack.pop();
        assert_eq!(stack.current_directive(), DirectiveKind::Unknown);
    }

    #[test]
    #[should_panic(expected = "no regions to pop")]
    fn test_pop_sentinel_panics() {
        let mut stack = DsaStack::new();
        stack.pop();
    }

    #[test]
    fn test_threadprivate_binding_lands_on_sentinel() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema
            .stack
            .add_dsa(x, Some(Span::at(5)), ClauseKind::Threadprivate);
        // The binding is on the sentinel frame, not on the parallel region.
        assert!(f.sema.stack.frames()[0].binding(x).is_some());
        assert!(f.sema.stack.frames()[1].binding(x).is_none());
        f.sema.stack.pop();
        assert!(f.sema.stack.frames()[0].binding(x).is_some());
    }

    #[test]
    fn test_explicit_binding_overwrites() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        f.sema.stack.push(DirectiveKind::Parallel, None, None);
        f.sema.stack.add_dsa(x, Some(Span::at(1)), ClauseKind::Private);
        f.sema
            .stack
            .add_dsa(x, Some(Span::at(2)), ClauseKind::Lastprivate);
        let info = f.sema.stack.frames()[1].binding(x).unwrap();
        assert_eq!(info.attr, ClauseKind::Lastprivate);
        assert_eq!(info.ref_site, Some(Span::at(2)));
    }

    #[test]
    fn test_parent_binding() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Parallel, None, None);
        stack.push(DirectiveKind::For, None, None);
        let mut f = Fixture::new();
        let x = f.global_int("x");
        stack.add_parent_dsa(x, None, ClauseKind::Private);
        assert!(stack.frames()[1].binding(x).is_some());
        assert!(stack.frames()[2].binding(x).is_none());
    }

    #[test]
    fn test_default_policy() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Parallel, None, None);
        assert_eq!(stack.default_attr(), DefaultPolicy::Unspecified);
        stack.set_default_none();
        assert_eq!(stack.default_attr(), DefaultPolicy::None);
        stack.set_default_shared();
        assert_eq!(stack.default_attr(), DefaultPolicy::Shared);
    }

    #[test]
    fn test_ordered_flag_propagation() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::For, None, None);
        stack.set_ordered();
        stack.push(DirectiveKind::ParallelFor, None, None);
        assert!(stack.is_parent_ordered());
        // A combined directive consumes the parent's pending flag exactly
        // once.
        stack.set_ordered();
        stack.clear_parent_ordered();
        assert!(!stack.is_parent_ordered());
        stack.push(DirectiveKind::For, None, None);
        assert!(stack.is_parent_ordered());
    }

    #[test]
    fn test_nowait_flag_propagation() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Parallel, None, None);
        stack.set_nowait();
        stack.push(DirectiveKind::ParallelSections, None, None);
        assert!(stack.is_parent_nowait());
        stack.set_nowait();
        stack.clear_parent_nowait();
        assert!(!stack.is_parent_nowait());
    }

    #[test]
    fn test_has_directive_with_name() {
        let mut f = Fixture::new();
        let lock = f.sema.ctx.intern("lock");
        let other = f.sema.ctx.intern("other");
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Critical, Some(lock), None);
        stack.push(DirectiveKind::Critical, Some(other), None);
        // The scan covers enclosing regions only, not the current one.
        assert!(stack.has_directive_with_name(DirectiveKind::Critical, Some(lock)));
        assert!(!stack.has_directive_with_name(DirectiveKind::Critical, Some(other)));
    }

    #[test]
    fn test_has_directive_includes_current() {
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Parallel, None, None);
        stack.push(DirectiveKind::Task, None, None);
        assert!(stack.has_directive(DirectiveKind::Task));
        assert!(stack.has_directive(DirectiveKind::Parallel));
        assert!(!stack.has_directive(DirectiveKind::Critical));
    }

    #[test]
    fn test_unique_aligned_registration() {
        let mut f = Fixture::new();
        let x = f.global_int("x");
        let mut stack = DsaStack::new();
        stack.push(DirectiveKind::Simd, None, None);
        assert!(stack.add_unique_aligned(x, Span::at(1)).is_ok());
        assert_eq!(stack.add_unique_aligned(x, Span::at(2)), Err(Span::at(1)));
    }
}

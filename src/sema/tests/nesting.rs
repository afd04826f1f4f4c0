#[cfg(test)]
mod nesting_tests {
    use crate::sema::ast::DirectiveKind;
    use crate::sema::diag::DiagKind;
    use crate::sema::tests::fixture::Fixture;

    fn begin(f: &mut Fixture, kind: DirectiveKind) -> bool {
        let span = f.span();
        f.sema.begin_directive(kind, None, None, span).is_ok()
    }

    fn begin_named(f: &mut Fixture, kind: DirectiveKind, name: &str) -> bool {
        let name = f.sema.ctx.intern(name);
        let span = f.span();
        f.sema.begin_directive(kind, Some(name), None, span).is_ok()
    }

    #[test]
    fn test_barrier_inside_worksharing_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Parallel));
        assert!(begin(&mut f, DirectiveKind::For));
        assert!(!begin(&mut f, DirectiveKind::Barrier));
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::ProhibitedRegion { .. })));
        // The failed directive left no region behind.
        assert_eq!(f.sema.stack.current_directive(), DirectiveKind::For);
    }

    #[test]
    fn test_barrier_inside_parallel_is_allowed() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Parallel));
        assert!(begin(&mut f, DirectiveKind::Barrier));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_worksharing_inside_worksharing_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Parallel));
        assert!(begin(&mut f, DirectiveKind::For));
        assert!(!begin(&mut f, DirectiveKind::Single));
    }

    #[test]
    fn test_master_inside_task_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Task));
        assert!(!begin(&mut f, DirectiveKind::Master));
    }

    #[test]
    fn test_anything_inside_atomic_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Atomic));
        assert!(!begin(&mut f, DirectiveKind::Parallel));
    }

    #[test]
    fn test_anything_inside_simd_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Simd));
        assert!(!begin(&mut f, DirectiveKind::Critical));
    }

    #[test]
    fn test_parallel_inside_worksharing_is_allowed() {
        // Only close nesting of worksharing in worksharing is restricted; a
        // new parallel region is fine.
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::For));
        assert!(begin(&mut f, DirectiveKind::Parallel));
        assert!(begin(&mut f, DirectiveKind::For));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_critical_same_name_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin_named(&mut f, DirectiveKind::Critical, "lock"));
        assert!(!begin_named(&mut f, DirectiveKind::Critical, "lock"));
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::ProhibitedRegion { close_nesting: false, .. })));
    }

    #[test]
    fn test_critical_same_name_not_closely_nested() {
        // The same-name restriction applies through intervening regions.
        let mut f = Fixture::new();
        assert!(begin_named(&mut f, DirectiveKind::Critical, "lock"));
        assert!(begin(&mut f, DirectiveKind::Parallel));
        assert!(!begin_named(&mut f, DirectiveKind::Critical, "lock"));
    }

    #[test]
    fn test_critical_different_names_are_allowed() {
        let mut f = Fixture::new();
        assert!(begin_named(&mut f, DirectiveKind::Critical, "a"));
        assert!(begin_named(&mut f, DirectiveKind::Critical, "b"));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_unnamed_critical_nesting_is_allowed() {
        // Only an explicitly named critical participates in the same-name
        // check.
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Critical));
        assert!(begin(&mut f, DirectiveKind::Critical));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_ordered_requires_ordered_loop_region() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::For));
        assert!(!begin(&mut f, DirectiveKind::Ordered));
        assert!(f
            .sema
            .reporter()
            .has_kind(|k| matches!(k, DiagKind::ProhibitedOrderedRegion)));
    }

    #[test]
    fn test_ordered_inside_ordered_loop_region() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::For));
        f.sema.stack.set_ordered();
        assert!(begin(&mut f, DirectiveKind::Ordered));
        assert_eq!(f.error_count(), 0);
    }

    #[test]
    fn test_ordered_inside_critical_is_prohibited() {
        let mut f = Fixture::new();
        assert!(begin(&mut f, DirectiveKind::Critical));
        assert!(!begin(&mut f, DirectiveKind::Ordered));
    }
}

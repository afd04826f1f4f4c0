//! Directive nesting legality.  A table-driven check run when a directive
//! region is entered, against the already-pushed enclosing state.  Any
//! violation is fatal for the directive: no node is constructed and the
//! caller elides the statement.

use log::debug;

use crate::StringId;

use super::ast::DirectiveKind;
use super::diag::{DiagKind, Diagnostic, Reporter};
use super::stack::DsaStack;
use super::{SemaError, Span};

/// Whether `kind` belongs to the family that may not be closely nested
/// inside a worksharing, task, critical, ordered or master region: the
/// worksharing directives themselves plus `barrier`.
fn is_worksharing_or_barrier(kind: DirectiveKind) -> bool {
    kind.is_worksharing() || kind == DirectiveKind::Barrier
}

/// Checks the new directive against its enclosing region.  On violation the
/// diagnostic is reported and an error describing the failure is returned;
/// the caller aborts directive construction.
pub fn check_nesting(
    stack: &DsaStack,
    kind: DirectiveKind,
    name: Option<StringId>,
    span: Span,
    reporter: &mut dyn Reporter,
) -> Result<(), SemaError> {
    let parent = stack.parent_directive();
    let mut prohibited = false;
    let mut close_nesting = true;
    let mut has_named = false;

    match parent {
        DirectiveKind::For
        | DirectiveKind::Sections
        | DirectiveKind::ParallelFor
        | DirectiveKind::ParallelSections
        | DirectiveKind::Single => {
            // A worksharing region may not be closely nested inside a
            // worksharing, explicit task, critical, ordered, atomic, or
            // master region; the same holds for barrier and master regions.
            prohibited = is_worksharing_or_barrier(kind) || kind == DirectiveKind::Master;
        }
        DirectiveKind::Task => {
            // Ordered regions are additionally barred from explicit tasks.
            prohibited = is_worksharing_or_barrier(kind)
                || kind == DirectiveKind::Master
                || kind == DirectiveKind::Ordered;
        }
        DirectiveKind::Master => {
            prohibited = is_worksharing_or_barrier(kind);
        }
        DirectiveKind::Critical => {
            prohibited = is_worksharing_or_barrier(kind) || kind == DirectiveKind::Ordered;
        }
        DirectiveKind::Atomic => {
            // No construct may be nested inside an atomic region.
            prohibited = true;
        }
        DirectiveKind::Simd | DirectiveKind::ForSimd | DirectiveKind::ParallelForSimd => {
            // No construct may be nested inside a simd region.
            prohibited = true;
        }
        DirectiveKind::Ordered => {
            prohibited = is_worksharing_or_barrier(kind) || kind == DirectiveKind::Master;
        }
        _ => (),
    }

    // A critical region may not be nested, closely or otherwise, inside a
    // critical region with the same name.  Only an explicitly named critical
    // participates; the check scans every enclosing region, not just the
    // immediate parent.
    if kind == DirectiveKind::Critical && name.is_some() {
        has_named = stack.has_directive_with_name(kind, name);
        close_nesting = false;
        prohibited = has_named;
    }

    if prohibited {
        debug!("nesting violation: {} inside {}", kind, parent);
        reporter.report(Diagnostic {
            kind: DiagKind::ProhibitedRegion {
                close_nesting,
                parent,
                name,
            },
            span,
        });
        return Err(if has_named {
            SemaError::CriticalSameName(name)
        } else {
            SemaError::ProhibitedNesting(kind, parent)
        });
    }

    // An ordered region must be closely nested inside a loop region (or
    // parallel loop region) with an ordered clause.
    if kind == DirectiveKind::Ordered
        && parent != DirectiveKind::Unknown
        && !stack.is_parent_ordered()
    {
        reporter.report(Diagnostic {
            kind: DiagKind::ProhibitedOrderedRegion,
            span,
        });
        return Err(SemaError::OrderedNotBound);
    }

    Ok(())
}

/*
 * Semantic analysis of structured parallel pragma directives.  This includes:
 * 1. Data-sharing attribute (DSA) resolution: determining, for every variable
 *    referenced inside a parallel region, whether it is shared, private,
 *    firstprivate, etc., per the predetermined/explicit/implicit rule table.
 * 2. Directive nesting legality: checking each newly entered region against
 *    the regions that enclose it.
 * 3. Clause validation: checking the variable list and semantic constraints
 *    of every clause and synthesizing the helper declarations and expressions
 *    that code generation needs (copy initializers, combiner calls, hoisted
 *    schedule arguments).
 * 4. Canonical loop recognition and collapse: pattern matching the for-loops
 *    associated with loop-bearing directives and flattening collapsed nests
 *    into a single iteration space.
 *
 * The host compiler drives this engine through a directive protocol (see
 * [`engine::Sema`]): begin_directive / process_clause / end_directive, plus
 * an implicit-attribute query used while walking the region body.  The engine
 * annotates and partially rewrites an immutable syntax tree; it never prints
 * diagnostics itself, it reports structured diagnostic kinds through a sink
 * owned by the driver.
 */
mod tests;

pub mod ast;
pub mod builder;
pub mod clauses;
pub mod diag;
pub mod engine;
pub mod error;
pub mod loops;
pub mod nesting;
pub mod resolve;
pub mod source;
pub mod stack;
pub mod stringtable;

pub use error::{CompilerDisplay, CompilerDisplayError, CompilerError, SemaError};
pub use source::Span;

/// Captures the failure state of any directive-level semantic operation.
/// Fatal failures produce a [`SemaError`] wrapped in a [`CompilerError`];
/// the diagnostics describing the failure have already been sent to the
/// [`diag::Reporter`] by the time the error is returned.
pub type SemaResult<T> = Result<T, CompilerError<SemaError>>;

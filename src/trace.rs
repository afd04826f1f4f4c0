//! Serialized directive-event traces.  A trace is a JSON file describing a
//! small world of variables and the sequence of directive events a parser
//! would have produced for them; the replay driver feeds the events through
//! the semantic engine and reports the diagnostics.  Used for debugging the
//! engine against reduced test cases without a front end attached.

use serde::{Deserialize, Serialize};

use crate::sema::ast::{ClauseKind, DefaultKind, DirectiveKind, ReductionOp, ScheduleKind};
use crate::sema::clauses::ClauseSpec;
use crate::sema::diag::BufferedReporter;
use crate::sema::engine::Sema;
use crate::sema::Span;

/// One parser event.  Variables are referenced by name; every name must
/// have been declared by an earlier `DeclareInt` event.
#[derive(Debug, Serialize, Deserialize)]
pub enum TraceEvent {
    /// Declares an integer variable; `global` selects file scope.
    DeclareInt { name: String, global: bool },
    /// Marks previously declared variables threadprivate.
    Threadprivate { vars: Vec<String> },
    Begin {
        directive: DirectiveKind,
        name: Option<String>,
    },
    /// A variable-list clause (private, firstprivate, lastprivate, shared,
    /// copyin, copyprivate, flush, uniform).
    VarList { kind: ClauseKind, vars: Vec<String> },
    Reduction { op: ReductionOp, vars: Vec<String> },
    Default { kind: DefaultKind },
    Schedule {
        sched: ScheduleKind,
        chunk: Option<i64>,
    },
    /// A flag clause (ordered, nowait, untied, mergeable).
    Flag { kind: ClauseKind },
    /// Ends the innermost open directive with an empty body.
    End,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Default)]
pub struct ReplayOutcome {
    pub diagnostics: usize,
    pub errors: usize,
    pub failed_directives: usize,
}

/// Replays a trace through a fresh engine.  Unknown variable names and
/// events after a failed `Begin` are skipped with a note on stderr rather
/// than aborting, so a partially wrong trace still shows its diagnostics.
pub fn replay(trace: &Trace) -> (Sema<BufferedReporter>, ReplayOutcome) {
    use crate::sema::ast::AstContext;
    use std::collections::HashMap;

    let mut sema = Sema::new(AstContext::new(), BufferedReporter::new());
    let mut vars: HashMap<String, crate::sema::ast::VarId> = HashMap::new();
    let mut outcome = ReplayOutcome::default();
    let mut offset = 1u32;
    let mut skip_depth = 0u32;

    let mut next_span = || {
        let s = Span::at(offset);
        offset += 10;
        s
    };

    for event in &trace.events {
        match event {
            TraceEvent::DeclareInt { name, global } => {
                let ty = sema.ctx.int_ty();
                let id = sema.ctx.intern(name);
                let span = next_span();
                let var = sema.ctx.vars.add(crate::sema::ast::Var {
                    name: id,
                    ty,
                    storage: crate::sema::ast::StorageClass::None,
                    scope: None,
                    decl_span: span,
                    is_global: *global,
                    is_static_local: false,
                    is_static_member: false,
                    is_tls: false,
                    is_synthetic: false,
                });
                vars.insert(name.clone(), var);
            }
            TraceEvent::Threadprivate { vars: names } => {
                let mut items = vec![];
                for n in names {
                    if let Some(v) = vars.get(n) {
                        let span = next_span();
                        items.push(sema.ctx.build_var_ref(*v, span));
                    } else {
                        eprintln!("trace: unknown variable {}", n);
                    }
                }
                sema.act_on_threadprivate(items);
            }
            TraceEvent::Begin { directive, name } => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                let name = name.as_ref().map(|n| sema.ctx.intern(n));
                let span = next_span();
                if sema.begin_directive(*directive, name, None, span).is_err() {
                    outcome.failed_directives += 1;
                    skip_depth = 1;
                }
            }
            TraceEvent::VarList { kind, vars: names } => {
                if skip_depth > 0 {
                    continue;
                }
                let mut items = vec![];
                for n in names {
                    if let Some(v) = vars.get(n) {
                        let span = next_span();
                        items.push(sema.ctx.build_var_ref(*v, span));
                    } else {
                        eprintln!("trace: unknown variable {}", n);
                    }
                }
                let span = next_span();
                sema.process_clause(ClauseSpec::VarList { kind: *kind, vars: items }, span);
            }
            TraceEvent::Reduction { op, vars: names } => {
                if skip_depth > 0 {
                    continue;
                }
                let mut items = vec![];
                for n in names {
                    if let Some(v) = vars.get(n) {
                        let span = next_span();
                        items.push(sema.ctx.build_var_ref(*v, span));
                    }
                }
                let span = next_span();
                sema.process_clause(
                    ClauseSpec::Reduction {
                        op: *op,
                        op_name: None,
                        vars: items,
                    },
                    span,
                );
            }
            TraceEvent::Default { kind } => {
                if skip_depth > 0 {
                    continue;
                }
                let span = next_span();
                sema.process_clause(ClauseSpec::Default(*kind), span);
            }
            TraceEvent::Schedule { sched, chunk } => {
                if skip_depth > 0 {
                    continue;
                }
                let chunk = chunk.map(|c| {
                    let span = next_span();
                    sema.ctx.int_literal(c, span)
                });
                let span = next_span();
                sema.process_clause(
                    ClauseSpec::Schedule {
                        kind: ClauseKind::Schedule,
                        sched: *sched,
                        chunk,
                    },
                    span,
                );
            }
            TraceEvent::Flag { kind } => {
                if skip_depth > 0 {
                    continue;
                }
                let span = next_span();
                sema.process_clause(ClauseSpec::Flag(*kind), span);
            }
            TraceEvent::End => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                let span = next_span();
                if sema.end_directive(None, span).is_err() {
                    outcome.failed_directives += 1;
                }
            }
        }
    }

    outcome.diagnostics = sema.reporter().diagnostics().len();
    outcome.errors = sema.reporter().error_count();
    (sema, outcome)
}

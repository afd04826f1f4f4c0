use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The directive introduced by a pragma.  Combined directives (`parallel
/// for`, ...) are distinct kinds: several rules (flag propagation, loop
/// variable predetermination, nesting classes) treat them specially.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveKind {
    Unknown,
    Parallel,
    For,
    Sections,
    Section,
    Single,
    Task,
    Taskyield,
    Master,
    Critical,
    Barrier,
    Taskwait,
    Taskgroup,
    Atomic,
    Flush,
    Ordered,
    Simd,
    ForSimd,
    ParallelFor,
    ParallelForSimd,
    ParallelSections,
    Threadprivate,
}

impl DirectiveKind {
    /// Worksharing directives divide work among the threads of the enclosing
    /// team.  They share one set of nesting restrictions.
    pub fn is_worksharing(self) -> bool {
        matches!(
            self,
            DirectiveKind::For
                | DirectiveKind::Sections
                | DirectiveKind::Single
                | DirectiveKind::ParallelFor
                | DirectiveKind::ParallelForSimd
                | DirectiveKind::ParallelSections
        )
    }

    /// Directives whose associated statement must be a canonical loop nest.
    pub fn is_loop_bearing(self) -> bool {
        matches!(
            self,
            DirectiveKind::For
                | DirectiveKind::Simd
                | DirectiveKind::ForSimd
                | DirectiveKind::ParallelFor
                | DirectiveKind::ParallelForSimd
        )
    }

    /// Directives subject to the simd body restrictions (no exceptions).
    pub fn is_simd(self) -> bool {
        matches!(
            self,
            DirectiveKind::Simd | DirectiveKind::ForSimd | DirectiveKind::ParallelForSimd
        )
    }

    /// Stand-alone directives carry no associated statement.
    pub fn is_standalone(self) -> bool {
        matches!(
            self,
            DirectiveKind::Taskyield
                | DirectiveKind::Barrier
                | DirectiveKind::Taskwait
                | DirectiveKind::Flush
        )
    }
}

impl Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DirectiveKind::Unknown => "unknown",
            DirectiveKind::Parallel => "parallel",
            DirectiveKind::For => "for",
            DirectiveKind::Sections => "sections",
            DirectiveKind::Section => "section",
            DirectiveKind::Single => "single",
            DirectiveKind::Task => "task",
            DirectiveKind::Taskyield => "taskyield",
            DirectiveKind::Master => "master",
            DirectiveKind::Critical => "critical",
            DirectiveKind::Barrier => "barrier",
            DirectiveKind::Taskwait => "taskwait",
            DirectiveKind::Taskgroup => "taskgroup",
            DirectiveKind::Atomic => "atomic",
            DirectiveKind::Flush => "flush",
            DirectiveKind::Ordered => "ordered",
            DirectiveKind::Simd => "simd",
            DirectiveKind::ForSimd => "for simd",
            DirectiveKind::ParallelFor => "parallel for",
            DirectiveKind::ParallelForSimd => "parallel for simd",
            DirectiveKind::ParallelSections => "parallel sections",
            DirectiveKind::Threadprivate => "threadprivate",
        };
        f.write_str(name)
    }
}

/// The clause kinds the engine can validate.  Data-sharing attribute kinds
/// double as the attribute recorded in a region's binding map, so `Unknown`
/// also serves as the "no attribute" result of resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseKind {
    Unknown,
    Private,
    Firstprivate,
    Lastprivate,
    Shared,
    Reduction,
    Linear,
    Aligned,
    Copyin,
    Copyprivate,
    Threadprivate,
    Default,
    If,
    Final,
    NumThreads,
    Schedule,
    DistSchedule,
    Collapse,
    Safelen,
    Simdlen,
    Ordered,
    Nowait,
    Untied,
    Mergeable,
    Flush,
    Uniform,
    Depend,
}

impl Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClauseKind::Unknown => "unknown",
            ClauseKind::Private => "private",
            ClauseKind::Firstprivate => "firstprivate",
            ClauseKind::Lastprivate => "lastprivate",
            ClauseKind::Shared => "shared",
            ClauseKind::Reduction => "reduction",
            ClauseKind::Linear => "linear",
            ClauseKind::Aligned => "aligned",
            ClauseKind::Copyin => "copyin",
            ClauseKind::Copyprivate => "copyprivate",
            ClauseKind::Threadprivate => "threadprivate",
            ClauseKind::Default => "default",
            ClauseKind::If => "if",
            ClauseKind::Final => "final",
            ClauseKind::NumThreads => "num_threads",
            ClauseKind::Schedule => "schedule",
            ClauseKind::DistSchedule => "dist_schedule",
            ClauseKind::Collapse => "collapse",
            ClauseKind::Safelen => "safelen",
            ClauseKind::Simdlen => "simdlen",
            ClauseKind::Ordered => "ordered",
            ClauseKind::Nowait => "nowait",
            ClauseKind::Untied => "untied",
            ClauseKind::Mergeable => "mergeable",
            ClauseKind::Flush => "flush",
            ClauseKind::Uniform => "uniform",
            ClauseKind::Depend => "depend",
        };
        f.write_str(name)
    }
}

/// Argument of the `default` clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultKind {
    Unknown,
    None,
    Shared,
}

impl Display for DefaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultKind::Unknown => f.write_str("unknown"),
            DefaultKind::None => f.write_str("none"),
            DefaultKind::Shared => f.write_str("shared"),
        }
    }
}

/// Kind argument of the `schedule` and `dist_schedule` clauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleKind {
    Unknown,
    Static,
    Dynamic,
    Guided,
    Auto,
    Runtime,
}

impl Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScheduleKind::Unknown => "unknown",
            ScheduleKind::Static => "static",
            ScheduleKind::Dynamic => "dynamic",
            ScheduleKind::Guided => "guided",
            ScheduleKind::Auto => "auto",
            ScheduleKind::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// Reduction operator: either a built-in combiner or a user-declared one
/// referenced by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReductionOp {
    Add,
    Mult,
    Sub,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Min,
    Max,
    Custom,
}

impl Display for ReductionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReductionOp::Add => "+",
            ReductionOp::Mult => "*",
            ReductionOp::Sub => "-",
            ReductionOp::BitAnd => "&",
            ReductionOp::BitOr => "|",
            ReductionOp::BitXor => "^",
            ReductionOp::And => "&&",
            ReductionOp::Or => "||",
            ReductionOp::Min => "min",
            ReductionOp::Max => "max",
            ReductionOp::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Dependency direction of a `depend` clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependType {
    In,
    Out,
    Inout,
}

impl Display for DependType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependType::In => f.write_str("in"),
            DependType::Out => f.write_str("out"),
            DependType::Inout => f.write_str("inout"),
        }
    }
}

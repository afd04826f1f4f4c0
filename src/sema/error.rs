use crate::{StringId, StringTable};

use super::ast::DirectiveKind;
use super::source::Span;
use super::stringtable::StringTableError;

/// Represents all errors that are generated from within the semantic engine.
///
/// This type captures common metadata which is necessarily present for all
/// errors caused by input source code: the span the error occurs at.  The
/// inner error carries the submodule-specific data.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerError<IE> {
    span: Span,
    inner: IE,
}

impl<IE> CompilerError<IE> {
    pub fn new(span: Span, inner: IE) -> Self {
        CompilerError { span, inner }
    }

    pub fn inner(self) -> IE {
        self.inner
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl<IE> CompilerDisplay for CompilerError<IE>
where
    IE: CompilerDisplay,
{
    fn fmt(&self, st: &StringTable) -> Result<String, CompilerDisplayError> {
        let inner = self.inner.fmt(st)?;
        Ok(format!("{}: {}", self.span, inner))
    }
}

/// Turns compiler values into human readable strings, resolving any
/// [`StringId`]s against the given [`StringTable`].  Rendering is a driver
/// concern; the engine only ever hands these values to the driver.
pub trait CompilerDisplay {
    fn fmt(&self, st: &StringTable) -> Result<String, CompilerDisplayError>;
}

#[derive(Debug)]
pub enum CompilerDisplayError {
    StringIdNotFound,
}

impl From<StringTableError> for CompilerDisplayError {
    fn from(_: StringTableError) -> Self {
        Self::StringIdNotFound
    }
}

impl CompilerDisplay for StringId {
    fn fmt(&self, st: &StringTable) -> Result<String, CompilerDisplayError> {
        st.get(*self).map_err(|e| e.into())
    }
}

/// Fatal, directive-level failures of semantic analysis.  Each of these
/// aborts construction of the directive node; the diagnostics describing the
/// failure have already been reported by the time the error is returned.
/// Per-entry clause problems are not errors of this type; they drop the
/// entry and continue.
#[derive(Clone, Debug, PartialEq)]
pub enum SemaError {
    /// The new directive may not appear where it does.
    ProhibitedNesting(DirectiveKind, DirectiveKind),
    /// A critical region is nested inside a critical region with the same
    /// name.
    CriticalSameName(Option<StringId>),
    /// An ordered region outside a loop region carrying the ordered clause.
    OrderedNotBound,
    /// The region body referenced variables that violate the data-sharing
    /// rules (default(none) violations, reduction use in a task).
    RegionBodyInvalid(DirectiveKind),
    /// The associated loop nest failed canonical-form recognition or
    /// collapse expansion.
    LoopNormalizationFailed(DirectiveKind),
    /// Synthesis of the implicit firstprivate clause for a task failed.
    ImplicitClauseFailed(DirectiveKind),
}

impl CompilerDisplay for SemaError {
    fn fmt(&self, st: &StringTable) -> Result<String, CompilerDisplayError> {
        match self {
            SemaError::ProhibitedNesting(kind, parent) => Ok(format!(
                "region cannot be closely nested inside {} region: {}",
                parent, kind
            )),
            SemaError::CriticalSameName(name) => {
                let name = match name {
                    Some(id) => id.fmt(st)?,
                    None => String::new(),
                };
                Ok(format!(
                    "cannot nest critical regions having the same name {}",
                    name
                ))
            }
            SemaError::OrderedNotBound => Ok(
                "ordered region must be closely nested inside a loop region with an ordered clause"
                    .into(),
            ),
            SemaError::RegionBodyInvalid(kind) => Ok(format!(
                "invalid variable references in {} region body",
                kind
            )),
            SemaError::LoopNormalizationFailed(kind) => Ok(format!(
                "statement after {} is not a canonical for loop nest",
                kind
            )),
            SemaError::ImplicitClauseFailed(kind) => Ok(format!(
                "could not build implicit data-sharing clause for {} region",
                kind
            )),
        }
    }
}

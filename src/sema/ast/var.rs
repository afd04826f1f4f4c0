use crate::sema::Span;
use crate::StringId;

use super::TyId;

/// Handle into the [`VarTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(u32);

impl VarId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into the [`ScopeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage duration of a variable, as determined by the host front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageClass {
    /// No storage class specifier; automatic for locals.
    None,
    Auto,
    Static,
    Register,
    Extern,
}

/// Host facts about one variable.  The engine never mutates these; it only
/// appends synthesized pseudo variables to the table.
#[derive(Clone, Debug)]
pub struct Var {
    pub name: StringId,
    pub ty: TyId,
    pub storage: StorageClass,
    /// The lexical scope the declaration appears in; `None` for variables
    /// synthesized at translation-unit scope.
    pub scope: Option<ScopeId>,
    pub decl_span: Span,
    /// File-scope or namespace-scope variable.
    pub is_global: bool,
    /// Block-scope variable with static storage duration.
    pub is_static_local: bool,
    /// Static data member of a class.
    pub is_static_member: bool,
    /// Declared with thread-local storage; threadprivate by construction.
    pub is_tls: bool,
    /// Created by the engine (hoisted clause argument, proxy parameter,
    /// collapsed loop counter).
    pub is_synthetic: bool,
}

impl Var {
    /// A function-local variable: declared inside some function scope and not
    /// global or a static member.
    pub fn is_local(&self) -> bool {
        !self.is_global && !self.is_static_member && self.scope.is_some()
    }

    /// Automatic storage duration.
    pub fn is_automatic(&self) -> bool {
        self.is_local()
            && !self.is_static_local
            && matches!(self.storage, StorageClass::None | StorageClass::Auto)
    }
}

#[derive(Debug, Default)]
pub struct VarTable {
    vars: Vec<Var>,
}

impl VarTable {
    pub fn new() -> VarTable {
        VarTable { vars: vec![] }
    }

    pub fn add(&mut self, var: Var) -> VarId {
        self.vars.push(var);
        VarId(self.vars.len() as u32 - 1)
    }

    pub fn get(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    /// Appends a pseudo variable owned by the translation unit.  Synthesized
    /// declarations are never freed individually; their lifetime is the
    /// unit's.
    pub fn synthesize(&mut self, name: StringId, ty: TyId) -> VarId {
        self.add(Var {
            name,
            ty,
            storage: StorageClass::Static,
            scope: None,
            decl_span: Span::zero(),
            is_global: true,
            is_static_local: false,
            is_static_member: false,
            is_tls: false,
            is_synthetic: true,
        })
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// The lexical scope tree, owned by the host front end and referenced by
/// regions through [`ScopeId`]s.  Only the parent relation is needed: the
/// engine walks upward to decide whether a declaration sits strictly inside a
/// construct.
#[derive(Debug, Default)]
pub struct ScopeTree {
    parents: Vec<Option<ScopeId>>,
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        ScopeTree { parents: vec![] }
    }

    pub fn add(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.parents.push(parent);
        ScopeId(self.parents.len() as u32 - 1)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.parents[id.index()]
    }

    /// Whether `scope` equals `ancestor` or is nested anywhere below it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if s == ancestor {
                return true;
            }
            cur = self.parent(s);
        }
        false
    }

    /// Walks from `from` toward the root, stopping at `stop` (exclusive), and
    /// reports whether `target` is on that path.  This is the scope-distance
    /// question behind "declared strictly inside the construct".
    pub fn on_path(&self, from: ScopeId, stop: Option<ScopeId>, target: ScopeId) -> bool {
        let mut cur = Some(from);
        while let Some(s) = cur {
            if Some(s) == stop {
                return false;
            }
            if s == target {
                return true;
            }
            cur = self.parent(s);
        }
        false
    }
}

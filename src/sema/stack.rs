use std::collections::HashMap;

use log::debug;

use crate::StringId;

use super::ast::{ClauseKind, DirectiveKind, ScopeId, VarId};
use super::Span;

/// Default data-sharing attribute policy of a region, set by the `default`
/// clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultPolicy {
    Unspecified,
    None,
    Shared,
}

/// One explicit variable binding inside a region: the attribute and the
/// source site of the clause entry that created it.  Predetermined bindings
/// (loop variables, implicit task attributes) carry no reference site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DsaInfo {
    pub attr: ClauseKind,
    pub ref_site: Option<Span>,
}

/**
 One frame of the data-sharing attribute stack: the semantic state of a
 single directive region while its clauses and body are being analyzed.

 The explicit binding map holds at most one entry per variable; clause
 validators decide whether overwriting is legal before calling
 [`DsaStack::add_dsa`].  The aligned map is kept separate because `aligned`
 does not participate in data-sharing at all, it only forbids duplicate
 listing.
*/
#[derive(Clone, Debug)]
pub struct Region {
    sharing: HashMap<VarId, DsaInfo>,
    aligned: HashMap<VarId, Span>,
    default_attr: DefaultPolicy,
    directive: DirectiveKind,
    name: Option<StringId>,
    is_ordered: bool,
    is_nowait: bool,
    scope: Option<ScopeId>,
}

impl Region {
    fn new(directive: DirectiveKind, name: Option<StringId>, scope: Option<ScopeId>) -> Region {
        Region {
            sharing: HashMap::new(),
            aligned: HashMap::new(),
            default_attr: DefaultPolicy::Unspecified,
            directive,
            name,
            is_ordered: false,
            is_nowait: false,
            scope,
        }
    }

    /// The sentinel frame representing "outside all directives".  It hosts
    /// threadprivate registrations for the whole translation unit.
    fn sentinel() -> Region {
        Region::new(DirectiveKind::Unknown, None, None)
    }

    pub fn directive(&self) -> DirectiveKind {
        self.directive
    }

    pub fn name(&self) -> Option<StringId> {
        self.name
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    pub fn default_attr(&self) -> DefaultPolicy {
        self.default_attr
    }

    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    pub fn binding(&self, var: VarId) -> Option<&DsaInfo> {
        self.sharing.get(&var)
    }
}

/// Stack of regions tracking declarations used in directives and clauses and
/// their data-sharing attributes.  Pushes and pops mirror the driver's
/// directive-entry and directive-exit calls exactly once per directive; a
/// mismatch is a protocol violation by the driver, not a user error, and
/// panics.
#[derive(Debug)]
pub struct DsaStack {
    stack: Vec<Region>,
}

impl Default for DsaStack {
    fn default() -> Self {
        Self::new()
    }
}

impl DsaStack {
    pub fn new() -> DsaStack {
        DsaStack {
            stack: vec![Region::sentinel()],
        }
    }

    pub fn push(&mut self, directive: DirectiveKind, name: Option<StringId>, scope: Option<ScopeId>) {
        debug!("DsaStack push {}", directive);
        self.stack.push(Region::new(directive, name, scope));
    }

    pub fn pop(&mut self) {
        if self.stack.len() <= 1 {
            panic!("There are no regions to pop");
        }
        let region = self.stack.pop().unwrap();
        debug!("DsaStack pop {}", region.directive);
    }

    /// Number of frames including the sentinel.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Frames from the sentinel (index 0) to the current region.
    pub fn frames(&self) -> &[Region] {
        &self.stack
    }

    fn top(&self) -> &Region {
        self.stack.last().unwrap()
    }

    fn top_mut(&mut self) -> &mut Region {
        self.stack.last_mut().unwrap()
    }

    /// Adds an explicit data-sharing attribute for the variable to the
    /// current region.  Threadprivate registrations always land on the
    /// sentinel frame: they are process-wide, not per-region.
    pub fn add_dsa(&mut self, var: VarId, ref_site: Option<Span>, attr: ClauseKind) {
        if attr == ClauseKind::Threadprivate {
            self.stack[0].sharing.insert(var, DsaInfo { attr, ref_site });
        } else {
            assert!(self.stack.len() > 1, "Data sharing attribute stack is empty");
            self.top_mut().sharing.insert(var, DsaInfo { attr, ref_site });
        }
    }

    /// Adds an attribute to the parent region.  Used when a combined
    /// directive such as `parallel for` predetermines the loop variable in
    /// the enclosing parallel region as well.
    pub fn add_parent_dsa(&mut self, var: VarId, ref_site: Option<Span>, attr: ClauseKind) {
        let n = self.stack.len();
        assert!(n > 2, "Data sharing attribute stack does not have a parent");
        self.stack[n - 2].sharing.insert(var, DsaInfo { attr, ref_site });
    }

    /// Registers the variable in the current region's aligned map.  Returns
    /// the previous listing's span if the variable was already aligned here,
    /// in which case nothing is added.
    pub fn add_unique_aligned(&mut self, var: VarId, ref_site: Span) -> Result<(), Span> {
        assert!(self.stack.len() > 1, "Data sharing attribute stack is empty");
        match self.top().aligned.get(&var) {
            Some(prev) => Err(*prev),
            None => {
                self.top_mut().aligned.insert(var, ref_site);
                Ok(())
            }
        }
    }

    pub fn current_directive(&self) -> DirectiveKind {
        self.top().directive
    }

    pub fn parent_directive(&self) -> DirectiveKind {
        if self.stack.len() > 2 {
            self.stack[self.stack.len() - 2].directive
        } else {
            DirectiveKind::Unknown
        }
    }

    pub fn is_parent_ordered(&self) -> bool {
        if self.stack.len() > 2 {
            self.stack[self.stack.len() - 2].is_ordered
        } else {
            false
        }
    }

    pub fn set_ordered(&mut self) {
        self.top_mut().is_ordered = true;
    }

    pub fn clear_parent_ordered(&mut self) {
        let n = self.stack.len();
        self.stack[n - 2].is_ordered = false;
    }

    pub fn is_parent_nowait(&self) -> bool {
        if self.stack.len() > 2 {
            self.stack[self.stack.len() - 2].is_nowait
        } else {
            false
        }
    }

    pub fn set_nowait(&mut self) {
        self.top_mut().is_nowait = true;
    }

    pub fn clear_parent_nowait(&mut self) {
        let n = self.stack.len();
        self.stack[n - 2].is_nowait = false;
    }

    pub fn set_default_none(&mut self) {
        self.top_mut().default_attr = DefaultPolicy::None;
    }

    pub fn set_default_shared(&mut self) {
        self.top_mut().default_attr = DefaultPolicy::Shared;
    }

    pub fn default_attr(&self) -> DefaultPolicy {
        self.top().default_attr
    }

    pub fn cur_scope(&self) -> Option<ScopeId> {
        self.top().scope
    }

    /// Whether an enclosing region (excluding the current one) is a
    /// `directive` region carrying the given name.  Two absent names compare
    /// equal: all unnamed regions of a kind share one identity.
    pub fn has_directive_with_name(&self, directive: DirectiveKind, name: Option<StringId>) -> bool {
        self.stack[1..self.stack.len() - 1]
            .iter()
            .any(|r| r.directive == directive && r.name == name)
    }

    /// Whether any enclosing region (including the current one) is a
    /// `directive` region.
    pub fn has_directive(&self, directive: DirectiveKind) -> bool {
        self.stack[1..].iter().any(|r| r.directive == directive)
    }
}

impl std::fmt::Display for DsaStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, region) in self.stack.iter().rev().enumerate() {
            f.write_fmt(format_args!(
                "{}: {} ({} bindings)\n",
                i,
                region.directive,
                region.sharing.len()
            ))?;
        }
        Ok(())
    }
}

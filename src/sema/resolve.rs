//! Implicit and predetermined data-sharing attribute resolution.  This is
//! the rule engine behind every clause validator's conflict check and behind
//! the implicit-attribute inference pass that walks region bodies: given a
//! variable and a position in the region stack, produce the attribute the
//! standard's rule table assigns to it there.

use super::ast::{AstContext, ClauseKind, DirectiveKind, VarId};
use super::stack::{DefaultPolicy, DsaStack};
use super::Span;

/// The result of resolving one variable: the attribute, the directive kind
/// of the region where the attribute was determined, and the clause
/// reference site when the attribute came from an explicit listing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DsaVarData {
    pub attr: ClauseKind,
    pub directive: DirectiveKind,
    pub ref_site: Option<Span>,
}

impl DsaVarData {
    fn unknown() -> DsaVarData {
        DsaVarData {
            attr: ClauseKind::Unknown,
            directive: DirectiveKind::Unknown,
            ref_site: None,
        }
    }
}

/// Read-only view over the region stack and the host tables, answering the
/// resolution queries.  Borrowed for the duration of a single query; holds
/// no state of its own.
pub struct Resolver<'a> {
    stack: &'a DsaStack,
    ctx: &'a AstContext,
}

impl<'a> Resolver<'a> {
    pub fn new(stack: &'a DsaStack, ctx: &'a AstContext) -> Resolver<'a> {
        Resolver { stack, ctx }
    }

    /// Whether the variable's declaration sits strictly inside the current
    /// construct: between the current scope and the scope enclosing the
    /// nearest parallel or task region at or outside `level`.
    fn is_region_local(&self, var: VarId, level: usize) -> bool {
        if self.stack.depth() <= 2 {
            return false;
        }
        let frames = self.stack.frames();
        // Find the nearest enclosing parallel or task boundary, starting the
        // search at `level` and walking outward.
        let mut boundary = None;
        for i in (1..=level).rev() {
            if matches!(
                frames[i].directive(),
                DirectiveKind::Parallel | DirectiveKind::Task
            ) {
                boundary = Some(i);
                break;
            }
        }
        let boundary = match boundary {
            Some(b) => b,
            None => return false,
        };
        let top_scope = frames[boundary]
            .scope()
            .and_then(|s| self.ctx.scopes.parent(s));
        let cur_scope = match self.stack.cur_scope() {
            Some(s) => s,
            None => return false,
        };
        let var_scope = match self.ctx.vars.get(var).scope {
            Some(s) => s,
            None => return false,
        };
        self.ctx.scopes.on_path(cur_scope, top_scope, var_scope)
    }

    /// Whether a const-qualified variable's type rules out mutation: const
    /// with no mutable members is predetermined shared.
    fn is_immutable_const(&self, var: VarId) -> bool {
        let tys = &self.ctx.tys;
        let ty = tys.non_reference(self.ctx.vars.get(var).ty);
        if !tys.is_const(ty) {
            return false;
        }
        let elem = tys.array_element(ty);
        match tys.as_class(elem) {
            Some(class) => !self.ctx.classes.get(class).has_mutable_fields,
            None => true,
        }
    }

    /// Returns the data-sharing attribute from the top of the stack for the
    /// variable: threadprivate registration, predetermined attributes, and
    /// the current region's explicit bindings, in that order.  `Unknown`
    /// means no attribute is predetermined here and clause validators may
    /// still assign one.
    pub fn top_dsa(&self, var: VarId) -> DsaVarData {
        let v = self.ctx.vars.get(var);
        let frames = self.stack.frames();

        // Variables appearing in threadprivate directives, or declared with
        // thread-local storage, are threadprivate.
        if v.is_tls {
            return DsaVarData {
                attr: ClauseKind::Threadprivate,
                directive: DirectiveKind::Unknown,
                ref_site: None,
            };
        }
        if let Some(info) = frames[0].binding(var) {
            return DsaVarData {
                attr: ClauseKind::Threadprivate,
                directive: DirectiveKind::Unknown,
                ref_site: info.ref_site,
            };
        }

        // Variables with automatic storage duration that are declared in a
        // scope inside the construct are private.
        let kind = self.stack.current_directive();
        if kind != DirectiveKind::Parallel && kind != DirectiveKind::Task {
            let parent_level = self.stack.depth().saturating_sub(2);
            if self.is_region_local(var, parent_level) && v.is_automatic() {
                return DsaVarData {
                    attr: ClauseKind::Private,
                    directive: DirectiveKind::Unknown,
                    ref_site: None,
                };
            }
        }

        // Static data members are shared, and const-qualified types with no
        // mutable member are shared; both may still be listed in a
        // firstprivate clause, in which case no attribute is predetermined.
        if v.is_static_member {
            if let Some(Some(_)) = self.has_dsa(var, ClauseKind::Firstprivate, None) {
                return DsaVarData::unknown();
            }
            return DsaVarData {
                attr: ClauseKind::Shared,
                directive: DirectiveKind::Unknown,
                ref_site: None,
            };
        }
        if self.is_immutable_const(var) {
            if let Some(Some(_)) = self.has_dsa(var, ClauseKind::Firstprivate, None) {
                return DsaVarData::unknown();
            }
            return DsaVarData {
                attr: ClauseKind::Shared,
                directive: DirectiveKind::Unknown,
                ref_site: None,
            };
        }

        // Variables with static storage duration that are declared in a
        // scope inside the construct are shared.
        if v.is_static_local {
            return DsaVarData {
                attr: ClauseKind::Shared,
                directive: DirectiveKind::Unknown,
                ref_site: None,
            };
        }

        // Explicitly specified attributes in the current region.
        if let Some(info) = frames[frames.len() - 1].binding(var) {
            return DsaVarData {
                attr: info.attr,
                directive: kind,
                ref_site: info.ref_site,
            };
        }

        DsaVarData::unknown()
    }

    /// Resolves the implicit attribute the variable would carry in the
    /// current region, per the inheritance rules: the walk starts at the
    /// parent region.
    pub fn implicit_dsa(&self, var: VarId) -> DsaVarData {
        self.dsa_at(self.stack.depth() - 2, var)
    }

    /// The core recursive walk.  `level` indexes the frame being examined;
    /// level 0 is the sentinel and terminates the recursion.
    fn dsa_at(&self, level: usize, var: VarId) -> DsaVarData {
        let frames = self.stack.frames();
        let v = self.ctx.vars.get(var);

        if level == 0 {
            // At the file/global scope boundary: file-scope and
            // namespace-scope variables are shared, as are variables with
            // static storage duration; other function-local variables are
            // private.
            let attr = if !v.is_local() {
                ClauseKind::Shared
            } else if v.is_static_local {
                ClauseKind::Shared
            } else {
                ClauseKind::Private
            };
            return DsaVarData {
                attr,
                directive: DirectiveKind::Unknown,
                ref_site: None,
            };
        }

        let directive = frames[level].directive();

        // Variables with automatic storage duration that are declared in a
        // scope inside the construct are private.
        if self.is_region_local(var, level) && v.is_automatic() {
            return DsaVarData {
                attr: ClauseKind::Private,
                directive,
                ref_site: None,
            };
        }

        // Explicitly specified attributes and local variables with
        // predetermined attributes win outright.
        if let Some(info) = frames[level].binding(var) {
            return DsaVarData {
                attr: info.attr,
                directive,
                ref_site: info.ref_site,
            };
        }

        // In a parallel or task construct the data-sharing attributes of
        // these variables are determined by the default clause, if present.
        match frames[level].default_attr() {
            DefaultPolicy::Shared => {
                return DsaVarData {
                    attr: ClauseKind::Shared,
                    directive,
                    ref_site: None,
                }
            }
            DefaultPolicy::None => {
                // default(none) leaves the variable unresolved; the caller
                // must diagnose the missing explicit attribute.
                return DsaVarData {
                    attr: ClauseKind::Unknown,
                    directive,
                    ref_site: None,
                };
            }
            DefaultPolicy::Unspecified => {
                // In a parallel construct with no default clause, these
                // variables are shared.
                if directive == DirectiveKind::Parallel {
                    return DsaVarData {
                        attr: ClauseKind::Shared,
                        directive,
                        ref_site: None,
                    };
                }

                // In a task construct with no default clause, a variable
                // that is shared by all implicit tasks bound to the current
                // team is shared; otherwise it is firstprivate.  The walk is
                // bounded: it stops at the nearest enclosing parallel region
                // or the sentinel.
                if directive == DirectiveKind::Task {
                    let mut attr = ClauseKind::Unknown;
                    for i in (1..level).rev() {
                        attr = self.dsa_at(i, var).attr;
                        if attr != ClauseKind::Shared {
                            return DsaVarData {
                                attr: ClauseKind::Firstprivate,
                                directive: DirectiveKind::Task,
                                ref_site: None,
                            };
                        }
                        if frames[i].directive() == DirectiveKind::Parallel {
                            break;
                        }
                    }
                    let attr = if attr == ClauseKind::Unknown {
                        ClauseKind::Firstprivate
                    } else {
                        ClauseKind::Shared
                    };
                    return DsaVarData {
                        attr,
                        directive: DirectiveKind::Task,
                        ref_site: None,
                    };
                }
            }
        }

        // For constructs other than task, with no default clause, these
        // variables inherit their attributes from the enclosing context.
        self.dsa_at(level - 1, var)
    }

    /// Scans outward (excluding the current region) for a region where the
    /// variable resolves to `attr`, optionally restricted to regions of one
    /// directive kind.  Returns the binding's reference site on a hit.
    pub fn has_dsa(
        &self,
        var: VarId,
        attr: ClauseKind,
        directive: Option<DirectiveKind>,
    ) -> Option<Option<Span>> {
        let frames = self.stack.frames();
        for level in (1..frames.len() - 1).rev() {
            if let Some(d) = directive {
                if frames[level].directive() != d {
                    continue;
                }
            }
            let data = self.dsa_at(level, var);
            if data.attr == attr {
                return Some(data.ref_site);
            }
        }
        None
    }

    /// Checks the nearest enclosing region of the given directive kind
    /// (including the current region) for the attribute; unlike
    /// [`Resolver::has_dsa`] no further regions are examined.
    pub fn has_innermost_dsa(
        &self,
        var: VarId,
        attr: ClauseKind,
        directive: DirectiveKind,
    ) -> Option<Option<Span>> {
        let frames = self.stack.frames();
        for level in (1..frames.len()).rev() {
            if frames[level].directive() != directive {
                continue;
            }
            let data = self.dsa_at(level, var);
            if data.attr == attr {
                return Some(data.ref_site);
            }
            return None;
        }
        None
    }
}

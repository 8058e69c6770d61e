//! Generation environments.
//!
//! Every construct that can be the target of a jump, or that must run
//! cleanup code when left, opens a scope. Scopes live in an arena and are
//! opened and closed in stack order; each one records its parent so an
//! unwind can walk outward from any point.

use std::collections::VecDeque;

use super::chain::{self, Chain};
use crate::ast::{NodeId, Stmt};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Method,
    Block,
    Loop,
    Labelled,
    Switch,
    Try,
    Synchronized,
}

impl ScopeKind {
    pub fn name(self) -> &'static str {
        match self {
            ScopeKind::Method => "method",
            ScopeKind::Block => "block",
            ScopeKind::Loop => "loop",
            ScopeKind::Labelled => "labelled",
            ScopeKind::Switch => "switch",
            ScopeKind::Try => "try",
            ScopeKind::Synchronized => "synchronized",
        }
    }
}

/// Cleanup attached to a protected region.
#[derive(Debug, Clone, Copy)]
pub enum Finalizer<'t> {
    /// A `try`; `body` is its `finally` block, if any, generated in `outer`.
    Try { body: Option<&'t Stmt>, outer: ScopeId },
    /// A `synchronized` region; the monitor is held in `lock_reg`.
    Synchronized { lock_reg: u16 },
}

impl<'t> Finalizer<'t> {
    /// Whether leaving the region runs any code.
    pub fn has_cleanup(&self) -> bool {
        match self {
            Finalizer::Try { body, .. } => body.is_some(),
            Finalizer::Synchronized { .. } => true,
        }
    }
}

#[derive(Debug)]
pub struct Scope<'t> {
    pub kind: ScopeKind,
    /// Statement this scope belongs to; jumps name it as their target.
    pub tree: Option<NodeId>,
    pub parent: Option<ScopeId>,
    /// Jumps leaving the construct.
    pub exit: Option<Box<Chain>>,
    /// Jumps continuing the construct; `jsr`s for subroutine finalizers.
    pub cont: Option<Box<Chain>>,
    pub finalizer: Option<Finalizer<'t>>,
    /// Alternating start and end pcs of finalizer code inside the region.
    pub gaps: Option<VecDeque<u32>>,
    /// Locals declared in dead code still need a register.
    pub is_switch: bool,
}

impl<'t> Scope<'t> {
    fn new(kind: ScopeKind, tree: Option<NodeId>, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            tree,
            parent,
            exit: None,
            cont: None,
            finalizer: None,
            gaps: None,
            is_switch: false,
        }
    }

    pub fn add_exit(&mut self, c: Option<Box<Chain>>) -> Result<()> {
        self.exit = chain::merge(c, self.exit.take())?;
        Ok(())
    }

    pub fn add_cont(&mut self, c: Option<Box<Chain>>) -> Result<()> {
        self.cont = chain::merge(c, self.cont.take())?;
        Ok(())
    }

    /// Opens a gap at `pc`.
    pub fn open_gap(&mut self, pc: u32) -> Result<()> {
        let gaps = self.gaps.get_or_insert_with(VecDeque::new);
        if gaps.len() % 2 != 0 {
            return Err(Error::OddGapList);
        }
        gaps.push_back(pc);
        Ok(())
    }

    /// Closes the open gap, if there is one, at `pc`.
    pub fn close_gap(&mut self, pc: u32) {
        if let Some(gaps) = &mut self.gaps {
            if gaps.len() % 2 == 1 {
                gaps.push_back(pc);
            }
        }
    }

    pub fn has_open_gap(&self) -> bool {
        self.gaps.as_ref().map_or(false, |g| g.len() % 2 == 1)
    }
}

/// Arena of the scopes currently open in one method.
#[derive(Debug)]
pub struct Scopes<'t> {
    arena: Vec<Scope<'t>>,
}

impl<'t> Scopes<'t> {
    /// A fresh arena holding only the method scope.
    pub fn new() -> Self {
        Self { arena: vec![Scope::new(ScopeKind::Method, None, None)] }
    }

    pub fn method(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn depth(&self) -> usize {
        self.arena.len()
    }

    pub fn open(&mut self, kind: ScopeKind, tree: Option<NodeId>, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.arena.len());
        self.arena.push(Scope::new(kind, tree, Some(parent)));
        id
    }

    /// Closes the innermost scope, which must be `id`. Every chain it
    /// collected must have been resolved.
    pub fn close(&mut self, id: ScopeId) -> Result<()> {
        if id.0 + 1 != self.arena.len() {
            return Err(Error::internal(format!(
                "closing scope {} while {} scopes are open",
                id.0,
                self.arena.len()
            )));
        }
        if let Some(scope) = self.arena.pop() {
            if scope.exit.is_some() || scope.cont.is_some() {
                return Err(Error::UnresolvedChain { scope: scope.kind.name() });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: ScopeId) -> &Scope<'t> {
        &self.arena[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope<'t> {
        &mut self.arena[id.0]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.arena[id.0].parent
    }

    /// The innermost scope enclosing `from` that belongs to `target`.
    pub fn find_target(&self, from: ScopeId, target: NodeId) -> Result<ScopeId> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            if self.arena[id.0].tree == Some(target) {
                return Ok(id);
            }
            cur = self.arena[id.0].parent;
        }
        Err(Error::UnknownJumpTarget(target))
    }

    /// Scopes from `from` outward up to and including `to`.
    pub fn path(&self, from: ScopeId, to: ScopeId) -> Vec<ScopeId> {
        let mut path = Vec::new();
        let mut cur = Some(from);
        while let Some(id) = cur {
            path.push(id);
            if id == to {
                break;
            }
            cur = self.arena[id.0].parent;
        }
        path
    }

    /// Whether a `finally` block runs between `from` and the method scope.
    pub fn has_finally(&self, from: ScopeId) -> bool {
        let method = self.method();
        let mut cur = Some(from);
        while let Some(id) = cur {
            if id == method {
                break;
            }
            let scope = &self.arena[id.0];
            if scope.kind == ScopeKind::Try
                && matches!(scope.finalizer, Some(Finalizer::Try { body: Some(_), .. }))
            {
                return true;
            }
            cur = scope.parent;
        }
        false
    }
}

impl<'t> Default for Scopes<'t> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::code::State;

    #[test]
    fn targets_are_found_outward() {
        let mut scopes = Scopes::new();
        let method = scopes.method();
        let outer = scopes.open(ScopeKind::Loop, Some(NodeId(1)), method);
        let inner = scopes.open(ScopeKind::Block, Some(NodeId(2)), outer);
        assert_eq!(scopes.find_target(inner, NodeId(1)).unwrap(), outer);
        assert!(matches!(
            scopes.find_target(inner, NodeId(9)),
            Err(Error::UnknownJumpTarget(NodeId(9)))
        ));
        assert_eq!(scopes.path(inner, outer), vec![inner, outer]);
    }

    #[test]
    fn closing_with_pending_jumps_fails() {
        let mut scopes = Scopes::new();
        let method = scopes.method();
        let lp = scopes.open(ScopeKind::Loop, Some(NodeId(1)), method);
        scopes.get_mut(lp).add_exit(Chain::new(4, State::default(), None).boxed()).unwrap();
        assert_eq!(scopes.close(lp), Err(Error::UnresolvedChain { scope: "loop" }));
    }

    #[test]
    fn gaps_open_only_when_even() {
        let mut scopes = Scopes::new();
        let method = scopes.method();
        let t = scopes.open(ScopeKind::Try, None, method);
        let scope = scopes.get_mut(t);
        scope.open_gap(10).unwrap();
        assert!(scope.has_open_gap());
        assert_eq!(scope.open_gap(12), Err(Error::OddGapList));
        scope.close_gap(14);
        scope.close_gap(20);
        assert_eq!(scope.gaps.as_ref().unwrap().len(), 2);
    }
}

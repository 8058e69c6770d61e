//! Jump chains: unresolved forward branches that share a target.
//!
//! A chain is a linked list of branch instructions whose offsets are still
//! zero, kept in decreasing pc order. Each link carries the machine state
//! at its branch so the target can be entered with a known stack shape.

use super::code::State;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    /// Position of the branch opcode.
    pub pc: u32,
    /// Machine state when the branch is taken.
    pub state: State,
    pub next: Option<Box<Chain>>,
}

impl Chain {
    pub fn new(pc: u32, state: State, next: Option<Box<Chain>>) -> Self {
        Chain { pc, state, next }
    }

    pub fn boxed(self) -> Option<Box<Chain>> {
        Some(Box::new(self))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A chain always holds at least one branch.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Branch positions, highest first.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter { current: Some(self) }
    }
}

pub struct ChainIter<'a> {
    current: Option<&'a Chain>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let chain = self.current?;
        self.current = chain.next.as_deref();
        Some(chain.pc)
    }
}

/// Merges two chains into one in decreasing pc order. Both must have been
/// built under the same stack depth and lock set.
pub fn merge(c1: Option<Box<Chain>>, c2: Option<Box<Chain>>) -> Result<Option<Box<Chain>>> {
    match (c1, c2) {
        (None, c) | (c, None) => Ok(c),
        (Some(mut a), Some(mut b)) => {
            if !a.state.compatible(&b.state) {
                return Err(Error::StateMismatch {
                    pc: a.pc.max(b.pc),
                    detail: format!(
                        "merging chains with stack {} / locks {:?} and stack {} / locks {:?}",
                        a.state.stack_size(),
                        a.state.locks(),
                        b.state.stack_size(),
                        b.state.locks()
                    ),
                });
            }
            if a.pc < b.pc {
                let rest = b.next.take();
                b.next = merge(Some(a), rest)?;
                Ok(Some(b))
            } else {
                let rest = a.next.take();
                a.next = merge(rest, Some(b))?;
                Ok(Some(a))
            }
        }
    }
}

/// Branch positions of a possibly empty chain.
pub fn positions(chain: &Option<Box<Chain>>) -> Vec<u32> {
    chain.as_ref().map(|c| c.iter().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::typecodes;

    fn single(pc: u32, state: &State) -> Option<Box<Chain>> {
        Chain::new(pc, state.clone(), None).boxed()
    }

    #[test]
    fn merge_keeps_decreasing_order() {
        let s = State::default();
        let a = merge(single(10, &s), single(40, &s)).unwrap();
        let b = merge(single(25, &s), single(5, &s)).unwrap();
        let all = merge(a, b).unwrap();
        assert_eq!(positions(&all), vec![40, 25, 10, 5]);
        assert_eq!(all.unwrap().len(), 4);
    }

    #[test]
    fn merge_with_nothing_is_identity() {
        let s = State::default();
        let a = merge(single(7, &s), None).unwrap();
        assert_eq!(positions(&a), vec![7]);
        assert!(merge(None, None).unwrap().is_none());
    }

    #[test]
    fn incompatible_states_are_rejected() {
        let empty = State::default();
        let mut one = State::default();
        one.push(typecodes::INT);
        let err = merge(single(3, &empty), single(9, &one)).unwrap_err();
        assert!(matches!(err, Error::StateMismatch { pc: 9, .. }));
    }
}

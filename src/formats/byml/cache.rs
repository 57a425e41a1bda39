//! Offset-keyed memo of decoded containers.

use std::collections::HashMap;

use super::Node;
use crate::{Error, Result};

enum Slot {
    InProgress,
    Done(Node),
}

/// Maps the absolute offset of every array/hash decoded so far to its node.
///
/// Lives for exactly one document decode.
#[derive(Default)]
pub(super) struct RefCache {
    slots: HashMap<u32, Slot>,
}

impl RefCache {
    /// Return the node already decoded at `offset`, or run `decode` and
    /// remember its result.
    ///
    /// A hit never touches the cursor. Seeing `offset` again while its own
    /// decode is still running is a cycle and fails with
    /// [`Error::ReferenceCycle`].
    pub(super) fn get_or_decode<F>(&mut self, offset: u32, decode: F) -> Result<Node>
    where
        F: FnOnce(&mut Self) -> Result<Node>,
    {
        match self.slots.get(&offset) {
            Some(Slot::Done(node)) => return Ok(node.clone()),
            Some(Slot::InProgress) => {
                return Err(Error::ReferenceCycle {
                    offset: offset as usize,
                });
            }
            None => {}
        }

        self.slots.insert(offset, Slot::InProgress);
        let node = decode(self)?;
        self.slots.insert(offset, Slot::Done(node.clone()));
        Ok(node)
    }

    /// Number of distinct containers seen.
    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn second_lookup_returns_same_instance() {
        let mut cache = RefCache::default();
        let a = cache
            .get_or_decode(0x20, |_| Ok(Node::Array(Arc::new(vec![Node::Null]))))
            .unwrap();
        let b = cache
            .get_or_decode(0x20, |_| panic!("decoded twice"))
            .unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reentry_is_a_cycle() {
        let mut cache = RefCache::default();
        let err = cache
            .get_or_decode(0x20, |c| c.get_or_decode(0x20, |_| Ok(Node::Null)))
            .unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle { offset: 0x20 }));
    }
}

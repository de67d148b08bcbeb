// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{cell::RefCell, rc::Rc};

/// Accumulates invariant violations found while walking a state snapshot.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    /// Shared with accumulators derived through `with_prefix`.
    msgs: Rc<RefCell<Vec<String>>>,
    prefix: String,
}

impl MessageAccumulator {
    /// Returns an accumulator backed by the same collection that prefixes each new message.
    pub fn with_prefix<S: AsRef<str>>(&self, prefix: S) -> Self {
        MessageAccumulator {
            msgs: self.msgs.clone(),
            prefix: self.prefix.to_owned() + prefix.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.borrow().is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.msgs.borrow().to_owned()
    }

    pub fn add<S: AsRef<str>>(&self, msg: S) {
        self.msgs
            .borrow_mut()
            .push(format!("{}{}", self.prefix, msg.as_ref()));
    }

    /// Adds a message if predicate is false
    pub fn require<S: AsRef<str>>(&self, predicate: bool, msg: S) {
        if !predicate {
            self.add(msg);
        }
    }

    /// Panics if any message was recorded, listing all of them.
    #[track_caller]
    pub fn assert_empty(&self) {
        assert!(self.is_empty(), "{}", self.messages().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_accumulators_share_messages() {
        let acc = MessageAccumulator::default();
        acc.require(true, "never recorded");
        assert!(acc.is_empty());

        let sub = acc.with_prefix("miner 1000: ");
        sub.require(false, "negative balance");
        acc.add("total mismatch");

        assert_eq!(
            acc.messages(),
            vec![
                "miner 1000: negative balance".to_string(),
                "total mismatch".to_string()
            ]
        );
    }
}

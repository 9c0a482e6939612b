//! Transaction ids handed out by a connection and what they wait for.

use std::collections::HashMap;

use super::super::ds::Type;
use super::super::err::*;

/// What an outstanding xid is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    /// Our HELLO, completed by the peer's HELLO.
    Hello,
    /// Liveness probe, completed by the echo reply.
    EchoRequest,
    /// Request of the given type sent on behalf of the message consumer.
    Request(Type),
}

/// Bounded map of outstanding transactions.
#[derive(Debug)]
pub struct TransactionTable {
    next_xid: u32,
    capacity: usize,
    pending: HashMap<u32, PendingOp>,
}

impl TransactionTable {
    pub fn new(capacity: usize) -> Self {
        TransactionTable {
            next_xid: 1,
            capacity: capacity,
            pending: HashMap::new(),
        }
    }

    /// Next xid not currently pending, without tracking it.
    /// Zero is never handed out.
    pub fn fresh(&mut self) -> u32 {
        loop {
            let xid = self.next_xid;
            self.next_xid = self.next_xid.wrapping_add(1);
            if xid != 0 && !self.pending.contains_key(&xid) {
                return xid;
            }
        }
    }

    /// Allocates an xid and remembers `op` for it.
    pub fn allocate(&mut self, op: PendingOp) -> Result<u32> {
        if self.pending.len() >= self.capacity {
            warn!(
                "Transaction table full ({} pending), cannot track {:?}.",
                self.pending.len(),
                op
            );
            bail!(ErrorKind::NoTransactionIdAvailable(self.pending.len()));
        }
        let xid = self.fresh();
        trace!("Allocated xid {} for {:?}.", xid, op);
        self.pending.insert(xid, op);
        Ok(xid)
    }

    pub fn get(&self, xid: u32) -> Option<&PendingOp> {
        self.pending.get(&xid)
    }

    /// Removes and returns the pending operation of `xid`.
    pub fn complete(&mut self, xid: u32) -> Option<PendingOp> {
        self.pending.remove(&xid)
    }

    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            debug!("Dropping {} pending transactions.", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_complete() {
        let mut testee = TransactionTable::new(4);
        let echo = testee.allocate(PendingOp::EchoRequest).unwrap();
        let req = testee
            .allocate(PendingOp::Request(Type::MultipartRequest))
            .unwrap();
        assert_ne!(echo, req);
        assert_eq!(2, testee.len());
        assert_eq!(Some(PendingOp::EchoRequest), testee.complete(echo));
        assert_eq!(None, testee.complete(echo));
        assert_eq!(Some(&PendingOp::Request(Type::MultipartRequest)), testee.get(req));
    }

    #[test]
    fn exhausted() {
        let mut testee = TransactionTable::new(2);
        testee.allocate(PendingOp::Hello).unwrap();
        testee.allocate(PendingOp::EchoRequest).unwrap();
        let err = testee.allocate(PendingOp::EchoRequest).unwrap_err();
        assert!(match err.kind() {
            ErrorKind::NoTransactionIdAvailable(2) => true,
            _ => false,
        });
        testee.clear();
        assert!(testee.allocate(PendingOp::EchoRequest).is_ok());
    }

    #[test]
    fn skips_zero_and_pending() {
        let mut testee = TransactionTable::new(8);
        testee.next_xid = u32::max_value();
        let last = testee.allocate(PendingOp::Hello).unwrap();
        assert_eq!(u32::max_value(), last);
        // wraps past zero
        assert_eq!(1, testee.allocate(PendingOp::EchoRequest).unwrap());
        testee.next_xid = last;
        assert_eq!(2, testee.fresh());
    }
}

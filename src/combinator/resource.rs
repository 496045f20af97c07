/*!
A budget on the number of live coroutines.

Pathological backtracking can leave huge numbers of suspended alternatives
alive. When a budget is configured, every resume stamps the coroutine with a
fresh epoch, and when a spawn pushes the live count over the budget the
least recently used coroutines that are not on the trampoline's stack are
closed. A closed coroutine behaves as exhausted when next requested, so
eviction trades completeness of backtracking for bounded memory.

Stamps are kept in a min-heap that is invalidated lazily: an entry whose
epoch no longer matches its coroutine (or whose coroutine is gone) is
simply skipped.
*/

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::{combinator::coroutine::Coroutines, util::primitives::CoroutineID};

#[derive(Debug)]
pub(crate) struct Resources {
    limit: Option<usize>,
    epoch: u64,
    heap: BinaryHeap<Reverse<(u64, CoroutineID)>>,
    warned: bool,
}

impl Resources {
    pub(crate) fn new(limit: Option<usize>) -> Resources {
        Resources { limit, epoch: 0, heap: BinaryHeap::new(), warned: false }
    }

    /// Returns a fresh epoch for `cid`, recording it for eviction order.
    pub(crate) fn touch(&mut self, cid: CoroutineID) -> u64 {
        self.epoch += 1;
        if self.limit.is_some() {
            self.heap.push(Reverse((self.epoch, cid)));
        }
        self.epoch
    }

    /// Returns true if `live` coroutines exceed the budget.
    pub(crate) fn over(&self, live: usize) -> bool {
        self.limit.map_or(false, |limit| live > limit)
    }

    /// Pick the least recently used coroutine that may be closed: alive,
    /// not on the stack and not `protect`. Returns `None` (and warns once
    /// per run) when every candidate is in use.
    pub(crate) fn victim<'g, S>(
        &mut self,
        coroutines: &Coroutines<'g, S>,
        protect: CoroutineID,
    ) -> Option<CoroutineID> {
        self.compact(coroutines);
        let mut busy = vec![];
        let mut found = None;
        while let Some(Reverse((epoch, cid))) = self.heap.pop() {
            let co = match coroutines.get(cid) {
                Some(co) if co.epoch == epoch => co,
                _ => continue,
            };
            if co.active || cid == protect {
                busy.push(Reverse((epoch, cid)));
                continue;
            }
            found = Some(cid);
            break;
        }
        self.heap.extend(busy);
        if found.is_none() && !self.warned {
            self.warned = true;
            warn!(
                "coroutine budget of {} exceeded ({} live) but every \
                 candidate for eviction is in use",
                self.limit.unwrap_or(0),
                coroutines.len(),
            );
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn warned(&self) -> bool {
        self.warned
    }

    /// Rebuild the heap from the live coroutines once stale entries
    /// dominate it.
    fn compact<'g, S>(&mut self, coroutines: &Coroutines<'g, S>) {
        if self.heap.len() <= 2 * coroutines.len() + 64 {
            return;
        }
        self.heap =
            coroutines.iter().map(|(cid, co)| Reverse((co.epoch, cid))).collect();
    }
}

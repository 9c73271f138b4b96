//! Shared FIFO work queue for dynamic-class schedules
//!
//! One member counts the loop and fills the queue with position batches
//! `start..end` of at most `chunk` elements, then pushes one end marker per
//! team member. Members pop until they take an end marker, so no member can
//! finish while batches remain ahead of it in the queue.
//!
//! Batches carry positions, not elements. Each member walks its own copy of
//! the loop iterator and skips forward to the batches it pops; a single
//! queue hands any one consumer increasing starts, so skipping never has to
//! go back. Elements stay on the thread that produced them.
//!
//! The last member to finish removes the queue from the team.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use omprt_core::{ktrace, kwarn};

use crate::team::{SharedKey, Team};

/// Spins before an empty-queue wait starts yielding
const SPINS_BEFORE_YIELD: u32 = 32;

enum Slot {
    Batch(Range<usize>),
    End,
}

pub struct WorkQueue {
    slots: SegQueue<Slot>,
    consumers: usize,
    finished: AtomicUsize,
}

impl WorkQueue {
    pub fn new(consumers: usize) -> Self {
        Self {
            slots: SegQueue::new(),
            consumers: consumers.max(1),
            finished: AtomicUsize::new(0),
        }
    }

    /// Push batches covering `0..len`, then one end marker per consumer
    pub fn populate(&self, len: usize, chunk: usize) {
        let chunk = chunk.max(1);
        let mut start = 0usize;
        let mut batches = 0usize;
        while start < len {
            let end = start.saturating_add(chunk).min(len);
            self.slots.push(Slot::Batch(start..end));
            start = end;
            batches += 1;
        }
        for _ in 0..self.consumers {
            self.slots.push(Slot::End);
        }
        ktrace!("work queue populated: {} batches of up to {}", batches, chunk);
    }

    /// Next batch, or `None` once this consumer took its end marker
    ///
    /// Waits while the queue is empty and still being filled.
    fn pop_blocking(&self, team: &Team) -> Option<Range<usize>> {
        let mut spins = 0u32;
        loop {
            match self.slots.pop() {
                Some(Slot::Batch(batch)) => return Some(batch),
                Some(Slot::End) => return None,
                None => {
                    team.check_broken();
                    if spins < SPINS_BEFORE_YIELD {
                        spins += 1;
                        core::hint::spin_loop();
                    } else {
                        std::thread::yield_now();
                    }
                }
            }
        }
    }

    /// Record one consumer done; true for the last one
    fn finish(&self) -> bool {
        self.finished.fetch_add(1, Ordering::AcqRel) + 1 == self.consumers
    }

    /// Slots still queued, end markers included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("queued", &self.slots.len())
            .field("consumers", &self.consumers)
            .field("finished", &self.finished.load(Ordering::Relaxed))
            .finish()
    }
}

/// One member's view of a dynamic-class loop
pub struct DynamicShare<'t, I> {
    team: &'t Team,
    key: SharedKey,
    queue: Arc<WorkQueue>,
    iter: I,
    /// Position of the element `iter` yields next
    pos: usize,
    /// End of the batch being worked on
    batch_end: usize,
    done: bool,
}

impl<'t, I> DynamicShare<'t, I> {
    pub(crate) fn new(team: &'t Team, key: SharedKey, queue: Arc<WorkQueue>, iter: I) -> Self {
        Self {
            team,
            key,
            queue,
            iter,
            pos: 0,
            batch_end: 0,
            done: false,
        }
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if self.queue.finish() {
            ktrace!("work queue {:?} drained", self.key);
            if let Err(e) = self.team.remove_shared(self.key) {
                kwarn!("work queue {:?} not released: {}", self.key, e);
            }
        }
    }
}

impl<I: Iterator> Iterator for DynamicShare<'_, I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        loop {
            if self.pos < self.batch_end {
                self.pos += 1;
                let item = self.iter.next();
                if item.is_none() {
                    // Shorter than the populating member's loop
                    self.batch_end = self.pos;
                    self.finish();
                }
                return item;
            }
            if self.done {
                return None;
            }
            match self.queue.pop_blocking(self.team) {
                Some(batch) => {
                    let skip = batch.start.saturating_sub(self.pos);
                    if skip > 0 && self.iter.nth(skip - 1).is_none() {
                        self.finish();
                        return None;
                    }
                    self.pos = batch.start;
                    self.batch_end = batch.end;
                }
                None => {
                    self.finish();
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &WorkQueue) -> Vec<Option<Range<usize>>> {
        let mut slots = Vec::new();
        while let Some(slot) = queue.slots.pop() {
            slots.push(match slot {
                Slot::Batch(b) => Some(b),
                Slot::End => None,
            });
        }
        slots
    }

    #[test]
    fn test_populate_batches_then_markers() {
        let queue = WorkQueue::new(2);
        queue.populate(7, 3);
        // 3 batches + 2 end markers
        assert_eq!(queue.len(), 5);
        assert_eq!(
            drain(&queue),
            vec![Some(0..3), Some(3..6), Some(6..7), None, None]
        );
    }

    #[test]
    fn test_unit_chunk_batches() {
        let queue = WorkQueue::new(1);
        queue.populate(3, 1);
        assert_eq!(drain(&queue), vec![Some(0..1), Some(1..2), Some(2..3), None]);
    }

    #[test]
    fn test_empty_input_only_markers() {
        let queue = WorkQueue::new(3);
        queue.populate(0, 4);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_last_finisher() {
        let queue = WorkQueue::new(3);
        assert!(!queue.finish());
        assert!(!queue.finish());
        assert!(queue.finish());
    }
}

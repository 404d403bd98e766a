//! Reassembles results produced out of order by worker threads

use crate::error::{CatResult, Error};
use crossbeam_channel::{Receiver, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Producer side. Each worker pushes its result under the index of the job it came from.
pub struct OrdQueue<T> {
    sender: Sender<Slot<T>>,
}

impl<T> Clone for OrdQueue<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

/// Consumer side. Yields items strictly in index order, starting at 0.
pub struct OrdQueueIter<T> {
    receiver: Receiver<Slot<T>>,
    next_index: usize,
    pending: BinaryHeap<Reverse<Slot<T>>>,
}

/// `depth` is the number of finished items that can wait in the channel
/// before `push` blocks.
pub fn new<T>(depth: usize) -> (OrdQueue<T>, OrdQueueIter<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(depth);
    (OrdQueue { sender }, OrdQueueIter {
        receiver,
        next_index: 0,
        pending: BinaryHeap::new(),
    })
}

impl<T: Send + 'static> OrdQueue<T> {
    #[inline]
    pub fn push(&self, index: usize, item: T) -> CatResult<()> {
        self.sender.send(Slot { index, item })?;
        Ok(())
    }
}

impl<T> OrdQueueIter<T> {
    /// Drains the queue, and fails unless every index in `0..total` arrived.
    pub fn collect_exact(self, total: usize) -> CatResult<Vec<T>> {
        let items: Vec<T> = self.collect();
        if items.len() != total {
            return Err(Error::ThreadSend);
        }
        Ok(items)
    }
}

impl<T> Iterator for OrdQueueIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while self.pending.peek().map(|Reverse(slot)| slot.index) != Some(self.next_index) {
            match self.receiver.recv() {
                Ok(slot) => self.pending.push(Reverse(slot)),
                // all producers are gone; a gap means a worker gave up
                Err(_) => return None,
            }
        }
        let Reverse(slot) = self.pending.pop()?;
        self.next_index += 1;
        Some(slot.item)
    }
}

struct Slot<T> {
    index: usize,
    item: T,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, o: &Self) -> bool { self.index == o.index }
}
impl<T> Eq for Slot<T> {}
impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, o: &Self) -> Option<Ordering> { Some(self.cmp(o)) }
}
impl<T> Ord for Slot<T> {
    fn cmp(&self, o: &Self) -> Ordering { self.index.cmp(&o.index) }
}

#[test]
fn reorders() {
    let (queue, iter) = new(4);
    for i in [2, 0, 3, 1] {
        queue.push(i, i * 10).unwrap();
    }
    drop(queue);
    assert_eq!(iter.collect_exact(4).unwrap(), [0, 10, 20, 30]);
}

#[test]
fn gap_is_an_error() {
    let (queue, iter) = new(4);
    queue.push(0, 'a').unwrap();
    queue.push(2, 'c').unwrap();
    drop(queue);
    assert!(matches!(iter.collect_exact(3), Err(Error::ThreadSend)));
}

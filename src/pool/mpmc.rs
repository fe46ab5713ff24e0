//! Bounded MPMC ring queue, ported from `original_source/core/pool.c`'s
//! `mpmc_create`/`mpmc_push`/`mpmc_pop` (Dmitry Vyukov's bounded queue
//! algorithm): each slot carries its own sequence number so producers and
//! consumers can make progress without a single shared lock, falling back to
//! a short backoff spin only when the ring is momentarily full or empty.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Cell<T> {
    sequence: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

/// A bounded multi-producer multi-consumer queue of fixed power-of-two
/// capacity.
pub struct Mpmc<T> {
    buffer: Box<[Cell<T>]>,
    mask: usize,
    enqueue_pos: AtomicUsize,
    dequeue_pos: AtomicUsize,
}

unsafe impl<T: Send> Send for Mpmc<T> {}
unsafe impl<T: Send> Sync for Mpmc<T> {}

impl<T> Mpmc<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let mut buffer = Vec::with_capacity(capacity);
        for i in 0..capacity {
            buffer.push(Cell {
                sequence: AtomicUsize::new(i),
                data: UnsafeCell::new(MaybeUninit::uninit()),
            });
        }
        Mpmc {
            buffer: buffer.into_boxed_slice(),
            mask: capacity - 1,
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Try to push `value`. Returns `Err(value)` if the ring is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        let mut backoff = 0u32;
        loop {
            let cell = &self.buffer[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                if self
                    .enqueue_pos
                    .compare_exchange_weak(pos, pos + 1, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    unsafe {
                        (*cell.data.get()).write(value);
                    }
                    cell.sequence.store(pos + 1, Ordering::Release);
                    return Ok(());
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
                backoff_spin(&mut backoff);
            }
        }
    }

    /// Try to pop a value. Returns `None` if the ring is empty.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        let mut backoff = 0u32;
        loop {
            let cell = &self.buffer[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos as isize + 1);
            if diff == 0 {
                if self
                    .dequeue_pos
                    .compare_exchange_weak(pos, pos + 1, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    let value = unsafe { (*cell.data.get()).assume_init_read() };
                    cell.sequence.store(pos + self.mask + 1, Ordering::Release);
                    return Some(value);
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
                backoff_spin(&mut backoff);
            }
        }
    }
}

fn backoff_spin(counter: &mut u32) {
    for _ in 0..(1 << (*counter).min(6)) {
        std::hint::spin_loop();
    }
    *counter += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_order() {
        let q: Mpmc<i32> = Mpmc::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_ring_rejects_push() {
        let q: Mpmc<i32> = Mpmc::new(2);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert!(q.push(3).is_err());
    }

    #[test]
    fn concurrent_producers_consumers() {
        const PER_PRODUCER: i64 = 1000;
        const PRODUCERS: i64 = 4;
        let q = Arc::new(Mpmc::<i64>::new(1024));
        let produced = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|tid| {
                let q = q.clone();
                let produced = produced.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        loop {
                            if q.push(tid * PER_PRODUCER + i).is_ok() {
                                break;
                            }
                            std::thread::yield_now();
                        }
                    }
                    produced.fetch_add(PER_PRODUCER as usize, Ordering::Relaxed);
                })
            })
            .collect();
        let total_target = (PRODUCERS * PER_PRODUCER) as usize;
        let consumed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let consumers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let q = q.clone();
                let consumed = consumed.clone();
                thread::spawn(move || loop {
                    if let Some(_) = q.pop() {
                        if consumed.fetch_add(1, Ordering::Relaxed) + 1 >= total_target {
                            return;
                        }
                    } else if consumed.load(Ordering::Relaxed) >= total_target {
                        return;
                    } else {
                        std::thread::yield_now();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        for c in consumers {
            c.join().unwrap();
        }
        assert_eq!(consumed.load(Ordering::Relaxed), total_target);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Bounded lock-free hand-off queue (multiple producers, single consumer)
//
// Producers reserve a sequence number with CAS, but only while the reserved
// slot is guaranteed to be free (seq < read_seq + capacity). A full queue
// hands the item straight back instead of overwriting or waiting.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crate::item::LogItem;

/// Slot states for the per-slot state machine
const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// Spins the consumer waits for a reserved slot to become READY
const MAX_READY_SPINS: u32 = 1000;

/// Cache-aligned wrapper to prevent false sharing
#[repr(align(64))]
struct CacheAligned<T>(T);

struct Slot {
    state: AtomicU8,
    item: UnsafeCell<Option<LogItem>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            item: UnsafeCell::new(None),
        }
    }
}

/// Lock-free bounded FIFO carrying ready records to the dispatcher.
///
/// Any number of threads may [`try_push`](Self::try_push). Popping is
/// serialized by an internal consumer flag: a second concurrent
/// [`try_pop`](Self::try_pop) sees the queue as empty rather than racing.
pub struct MessageQueue {
    slots: Box<[Slot]>,
    capacity: usize,
    write_seq: CacheAligned<AtomicU64>,
    read_seq: CacheAligned<AtomicU64>,
    consumer_busy: AtomicBool,
    overruns: AtomicU64,
    cas_failures: AtomicU64,
}

// SAFETY: MessageQueue is Sync because:
// - Writers own a slot exclusively once their CAS on write_seq succeeds, and
//   the capacity check guarantees the consumer has already emptied it
// - Only one reader at a time (consumer_busy flag)
// - State machine (EMPTY -> WRITING -> READY -> EMPTY) with Release/Acquire
//   publishes slot contents between the two sides
unsafe impl Sync for MessageQueue {}

struct ConsumerGuard<'a>(&'a AtomicBool);

impl<'a> ConsumerGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MessageQueue {
    /// Create a queue with `capacity` slots
    ///
    /// # Panics
    /// Panics if capacity is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be non-zero");

        let slots: Vec<Slot> = (0..capacity).map(|_| Slot::new()).collect();

        Self {
            slots: slots.into_boxed_slice(),
            capacity,
            write_seq: CacheAligned(AtomicU64::new(0)),
            read_seq: CacheAligned(AtomicU64::new(0)),
            consumer_busy: AtomicBool::new(false),
            overruns: AtomicU64::new(0),
            cas_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    fn slot(&self, seq: u64) -> &Slot {
        &self.slots[(seq % self.capacity as u64) as usize]
    }

    /// Enqueue without blocking.
    ///
    /// Returns the item back to the caller if the queue is full.
    pub fn try_push(&self, item: LogItem) -> Result<(), LogItem> {
        // 1. Reserve a sequence number, but only while its slot is free
        let mut seq = self.write_seq.0.load(Ordering::Relaxed);
        loop {
            let read_seq = self.read_seq.0.load(Ordering::Acquire);
            if seq >= read_seq + self.capacity as u64 {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                return Err(item);
            }

            match self.write_seq.0.compare_exchange_weak(
                seq,
                seq + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => {
                    seq = current;
                    self.cas_failures.fetch_add(1, Ordering::Relaxed);
                    std::hint::spin_loop();
                }
            }
        }

        let slot = self.slot(seq);

        // 2. Mark slot as WRITING
        slot.state.store(WRITING, Ordering::Relaxed);

        // 3. Move the item in (safe: we own this slot via the reservation)
        unsafe {
            *slot.item.get() = Some(item);
        }

        // 4. Mark slot as READY (item visible to the consumer)
        slot.state.store(READY, Ordering::Release);
        Ok(())
    }

    /// Dequeue without blocking.
    ///
    /// Returns None when the queue is empty, when the head slot is still
    /// being written, or when another consumer is mid-pop.
    pub fn try_pop(&self) -> Option<LogItem> {
        let _guard = ConsumerGuard::try_acquire(&self.consumer_busy)?;

        let read_seq = self.read_seq.0.load(Ordering::Relaxed);
        let write_seq = self.write_seq.0.load(Ordering::Acquire);
        if read_seq >= write_seq {
            return None;
        }

        let slot = self.slot(read_seq);

        // Wait for the slot to be READY (rare: writer might be mid-write)
        let mut spins = 0;
        while slot.state.load(Ordering::Acquire) != READY {
            if spins > MAX_READY_SPINS {
                return None;
            }
            spins += 1;
            std::hint::spin_loop();
        }

        // Safe: READY guarantees the writer is done and nobody else reads
        let item = unsafe { (*slot.item.get()).take() };

        // Release the slot before advancing read_seq so producers that see
        // the new read_seq also see an empty slot
        slot.state.store(EMPTY, Ordering::Release);
        self.read_seq.0.store(read_seq + 1, Ordering::Release);

        item
    }

    /// Number of pushes rejected because the queue was full
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Number of CAS retries (contention metric)
    pub fn cas_failures(&self) -> u64 {
        self.cas_failures.load(Ordering::Relaxed)
    }

    /// Get number of items currently queued
    pub fn len(&self) -> usize {
        let write_seq = self.write_seq.0.load(Ordering::Relaxed);
        let read_seq = self.read_seq.0.load(Ordering::Relaxed);
        (write_seq.saturating_sub(read_seq) as usize).min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

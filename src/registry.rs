// SPDX-License-Identifier: Apache-2.0 OR MIT
// Thread registry - lazily records every thread that touches the pipeline
//
// Each thread remembers which registries it already joined in a thread-local
// set, so a registered thread never touches the shared map again.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};
use std::time::Instant;

use crate::diag::Diagnostics;

const COMPONENT: &str = "registry";

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // Ids of the registries the current thread is recorded in
    static JOINED: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

fn joined(registry_id: u64) -> bool {
    JOINED.with(|joined| joined.borrow().contains(&registry_id))
}

fn mark_joined(registry_id: u64) {
    JOINED.with(|joined| {
        joined.borrow_mut().insert(registry_id);
    });
}

/// Bookkeeping for one producer or consumer thread
#[derive(Debug, Clone)]
pub struct ThreadContext {
    id: ThreadId,
    name: Option<String>,
    ordinal: usize,
    registered_at: Instant,
}

impl ThreadContext {
    fn current(ordinal: usize) -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_owned),
            ordinal,
            registered_at: Instant::now(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Registration order, starting at 0
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }
}

/// Concurrent `ThreadId -> ThreadContext` map with insert-if-absent semantics.
///
/// Entries are never updated or removed one by one. [`teardown`](Self::teardown)
/// clears the whole map exactly once; afterwards registration is a no-op.
pub struct ThreadRegistry {
    id: u64,
    contexts: RwLock<HashMap<ThreadId, ThreadContext>>,
    next_ordinal: AtomicUsize,
    torn_down: AtomicBool,
    diag: Arc<Diagnostics>,
}

impl ThreadRegistry {
    pub fn new(expected_threads: usize, diag: Arc<Diagnostics>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            contexts: RwLock::new(HashMap::with_capacity(expected_threads)),
            next_ordinal: AtomicUsize::new(0),
            torn_down: AtomicBool::new(false),
            diag,
        }
    }

    // Insert is the only mutation, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ThreadId, ThreadContext>> {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ThreadId, ThreadContext>> {
        self.contexts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the calling thread if it is not known yet.
    ///
    /// Idempotent. Returns `true` only for the call that inserted the entry.
    /// A thread that already joined only reads its own thread-local set. If
    /// the map cannot grow, the failure is reported and the caller carries
    /// on unregistered. After [`teardown`](Self::teardown) nothing is inserted.
    pub fn ensure_registered(&self) -> bool {
        if joined(self.id) || self.is_torn_down() {
            return false;
        }

        let id = thread::current().id();
        let mut contexts = self.write();
        // Checked again under the lock: teardown may have just run
        if self.is_torn_down() {
            return false;
        }
        if contexts.contains_key(&id) {
            mark_joined(self.id);
            return false;
        }
        if let Err(e) = contexts.try_reserve(1) {
            diag_error!(self.diag, COMPONENT, "could not create thread context: {}", e);
            return false;
        }
        let ordinal = self.next_ordinal.fetch_add(1, Ordering::Relaxed);
        contexts.insert(id, ThreadContext::current(ordinal));
        mark_joined(self.id);
        true
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.read().contains_key(&id)
    }

    /// Whether the calling thread is registered
    pub fn is_current_registered(&self) -> bool {
        self.contains(thread::current().id())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Copy of all contexts, ordered by registration
    pub fn snapshot(&self) -> Vec<ThreadContext> {
        let mut contexts: Vec<ThreadContext> = self.read().values().cloned().collect();
        contexts.sort_by_key(ThreadContext::ordinal);
        contexts
    }

    /// Drop every context and refuse further registrations.
    ///
    /// Returns how many contexts were removed; 0 on any call after the first.
    pub fn teardown(&self) -> usize {
        let mut contexts = self.write();
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let removed = contexts.len();
        contexts.clear();
        contexts.shrink_to_fit();
        removed
    }
}

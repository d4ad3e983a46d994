//! The two-tier slice pool: a bounded *reserved* tier that guarantees each
//! thread one pre-allocated slice, and an optionally-bounded *dynamic* tier
//! that lazily allocates slices shared across threads. Grounded on
//! `original_source/spoor/runtime/buffer/buffer_slice_pool_allocator.h` and
//! `buffer_slice_pool_ownership_info.h`: the reserved free-list is a
//! lock-free queue of pre-allocated slices, and the dynamic tier is a single
//! atomic live-slice counter bounded by a CAS-attempt budget.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::ArrayQueue;
use spoor_trace::Event;

/// A fixed-capacity, single-writer sequence of events.
#[derive(Debug)]
pub struct EventSlice {
    capacity: usize,
    events: Vec<Event>,
}

impl EventSlice {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, events: Vec::with_capacity(capacity) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    /// Append `event`. Caller must check [`EventSlice::is_full`] first --
    /// pushing past capacity panics, since it indicates a bug in the
    /// per-thread buffer's retire-before-append contract.
    pub fn push(&mut self, event: Event) {
        assert!(!self.is_full(), "pushed into a full event slice");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Where a borrowed [`EventSlice`] came from, so it can be returned to the
/// matching tier.
#[derive(Debug)]
pub enum BorrowedSlice {
    Reserved(Box<EventSlice>),
    Dynamic(Box<EventSlice>),
}

impl BorrowedSlice {
    pub fn slice(&self) -> &EventSlice {
        match self {
            BorrowedSlice::Reserved(s) | BorrowedSlice::Dynamic(s) => s,
        }
    }

    pub fn slice_mut(&mut self) -> &mut EventSlice {
        match self {
            BorrowedSlice::Reserved(s) | BorrowedSlice::Dynamic(s) => s,
        }
    }

    pub fn into_slice(self) -> Box<EventSlice> {
        match self {
            BorrowedSlice::Reserved(s) | BorrowedSlice::Dynamic(s) => s,
        }
    }
}

/// A bounded free-list of pre-allocated slices. Borrowing and returning are
/// both lock-free `ArrayQueue` operations.
pub struct ReservedPool {
    free_list: ArrayQueue<Box<EventSlice>>,
}

impl ReservedPool {
    pub fn new(capacity: usize, slice_capacity: usize) -> Self {
        let free_list = ArrayQueue::new(capacity.max(1));
        for _ in 0..capacity {
            let _ = free_list.push(Box::new(EventSlice::new(slice_capacity)));
        }
        Self { free_list }
    }

    /// Claim a slice from the free list, or `None` if it is empty.
    pub fn try_borrow(&self) -> Option<Box<EventSlice>> {
        self.free_list.pop()
    }

    /// Return a slice to the free list. Its contents are cleared first.
    pub fn r#return(&self, mut slice: Box<EventSlice>) {
        slice.clear();
        // The free list was sized to the reserved capacity, so this cannot
        // overflow in correct usage; drop the slice rather than panic if it
        // somehow does.
        let _ = self.free_list.push(slice);
    }
}

/// A lazily-allocated tier shared across threads, bounded by `capacity` and
/// claimed via a bounded CAS loop on a live-slice counter.
pub struct DynamicPool {
    capacity: usize,
    cas_attempts: usize,
    slice_capacity: usize,
    live: AtomicUsize,
}

impl DynamicPool {
    pub fn new(capacity: usize, cas_attempts: usize, slice_capacity: usize) -> Self {
        Self { capacity, cas_attempts: cas_attempts.max(1), slice_capacity, live: AtomicUsize::new(0) }
    }

    /// Attempt to claim a dynamic slot via a bounded CAS loop, allocating a
    /// fresh slice on success.
    pub fn try_borrow(&self) -> Option<Box<EventSlice>> {
        let mut current = self.live.load(Ordering::Relaxed);
        for _ in 0..self.cas_attempts {
            if current >= self.capacity {
                return None;
            }
            match self.live.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(Box::new(EventSlice::new(self.slice_capacity))),
                Err(observed) => current = observed,
            }
        }
        None
    }

    /// Release a dynamic slot; the slice itself is dropped by the caller.
    pub fn release(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

/// The combined two-tier pool. Borrowing tries the reserved tier first (iff
/// the calling thread does not already hold a reserved slice), then falls
/// back to the dynamic tier.
pub struct SlicePool {
    reserved: ReservedPool,
    dynamic: DynamicPool,
}

impl SlicePool {
    pub fn new(
        reserved_capacity: usize,
        max_reserved_slice_capacity: usize,
        dynamic_capacity: usize,
        dynamic_cas_attempts: usize,
        max_dynamic_slice_capacity: usize,
    ) -> Self {
        Self {
            reserved: ReservedPool::new(reserved_capacity, max_reserved_slice_capacity),
            dynamic: DynamicPool::new(dynamic_capacity, dynamic_cas_attempts, max_dynamic_slice_capacity),
        }
    }

    /// Borrow a slice, trying the reserved tier first when `holds_reserved`
    /// is `false`. Returns the slice plus whether the reserved tier was used
    /// (callers update their per-thread reserved-borrowed flag accordingly).
    pub fn try_borrow(&self, holds_reserved: bool) -> Option<BorrowedSlice> {
        if !holds_reserved {
            if let Some(slice) = self.reserved.try_borrow() {
                return Some(BorrowedSlice::Reserved(slice));
            }
        }
        self.dynamic.try_borrow().map(BorrowedSlice::Dynamic)
    }

    /// Return a slice to its origin tier.
    pub fn return_slice(&self, slice: BorrowedSlice) {
        match slice {
            BorrowedSlice::Reserved(slice) => self.reserved.r#return(slice),
            BorrowedSlice::Dynamic(_slice) => self.dynamic.release(),
        }
    }

    pub fn dynamic_live_count(&self) -> usize {
        self.dynamic.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: i64) -> Event {
        Event { steady_clock_timestamp: n, payload_1: 0, r#type: 0, payload_2: 0 }
    }

    #[test]
    fn reserved_pool_borrows_up_to_capacity_then_fails() {
        let pool = ReservedPool::new(2, 10);
        let a = pool.try_borrow();
        let b = pool.try_borrow();
        let c = pool.try_borrow();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(c.is_none());
    }

    #[test]
    fn reserved_pool_returned_slice_is_cleared_and_reusable() {
        let pool = ReservedPool::new(1, 10);
        let mut slice = pool.try_borrow().unwrap();
        slice.push(event(1));
        pool.r#return(slice);
        let slice = pool.try_borrow().unwrap();
        assert!(slice.is_empty());
    }

    #[test]
    fn dynamic_pool_borrows_up_to_capacity_then_fails() {
        let pool = DynamicPool::new(1, 4, 10);
        assert!(pool.try_borrow().is_some());
        assert_eq!(pool.live_count(), 1);
        assert!(pool.try_borrow().is_none());
    }

    #[test]
    fn dynamic_pool_release_frees_a_slot() {
        let pool = DynamicPool::new(1, 4, 10);
        let _slice = pool.try_borrow().unwrap();
        pool.release();
        assert_eq!(pool.live_count(), 0);
        assert!(pool.try_borrow().is_some());
    }

    #[test]
    fn slice_pool_prefers_reserved_tier_when_not_held() {
        let pool = SlicePool::new(1, 10, 1, 4, 10);
        let borrowed = pool.try_borrow(false).unwrap();
        assert!(matches!(borrowed, BorrowedSlice::Reserved(_)));
    }

    #[test]
    fn slice_pool_falls_back_to_dynamic_tier_when_reserved_exhausted() {
        let pool = SlicePool::new(1, 10, 1, 4, 10);
        let _first = pool.try_borrow(false).unwrap();
        let second = pool.try_borrow(false).unwrap();
        assert!(matches!(second, BorrowedSlice::Dynamic(_)));
    }

    #[test]
    fn slice_pool_skips_reserved_tier_when_thread_already_holds_one() {
        let pool = SlicePool::new(1, 10, 0, 4, 10);
        // Reserved tier has capacity, but holds_reserved=true means it's
        // skipped, so dynamic is tried and fails (capacity 0).
        assert!(pool.try_borrow(true).is_none());
    }
}

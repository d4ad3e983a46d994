//! Per-thread event buffers: the hot-path append contract (retire full/absent
//! slice, borrow a fresh one, drop on exhaustion), the retention-window ring,
//! and the registry the admin operations (`ClearTraceEvents`,
//! `FlushTraceEvents`, `Deinitialize`) use to reach buffers that are not yet
//! full. Grounded on `original_source/spoor/runtime/buffer/circular_buffer.h`
//! and `runtime_common.cc`'s append/retire sequence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use spoor_trace::{DurationNanoseconds, Event};

use crate::pool::{BorrowedSlice, SlicePool};

struct RetainedSlice {
    slice: BorrowedSlice,
    retired_at: Instant,
}

struct State {
    current: Option<BorrowedSlice>,
    retained: VecDeque<RetainedSlice>,
}

/// The shared state backing one thread's buffer. Registered in
/// [`crate::runtime_data::RuntimeData`]'s registry so admin operations can
/// reach slices that a thread has not yet filled.
pub struct ThreadBufferShared {
    state: Mutex<State>,
    holds_reserved: AtomicBool,
    dropped_events: AtomicU64,
    pub thread_id: u64,
}

impl ThreadBufferShared {
    pub fn new(thread_id: u64) -> Self {
        Self {
            state: Mutex::new(State { current: None, retained: VecDeque::new() }),
            holds_reserved: AtomicBool::new(false),
            dropped_events: AtomicU64::new(0),
            thread_id,
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Append one event, retiring and re-borrowing slices per the hot-path
    /// contract. Returns `true` if the event was recorded, `false` if it was
    /// dropped for lack of capacity.
    pub fn append(
        &self,
        event: Event,
        pool: &SlicePool,
        retention: DurationNanoseconds,
        mut on_retire: impl FnMut(BorrowedSlice),
    ) -> bool {
        let mut state = self.state.lock();

        let needs_fresh_slice = match &state.current {
            None => true,
            Some(slice) => slice.slice().is_full(),
        };
        if needs_fresh_slice {
            if let Some(full) = state.current.take() {
                self.retire(&mut state, full, pool, retention, &mut on_retire);
            }
            let holds_reserved = self.holds_reserved.load(Ordering::Acquire);
            match pool.try_borrow(holds_reserved) {
                Some(slice) => {
                    if matches!(slice, BorrowedSlice::Reserved(_)) {
                        self.holds_reserved.store(true, Ordering::Release);
                    }
                    state.current = Some(slice);
                }
                None => {
                    if retention == 0 {
                        self.dropped_events.fetch_add(1, Ordering::Relaxed);
                        return false;
                    }
                }
            }
        }

        match &mut state.current {
            Some(slice) => {
                slice.slice_mut().push(event);
                true
            }
            None => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    fn retire(
        &self,
        state: &mut State,
        slice: BorrowedSlice,
        pool: &SlicePool,
        retention: DurationNanoseconds,
        on_retire: &mut impl FnMut(BorrowedSlice),
    ) {
        if matches!(slice, BorrowedSlice::Reserved(_)) {
            self.holds_reserved.store(false, Ordering::Release);
        }
        if retention == 0 {
            on_retire(slice);
            return;
        }
        state.retained.push_back(RetainedSlice { slice, retired_at: Instant::now() });
        let window = std::time::Duration::from_nanos(retention.max(0) as u64);
        while let Some(front) = state.retained.front() {
            if front.retired_at.elapsed() <= window {
                break;
            }
            // Recycled without flushing -- it aged out of the retention
            // window before an explicit flush claimed it.
            let stale = state.retained.pop_front().unwrap();
            pool.return_slice(stale.slice);
        }
    }

    /// Drain every slice this thread currently holds (the active slice plus
    /// anything retained in the window) to `on_retire`, for `FlushTraceEvents`
    /// and a draining `Deinitialize`.
    pub fn drain_all(&self, mut on_retire: impl FnMut(BorrowedSlice)) {
        let mut state = self.state.lock();
        if let Some(current) = state.current.take() {
            if matches!(current, BorrowedSlice::Reserved(_)) {
                self.holds_reserved.store(false, Ordering::Release);
            }
            on_retire(current);
        }
        while let Some(retained) = state.retained.pop_front() {
            on_retire(retained.slice);
        }
    }

    /// Discard everything this thread currently holds without flushing, for
    /// `ClearTraceEvents` and a non-draining `Deinitialize`.
    pub fn clear_all(&self, pool: &SlicePool) {
        let mut state = self.state.lock();
        if let Some(current) = state.current.take() {
            if matches!(current, BorrowedSlice::Reserved(_)) {
                self.holds_reserved.store(false, Ordering::Release);
            }
            pool.return_slice(current);
        }
        while let Some(retained) = state.retained.pop_front() {
            pool.return_slice(retained.slice);
        }
    }
}

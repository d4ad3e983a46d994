//! The three-state lifecycle state machine: Uninitialized, Initialized
//! (Disabled), Initialized (Enabled). All transitions are idempotent, per
//! `original_source/spoor/runtime/runtime.h`'s documented contract, and are
//! checked lock-free on the hot path via a single `AtomicU8`.

use std::sync::atomic::{AtomicU8, Ordering};

const UNINITIALIZED: u8 = 0;
const DISABLED: u8 = 1;
const ENABLED: u8 = 2;

/// A lock-free lifecycle state word. `Uninitialized -> Initialized(Disabled)
/// -> Initialized(Enabled) -> Uninitialized`, with `Enable`/`Disable` toggling
/// within the initialized state.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self { state: AtomicU8::new(UNINITIALIZED) }
    }

    /// `Uninitialized -> Initialized(Disabled)`. Idempotent: returns `true`
    /// the first time it actually initializes, `false` if already
    /// initialized.
    pub fn initialize(&self) -> bool {
        self.state.compare_exchange(UNINITIALIZED, DISABLED, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// `Initialized(*) -> Uninitialized`. Idempotent.
    pub fn deinitialize(&self) {
        self.state.store(UNINITIALIZED, Ordering::Release);
    }

    pub fn initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) != UNINITIALIZED
    }

    /// `Initialized(Disabled) -> Initialized(Enabled)`. A no-op while
    /// Uninitialized. Idempotent.
    pub fn enable(&self) {
        let _ = self.state.compare_exchange(DISABLED, ENABLED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// `Initialized(Enabled) -> Initialized(Disabled)`. A no-op while
    /// Uninitialized. Idempotent.
    pub fn disable(&self) {
        let _ = self.state.compare_exchange(ENABLED, DISABLED, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn enabled(&self) -> bool {
        self.state.load(Ordering::Acquire) == ENABLED
    }
}

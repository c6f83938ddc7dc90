#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The USB task and the control loop run as separate tasks; these atomics
//! let the loop see whether a host is listening and let it report how many
//! reply frames were lost to a full queue.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Set while a host holds the CDC port open with DTR asserted.
static LINK_ATTACHED: AtomicBool = AtomicBool::new(false);
/// Reply frames dropped since the last [`take_dropped_frames`].
static DROPPED_FRAMES: AtomicU32 = AtomicU32::new(0);

pub fn record_link_attached(attached: bool) {
    LINK_ATTACHED.store(attached, Ordering::Relaxed);
}

pub fn link_attached() -> bool {
    LINK_ATTACHED.load(Ordering::Relaxed)
}

pub fn record_dropped_frame() {
    DROPPED_FRAMES.fetch_add(1, Ordering::Relaxed);
}

/// Returns the dropped-frame count and starts a new tally.
pub fn take_dropped_frames() -> u32 {
    DROPPED_FRAMES.swap(0, Ordering::Relaxed)
}

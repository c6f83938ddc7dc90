//! Quadrature decoding for the two drive wheels.
//!
//! Each wheel exposes channel B and the XOR of both channels, so one edge
//! interrupt on XOR covers every transition: each Gray-code step flips exactly
//! one channel and therefore toggles XOR. The handler recovers `A = XOR ^ B`
//! and compares against the previous state to produce a ±1 step.
//!
//! The interrupt handlers are the only writers of the counts. The main loop
//! reads both sides through [`EncoderCounts::snapshot`], which copies them inside
//! one critical section so the pair is never torn.

use core::cell::Cell;
use core::f32::consts::PI;

use critical_section::Mutex;

/// Counts per revolution used by the radian conversion.
pub const DEFAULT_COUNTS_PER_REV: f32 = 909.7;

/// Drive side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// Decoder state for one wheel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QuadratureDecoder {
    last_a: bool,
    last_b: bool,
    last_xor: bool,
    count: i32,
}

impl QuadratureDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_a: false,
            last_b: false,
            last_xor: false,
            count: 0,
        }
    }

    /// Seeds the previous-state bits from the current pin levels without counting.
    #[must_use]
    pub const fn primed(xor: bool, b: bool) -> Self {
        Self {
            last_a: xor ^ b,
            last_b: b,
            last_xor: xor,
            count: 0,
        }
    }

    /// Consumes one XOR edge and returns the signed step applied to the count.
    ///
    /// A sample whose XOR level matches the previous one is a glitch on the
    /// other line; it leaves the state untouched.
    pub fn observe(&mut self, xor: bool, b: bool) -> i32 {
        if xor == self.last_xor {
            return 0;
        }

        let a = xor ^ b;
        let step = i32::from(a ^ self.last_b) - i32::from(self.last_a ^ b);
        self.count = self.count.wrapping_add(step);
        self.last_a = a;
        self.last_b = b;
        self.last_xor = xor;
        step
    }

    #[must_use]
    pub const fn count(&self) -> i32 {
        self.count
    }

    #[must_use]
    pub const fn last_xor(&self) -> bool {
        self.last_xor
    }
}

/// Both wheel counts captured together.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderSnapshot {
    pub left: i32,
    pub right: i32,
}

impl EncoderSnapshot {
    #[must_use]
    pub const fn side(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Wheel angles in radians for the given counts-per-revolution figure.
    #[must_use]
    pub fn radians(&self, counts_per_rev: f32) -> (f32, f32) {
        (
            counts_to_radians(self.left, counts_per_rev),
            counts_to_radians(self.right, counts_per_rev),
        )
    }
}

/// Interrupt-shared decoder pair.
pub struct EncoderCounts {
    left: Mutex<Cell<QuadratureDecoder>>,
    right: Mutex<Cell<QuadratureDecoder>>,
}

impl EncoderCounts {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: Mutex::new(Cell::new(QuadratureDecoder::new())),
            right: Mutex::new(Cell::new(QuadratureDecoder::new())),
        }
    }

    fn slot(&self, side: Side) -> &Mutex<Cell<QuadratureDecoder>> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Edge handler entry point for `side`.
    pub fn on_edge(&self, side: Side, xor: bool, b: bool) -> i32 {
        critical_section::with(|cs| {
            let cell = self.slot(side).borrow(cs);
            let mut decoder = cell.get();
            let step = decoder.observe(xor, b);
            cell.set(decoder);
            step
        })
    }

    /// Copies both counts inside a single critical section.
    pub fn snapshot(&self) -> EncoderSnapshot {
        critical_section::with(|cs| EncoderSnapshot {
            left: self.left.borrow(cs).get().count(),
            right: self.right.borrow(cs).get().count(),
        })
    }

    /// Re-initializes a side from its current pin levels.
    pub fn prime(&self, side: Side, xor: bool, b: bool) {
        critical_section::with(|cs| {
            self.slot(side)
                .borrow(cs)
                .set(QuadratureDecoder::primed(xor, b));
        });
    }

    /// Zeroes both counts while keeping the last pin state.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            for side in Side::BOTH {
                let cell = self.slot(side).borrow(cs);
                let decoder = cell.get();
                cell.set(QuadratureDecoder::primed(decoder.last_xor, decoder.last_b));
            }
        });
    }
}

impl Default for EncoderCounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a raw count to radians: `count × 4π / counts_per_rev`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn counts_to_radians(count: i32, counts_per_rev: f32) -> f32 {
    count as f32 * 4.0 * PI / counts_per_rev
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gray-code sequence for one forward cycle as (A, B) pairs.
    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    fn feed(decoder: &mut QuadratureDecoder, states: impl Iterator<Item = (bool, bool)>) -> i32 {
        states.map(|(a, b)| decoder.observe(a ^ b, b)).sum()
    }

    #[test]
    fn forward_cycle_counts_plus_four() {
        let mut decoder = QuadratureDecoder::new();
        assert_eq!(feed(&mut decoder, FORWARD.into_iter()), 4);
        assert_eq!(decoder.count(), 4);
    }

    #[test]
    fn reverse_cycle_counts_minus_four() {
        let mut decoder = QuadratureDecoder::new();
        let reverse = [(false, true), (true, true), (true, false), (false, false)];
        assert_eq!(feed(&mut decoder, reverse.into_iter()), -4);
        assert_eq!(decoder.count(), -4);
    }

    #[test]
    fn repeated_level_is_ignored() {
        let mut decoder = QuadratureDecoder::new();
        decoder.observe(true, false);
        let before = decoder;
        // Same XOR level as before: nothing moved.
        assert_eq!(decoder.observe(true, false), 0);
        assert_eq!(decoder, before);
    }

    #[test]
    fn direction_change_unwinds_count() {
        let mut decoder = QuadratureDecoder::new();
        feed(&mut decoder, FORWARD.into_iter().take(2));
        feed(&mut decoder, [(true, false), (false, false)].into_iter());
        assert_eq!(decoder.count(), 0);
    }

    #[test]
    fn shared_counts_snapshot_both_sides() {
        let counts = EncoderCounts::new();
        for (a, b) in FORWARD {
            counts.on_edge(Side::Left, a ^ b, b);
        }
        for (a, b) in FORWARD.into_iter().take(2) {
            counts.on_edge(Side::Right, a ^ b, b);
        }

        let snapshot = counts.snapshot();
        assert_eq!(snapshot, EncoderSnapshot { left: 4, right: 2 });
        assert_eq!(snapshot.side(Side::Right), 2);

        counts.reset();
        assert_eq!(counts.snapshot(), EncoderSnapshot::default());
        // The primed state continues counting from the last pins.
        counts.on_edge(Side::Right, true, true);
        assert_eq!(counts.snapshot().right, 1);
    }

    #[test]
    fn edges_from_another_context_are_never_lost() {
        extern crate std;

        const CYCLES: i32 = 250;
        let counts = EncoderCounts::new();

        std::thread::scope(|scope| {
            let handler = scope.spawn(|| {
                for _ in 0..CYCLES {
                    for (a, b) in FORWARD {
                        counts.on_edge(Side::Left, a ^ b, b);
                    }
                }
            });

            let mut previous = 0;
            while !handler.is_finished() {
                let left = counts.snapshot().left;
                assert!((previous..=CYCLES * 4).contains(&left));
                previous = left;
            }
        });

        assert_eq!(counts.snapshot().left, CYCLES * 4);
        assert_eq!(counts.snapshot().right, 0);
    }

    #[test]
    fn radians_scale_with_counts() {
        let radians = counts_to_radians(909, DEFAULT_COUNTS_PER_REV);
        assert!((radians - 4.0 * PI * 909.0 / 909.7).abs() < 1e-5);
        assert_eq!(counts_to_radians(0, DEFAULT_COUNTS_PER_REV), 0.0);
    }
}

//! Fixed-capacity double-ended ring buffer.
//!
//! Storage is an inline `[T; N]` with `N` a power of two so index arithmetic
//! reduces to a mask. One slot always stays free to tell "full" from "empty",
//! which leaves `N - 1` usable elements. Pushing into a full buffer overwrites
//! instead of failing: `push_back` drops the front element and `push_front`
//! drops the back element.

use core::fmt;

/// Double-ended circular buffer with `N - 1` live slots.
#[derive(Clone)]
pub struct RingBuffer<T, const N: usize> {
    start: usize,
    end: usize,
    buffer: [T; N],
}

impl<T, const N: usize> RingBuffer<T, N>
where
    T: Copy + Default,
{
    const MASK: usize = {
        assert!(N.is_power_of_two(), "ring buffer size must be a power of two");
        assert!(N >= 2, "ring buffer needs at least two slots");
        N - 1
    };

    /// Creates an empty buffer with every slot set to `T::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: 0,
            end: 0,
            buffer: [T::default(); N],
        }
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.wrapping_sub(self.start) & Self::MASK
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == Self::MASK
    }

    /// Maximum number of live elements (`N - 1`).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        Self::MASK
    }

    /// Appends at the back, evicting the front element when full.
    pub fn push_back(&mut self, value: T) {
        self.buffer[self.end] = value;
        self.end = (self.end + 1) & Self::MASK;
        if self.end == self.start {
            self.start = (self.start + 1) & Self::MASK;
        }
    }

    /// Prepends at the front, evicting the back element when full.
    pub fn push_front(&mut self, value: T) {
        self.start = self.start.wrapping_sub(1) & Self::MASK;
        if self.start == self.end {
            self.end = self.end.wrapping_sub(1) & Self::MASK;
        }
        self.buffer[self.start] = value;
    }

    /// Removes the back element. An empty buffer yields `T::default()`.
    pub fn pop_back(&mut self) -> T {
        if self.is_empty() {
            return T::default();
        }
        self.end = self.end.wrapping_sub(1) & Self::MASK;
        self.buffer[self.end]
    }

    /// Removes the front element. An empty buffer yields `T::default()`.
    pub fn pop_front(&mut self) -> T {
        if self.is_empty() {
            return T::default();
        }
        let value = self.buffer[self.start];
        self.start = (self.start + 1) & Self::MASK;
        value
    }

    /// Element at logical index `index`, counted from the front.
    ///
    /// Indices past `len()` wrap into storage and return stale slots rather than
    /// panicking.
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.buffer[self.start.wrapping_add(index) & Self::MASK]
    }

    /// Overwrites the element at logical index `index`.
    pub fn set(&mut self, index: usize, value: T) {
        self.buffer[self.start.wrapping_add(index) & Self::MASK] = value;
    }

    /// Sets every live element to `value`.
    pub fn fill(&mut self, value: T) {
        self.update_each(|_| value);
    }

    /// Replaces every live element with `f(element)`, front to back.
    pub fn update_each<F>(&mut self, mut f: F)
    where
        F: FnMut(T) -> T,
    {
        for index in 0..self.len() {
            let slot = self.start.wrapping_add(index) & Self::MASK;
            self.buffer[slot] = f(self.buffer[slot]);
        }
    }

    /// Iterates live elements front to back.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Drops every element without touching storage.
    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N>
where
    T: Copy + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for RingBuffer<T, N>
where
    T: Copy + Default + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<const N: usize>(buffer: &RingBuffer<i32, N>) -> heapless::Vec<i32, N> {
        buffer.iter().collect()
    }

    #[test]
    fn keeps_push_order_within_capacity() {
        let mut buffer = RingBuffer::<i32, 8>::new();
        assert_eq!(buffer.capacity(), 7);

        for value in 1..=7 {
            buffer.push_back(value);
            assert_eq!(buffer.len(), usize::try_from(value).unwrap());
        }

        assert!(buffer.is_full());
        assert_eq!(contents(&buffer).as_slice(), &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn push_back_at_capacity_evicts_oldest() {
        let mut buffer = RingBuffer::<i32, 4>::new();
        for value in [10, 20, 30] {
            buffer.push_back(value);
        }

        buffer.push_back(40);
        assert_eq!(buffer.len(), 3);
        assert_eq!(contents(&buffer).as_slice(), &[20, 30, 40]);
        assert_eq!(buffer.pop_front(), 20);
    }

    #[test]
    fn push_front_at_capacity_drops_back() {
        let mut buffer = RingBuffer::<i32, 4>::new();
        for value in [1, 2, 3] {
            buffer.push_back(value);
        }

        buffer.push_front(0);
        assert_eq!(contents(&buffer).as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn pops_from_both_ends() {
        let mut buffer = RingBuffer::<i32, 8>::new();
        buffer.push_back(2);
        buffer.push_back(3);
        buffer.push_front(1);

        assert_eq!(buffer.pop_back(), 3);
        assert_eq!(buffer.pop_front(), 1);
        assert_eq!(buffer.pop_front(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn pop_on_empty_returns_default() {
        let mut buffer = RingBuffer::<i32, 4>::new();
        assert_eq!(buffer.pop_back(), 0);
        assert_eq!(buffer.pop_front(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn indexing_wraps_around_storage() {
        let mut buffer = RingBuffer::<i32, 4>::new();
        for value in 0..6 {
            buffer.push_back(value);
        }

        assert_eq!(buffer.get(0), 3);
        assert_eq!(buffer.get(2), 5);

        buffer.set(1, 40);
        assert_eq!(contents(&buffer).as_slice(), &[3, 40, 5]);
    }

    #[test]
    fn bulk_updates_touch_only_live_elements() {
        let mut buffer = RingBuffer::<i32, 8>::new();
        for value in [1, 2, 3] {
            buffer.push_back(value);
        }

        buffer.update_each(|value| value * 10);
        assert_eq!(contents(&buffer).as_slice(), &[10, 20, 30]);

        buffer.fill(-1);
        assert_eq!(contents(&buffer).as_slice(), &[-1, -1, -1]);
        assert_eq!(buffer.get(3), 0);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut buffer = RingBuffer::<u8, 16>::new();
        buffer.push_back(b'x');
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }
}

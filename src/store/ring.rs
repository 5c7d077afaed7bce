//! Fixed-capacity ring buffer with head-index + saturating item count,
//! exposing iterator semantics for chronological reads instead of manual
//! modular arithmetic at call sites (spec.md §9 design note "Ring buffers").

pub struct RingBuffer<T, const N: usize> {
    items: Vec<T>,
    head: usize,
    count: usize,
}

impl<T: Default + Clone, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        RingBuffer {
            items: vec![T::default(); N],
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The slot the next write will land on (or, for a non-empty buffer,
    /// the most recently written slot once `push`/`overwrite_head` returns).
    pub fn head_slot(&self) -> &T {
        &self.items[self.head]
    }

    /// Appends a new entry, advancing the head and saturating the item
    /// count at `N` (spec.md §4.3 `append_short_term`).
    pub fn push(&mut self, value: T) {
        if self.count > 0 {
            self.head = (self.head + 1) % N;
        }
        self.items[self.head] = value;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Overwrites the current head slot in place without advancing,
    /// without changing the item count (spec.md §4.3 `append_long_term`
    /// "overwrite the head in place").
    pub fn overwrite_head(&mut self, value: T) {
        if self.count == 0 {
            self.count = 1;
        }
        self.items[self.head] = value;
    }

    /// Iterates the buffer's contents tail-to-head, i.e. in chronological
    /// order (spec.md §4.3 `snapshot_short_term`/`snapshot_long_term`).
    pub fn iter_chronological(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.count == 0 {
            0
        } else {
            (self.head + N - self.count + 1) % N
        };
        (0..self.count).map(move |i| &self.items[(start + i) % N])
    }

    /// Copies up to `max` chronologically-ordered entries into `out`,
    /// returning the number copied (spec.md's `snapshot_*(out[], max) -> n`
    /// shape, expressed as a `Vec` return here since this is not a
    /// fixed-memory target).
    pub fn snapshot(&self, max: usize) -> Vec<T> {
        self.iter_chronological().take(max).cloned().collect()
    }
}

impl<T: Default + Clone, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_advances_head_and_saturates_count() {
        let mut r: RingBuffer<i32, 3> = RingBuffer::new();
        r.push(1);
        r.push(2);
        r.push(3);
        assert_eq!(r.len(), 3);
        r.push(4);
        assert_eq!(r.len(), 3);
        assert_eq!(r.snapshot(10), vec![2, 3, 4]);
    }

    #[test]
    fn overwrite_head_keeps_count() {
        let mut r: RingBuffer<i32, 3> = RingBuffer::new();
        r.push(1);
        r.push(2);
        assert_eq!(r.len(), 2);
        r.overwrite_head(20);
        assert_eq!(r.len(), 2);
        assert_eq!(r.snapshot(10), vec![1, 20]);
    }

    #[test]
    fn chronological_order_after_wraparound() {
        let mut r: RingBuffer<i32, 2> = RingBuffer::new();
        r.push(1);
        r.push(2);
        r.push(3);
        assert_eq!(r.snapshot(10), vec![2, 3]);
    }

    #[test]
    fn empty_ring_snapshot_is_empty() {
        let r: RingBuffer<i32, 4> = RingBuffer::new();
        assert!(r.snapshot(10).is_empty());
    }
}

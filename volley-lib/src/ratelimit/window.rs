use std::collections::VecDeque;

/// A rolling window that keeps at most `capacity` elements,
/// dropping the oldest element once the capacity is exceeded.
#[derive(Debug, Clone)]
pub(crate) struct Window<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> Window<T> {
    /// Create a new window holding at most `capacity` elements.
    ///
    /// Storage grows with the elements pushed, not with `capacity`.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::new(),
            capacity,
        }
    }

    /// Push an element to the window, removing the oldest if at capacity
    pub(crate) fn push(&mut self, item: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }

    /// The oldest element still in the window
    #[must_use]
    pub(crate) fn oldest(&self) -> Option<&T> {
        self.data.front()
    }

    /// Returns `true` once the window holds `capacity` elements
    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Get an iterator over the elements in the window, oldest first
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_capacity() {
        let mut window = Window::new(3);

        window.push(1);
        window.push(2);
        assert!(!window.is_full());
        window.push(3);
        assert!(window.is_full());

        // Add one more, should remove the oldest
        window.push(4);
        assert_eq!(window.oldest(), Some(&2));

        let values: Vec<_> = window.iter().copied().collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn test_window_allocates_lazily() {
        let mut window = Window::new(usize::MAX);
        assert_eq!(window.data.capacity(), 0);

        window.push(1);
        assert!(!window.is_full());
        assert_eq!(window.oldest(), Some(&1));
    }

    #[test]
    fn test_window_empty() {
        let window: Window<i32> = Window::new(5);
        assert!(!window.is_full());
        assert_eq!(window.oldest(), None);
    }
}

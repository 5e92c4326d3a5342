//! Explicit numbering state threaded through composition.
//!
//! Nothing here is global. Each document owns a [`Counters`] set reset
//! when it is built; composition advances a copy of it, and step lists draw
//! a fresh [`Counter`] per block.

/// A monotonically increasing 1-based counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    value: u32,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the new value. The first call returns 1.
    pub fn next(&mut self) -> u32 {
        self.value += 1;
        self.value
    }

    /// The last value handed out, 0 before the first `next`.
    pub fn current(&self) -> u32 {
        self.value
    }
}

/// The document-scoped counters.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Physical page number, advanced once per page.
    pub page: Counter,
    /// Table-of-contents entry number.
    pub contents: Counter,
    /// Total page count, fixed when the set is created.
    total_pages: u32,
}

impl Counters {
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages: total_pages as u32,
            ..Self::default()
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// A fresh counter for one ordered list block.
    pub fn step_counter(&self) -> Counter {
        Counter::new()
    }

    /// "n / total" for the current page.
    pub fn page_label(&self) -> String {
        format!("{} / {}", self.page.current(), self.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_one() {
        let mut c = Counter::new();
        assert_eq!(c.current(), 0);
        assert_eq!(c.next(), 1);
        assert_eq!(c.next(), 2);
        assert_eq!(c.current(), 2);
    }

    #[test]
    fn step_counters_are_independent() {
        let counters = Counters::new(3);
        let mut a = counters.step_counter();
        a.next();
        a.next();
        let mut b = counters.step_counter();
        assert_eq!(b.next(), 1);
    }

    #[test]
    fn page_label() {
        let mut counters = Counters::new(9);
        counters.page.next();
        counters.page.next();
        assert_eq!(counters.page_label(), "2 / 9");
    }
}

//! Free list of reusable `Vec` buffers.

/// Hands out cleared vectors and takes them back for reuse.
#[derive(Debug)]
pub struct ListPool<T> {
    free: Vec<Vec<T>>,
}

impl<T> Default for ListPool<T> {
    fn default() -> Self {
        Self { free: Vec::new() }
    }
}

impl<T> ListPool<T> {
    /// An empty vector, reusing a returned allocation when one is available.
    pub fn get(&mut self) -> Vec<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Returns `list` to the pool.
    pub fn add(&mut self, mut list: Vec<T>) {
        list.clear();
        self.free.push(list);
    }

    /// Number of buffers waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

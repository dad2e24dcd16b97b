//! Bucketed decrease-key priority queue over small integer priorities.
//!
//! Items are arena indices. The queue stores only the head of each priority
//! bucket; the "next item with the same priority" link lives on the items
//! themselves and is reached through [`FrontierLinks`].

/// Intrusive storage the frontier threads its buckets through.
pub trait FrontierLinks {
    /// Current priority of `item`.
    fn priority(&self, item: usize) -> usize;
    /// Item after `item` in its bucket.
    fn next_with_same_priority(&self, item: usize) -> Option<usize>;
    /// Relinks `item` within its bucket.
    fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>);
}

/// Monotone priority queue with amortized O(1) dequeue when priorities grow
/// slowly.
///
/// Within one priority the most recently enqueued item is dequeued first.
#[derive(Debug, Default)]
pub struct PriorityFrontier {
    buckets: Vec<Option<usize>>,
    count: usize,
    minimum: usize,
}

impl PriorityFrontier {
    /// Empty frontier.
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            count: 0,
            minimum: usize::MAX,
        }
    }

    /// Number of enqueued items.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether nothing is enqueued.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Forgets every item; bucket storage is kept for reuse.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.count = 0;
        self.minimum = usize::MAX;
    }

    /// Inserts `item` at the head of its priority bucket.
    pub fn enqueue<L: FrontierLinks + ?Sized>(&mut self, links: &mut L, item: usize) {
        self.count += 1;
        let priority = links.priority(item);
        self.minimum = self.minimum.min(priority);
        if self.buckets.len() <= priority {
            self.buckets.resize(priority + 1, None);
        }
        links.set_next_with_same_priority(item, self.buckets[priority]);
        self.buckets[priority] = Some(item);
    }

    /// Removes and returns an item with the lowest priority.
    pub fn dequeue<L: FrontierLinks + ?Sized>(&mut self, links: &mut L) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        for priority in self.minimum..self.buckets.len() {
            self.minimum = priority;
            if let Some(item) = self.buckets[priority] {
                self.buckets[priority] = links.next_with_same_priority(item);
                self.count -= 1;
                return Some(item);
            }
        }
        None
    }

    /// Moves `item` out of the `old_priority` bucket and re-enqueues it under
    /// its current priority.
    ///
    /// Does nothing if `item` is not in that bucket.
    pub fn change_priority<L: FrontierLinks + ?Sized>(
        &mut self,
        links: &mut L,
        item: usize,
        old_priority: usize,
    ) {
        let Some(head) = self.buckets.get(old_priority).copied().flatten() else {
            return;
        };

        if head == item {
            self.buckets[old_priority] = links.next_with_same_priority(item);
        } else {
            let mut current = head;
            loop {
                match links.next_with_same_priority(current) {
                    Some(next) if next == item => {
                        let after = links.next_with_same_priority(item);
                        links.set_next_with_same_priority(current, after);
                        break;
                    }
                    Some(next) => current = next,
                    None => return,
                }
            }
        }

        self.count -= 1;
        self.enqueue(links, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain arena of `(priority, next)` pairs.
    struct Items(Vec<(usize, Option<usize>)>);

    impl FrontierLinks for Items {
        fn priority(&self, item: usize) -> usize {
            self.0[item].0
        }
        fn next_with_same_priority(&self, item: usize) -> Option<usize> {
            self.0[item].1
        }
        fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>) {
            self.0[item].1 = next;
        }
    }

    fn items(priorities: &[usize]) -> Items {
        Items(priorities.iter().map(|&p| (p, None)).collect())
    }

    fn drain(frontier: &mut PriorityFrontier, links: &mut Items) -> Vec<usize> {
        std::iter::from_fn(|| frontier.dequeue(links)).collect()
    }

    #[test]
    fn dequeues_in_priority_order() {
        let mut links = items(&[5, 1, 3, 0, 4]);
        let mut frontier = PriorityFrontier::new();
        for i in 0..5 {
            frontier.enqueue(&mut links, i);
        }
        assert_eq!(frontier.len(), 5);
        assert_eq!(drain(&mut frontier, &mut links), vec![3, 1, 2, 4, 0]);
        assert!(frontier.is_empty());
    }

    #[test]
    fn ties_pop_most_recent_first() {
        let mut links = items(&[2, 2, 2]);
        let mut frontier = PriorityFrontier::new();
        for i in 0..3 {
            frontier.enqueue(&mut links, i);
        }
        assert_eq!(drain(&mut frontier, &mut links), vec![2, 1, 0]);
    }

    #[test]
    fn change_priority_moves_head_item() {
        let mut links = items(&[6, 6, 3]);
        let mut frontier = PriorityFrontier::new();
        for i in 0..3 {
            frontier.enqueue(&mut links, i);
        }
        links.0[1].0 = 1;
        frontier.change_priority(&mut links, 1, 6);
        assert_eq!(frontier.len(), 3);
        assert_eq!(drain(&mut frontier, &mut links), vec![1, 2, 0]);
    }

    #[test]
    fn change_priority_moves_inner_item() {
        let mut links = items(&[6, 6, 6]);
        let mut frontier = PriorityFrontier::new();
        for i in 0..3 {
            frontier.enqueue(&mut links, i);
        }
        // Bucket 6 is 2 → 1 → 0.
        links.0[1].0 = 2;
        frontier.change_priority(&mut links, 1, 6);
        assert_eq!(drain(&mut frontier, &mut links), vec![1, 2, 0]);
    }

    #[test]
    fn change_priority_of_missing_item_is_ignored() {
        let mut links = items(&[4, 4]);
        let mut frontier = PriorityFrontier::new();
        frontier.enqueue(&mut links, 0);
        frontier.change_priority(&mut links, 1, 4);
        frontier.change_priority(&mut links, 1, 9);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn enqueue_below_minimum_after_dequeue() {
        let mut links = items(&[3, 5, 1]);
        let mut frontier = PriorityFrontier::new();
        frontier.enqueue(&mut links, 0);
        frontier.enqueue(&mut links, 1);
        assert_eq!(frontier.dequeue(&mut links), Some(0));
        frontier.enqueue(&mut links, 2);
        assert_eq!(drain(&mut frontier, &mut links), vec![2, 1]);
    }

    #[test]
    fn clear_empties_queue() {
        let mut links = items(&[1, 2]);
        let mut frontier = PriorityFrontier::new();
        frontier.enqueue(&mut links, 0);
        frontier.enqueue(&mut links, 1);
        frontier.clear();
        assert!(frontier.is_empty());
        assert_eq!(frontier.dequeue(&mut links), None);
    }
}

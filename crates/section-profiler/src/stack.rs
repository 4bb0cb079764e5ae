use std::borrow::Cow;
use std::collections::HashMap;
use std::thread::ThreadId;
use serde::{Deserialize, Serialize};

/// A section that has been entered but not yet exited
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSection {
    pub name: Cow<'static, str>,
    pub start_time: f64,
}

/// LIFO stack of open sections for one logical call tree
#[derive(Debug, Default)]
pub struct SectionStack {
    entries: Vec<OpenSection>,
}

impl SectionStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, name: Cow<'static, str>, start_time: f64) {
        self.entries.push(OpenSection { name, start_time });
    }

    #[inline]
    pub fn pop(&mut self) -> Option<OpenSection> {
        self.entries.pop()
    }

    #[inline]
    pub fn top(&self) -> Option<&OpenSection> {
        self.entries.last()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenSection> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

/// How open sections are tracked across threads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    /// Every thread nests its sections on its own stack
    #[default]
    PerThread,
    /// One stack shared by all threads; pushes and pops from different
    /// threads interleave into one global order
    Shared,
}

/// The set of section stacks owned by a profiler
#[derive(Debug)]
pub struct StackSet {
    mode: StackMode,
    capacity: usize,
    shared: SectionStack,
    per_thread: HashMap<ThreadId, SectionStack>,
}

impl StackSet {
    pub fn new(mode: StackMode, capacity: usize) -> Self {
        let shared = match mode {
            StackMode::Shared => SectionStack::with_capacity(capacity),
            StackMode::PerThread => SectionStack::default(),
        };
        Self {
            mode,
            capacity,
            shared,
            per_thread: HashMap::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> StackMode {
        self.mode
    }

    /// Stack for `thread`, created on first use
    pub fn stack_mut(&mut self, thread: ThreadId) -> &mut SectionStack {
        match self.mode {
            StackMode::Shared => &mut self.shared,
            StackMode::PerThread => {
                let capacity = self.capacity;
                self.per_thread
                    .entry(thread)
                    .or_insert_with(|| SectionStack::with_capacity(capacity))
            }
        }
    }

    pub fn stack(&self, thread: ThreadId) -> Option<&SectionStack> {
        match self.mode {
            StackMode::Shared => Some(&self.shared),
            StackMode::PerThread => self.per_thread.get(&thread),
        }
    }

    /// Pop the most recent entry for `thread`. Emptied stacks are kept for reuse.
    pub fn pop(&mut self, thread: ThreadId) -> Option<OpenSection> {
        match self.mode {
            StackMode::Shared => self.shared.pop(),
            StackMode::PerThread => self.per_thread.get_mut(&thread)?.pop(),
        }
    }

    /// Threads that own a stack
    #[inline]
    pub fn thread_count(&self) -> usize {
        match self.mode {
            StackMode::Shared => 0,
            StackMode::PerThread => self.per_thread.len(),
        }
    }

    #[inline]
    pub fn depth(&self, thread: ThreadId) -> usize {
        self.stack(thread).map_or(0, SectionStack::depth)
    }

    /// Open sections across every stack
    pub fn total_open(&self) -> usize {
        match self.mode {
            StackMode::Shared => self.shared.depth(),
            StackMode::PerThread => self.per_thread.values().map(SectionStack::depth).sum(),
        }
    }

    pub fn clear(&mut self) {
        self.shared.clear();
        self.per_thread.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = SectionStack::with_capacity(4);
        stack.push("A".into(), 1.0);
        stack.push("B".into(), 2.0);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top().map(|s| s.name.as_ref()), Some("B"));

        let popped = stack.pop().unwrap();
        assert_eq!(popped.name, "B");
        assert_eq!(popped.start_time, 2.0);
        assert_eq!(stack.pop().unwrap().name, "A");
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_per_thread_stacks_are_isolated() {
        let mut set = StackSet::new(StackMode::PerThread, 8);
        let main = thread::current().id();
        let other = thread::spawn(|| thread::current().id()).join().unwrap();

        set.stack_mut(main).push("A".into(), 0.0);
        set.stack_mut(other).push("B".into(), 0.0);
        set.stack_mut(other).push("C".into(), 0.0);

        assert_eq!(set.depth(main), 1);
        assert_eq!(set.depth(other), 2);
        assert_eq!(set.total_open(), 3);

        assert_eq!(set.pop(main).unwrap().name, "A");
        assert_eq!(set.depth(main), 0);
        assert!(set.pop(main).is_none());
        assert_eq!(set.pop(other).unwrap().name, "C");
    }

    #[test]
    fn test_emptied_stack_is_reused() {
        let mut set = StackSet::new(StackMode::PerThread, 16);
        let main = thread::current().id();

        for _ in 0..3 {
            set.stack_mut(main).push("top".into(), 0.0);
            assert_eq!(set.pop(main).unwrap().name, "top");
        }

        assert_eq!(set.thread_count(), 1);
        let stack = set.stack(main).unwrap();
        assert!(stack.is_empty());
        assert!(stack.capacity() >= 16);
        assert_eq!(set.total_open(), 0);

        set.clear();
        assert_eq!(set.thread_count(), 0);
    }

    #[test]
    fn test_shared_stack_interleaves_threads() {
        let mut set = StackSet::new(StackMode::Shared, 8);
        let main = thread::current().id();
        let other = thread::spawn(|| thread::current().id()).join().unwrap();

        set.stack_mut(main).push("A".into(), 0.0);
        set.stack_mut(other).push("B".into(), 0.0);

        assert_eq!(set.depth(main), 2);
        assert_eq!(set.pop(main).unwrap().name, "B");
        assert_eq!(set.total_open(), 1);

        set.clear();
        assert_eq!(set.total_open(), 0);
    }
}

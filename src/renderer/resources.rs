//! Lifecycle accounting for scarce GPU resources.
//!
//! Renderers receive a [`ResourceSink`] at construction instead of touching
//! process-wide counters. Acquisition hands back a lease whose `Drop`
//! reports the release, so teardown is reported on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ResourceSink: Send + Sync {
    fn context_acquired(&self, owner: &str);
    fn context_released(&self, owner: &str);
    fn loop_started(&self, owner: &str);
    fn loop_stopped(&self, owner: &str);
}

impl std::fmt::Debug for dyn ResourceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResourceSink")
    }
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResourceSink for NullSink {
    fn context_acquired(&self, _owner: &str) {}
    fn context_released(&self, _owner: &str) {}
    fn loop_started(&self, _owner: &str) {}
    fn loop_stopped(&self, _owner: &str) {}
}

/// Live and cumulative counters, for diagnostics panels and tests.
#[derive(Debug, Default)]
pub struct CountingSink {
    live_contexts: AtomicUsize,
    live_loops: AtomicUsize,
    contexts_acquired: AtomicUsize,
    loops_started: AtomicUsize,
}

impl CountingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_contexts(&self) -> usize {
        self.live_contexts.load(Ordering::SeqCst)
    }

    pub fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }

    pub fn contexts_acquired(&self) -> usize {
        self.contexts_acquired.load(Ordering::SeqCst)
    }

    pub fn loops_started(&self) -> usize {
        self.loops_started.load(Ordering::SeqCst)
    }
}

fn decrement(counter: &AtomicUsize) -> usize {
    // Saturating so a stray release cannot wrap the counter.
    let prev = counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
        .unwrap_or(0);
    prev.saturating_sub(1)
}

impl ResourceSink for CountingSink {
    fn context_acquired(&self, owner: &str) {
        self.contexts_acquired.fetch_add(1, Ordering::SeqCst);
        let live = self.live_contexts.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(owner, live, "gpu context acquired");
    }

    fn context_released(&self, owner: &str) {
        let live = decrement(&self.live_contexts);
        tracing::trace!(owner, live, "gpu context released");
    }

    fn loop_started(&self, owner: &str) {
        self.loops_started.fetch_add(1, Ordering::SeqCst);
        let live = self.live_loops.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(owner, live, "frame loop started");
    }

    fn loop_stopped(&self, owner: &str) {
        let live = decrement(&self.live_loops);
        tracing::trace!(owner, live, "frame loop stopped");
    }
}

/// A GPU context held for one node. Released on drop.
pub struct ContextLease {
    sink: Arc<dyn ResourceSink>,
    owner: String,
}

impl ContextLease {
    pub fn acquire(sink: Arc<dyn ResourceSink>, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        sink.context_acquired(&owner);
        Self { sink, owner }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn sink(&self) -> &Arc<dyn ResourceSink> {
        &self.sink
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        self.sink.context_released(&self.owner);
    }
}

impl std::fmt::Debug for ContextLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLease").field("owner", &self.owner).finish()
    }
}

/// A running per-frame callback chain. Stopped on drop.
pub struct LoopLease {
    sink: Arc<dyn ResourceSink>,
    owner: String,
}

impl LoopLease {
    pub fn start(sink: Arc<dyn ResourceSink>, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        sink.loop_started(&owner);
        Self { sink, owner }
    }
}

impl Drop for LoopLease {
    fn drop(&mut self) {
        self.sink.loop_stopped(&self.owner);
    }
}

impl std::fmt::Debug for LoopLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopLease").field("owner", &self.owner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leases_release_on_drop() {
        let sink = CountingSink::new();
        {
            let _ctx = ContextLease::acquire(sink.clone(), "a");
            let _loop = LoopLease::start(sink.clone(), "a");
            assert_eq!(sink.live_contexts(), 1);
            assert_eq!(sink.live_loops(), 1);
        }
        assert_eq!(sink.live_contexts(), 0);
        assert_eq!(sink.live_loops(), 0);
        assert_eq!(sink.contexts_acquired(), 1);
    }

    #[test]
    fn release_on_early_return_path() {
        fn fails(sink: Arc<dyn ResourceSink>) -> anyhow::Result<()> {
            let _ctx = ContextLease::acquire(sink, "b");
            anyhow::bail!("setup failed");
        }
        let sink = CountingSink::new();
        assert!(fails(sink.clone()).is_err());
        assert_eq!(sink.live_contexts(), 0);
    }

    #[test]
    fn sinks_are_isolated_between_instances() {
        let a = CountingSink::new();
        let b = CountingSink::new();
        let _lease = ContextLease::acquire(a.clone(), "x");
        assert_eq!(a.live_contexts(), 1);
        assert_eq!(b.live_contexts(), 0);
    }

    #[test]
    fn stray_release_saturates() {
        let sink = CountingSink::default();
        sink.loop_stopped("ghost");
        assert_eq!(sink.live_loops(), 0);
    }
}

//! Thread budget for concurrent searches
//!
//! CPU 核心视为固定预算，在「并发搜索数」与「每个 ffmpeg 子进程线程数」之间分配：
//! `parallel_searches * child_threads <= available_cores`
//!
//! 多实例部署时设置 `SIZE_BOOST_MULTI_INSTANCE` 以减半预算。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Overrides the search pool capacity.
pub const MAX_SEARCHES_ENV: &str = "SIZE_BOOST_MAX_SEARCHES";
/// Marks that several service instances share this machine.
pub const MULTI_INSTANCE_ENV: &str = "SIZE_BOOST_MULTI_INSTANCE";

static MULTI_INSTANCE_MODE: AtomicBool = AtomicBool::new(false);

static DEFAULT_CAPACITY: OnceLock<usize> = OnceLock::new();

/// Which search the budget is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadType {
    /// In-process encodes, short and memory-bound. Favour width.
    Image,
    /// ffmpeg children, long-lived and CPU heavy. Favour depth.
    Animated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAllocation {
    /// Searches allowed to run at once.
    pub parallel_searches: usize,
    /// `-threads` handed to each ffmpeg child.
    pub child_threads: usize,
}

/// Split `total_cores` into search slots and per-child threads.
pub fn balanced_allocation(total_cores: usize, workload: WorkloadType, multi_instance: bool) -> ThreadAllocation {
    // 给系统留 20% (1..=2 核)
    let reserved = ((total_cores as f64 * 0.2).ceil() as usize).clamp(1, 2);
    let mut available = total_cores.saturating_sub(reserved).max(1);
    if multi_instance {
        available = (available / 2).max(1);
    }

    match workload {
        WorkloadType::Image => {
            let child_threads = 1;
            let parallel_searches = available.clamp(1, 8);
            ThreadAllocation {
                parallel_searches,
                child_threads,
            }
        }
        WorkloadType::Animated => {
            let parallel_searches = if available >= 8 { 2 } else { 1 };
            let child_threads = (available / parallel_searches).max(1);
            ThreadAllocation {
                parallel_searches,
                child_threads,
            }
        }
    }
}

pub fn get_balanced_thread_config(workload: WorkloadType) -> ThreadAllocation {
    balanced_allocation(num_cpus::get(), workload, is_multi_instance())
}

/// Default search pool capacity (cached).
///
/// Animated searches dominate cost, so the pool follows the image budget
/// while ffmpeg children take `ffmpeg_threads()` each.
pub fn default_search_capacity() -> usize {
    *DEFAULT_CAPACITY.get_or_init(|| get_balanced_thread_config(WorkloadType::Image).parallel_searches)
}

/// Threads for one ffmpeg invocation.
pub fn ffmpeg_threads() -> usize {
    get_balanced_thread_config(WorkloadType::Animated).child_threads
}

pub fn is_multi_instance() -> bool {
    if std::env::var(MULTI_INSTANCE_ENV).is_ok() {
        return true;
    }
    MULTI_INSTANCE_MODE.load(Ordering::Relaxed)
}

pub fn enable_multi_instance_mode() {
    MULTI_INSTANCE_MODE.store(true, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_budget() {
        // 10 核：保留 2，可用 8
        let alloc = balanced_allocation(10, WorkloadType::Image, false);
        assert_eq!(alloc.parallel_searches, 8);
        assert_eq!(alloc.child_threads, 1);

        let alloc = balanced_allocation(64, WorkloadType::Image, false);
        assert_eq!(alloc.parallel_searches, 8);
    }

    #[test]
    fn test_animated_budget() {
        let alloc = balanced_allocation(10, WorkloadType::Animated, false);
        assert_eq!(alloc.parallel_searches, 2);
        assert_eq!(alloc.child_threads, 4);

        let alloc = balanced_allocation(4, WorkloadType::Animated, false);
        assert_eq!(alloc.parallel_searches, 1);
        assert_eq!(alloc.child_threads, 3);
    }

    #[test]
    fn test_multi_instance_halves_budget() {
        let alloc = balanced_allocation(10, WorkloadType::Image, true);
        assert_eq!(alloc.parallel_searches, 4);
    }

    #[test]
    fn test_single_core_never_zero() {
        for workload in [WorkloadType::Image, WorkloadType::Animated] {
            let alloc = balanced_allocation(1, workload, true);
            assert!(alloc.parallel_searches >= 1);
            assert!(alloc.child_threads >= 1);
        }
    }

    #[test]
    fn test_default_capacity_bounds() {
        let cap = default_search_capacity();
        assert!((1..=8).contains(&cap));
        assert!(ffmpeg_threads() >= 1);
    }
}

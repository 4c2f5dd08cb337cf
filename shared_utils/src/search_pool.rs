//! Fixed-capacity search pool
//!
//! 有界 token 通道：容量 N 个 token，每个搜索持有一个 `SearchPermit`。
//! permit drop 时归还 token。满载时按 `AdmissionPolicy` 排队等待或直接拒绝（`Busy`）。

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Instant;

use crate::config::AdmissionPolicy;
use crate::errors::{CompressError, Result};

#[derive(Debug, Clone)]
pub struct SearchPool {
    take: Receiver<()>,
    give: Sender<()>,
    capacity: usize,
    admission: AdmissionPolicy,
}

impl SearchPool {
    pub fn new(capacity: usize, admission: AdmissionPolicy) -> Self {
        let capacity = capacity.max(1);
        let (give, take) = bounded(capacity);
        for _ in 0..capacity {
            // 容量刚好为 capacity，不会失败
            let _ = give.try_send(());
        }
        Self {
            take,
            give,
            capacity,
            admission,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.take.len()
    }

    pub fn acquire(&self) -> Result<SearchPermit> {
        let started = Instant::now();
        let outcome = match self.admission {
            AdmissionPolicy::Reject => self.take.try_recv().map_err(|e| match e {
                TryRecvError::Empty | TryRecvError::Disconnected => self.busy(),
            }),
            AdmissionPolicy::Queue { timeout } => self.take.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected => self.busy(),
            }),
        };
        outcome?;

        let waited = started.elapsed();
        if waited.as_millis() > 0 {
            tracing::debug!(waited_ms = waited.as_millis() as u64, "Search slot acquired after queueing");
        }
        Ok(SearchPermit {
            give: self.give.clone(),
        })
    }

    fn busy(&self) -> CompressError {
        tracing::warn!(capacity = self.capacity, admission = ?self.admission, "Search pool full, request refused");
        CompressError::Busy {
            capacity: self.capacity,
        }
    }
}

/// Returns its slot to the pool when dropped.
#[derive(Debug)]
pub struct SearchPermit {
    give: Sender<()>,
}

impl Drop for SearchPermit {
    fn drop(&mut self) {
        let _ = self.give.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_reject_when_full() {
        let pool = SearchPool::new(2, AdmissionPolicy::Reject);
        let a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert_eq!(pool.available(), 0);

        let err = pool.acquire().unwrap_err();
        assert_eq!(err.kind(), "busy");
        assert!(!err.is_client_error());

        drop(a);
        assert_eq!(pool.available(), 1);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_queue_times_out() {
        let pool = SearchPool::new(
            1,
            AdmissionPolicy::Queue {
                timeout: Duration::from_millis(20),
            },
        );
        let _held = pool.acquire().unwrap();
        assert!(matches!(pool.acquire(), Err(CompressError::Busy { capacity: 1 })));
    }

    #[test]
    fn test_queue_waits_for_release() {
        let pool = SearchPool::new(
            1,
            AdmissionPolicy::Queue {
                timeout: Duration::from_secs(5),
            },
        );
        let held = pool.acquire().unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            drop(held);
        });
        assert!(pool.acquire().is_ok());
        releaser.join().unwrap();
    }

    #[test]
    fn test_concurrency_never_exceeds_capacity() {
        let pool = SearchPool::new(
            3,
            AdmissionPolicy::Queue {
                timeout: Duration::from_secs(10),
            },
        );
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let pool = pool.clone();
                let running = running.clone();
                let peak = peak.clone();
                std::thread::spawn(move || {
                    let _permit = pool.acquire().unwrap();
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_zero_capacity_bumped() {
        let pool = SearchPool::new(0, AdmissionPolicy::Reject);
        assert_eq!(pool.capacity(), 1);
    }
}

//! QualityBisection - 有界整数质量二分
//!
//! 在 [low, high] 上二分，最多 `budget` 次试探：
//! - `fits` → 往高质量走 `low = mid + 1`
//! - 超出目标 → `high = mid - 1`
//!
//! 区间为空或预算用完时 `next_probe()` 返回 `None`，循环自然结束。

/// ⌈log2(95 − 20)⌉
pub const BINARY_SEARCH_MAX_ITERATIONS: u32 = 7;

/// Hard cap regardless of configuration.
pub const EMERGENCY_MAX_ITERATIONS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityBisection {
    low: u8,
    high: u8,
    budget: u32,
    probes: u32,
    pending: Option<u8>,
}

impl QualityBisection {
    pub fn new(low: u8, high: u8, budget: u32) -> Self {
        Self {
            low,
            high,
            budget: budget.min(EMERGENCY_MAX_ITERATIONS),
            probes: 0,
            pending: None,
        }
    }

    /// Next quality to try, or `None` when the search is over.
    ///
    /// Calling it again before `record` returns the same probe.
    pub fn next_probe(&mut self) -> Option<u8> {
        if let Some(mid) = self.pending {
            return Some(mid);
        }
        if self.low > self.high || self.probes >= self.budget {
            return None;
        }
        let mid = self.low + (self.high - self.low) / 2;
        self.probes += 1;
        self.pending = Some(mid);
        Some(mid)
    }

    /// Feed back whether the pending probe met the target.
    pub fn record(&mut self, fits: bool) {
        let Some(mid) = self.pending.take() else {
            return;
        };
        if fits {
            match mid.checked_add(1) {
                Some(next) => self.low = next,
                None => self.high = 0,
            }
        } else {
            match mid.checked_sub(1) {
                Some(prev) => self.high = prev,
                // mid == 0 且仍超出：区间已无更低质量
                None => self.budget = self.probes,
            }
        }
    }

    pub fn probes(&self) -> u32 {
        self.probes
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.probes)
    }

    /// Current open interval `[low, high]` (may be empty).
    pub fn bounds(&self) -> (u8, u8) {
        (self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the bisection against a threshold: q ≤ `max_fit` fits.
    fn drive(mut b: QualityBisection, max_fit: u8) -> Vec<u8> {
        let mut tried = Vec::new();
        while let Some(q) = b.next_probe() {
            tried.push(q);
            b.record(q <= max_fit);
        }
        tried
    }

    #[test]
    fn test_default_range_sequence() {
        // 所有质量都满足：一路向上
        let tried = drive(QualityBisection::new(20, 95, BINARY_SEARCH_MAX_ITERATIONS), 100);
        assert_eq!(tried, vec![57, 76, 86, 91, 93, 94, 95]);
    }

    #[test]
    fn test_nothing_fits_walks_down() {
        let tried = drive(QualityBisection::new(20, 95, BINARY_SEARCH_MAX_ITERATIONS), 0);
        assert_eq!(tried, vec![57, 38, 28, 23, 21, 20]);
    }

    #[test]
    fn test_converges_on_threshold() {
        let tried = drive(QualityBisection::new(20, 95, BINARY_SEARCH_MAX_ITERATIONS), 60);
        assert!(tried.contains(&60));
        assert!(tried.len() <= 7);
    }

    #[test]
    fn test_budget_caps_probes() {
        let mut b = QualityBisection::new(20, 95, 3);
        let tried = {
            let mut v = Vec::new();
            while let Some(q) = b.next_probe() {
                v.push(q);
                b.record(true);
            }
            v
        };
        assert_eq!(tried.len(), 3);
        assert_eq!(b.remaining(), 0);
        assert_eq!(b.probes(), 3);
    }

    #[test]
    fn test_emergency_cap() {
        let b = QualityBisection::new(0, 255, 1000);
        assert_eq!(b.remaining(), EMERGENCY_MAX_ITERATIONS);
    }

    #[test]
    fn test_pending_probe_is_stable() {
        let mut b = QualityBisection::new(20, 95, 7);
        assert_eq!(b.next_probe(), Some(57));
        assert_eq!(b.next_probe(), Some(57));
        assert_eq!(b.probes(), 1);
        b.record(false);
        assert_eq!(b.bounds(), (20, 56));
    }

    #[test]
    fn test_zero_quality_edge() {
        let tried = drive(QualityBisection::new(0, 2, 10), 0);
        assert_eq!(tried, vec![1, 0]);

        let tried = drive(QualityBisection::new(0, 0, 10), 100);
        assert_eq!(tried, vec![0]);

        // 0 仍超出 → 立即结束，不下溢
        let mut b = QualityBisection::new(0, 0, 10);
        assert_eq!(b.next_probe(), Some(0));
        b.record(false);
        assert_eq!(b.next_probe(), None);
    }

    #[test]
    fn test_u8_max_edge() {
        let tried = drive(QualityBisection::new(254, 255, 10), 255);
        assert_eq!(tried, vec![254, 255]);
    }
}

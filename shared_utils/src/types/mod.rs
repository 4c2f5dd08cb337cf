//! Type-Safe Wrappers Module
//!
//! 提供类型安全的包装器，将数学假设从注释提升到类型系统层面。
//!
//! ## 模块列表
//! - `file_size`: 文件大小 / 目标大小类型安全包装
//! - `iteration`: 有界质量二分

pub mod file_size;
pub mod iteration;

pub use file_size::{FileSize, SizeTarget};
pub use iteration::QualityBisection;

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// SizeTarget 构造成功 ⇔ 输入为正且至少 1 字节
        #[test]
        fn size_target_validation_property(mb in -10.0f64..10.0f64) {
            let result = SizeTarget::from_megabytes(mb);
            let valid = (mb * FileSize::MB as f64).floor() >= 1.0;
            prop_assert_eq!(result.is_ok(), valid,
                "SizeTarget::from_megabytes({}) should be {}", mb,
                if valid { "valid" } else { "invalid" });
            if let Ok(target) = result {
                prop_assert!(target.bytes() > 0);
            }
        }

        /// fits ⇔ overshoot == 0
        #[test]
        fn fits_matches_overshoot(size in 0u64..u64::MAX / 2, target in 1u64..u64::MAX / 2) {
            let target = SizeTarget::from_bytes(target).unwrap();
            let size = FileSize::new(size);
            prop_assert_eq!(size.fits(target), size.overshoot(target) == 0);
        }

        /// 任意反馈序列下：试探次数 ≤ 预算，且每次试探都在初始区间内
        #[test]
        fn bisection_terminates_within_budget(
            low in 0u8..=100, span in 0u8..=100, budget in 1u32..12,
            answers in proptest::collection::vec(any::<bool>(), 0..40)
        ) {
            let high = low.saturating_add(span);
            let mut bisect = QualityBisection::new(low, high, budget);
            let mut feedback = answers.into_iter();
            let mut probes = 0u32;
            while let Some(q) = bisect.next_probe() {
                prop_assert!(q >= low && q <= high);
                probes += 1;
                prop_assert!(probes <= budget);
                bisect.record(feedback.next().unwrap_or(false));
            }
        }
    }
}

//! Level Curve
//!
//! 레벨 ↔ 누적 경험치 변환
//!
//! ## 핵심 공식
//! xp_to_next(level) = base + linear·l + quadratic·l²,  l = level - 1
//!
//! All sums saturate instead of wrapping.

use crate::config::CurveConfig;

/// Pure level/XP curve bound to a maximum level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCurve {
    curve: CurveConfig,
    max_level: i32,
}

impl LevelCurve {
    pub fn new(curve: CurveConfig, max_level: i32) -> Self {
        Self { curve, max_level: max_level.max(1) }
    }

    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    /// XP needed to go from `level` to `level + 1`; 0 at or above max level.
    pub fn xp_to_next(&self, level: i32) -> i64 {
        if level >= self.max_level {
            return 0;
        }
        let l = i64::from(level.saturating_sub(1).max(0));
        let linear = self.curve.linear.saturating_mul(l);
        let quadratic = self.curve.quadratic.saturating_mul(l.saturating_mul(l));
        self.curve.base.saturating_add(linear).saturating_add(quadratic)
    }

    /// Cumulative XP at which `level` starts. `total_xp_for(1) == 0`.
    pub fn total_xp_for(&self, level: i32) -> i64 {
        let target = level.clamp(1, self.max_level);
        (1..target).fold(0i64, |total, l| total.saturating_add(self.xp_to_next(l)))
    }

    /// Highest level whose cumulative threshold is covered by `total_xp`.
    pub fn level_for(&self, total_xp: i64) -> i32 {
        let mut level = 1;
        let mut remaining = total_xp.max(0);
        while level < self.max_level {
            let step = self.xp_to_next(level);
            if step > remaining {
                break;
            }
            remaining -= step;
            level += 1;
        }
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(max_level: i32) -> LevelCurve {
        LevelCurve::new(CurveConfig::default(), max_level)
    }

    #[test]
    fn test_known_values() {
        let c = curve(25);
        assert_eq!(c.xp_to_next(1), 100);
        assert_eq!(c.xp_to_next(2), 170);
        assert_eq!(c.xp_to_next(3), 280);
        assert_eq!(c.total_xp_for(1), 0);
        assert_eq!(c.total_xp_for(2), 100);
        assert_eq!(c.total_xp_for(3), 270);
    }

    #[test]
    fn test_level_for_thresholds() {
        let c = curve(25);
        assert_eq!(c.level_for(0), 1);
        assert_eq!(c.level_for(99), 1);
        assert_eq!(c.level_for(100), 2);
        assert_eq!(c.level_for(250), 2);
        assert_eq!(c.level_for(269), 2);
        assert_eq!(c.level_for(270), 3);
        assert_eq!(c.level_for(-50), 1);
    }

    #[test]
    fn test_round_trip_all_levels() {
        let c = curve(25);
        for level in 1..=25 {
            assert_eq!(c.level_for(c.total_xp_for(level)), level, "level {}", level);
        }
    }

    #[test]
    fn test_max_level_caps_everything() {
        let c = curve(25);
        assert_eq!(c.xp_to_next(25), 0);
        assert_eq!(c.xp_to_next(40), 0);
        assert_eq!(c.total_xp_for(40), c.total_xp_for(25));
        assert_eq!(c.level_for(i64::MAX), 25);
        assert_eq!(c.total_xp_for(0), 0);
    }

    #[test]
    fn test_lower_max_level_lowers_derived_level() {
        let high = curve(25);
        let low = curve(3);
        let xp = high.total_xp_for(10);
        assert_eq!(high.level_for(xp), 10);
        assert_eq!(low.level_for(xp), 3);
    }

    #[test]
    fn test_single_level_curve() {
        let c = curve(1);
        assert_eq!(c.xp_to_next(1), 0);
        assert_eq!(c.level_for(1_000_000), 1);
        assert_eq!(c.total_xp_for(5), 0);
    }

    #[test]
    fn test_strictly_increasing_below_max() {
        let c = curve(25);
        for level in 1..24 {
            assert!(c.xp_to_next(level + 1) > c.xp_to_next(level));
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: level_for is monotonic in XP
            #[test]
            fn prop_level_for_monotonic(a in 0i64..5_000_000, b in 0i64..5_000_000) {
                let c = curve(60);
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(c.level_for(lo) <= c.level_for(hi));
            }

            /// Property: derived level brackets the XP
            #[test]
            fn prop_level_brackets_xp(xp in 0i64..5_000_000, max_level in 1i32..80) {
                let c = curve(max_level);
                let level = c.level_for(xp);
                prop_assert!(level >= 1 && level <= max_level);
                prop_assert!(c.total_xp_for(level) <= xp);
                if level < max_level {
                    prop_assert!(xp < c.total_xp_for(level + 1));
                }
            }

            /// Property: xp_to_next is non-decreasing up to max level
            #[test]
            fn prop_xp_to_next_non_decreasing(level in 1i32..200, max_level in 1i32..200) {
                let c = curve(max_level);
                if level + 1 < max_level {
                    prop_assert!(c.xp_to_next(level + 1) >= c.xp_to_next(level));
                } else if level >= max_level {
                    prop_assert_eq!(c.xp_to_next(level), 0);
                }
            }
        }
    }
}

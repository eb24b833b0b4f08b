//! XP Award
//!
//! 처치한 상대의 최대 체력 → 경험치
//!
//! ## 핵심 공식
//! XP = round(max_health × xp_multiplier × boss_bonus), clamped to [min, max]

use crate::config::ProgressionConfig;

/// XP for defeating an opponent with `max_health`.
///
/// Opponents with no health (or a non-finite value) award nothing.
pub fn experience_award(max_health: f64, config: &ProgressionConfig) -> i64 {
    if !max_health.is_finite() || max_health <= 0.0 {
        return 0;
    }

    let award = &config.award;
    let mut raw = max_health * config.xp_multiplier;
    if max_health >= award.boss_health_threshold {
        raw *= award.boss_multiplier;
    }

    let clamped = raw.round().clamp(award.min_award as f64, award.max_award as f64);
    clamped as i64
}

//! Progression System
//!
//! ## 모듈 구조
//! - `level_curve`: 레벨 ↔ 누적 XP
//! - `attributes`: 6개 능력치 식별자
//! - `ledger`: XP/레벨/스탯 포인트 기록 (persisted record)
//! - `ability`: 능력 포인트 경제
//! - `xp_award`: 처치 보상 XP
//! - `party`: 파티 XP 분배 인터페이스
//!
//! ## 사용 흐름
//! 1. 상대 처치 → `experience_award()`
//! 2. 파티면 `PartyDistributor::distribute()`
//! 3. 수령자마다 `ProgressionLedger::grant_xp()` (resync 자동)

pub mod ability;
pub mod attributes;
pub mod ledger;
pub mod level_curve;
pub mod party;
pub mod xp_award;

pub use attributes::{Attribute, UnknownAttribute};
pub use ledger::{ProgressionLedger, ProgressionSnapshot, ResyncReport};
pub use level_curve::LevelCurve;
pub use party::{within_contract, EqualShareDistributor, PartyDistributor, PartyMember, Share};
pub use xp_award::experience_award;

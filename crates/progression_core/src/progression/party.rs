//! Party XP distribution
//!
//! How one award is split between recipients is host policy. The ledger only
//! needs the contract: every share is non-negative and the shares sum to at
//! most `award × bonus_factor(party_size)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    pub actor_id: String,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub actor_id: String,
    pub xp: i64,
}

pub trait PartyDistributor {
    /// Upper bound on `Σ shares / award` for a party of `party_size`.
    fn bonus_factor(&self, party_size: usize) -> f64;

    fn distribute(&self, award: i64, recipients: &[PartyMember]) -> Vec<Share>;
}

/// Checks a distribution against the distributor's contract.
pub fn within_contract<D: PartyDistributor + ?Sized>(
    distributor: &D,
    award: i64,
    recipients: &[PartyMember],
    shares: &[Share],
) -> bool {
    if shares.iter().any(|s| s.xp < 0) {
        return false;
    }
    let total = shares.iter().fold(0i64, |acc, s| acc.saturating_add(s.xp));
    let cap = award.max(0) as f64 * distributor.bonus_factor(recipients.len());
    total as f64 <= cap
}

/// Equal split of a pool that grows with party size.
///
/// pool = award × (1 + bonus_per_extra_member × (n - 1)), floor-divided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualShareDistributor {
    pub bonus_per_extra_member: f64,
}

impl Default for EqualShareDistributor {
    fn default() -> Self {
        Self { bonus_per_extra_member: 0.1 }
    }
}

impl PartyDistributor for EqualShareDistributor {
    fn bonus_factor(&self, party_size: usize) -> f64 {
        let extra = party_size.saturating_sub(1) as f64;
        1.0 + self.bonus_per_extra_member.max(0.0) * extra
    }

    fn distribute(&self, award: i64, recipients: &[PartyMember]) -> Vec<Share> {
        if recipients.is_empty() || award <= 0 {
            return recipients
                .iter()
                .map(|m| Share { actor_id: m.actor_id.clone(), xp: 0 })
                .collect();
        }

        let pool = (award as f64 * self.bonus_factor(recipients.len())).floor() as i64;
        let each = pool / recipients.len() as i64;
        recipients.iter().map(|m| Share { actor_id: m.actor_id.clone(), xp: each }).collect()
    }
}

//! Score-based reward tiers
//!
//! The game only decides *whether* a finished run earned a reward and how
//! much. Claiming it (wallet, chain calls) belongs to an external service
//! that may never be present.

/// (minimum score, reward amount), ascending by score
pub const REWARD_THRESHOLDS: [(u64, u32); 4] = [(1500, 100), (2500, 200), (3500, 500), (5000, 1000)];

/// A reward earned by a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTier {
    /// 1-based tier index (1 = lowest)
    pub tier: u8,
    pub min_score: u64,
    pub amount: u32,
}

/// Highest tier the score reaches, if any
pub fn reward_for_score(score: u64) -> Option<RewardTier> {
    REWARD_THRESHOLDS
        .iter()
        .enumerate()
        .rev()
        .find(|(_, (min, _))| score >= *min)
        .map(|(i, &(min_score, amount))| RewardTier {
            tier: i as u8 + 1,
            min_score,
            amount,
        })
}

/// Amount earned for a score (0 when below every threshold)
pub fn reward_amount(score: u64) -> u32 {
    reward_for_score(score).map(|t| t.amount).unwrap_or(0)
}

/// External reward collaborator
///
/// Called once per completed run that reached a tier. Implementations must
/// return immediately; any network work happens on their side.
pub trait RewardService {
    fn offer_reward(&mut self, final_score: u64, tier: RewardTier);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_first_threshold() {
        assert_eq!(reward_for_score(0), None);
        assert_eq!(reward_for_score(1499), None);
        assert_eq!(reward_amount(1499), 0);
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(reward_amount(1500), 100);
        assert_eq!(reward_amount(2499), 100);
        assert_eq!(reward_amount(2500), 200);
        assert_eq!(reward_amount(3500), 500);
        assert_eq!(reward_amount(4999), 500);
        assert_eq!(reward_amount(5000), 1000);
    }

    #[test]
    fn test_top_tier() {
        let tier = reward_for_score(5200).unwrap();
        assert_eq!(tier.amount, 1000);
        assert_eq!(tier.tier, 4);
        assert_eq!(tier.min_score, 5000);
    }
}

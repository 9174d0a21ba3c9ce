//! Time remaining until an auction closes

use crate::accounts::AuctionData;

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_MINUTE: i64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn from_secs(total: i64) -> Self {
        if total <= 0 {
            return Self::default();
        }
        Self {
            days: total / SECS_PER_DAY,
            hours: (total % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (total % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: total % SECS_PER_MINUTE,
        }
    }

    /// Ended or never scheduled
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn total_secs(&self) -> i64 {
        self.days * SECS_PER_DAY + self.hours * SECS_PER_HOUR + self.minutes * SECS_PER_MINUTE + self.seconds
    }
}

/// Countdown at unix time `now`
///
/// A bid inside the gap window pushes the end to `last_bid + gap` when that
/// is later than `ended_at`.
pub fn time_to_auction_end(auction: &AuctionData, now: i64) -> Countdown {
    let mut end_at = auction.ended_at.unwrap_or(0);
    if let (Some(gap), Some(last_bid)) = (auction.end_auction_gap, auction.last_bid) {
        end_at = end_at.max(last_bid.saturating_add(gap));
    }
    if end_at == 0 {
        return Countdown::default();
    }
    Countdown::from_secs(end_at.saturating_sub(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::testing;

    #[test]
    fn test_breakdown() {
        let mut auction = testing::auction_record(Vec::new(), 1);
        let now = 1_000_000;
        auction.ended_at = Some(now + 2 * SECS_PER_DAY + 3 * SECS_PER_HOUR + 4 * SECS_PER_MINUTE + 5);
        let countdown = time_to_auction_end(&auction, now);
        assert_eq!(countdown, Countdown { days: 2, hours: 3, minutes: 4, seconds: 5 });
        assert_eq!(countdown.total_secs(), auction.ended_at.unwrap() - now);
    }

    #[test]
    fn test_unset_and_past_end_are_zero() {
        let mut auction = testing::auction_record(Vec::new(), 1);
        assert!(time_to_auction_end(&auction, 500).is_zero());
        auction.ended_at = Some(100);
        assert!(time_to_auction_end(&auction, 500).is_zero());
    }

    #[test]
    fn test_gap_extends_end() {
        let mut auction = testing::auction_record(Vec::new(), 1);
        auction.ended_at = Some(1_000);
        auction.end_auction_gap = Some(600);
        auction.last_bid = Some(900);
        // last bid + gap = 1500
        assert_eq!(time_to_auction_end(&auction, 1_200).total_secs(), 300);
        assert!(!auction.ended(1_200));
    }
}

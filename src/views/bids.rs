//! Bid ranking

use std::cmp::Ordering;

use solana_sdk::pubkey::Pubkey;

use crate::accounts::{AuctionData, BidderMetadata};
use crate::state::{MetaState, Parsed};

fn rank(a: &BidderMetadata, b: &BidderMetadata) -> Ordering {
    // higher amount first; the earlier bid wins a tie
    b.last_bid
        .cmp(&a.last_bid)
        .then(a.last_bid_timestamp.cmp(&b.last_bid_timestamp))
}

/// Bids on `auction`, best first
///
/// Cancelled bids stay in the list for activity views.
pub fn get_auction_bids(bidders: &[Parsed<BidderMetadata>], auction: &Pubkey) -> Vec<Parsed<BidderMetadata>> {
    let mut bids: Vec<Parsed<BidderMetadata>> =
        bidders.iter().filter(|b| b.info.auction_pubkey == *auction).cloned().collect();
    bids.sort_by(|a, b| rank(&a.info, &b.info));
    bids
}

/// Same as [`get_auction_bids`] over the bidders indexed for `auction`
pub fn bids_for_auction(state: &MetaState, auction: &Pubkey) -> Vec<Parsed<BidderMetadata>> {
    get_auction_bids(&state.bidders_for_auction(auction), auction)
}

/// Best uncancelled bid of a ranked list
pub fn get_highest_bid(bids: &[Parsed<BidderMetadata>]) -> Option<&Parsed<BidderMetadata>> {
    bids.iter().filter(|b| !b.info.cancelled).min_by(|a, b| rank(&a.info, &b.info))
}

pub fn winning_bidder_index(auction: &AuctionData, bidder: &Pubkey) -> Option<usize> {
    auction.winner_index(bidder)
}

pub fn is_bidder_a_winner(auction: &AuctionData, bidder: &BidderMetadata) -> bool {
    !bidder.cancelled && auction.winner_index(&bidder.bidder_pubkey).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::auction::Bid;
    use crate::accounts::testing;
    use crate::accounts::ParsedAccount;
    use std::sync::Arc;

    fn bid(auction: Pubkey, amount: u64, timestamp: i64, cancelled: bool) -> Parsed<BidderMetadata> {
        Arc::new(ParsedAccount::new(
            Pubkey::new_unique(),
            BidderMetadata {
                bidder_pubkey: Pubkey::new_unique(),
                auction_pubkey: auction,
                last_bid: amount,
                last_bid_timestamp: timestamp,
                cancelled,
            },
        ))
    }

    #[test]
    fn test_equal_amounts_rank_earlier_first() {
        let auction = Pubkey::new_unique();
        let late = bid(auction, 10, 5, false);
        let early = bid(auction, 10, 3, false);
        let bids = get_auction_bids(&[late.clone(), early.clone()], &auction);
        assert_eq!(bids[0].pubkey, early.pubkey);
        assert_eq!(bids[1].pubkey, late.pubkey);
    }

    #[test]
    fn test_filters_other_auctions_and_sorts_by_amount() {
        let auction = Pubkey::new_unique();
        let bidders = vec![
            bid(auction, 5, 1, false),
            bid(Pubkey::new_unique(), 100, 1, false),
            bid(auction, 20, 9, false),
            bid(auction, 7, 2, true),
        ];
        let amounts: Vec<u64> = get_auction_bids(&bidders, &auction).iter().map(|b| b.info.last_bid).collect();
        assert_eq!(amounts, vec![20, 7, 5]);
    }

    #[test]
    fn test_highest_bid_skips_cancelled() {
        let auction = Pubkey::new_unique();
        let cancelled = bid(auction, 50, 1, true);
        let live = bid(auction, 40, 2, false);
        let bids = get_auction_bids(&[cancelled.clone(), live.clone()], &auction);
        assert_eq!(get_highest_bid(&bids).unwrap().pubkey, live.pubkey);
        assert!(get_highest_bid(&[cancelled]).is_none());
        assert!(get_highest_bid(&[]).is_none());
    }

    #[test]
    fn test_winner_checks() {
        let winner = Pubkey::new_unique();
        let loser = Pubkey::new_unique();
        let auction = testing::auction_record(
            vec![Bid { bidder: loser, amount: 1 }, Bid { bidder: winner, amount: 2 }],
            1,
        );
        assert_eq!(winning_bidder_index(&auction, &winner), Some(0));
        assert_eq!(winning_bidder_index(&auction, &loser), None);

        let mut metadata = BidderMetadata {
            bidder_pubkey: winner,
            auction_pubkey: Pubkey::new_unique(),
            last_bid: 2,
            last_bid_timestamp: 0,
            cancelled: false,
        };
        assert!(is_bidder_a_winner(&auction, &metadata));
        metadata.cancelled = true;
        assert!(!is_bidder_a_winner(&auction, &metadata));
    }
}

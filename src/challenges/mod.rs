/**
 * Challenges and Polls
 *
 * The skill-based voting game: a challenger stakes an entry fee on a
 * category, a second user is matched in, voters pick a side, and the winner
 * takes a fixed bonus. "Challenge" and "poll" are one entity discriminated
 * by `kind`; they differ only in route prefix and win bonus.
 *
 * Matchmaking, voting, and finalizing are all single atomic conditional
 * writes so concurrent requests cannot double-pair, double-vote, or
 * double-award (see `db`).
 */

pub mod db;
pub mod handlers;

use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry fee staked on creation (and again on match by both sides)
pub const ENTRY_FEE: i32 = 10;

/// Max entries a challenger may create per kind since local midnight
pub const DAILY_CREATION_LIMIT: i64 = 3;

/// Max verse points a user can earn from voting per day
pub const DAILY_VOTE_POINT_CAP: i32 = 10;

/// How long a pending entry stays matchable
pub const MATCH_WINDOW_HOURS: i64 = 24;

/// The two entity flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Challenge,
    Poll,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Poll => "poll",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "challenge" => Some(Self::Challenge),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }

    /// Fixed bonus awarded to the winning side on finalize
    pub fn win_bonus(&self) -> i32 {
        match self {
            Self::Challenge => 20,
            Self::Poll => 10,
        }
    }
}

/// Lifecycle status; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Waiting for an opponent
    Pending,
    /// Matched, waiting for the opponent's submission
    Open,
    /// Both submissions in, voting allowed
    Closed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Which side a vote backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteSide {
    Challenger,
    /// "challenged" accepted as an alias for older clients
    #[serde(alias = "challenged")]
    Opponent,
}

impl VoteSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Challenger => "challenger",
            Self::Opponent => "opponent",
        }
    }
}

/// Winner of a closed entry: the side with strictly more votes, or no one
/// on a tie.
pub fn decide_winner(votes_challenger: i64, votes_opponent: i64) -> Option<VoteSide> {
    if votes_challenger > votes_opponent {
        Some(VoteSide::Challenger)
    } else if votes_opponent > votes_challenger {
        Some(VoteSide::Opponent)
    } else {
        None
    }
}

/// Remaining creations for today, counted after the current one is inserted
pub fn attempts_left(used_before: i64) -> i64 {
    DAILY_CREATION_LIMIT - used_before - 1
}

/// Local midnight, as the UTC instant daily counters compare against
pub fn start_of_local_day() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    today
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_winner() {
        assert_eq!(decide_winner(3, 1), Some(VoteSide::Challenger));
        assert_eq!(decide_winner(0, 2), Some(VoteSide::Opponent));
        assert_eq!(decide_winner(2, 2), None);
        assert_eq!(decide_winner(0, 0), None);
    }

    #[test]
    fn test_attempts_left_post_insertion() {
        // First creation of the day leaves two more
        assert_eq!(attempts_left(0), 2);
        assert_eq!(attempts_left(2), 0);
    }

    #[test]
    fn test_win_bonus_by_kind() {
        assert_eq!(ChallengeKind::Challenge.win_bonus(), 20);
        assert_eq!(ChallengeKind::Poll.win_bonus(), 10);
    }

    #[test]
    fn test_kind_and_status_strings_roundtrip() {
        for kind in [ChallengeKind::Challenge, ChallengeKind::Poll] {
            assert_eq!(ChallengeKind::from_str(kind.as_str()), Some(kind));
        }
        for status in [
            ChallengeStatus::Pending,
            ChallengeStatus::Open,
            ChallengeStatus::Closed,
        ] {
            assert_eq!(ChallengeStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ChallengeKind::from_str("tournament"), None);
    }

    #[test]
    fn test_vote_side_accepts_legacy_alias() {
        let side: VoteSide = serde_json::from_str(r#""challenged""#).unwrap();
        assert_eq!(side, VoteSide::Opponent);
        let side: VoteSide = serde_json::from_str(r#""opponent""#).unwrap();
        assert_eq!(side, VoteSide::Opponent);
    }

    #[test]
    fn test_start_of_local_day_is_not_in_the_future() {
        assert!(start_of_local_day() <= Utc::now());
    }
}

/**
 * Challenge Database Operations
 *
 * Every invariant here is enforced by one atomic conditional write:
 *
 * - matchmaking claims a pending entry with `UPDATE ... WHERE id = (SELECT
 *   ... FOR UPDATE SKIP LOCKED)`, so two concurrent creates can never pair
 *   with the same waiting entry;
 * - fee movements are guarded by `verse_points >= fee`, so a balance can
 *   never go negative;
 * - votes are a guarded `INSERT ... SELECT` with the one-vote-per-voter
 *   uniqueness on the primary key and both participant exclusions spelled
 *   out;
 * - finalizing flips the `finalized` latch with `WHERE finalized = FALSE`,
 *   so the bonus is awarded at most once.
 *
 * Multi-row mutations (match + two fees, latch + award, delete + refund)
 * run inside a transaction.
 */

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::challenges::{
    decide_winner, start_of_local_day, ChallengeKind, ChallengeStatus, VoteSide,
    DAILY_VOTE_POINT_CAP, ENTRY_FEE, MATCH_WINDOW_HOURS,
};

/// Participant reference with the fields the client renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: String,
    pub verse_points: i32,
}

/// Challenge payload returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub id: Uuid,
    pub kind: ChallengeKind,
    pub category: String,
    pub challenger: ParticipantSummary,
    pub opponent: Option<ParticipantSummary>,
    pub challenger_submission: String,
    pub opponent_submission: String,
    pub status: ChallengeStatus,
    pub finalized: bool,
    pub votes_challenger: i64,
    pub votes_opponent: i64,
    /// Whether the viewer has already voted on this entry
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shared SELECT: participants populated, vote tallies, and the viewer's
/// has-voted flag. Every query built on this binds the viewer as `$1`.
const CHALLENGE_SELECT: &str = r#"
    SELECT c.id, c.kind, c.category, c.challenger_submission, c.opponent_submission,
           c.status, c.finalized, c.created_at, c.updated_at,
           ch.id AS challenger_id, ch.username AS challenger_username,
           ch.profile_pic AS challenger_profile_pic, ch.verse_points AS challenger_points,
           op.id AS opponent_user_id, op.username AS opponent_username,
           op.profile_pic AS opponent_profile_pic, op.verse_points AS opponent_points,
           (SELECT COUNT(*) FROM challenge_votes v
             WHERE v.challenge_id = c.id AND v.side = 'challenger') AS votes_challenger,
           (SELECT COUNT(*) FROM challenge_votes v
             WHERE v.challenge_id = c.id AND v.side = 'opponent') AS votes_opponent,
           EXISTS (SELECT 1 FROM challenge_votes v
                    WHERE v.challenge_id = c.id AND v.voter_id = $1) AS has_voted
    FROM challenges c
    JOIN users ch ON ch.id = c.challenger_id
    LEFT JOIN users op ON op.id = c.opponent_id
"#;

fn row_to_challenge(row: sqlx::postgres::PgRow) -> ChallengeResponse {
    let opponent = row
        .get::<Option<Uuid>, _>("opponent_user_id")
        .map(|id| ParticipantSummary {
            id,
            username: row.get("opponent_username"),
            profile_pic: row.get("opponent_profile_pic"),
            verse_points: row.get("opponent_points"),
        });

    ChallengeResponse {
        id: row.get("id"),
        kind: ChallengeKind::from_str(row.get::<String, _>("kind").as_str())
            .unwrap_or(ChallengeKind::Challenge),
        category: row.get("category"),
        challenger: ParticipantSummary {
            id: row.get("challenger_id"),
            username: row.get("challenger_username"),
            profile_pic: row.get("challenger_profile_pic"),
            verse_points: row.get("challenger_points"),
        },
        opponent,
        challenger_submission: row.get("challenger_submission"),
        opponent_submission: row.get("opponent_submission"),
        status: ChallengeStatus::from_str(row.get::<String, _>("status").as_str())
            .unwrap_or(ChallengeStatus::Pending),
        finalized: row.get("finalized"),
        votes_challenger: row.get("votes_challenger"),
        votes_opponent: row.get("votes_opponent"),
        has_voted: row.get("has_voted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Load one challenge with the viewer's has-voted annotation
pub async fn get_by_id(
    pool: &PgPool,
    id: Uuid,
    viewer: Uuid,
) -> Result<Option<ChallengeResponse>, sqlx::Error> {
    let row = sqlx::query(&format!("{} WHERE c.id = $2", CHALLENGE_SELECT))
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(row_to_challenge))
}

/// Entries matched within the last 24 hours (anyone's), newest first
pub async fn list_active(
    pool: &PgPool,
    kind: ChallengeKind,
    viewer: Uuid,
) -> Result<Vec<ChallengeResponse>, sqlx::Error> {
    let since = Utc::now() - Duration::hours(MATCH_WINDOW_HOURS);
    let rows = sqlx::query(&format!(
        r#"
        {}
        WHERE c.kind = $2 AND c.status IN ('open', 'closed') AND c.created_at >= $3
        ORDER BY c.created_at DESC
        "#,
        CHALLENGE_SELECT
    ))
    .bind(viewer)
    .bind(kind.as_str())
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_challenge).collect())
}

/// Waiting entries, newest first
pub async fn list_pending(
    pool: &PgPool,
    kind: ChallengeKind,
    viewer: Uuid,
) -> Result<Vec<ChallengeResponse>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        {}
        WHERE c.kind = $2 AND c.status = 'pending'
        ORDER BY c.created_at DESC
        "#,
        CHALLENGE_SELECT
    ))
    .bind(viewer)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_challenge).collect())
}

/// The viewer's whole history (either side), newest first
pub async fn list_past(
    pool: &PgPool,
    kind: ChallengeKind,
    viewer: Uuid,
) -> Result<Vec<ChallengeResponse>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        {}
        WHERE c.kind = $2 AND (c.challenger_id = $1 OR c.opponent_id = $1)
        ORDER BY c.created_at DESC
        "#,
        CHALLENGE_SELECT
    ))
    .bind(viewer)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_challenge).collect())
}

/// Entries the user created since local midnight (daily limit input)
pub async fn count_created_since(
    pool: &PgPool,
    challenger: Uuid,
    kind: ChallengeKind,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM challenges
        WHERE challenger_id = $1 AND kind = $2 AND created_at >= $3
        "#,
    )
    .bind(challenger)
    .bind(kind.as_str())
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

/// Result of a create call
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Claimed a waiting entry; caller is now the opponent
    Matched(Uuid),
    /// No claimable entry; a new pending one was created
    Created(Uuid),
    /// The caller could not cover the entry fee
    InsufficientFunds,
}

/// Create a new entry or match a waiting one.
///
/// First tries to claim the oldest matchable pending entry (same kind and
/// category, younger than 24h, not the caller's own, challenger still able
/// to cover the fee). On a claim, both fees are deducted in the claiming
/// transaction. Otherwise the caller pays the fee and a new pending entry
/// is inserted.
pub async fn create_or_match(
    pool: &PgPool,
    kind: ChallengeKind,
    category: &str,
    challenger: Uuid,
    submission: Option<&str>,
) -> Result<CreateOutcome, sqlx::Error> {
    match try_match(pool, kind, category, challenger, submission).await? {
        MatchAttempt::Matched(id) => Ok(CreateOutcome::Matched(id)),
        MatchAttempt::CallerBroke => Ok(CreateOutcome::InsufficientFunds),
        MatchAttempt::NoEntry => create_pending(pool, kind, category, challenger, submission).await,
    }
}

enum MatchAttempt {
    Matched(Uuid),
    NoEntry,
    CallerBroke,
}

async fn try_match(
    pool: &PgPool,
    kind: ChallengeKind,
    category: &str,
    me: Uuid,
    submission: Option<&str>,
) -> Result<MatchAttempt, sqlx::Error> {
    let now = Utc::now();
    let since = now - Duration::hours(MATCH_WINDOW_HOURS);
    // Joining with a submission in hand closes the entry immediately
    let next_status = if submission.is_some() { "closed" } else { "open" };

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE challenges
        SET opponent_id = $1,
            opponent_submission = COALESCE($2, ''),
            status = $3,
            updated_at = $4
        WHERE id = (
            SELECT c.id
            FROM challenges c
            WHERE c.kind = $5
              AND c.category = $6
              AND c.status = 'pending'
              AND c.challenger_id <> $1
              AND c.created_at >= $7
              AND EXISTS (
                  SELECT 1 FROM users u
                  WHERE u.id = c.challenger_id AND u.verse_points >= $8
              )
            ORDER BY c.created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, challenger_id
        "#,
    )
    .bind(me)
    .bind(submission)
    .bind(next_status)
    .bind(now)
    .bind(kind.as_str())
    .bind(category)
    .bind(since)
    .bind(ENTRY_FEE)
    .fetch_optional(&mut *tx)
    .await?;

    let (challenge_id, waiting_challenger): (Uuid, Uuid) = match claimed {
        Some(row) => (row.get("id"), row.get("challenger_id")),
        None => return Ok(MatchAttempt::NoEntry),
    };

    // Both participants stake the fee on a match
    let caller_paid = deduct_fee(&mut tx, me).await?;
    if !caller_paid {
        // Dropping the transaction rolls the claim back
        return Ok(MatchAttempt::CallerBroke);
    }

    let challenger_paid = deduct_fee(&mut tx, waiting_challenger).await?;
    if !challenger_paid {
        // The waiting challenger spent their balance since the EXISTS check;
        // leave their entry alone and fall back to creating a new one.
        return Ok(MatchAttempt::NoEntry);
    }

    tx.commit().await?;
    tracing::info!(
        "Matched {} entry {} (opponent {})",
        kind.as_str(),
        challenge_id,
        me
    );
    Ok(MatchAttempt::Matched(challenge_id))
}

async fn create_pending(
    pool: &PgPool,
    kind: ChallengeKind,
    category: &str,
    challenger: Uuid,
    submission: Option<&str>,
) -> Result<CreateOutcome, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    if !deduct_fee(&mut tx, challenger).await? {
        return Ok(CreateOutcome::InsufficientFunds);
    }

    sqlx::query(
        r#"
        INSERT INTO challenges
            (id, kind, category, challenger_id, challenger_submission, status, finalized,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', FALSE, $6, $6)
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(category)
    .bind(challenger)
    .bind(submission.unwrap_or(""))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!("Created pending {} entry {} by {}", kind.as_str(), id, challenger);
    Ok(CreateOutcome::Created(id))
}

/// Deduct the entry fee, refusing to overdraw. Returns whether a row changed.
async fn deduct_fee(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET verse_points = verse_points - $1, updated_at = $2
        WHERE id = $3 AND verse_points >= $1
        "#,
    )
    .bind(ENTRY_FEE)
    .bind(Utc::now())
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Result of an opponent submission
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Updated(Uuid),
    NotFound,
    NotAllowed,
}

/// Attach the opponent's submission and close the entry for voting.
/// Only the recorded opponent may do this, and only before the entry closed.
pub async fn submit_opponent(
    pool: &PgPool,
    challenge_id: Uuid,
    me: Uuid,
    submission: &str,
) -> Result<SubmitOutcome, sqlx::Error> {
    let updated = sqlx::query(
        r#"
        UPDATE challenges
        SET opponent_submission = $1, status = 'closed', updated_at = $2
        WHERE id = $3 AND opponent_id = $4 AND status IN ('pending', 'open')
        RETURNING id
        "#,
    )
    .bind(submission)
    .bind(Utc::now())
    .bind(challenge_id)
    .bind(me)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = updated {
        return Ok(SubmitOutcome::Updated(row.get("id")));
    }

    let exists = sqlx::query("SELECT 1 FROM challenges WHERE id = $1")
        .bind(challenge_id)
        .fetch_optional(pool)
        .await?
        .is_some();

    Ok(if exists {
        SubmitOutcome::NotAllowed
    } else {
        SubmitOutcome::NotFound
    })
}

/// Result of a vote
#[derive(Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    NotFound,
    /// Self-vote, duplicate vote, or the entry is not closed for voting
    Rejected,
}

/// Record one vote and award the voter's daily point.
///
/// The insert carries all guards: the entry must be closed, the voter must
/// be neither the challenger nor the opponent (two independent conditions),
/// and the (challenge, voter) primary key rejects duplicates. The point
/// award resets the daily counter at local midnight and stops at the cap,
/// all in one statement.
pub async fn record_vote(
    pool: &PgPool,
    challenge_id: Uuid,
    voter: Uuid,
    side: VoteSide,
) -> Result<VoteOutcome, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO challenge_votes (challenge_id, voter_id, side, created_at)
        SELECT c.id, $2, $3, $4
        FROM challenges c
        WHERE c.id = $1
          AND c.status = 'closed'
          AND c.challenger_id <> $2
          AND (c.opponent_id IS NULL OR c.opponent_id <> $2)
        ON CONFLICT (challenge_id, voter_id) DO NOTHING
        "#,
    )
    .bind(challenge_id)
    .bind(voter)
    .bind(side.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        let exists = sqlx::query("SELECT 1 FROM challenges WHERE id = $1")
            .bind(challenge_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        return Ok(if exists {
            VoteOutcome::Rejected
        } else {
            VoteOutcome::NotFound
        });
    }

    // +1 verse point per vote until the daily cap; the counter restarts at
    // local midnight
    sqlx::query(
        r#"
        WITH current AS (
            SELECT CASE WHEN last_vote_date IS NULL OR last_vote_date < $2
                        THEN 0 ELSE vote_points_earned_today END AS earned
            FROM users WHERE id = $1
        )
        UPDATE users
        SET verse_points = verse_points
                + CASE WHEN current.earned < $3 THEN 1 ELSE 0 END,
            vote_points_earned_today =
                CASE WHEN current.earned < $3 THEN current.earned + 1 ELSE current.earned END,
            last_vote_date = $4,
            updated_at = $4
        FROM current
        WHERE users.id = $1
        "#,
    )
    .bind(voter)
    .bind(start_of_local_day())
    .bind(DAILY_VOTE_POINT_CAP)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(VoteOutcome::Recorded)
}

/// Result of a finalize call
#[derive(Debug, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Latch flipped; the winning user (if any) was awarded the bonus
    Finalized { winner: Option<Uuid> },
    NotFound,
    AlreadyFinalized,
    StillOpen,
}

/// Finalize a closed entry exactly once and award the strict-majority side.
pub async fn finalize(pool: &PgPool, challenge_id: Uuid) -> Result<FinalizeOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let latched = sqlx::query(
        r#"
        UPDATE challenges
        SET finalized = TRUE, updated_at = $2
        WHERE id = $1 AND finalized = FALSE AND status = 'closed'
        RETURNING kind, challenger_id, opponent_id
        "#,
    )
    .bind(challenge_id)
    .bind(Utc::now())
    .fetch_optional(&mut *tx)
    .await?;

    let row = match latched {
        Some(row) => row,
        None => {
            let state = sqlx::query("SELECT status, finalized FROM challenges WHERE id = $1")
                .bind(challenge_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Ok(match state {
                None => FinalizeOutcome::NotFound,
                Some(row) if row.get::<bool, _>("finalized") => FinalizeOutcome::AlreadyFinalized,
                Some(_) => FinalizeOutcome::StillOpen,
            });
        }
    };

    let kind = ChallengeKind::from_str(row.get::<String, _>("kind").as_str())
        .unwrap_or(ChallengeKind::Challenge);
    let challenger_id: Uuid = row.get("challenger_id");
    let opponent_id: Option<Uuid> = row.get("opponent_id");

    let tallies = sqlx::query(
        r#"
        SELECT side, COUNT(*) AS count
        FROM challenge_votes
        WHERE challenge_id = $1
        GROUP BY side
        "#,
    )
    .bind(challenge_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut votes_challenger = 0_i64;
    let mut votes_opponent = 0_i64;
    for row in &tallies {
        match row.get::<String, _>("side").as_str() {
            "challenger" => votes_challenger = row.get("count"),
            _ => votes_opponent = row.get("count"),
        }
    }

    let winner = match decide_winner(votes_challenger, votes_opponent) {
        Some(VoteSide::Challenger) => Some(challenger_id),
        Some(VoteSide::Opponent) => opponent_id,
        None => None,
    };

    if let Some(winner_id) = winner {
        sqlx::query(
            "UPDATE users SET verse_points = verse_points + $1, updated_at = $2 WHERE id = $3",
        )
        .bind(kind.win_bonus())
        .bind(Utc::now())
        .bind(winner_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        "Finalized {} entry {} (winner: {:?})",
        kind.as_str(),
        challenge_id,
        winner
    );
    Ok(FinalizeOutcome::Finalized { winner })
}

/// Cancel the caller's pending entry and refund the fee.
/// Returns `false` when there is nothing to cancel.
pub async fn cancel_pending(
    pool: &PgPool,
    challenger: Uuid,
    kind: ChallengeKind,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        r#"
        DELETE FROM challenges
        WHERE id = (
            SELECT id FROM challenges
            WHERE challenger_id = $1 AND kind = $2 AND status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE
        )
        RETURNING id
        "#,
    )
    .bind(challenger)
    .bind(kind.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    if deleted.is_none() {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE users SET verse_points = verse_points + $1, updated_at = $2 WHERE id = $3",
    )
    .bind(ENTRY_FEE)
    .bind(Utc::now())
    .bind(challenger)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/**
 * Message Model and Database Operations
 *
 * Messages are created once and mutated exactly once (marked read when the
 * recipient opens the conversation). The thread listing fetches the user's
 * messages newest-first and groups them by conversation partner in memory;
 * unread counts come from a single aggregate query.
 */

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::users::db::UserSummary;

/// Preview length for thread listings
const PREVIEW_LEN: usize = 25;

/// Message payload returned by the API, both parties populated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub text: Option<String>,
    pub file: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// One conversation thread in the thread listing
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    /// The conversation partner
    pub id: Uuid,
    pub username: String,
    pub profile_pic: String,
    /// Truncated preview of the latest message
    pub last_message: String,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.text, m.file, m.read, m.created_at,
           s.id AS sender_id, s.username AS sender_username, s.profile_pic AS sender_profile_pic,
           r.id AS receiver_id, r.username AS receiver_username, r.profile_pic AS receiver_profile_pic
    FROM messages m
    JOIN users s ON s.id = m.sender_id
    JOIN users r ON r.id = m.receiver_id
"#;

fn row_to_message(row: sqlx::postgres::PgRow) -> MessageResponse {
    MessageResponse {
        id: row.get("id"),
        sender: UserSummary {
            id: row.get("sender_id"),
            username: row.get("sender_username"),
            profile_pic: row.get("sender_profile_pic"),
        },
        receiver: UserSummary {
            id: row.get("receiver_id"),
            username: row.get("receiver_username"),
            profile_pic: row.get("receiver_profile_pic"),
        },
        text: row.get("text"),
        file: row.get("file"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    }
}

/// Persist a new message and return its populated payload
pub async fn create_message(
    pool: &PgPool,
    sender_id: Uuid,
    receiver_id: Uuid,
    text: Option<String>,
    file: Option<String>,
) -> Result<MessageResponse, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO messages (id, sender_id, receiver_id, text, file, read, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        "#,
    )
    .bind(id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(&text)
    .bind(&file)
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query(&format!("{} WHERE m.id = $1", MESSAGE_SELECT))
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(row_to_message(row))
}

/// The newest window of the conversation between two users, returned
/// oldest -> newest
pub async fn conversation(
    pool: &PgPool,
    me: Uuid,
    other: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<MessageResponse>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        {}
        WHERE (m.sender_id = $1 AND m.receiver_id = $2)
           OR (m.sender_id = $2 AND m.receiver_id = $1)
        ORDER BY m.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
        MESSAGE_SELECT
    ))
    .bind(me)
    .bind(other)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut messages: Vec<MessageResponse> = rows.into_iter().map(row_to_message).collect();
    messages.reverse();
    Ok(messages)
}

/// Mark all unread messages from `other` to `me` as read.
///
/// Returns the number of rows that changed; calling again right away
/// returns 0.
pub async fn mark_conversation_read(
    pool: &PgPool,
    me: Uuid,
    other: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET read = TRUE
        WHERE sender_id = $1 AND receiver_id = $2 AND read = FALSE
        "#,
    )
    .bind(other)
    .bind(me)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Every message the user has sent or received, newest first (thread input)
pub async fn all_messages_for(pool: &PgPool, me: Uuid) -> Result<Vec<MessageResponse>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        {}
        WHERE m.sender_id = $1 OR m.receiver_id = $1
        ORDER BY m.created_at DESC
        "#,
        MESSAGE_SELECT
    ))
    .bind(me)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_message).collect())
}

/// Unread message counts for `me`, grouped by sender
pub async fn unread_counts(pool: &PgPool, me: Uuid) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT sender_id, COUNT(*) AS count
        FROM messages
        WHERE receiver_id = $1 AND read = FALSE
        GROUP BY sender_id
        "#,
    )
    .bind(me)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("sender_id"), row.get("count")))
        .collect())
}

/// Group a user's messages (newest first) into per-partner threads.
///
/// Keeps the most recent message per partner as the preview and orders the
/// threads unread-first, then by latest activity.
pub fn build_threads(
    messages: &[MessageResponse],
    unread: &HashMap<Uuid, i64>,
    me: Uuid,
) -> Vec<ThreadSummary> {
    let mut threads: Vec<ThreadSummary> = Vec::new();
    let mut seen: std::collections::HashSet<Uuid> = std::collections::HashSet::new();

    for message in messages {
        let partner = if message.sender.id == me {
            &message.receiver
        } else {
            &message.sender
        };
        if !seen.insert(partner.id) {
            continue;
        }

        threads.push(ThreadSummary {
            id: partner.id,
            username: partner.username.clone(),
            profile_pic: partner.profile_pic.clone(),
            last_message: preview(message.text.as_deref()),
            unread_count: unread.get(&partner.id).copied().unwrap_or(0),
            updated_at: message.created_at,
        });
    }

    threads.sort_by(|a, b| {
        let a_unread = a.unread_count > 0;
        let b_unread = b.unread_count > 0;
        b_unread
            .cmp(&a_unread)
            .then(b.updated_at.cmp(&a.updated_at))
    });

    threads
}

/// Thread preview: the message text truncated at 25 chars, or a placeholder
/// for media-only messages
fn preview(text: Option<&str>) -> String {
    let text = match text {
        Some(text) if !text.is_empty() => text,
        _ => return "(attachment)".to_string(),
    };

    if text.chars().count() > PREVIEW_LEN {
        let truncated: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn summary(name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            username: name.to_string(),
            profile_pic: String::new(),
        }
    }

    fn message(
        sender: &UserSummary,
        receiver: &UserSummary,
        text: &str,
        at: DateTime<Utc>,
    ) -> MessageResponse {
        MessageResponse {
            id: Uuid::new_v4(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            text: Some(text.to_string()),
            file: None,
            read: false,
            created_at: at,
        }
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview(Some("short")), "short");
        assert_eq!(
            preview(Some("a message that is definitely too long")),
            "a message that is definit..."
        );
        assert_eq!(preview(None), "(attachment)");
        assert_eq!(preview(Some("")), "(attachment)");
    }

    #[test]
    fn test_build_threads_keeps_latest_per_partner() {
        let me = summary("me");
        let alice = summary("alice");
        let now = Utc::now();

        let messages = vec![
            message(&alice, &me, "newest", now),
            message(&me, &alice, "older", now - Duration::minutes(5)),
        ];

        let threads = build_threads(&messages, &HashMap::new(), me.id);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, alice.id);
        assert_eq!(threads[0].last_message, "newest");
        assert_eq!(threads[0].updated_at, now);
    }

    #[test]
    fn test_build_threads_orders_unread_first() {
        let me = summary("me");
        let alice = summary("alice");
        let bob = summary("bob");
        let now = Utc::now();

        // Alice is the most recent thread, but only Bob has unread messages
        let messages = vec![
            message(&alice, &me, "hi", now),
            message(&bob, &me, "ping", now - Duration::hours(1)),
        ];
        let unread = HashMap::from([(bob.id, 2_i64)]);

        let threads = build_threads(&messages, &unread, me.id);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, bob.id);
        assert_eq!(threads[0].unread_count, 2);
        assert_eq!(threads[1].id, alice.id);
        assert_eq!(threads[1].unread_count, 0);
    }

    #[test]
    fn test_build_threads_recency_breaks_ties() {
        let me = summary("me");
        let alice = summary("alice");
        let bob = summary("bob");
        let now = Utc::now();

        let messages = vec![
            message(&me, &alice, "later", now),
            message(&me, &bob, "earlier", now - Duration::minutes(1)),
        ];

        let threads = build_threads(&messages, &HashMap::new(), me.id);
        assert_eq!(threads[0].id, alice.id);
        assert_eq!(threads[1].id, bob.id);
    }
}

//! Fetching recent group history as [`MessageRecord`]s.

use chrono::{DateTime, TimeDelta, Utc};
use grammers_client::types::peer::Peer;
use grammers_client::types::Message;
use grammers_client::Client;
use grammers_tl_types as tl;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::threads::MessageRecord;

/// Messages fetched for one run.
#[derive(Debug, Default)]
pub struct FetchedBatch {
    /// Newest first, as returned by the API.
    pub records: Vec<MessageRecord>,
    /// Service messages and messages without a usable date.
    pub skipped: usize,
}

/// Start of the look-back window.
///
/// Fails with [`Error::InvalidArgument`] when `days` reaches past the
/// representable date range.
pub fn cutoff_for(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| Error::InvalidArgument(format!("--days {} is out of range", days)))
}

/// Sender id as text: plain user id for users, prefixed id for chats and channels
/// posting on behalf of themselves.
pub fn sender_id(from: Option<&tl::enums::Peer>) -> Option<String> {
    match from? {
        tl::enums::Peer::User(user) => Some(user.user_id.to_string()),
        tl::enums::Peer::Chat(chat) => Some(format!("chat:{}", chat.chat_id)),
        tl::enums::Peer::Channel(channel) => Some(format!("channel:{}", channel.channel_id)),
    }
}

/// Split a reply header into `(reply parent, forum topic)`.
///
/// In forum groups a message posted straight into a topic carries the topic id
/// as `reply_to_msg_id` with no `reply_to_top_id`; that is topic membership, not
/// a reply. A reply inside a topic carries both.
pub fn reply_links(
    forum_topic: bool,
    reply_to_msg_id: Option<i32>,
    reply_to_top_id: Option<i32>,
) -> (Option<i32>, Option<i32>) {
    if !forum_topic {
        return (reply_to_msg_id, None);
    }

    match reply_to_top_id {
        Some(top) => (reply_to_msg_id, Some(top)),
        None => (None, reply_to_msg_id),
    }
}

/// Map an API message to a record; `None` for service/empty messages or a bad date.
pub fn record_from_message(msg: &Message) -> Option<MessageRecord> {
    let tl::enums::Message::Message(raw) = &msg.raw else {
        return None;
    };

    let timestamp = DateTime::from_timestamp(i64::from(raw.date), 0)?;

    let (reply_to, topic_id) = match &raw.reply_to {
        Some(tl::enums::MessageReplyHeader::Header(header)) => reply_links(
            header.forum_topic,
            header.reply_to_msg_id,
            header.reply_to_top_id,
        ),
        _ => (None, None),
    };

    Some(MessageRecord {
        id: raw.id,
        timestamp,
        sender_id: sender_id(raw.from_id.as_ref()),
        text: raw.message.clone(),
        reply_to,
        topic_id,
    })
}

/// Page through history newest-first until a message older than `cutoff`.
pub async fn collect_recent_messages(
    client: &Client,
    peer: &Peer,
    cutoff: DateTime<Utc>,
) -> Result<FetchedBatch> {
    let mut batch = FetchedBatch::default();
    let mut iter = client.iter_messages(peer);

    while let Some(msg) = iter.next().await? {
        let Some(record) = record_from_message(&msg) else {
            debug!(message_id = msg.id(), "Skipping service or malformed message");
            batch.skipped += 1;
            continue;
        };

        if record.timestamp < cutoff {
            break;
        }
        batch.records.push(record);
    }

    info!(
        fetched = batch.records.len(),
        skipped = batch.skipped,
        since = %cutoff.format("%Y-%m-%d %H:%M"),
        "Collected messages"
    );

    Ok(batch)
}

//! Group resolution and group-type probing

use grammers_client::types::peer::Peer;
use grammers_client::Client;
use grammers_tl_types as tl;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::config::{ChatEntity, Config};
use crate::error::{Error, Result};

static LINK_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?(?:t\.me|telegram\.me)/").expect("valid link regex")
});

/// Turn a group link or `@username` into a bare username.
///
/// `https://t.me/Python/` and `@Python` both become `Python`. Other input is
/// returned trimmed.
pub fn normalize_group_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_link = LINK_PREFIX.replace(trimmed, "");
    let path = without_link.trim_matches('/');
    let name = path.split(['/', '?']).next().unwrap_or(path);
    name.trim_start_matches('@').to_string()
}

/// What kind of group a peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Basic (legacy) group chat
    Basic,
    /// Megagroup, possibly with forum topics enabled
    Supergroup { forum: bool },
}

impl GroupKind {
    pub fn is_supergroup(self) -> bool {
        matches!(self, GroupKind::Supergroup { .. })
    }
}

fn channel_kind(megagroup: bool, forum: bool) -> Option<GroupKind> {
    megagroup.then_some(GroupKind::Supergroup { forum })
}

/// Classify a peer; `None` for users and broadcast channels.
pub fn group_kind(peer: &Peer) -> Option<GroupKind> {
    match peer {
        Peer::Group(group) => match &group.raw {
            tl::enums::Chat::Channel(c) => Some(GroupKind::Supergroup { forum: c.forum }),
            tl::enums::Chat::ChannelForbidden(c) => channel_kind(c.megagroup, false),
            tl::enums::Chat::Empty(_) | tl::enums::Chat::Chat(_) | tl::enums::Chat::Forbidden(_) => {
                Some(GroupKind::Basic)
            }
        },
        Peer::Channel(channel) => channel_kind(channel.raw.megagroup, channel.raw.forum),
        Peer::User(_) => None,
    }
}

/// Classify a resolved peer, failing with [`Error::NotAGroup`] for anything else.
pub fn ensure_group(peer: &Peer, identifier: &str) -> Result<GroupKind> {
    group_kind(peer).ok_or_else(|| Error::NotAGroup(identifier.to_string()))
}

/// Resolve a configured ChatEntity to an actual Peer
pub async fn resolve_chat(client: &Client, entity: &ChatEntity) -> Result<Peer> {
    let target_id = match entity {
        ChatEntity::Username(username) => {
            return client
                .resolve_username(username)
                .await?
                .ok_or_else(|| Error::ChatNotFound(format!("Username @{} not found", username)));
        }
        ChatEntity::Channel(id) | ChatEntity::Chat(id) => *id,
    };

    // Numeric ids can only be found among the account's dialogs
    let mut dialogs = client.iter_dialogs();
    while let Some(dialog) = dialogs.next().await? {
        let id = match &dialog.peer {
            Peer::Channel(channel) => channel.raw.id,
            Peer::Group(group) => match &group.raw {
                tl::enums::Chat::Empty(c) => c.id,
                tl::enums::Chat::Chat(c) => c.id,
                tl::enums::Chat::Forbidden(c) => c.id,
                tl::enums::Chat::Channel(c) => c.id,
                tl::enums::Chat::ChannelForbidden(c) => c.id,
            },
            Peer::User(_) => continue,
        };
        if id == target_id {
            return Ok(dialog.peer);
        }
    }

    Err(Error::ChatNotFound(format!(
        "Group {} not found in dialogs",
        target_id
    )))
}

/// Get the display name for a peer
pub fn peer_name(peer: &Peer) -> String {
    peer.name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Find a group by config alias, link or username.
pub async fn find_group(client: &Client, config: &Config, identifier: &str) -> Result<Peer> {
    if let Some(entity) = config.get_chat(identifier.trim()) {
        return resolve_chat(client, entity).await;
    }

    let username = normalize_group_identifier(identifier);
    if username.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "Cannot read a group name from '{}'",
            identifier
        )));
    }

    let peer = client
        .resolve_username(&username)
        .await?
        .ok_or_else(|| Error::ChatNotFound(format!("Chat '{}' not found", identifier)))?;

    info!(group = %peer_name(&peer), username = %username, "Resolved group");
    Ok(peer)
}

//! Map teloxide types to the backend's raw update records.

use teloxide::types::{Chat, Message, Update, UpdateKind, User};

use tgb_core::messaging::types::{ChatKind, RawChat, RawMessage, RawUpdate, RawUser};

/// Only new messages carry a payload; every other update kind maps to `message: None`.
pub fn update(u: Update) -> RawUpdate {
    let message = match &u.kind {
        UpdateKind::Message(m) => Some(message(m)),
        _ => None,
    };
    RawUpdate {
        update_id: i64::from(u.id),
        message,
    }
}

pub fn message(m: &Message) -> RawMessage {
    RawMessage {
        text: m.text().map(str::to_string),
        from: m.from().map(user),
        chat: chat(&m.chat),
    }
}

pub fn user(u: &User) -> RawUser {
    RawUser {
        id: u.id.0 as i64,
        first_name: u.first_name.clone(),
        last_name: u.last_name.clone(),
        username: u.username.clone(),
    }
}

/// Private chats are direct; groups, supergroups and channels are rooms.
pub fn chat(c: &Chat) -> RawChat {
    let kind = if c.is_private() {
        ChatKind::Direct
    } else {
        ChatKind::Group {
            title: c.title().map(str::to_string),
        }
    };
    RawChat { id: c.id.0, kind }
}

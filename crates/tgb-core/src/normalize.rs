use tracing::warn;

use crate::{
    domain::{Identifier, RemotePerson, RemoteRoom, RoomMember},
    messaging::types::{ChatKind, Message, RawMessage},
    ports::Host,
};

/// Turn a raw Telegram message into a host message.
///
/// Returns `None` for messages the host cannot act on (no text, no sender).
pub fn normalize_message(host: &dyn Host, bot: &RemotePerson, raw: RawMessage) -> Option<Message> {
    let Some(text) = raw.text else {
        warn!(chat_id = raw.chat.id, "Unhandled message type (not a text message) ignored");
        return None;
    };
    let Some(from) = raw.from.as_ref() else {
        warn!(chat_id = raw.chat.id, "Message without a sender ignored");
        return None;
    };

    let sender = RemotePerson::from(from);
    let draft = host.build_message(&text);

    let msg = match raw.chat.kind {
        ChatKind::Direct => draft.address(Identifier::Person(sender), Identifier::Person(bot.clone())),
        ChatKind::Group { .. } => {
            let room = RemoteRoom::from(&raw.chat);
            draft.address(
                Identifier::Occupant(RoomMember::new(sender, room.clone())),
                Identifier::Room(room),
            )
        }
    };
    Some(msg)
}

use crate::domain::Identifier;

/// One record returned by the long-poll endpoint.
#[derive(Clone, Debug)]
pub struct RawUpdate {
    pub update_id: i64,
    /// `None` for update kinds other than a new message (edits, callbacks, ...).
    pub message: Option<RawMessage>,
}

#[derive(Clone, Debug)]
pub struct RawMessage {
    pub text: Option<String>,
    pub from: Option<RawUser>,
    pub chat: RawChat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChat {
    pub id: i64,
    pub kind: ChatKind,
}

/// Chat kind as reported by the provider client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one conversation with a user.
    Direct,
    /// Groups, supergroups and channels.
    Group { title: Option<String> },
}

impl ChatKind {
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Direct => None,
            Self::Group { title } => title.as_deref(),
        }
    }
}

/// Unaddressed message returned by a host's `build_message`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageDraft {
    pub body: String,
}

impl MessageDraft {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn address(self, frm: Identifier, to: Identifier) -> Message {
        Message {
            body: self.body,
            frm,
            to,
        }
    }
}

/// A message with sender and recipient, flowing either from Telegram to the
/// host or from the host back out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    pub frm: Identifier,
    pub to: Identifier,
}

impl Message {
    /// True unless the message is addressed to a group chat.
    pub fn is_direct(&self) -> bool {
        !self.to.is_room()
    }

    pub fn is_group(&self) -> bool {
        self.to.is_room()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RemotePerson, RemoteRoom, RoomMember};

    #[test]
    fn direct_and_group_are_decided_by_recipient() {
        let alice = RemotePerson::new(1);
        let room = RemoteRoom::new(-2);

        let dm = MessageDraft::new("hi").address(
            Identifier::Person(alice.clone()),
            Identifier::Person(RemotePerson::new(99)),
        );
        assert!(dm.is_direct());
        assert!(!dm.is_group());

        let group = MessageDraft::new("hi").address(
            Identifier::Occupant(RoomMember::new(alice, room.clone())),
            Identifier::Room(room),
        );
        assert!(group.is_group());
        assert!(!group.is_direct());
    }
}

//! Identity model: people, group chats and people observed inside a group chat.
//!
//! Every identity wraps the numeric id Telegram assigned to it. Equality is by
//! id only, so two observations of the same user with different display data
//! still compare equal.

use std::{fmt, hash, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    errors::Error,
    messaging::types::{RawChat, RawUser},
    Result,
};

/// Person-like accessors shared by [`RemotePerson`] and [`RoomMember`].
pub trait Person {
    fn id(&self) -> i64;

    /// Stable textual handle of the person (the numeric id).
    fn person(&self) -> String {
        self.id().to_string()
    }

    fn nick(&self) -> Option<&str>;

    fn fullname(&self) -> String;

    /// Telegram does not expose the client a message was sent from.
    fn client(&self) -> Option<&str> {
        None
    }

    /// Attribute ACL checks are matched against.
    fn aclattr(&self) -> String {
        self.id().to_string()
    }
}

/// Group chat operations a generic bot host expects.
///
/// Telegram offers none of them to bots, see [`RemoteRoom`].
pub trait Room {
    fn join(&self, username: Option<&str>, password: Option<&str>) -> Result<()>;
    fn create(&self) -> Result<()>;
    fn leave(&self, reason: Option<&str>) -> Result<()>;
    fn destroy(&self) -> Result<()>;
    fn joined(&self) -> Result<bool>;
    fn exists(&self) -> Result<bool>;
    fn topic(&self) -> Result<Option<String>>;
    fn occupants(&self) -> Result<Vec<RoomMember>>;
    fn invite(&self, people: &[Identifier]) -> Result<()>;
}

/// A Telegram user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemotePerson {
    id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
}

impl RemotePerson {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            username: None,
        }
    }

    pub fn with_names(
        id: i64,
        first_name: Option<String>,
        last_name: Option<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            username,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl Person for RemotePerson {
    fn id(&self) -> i64 {
        self.id
    }

    fn nick(&self) -> Option<&str> {
        self.username()
    }

    fn fullname(&self) -> String {
        match (self.first_name(), self.last_name()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl From<&RawUser> for RemotePerson {
    fn from(u: &RawUser) -> Self {
        Self::with_names(
            u.id,
            Some(u.first_name.clone()),
            u.last_name.clone(),
            u.username.clone(),
        )
    }
}

impl PartialEq for RemotePerson {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RemotePerson {}

impl hash::Hash for RemotePerson {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RemotePerson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A Telegram group chat.
///
/// Only the id and title are known; every [`Room`] operation fails with
/// [`Error::RoomsNotSupported`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteRoom {
    id: i64,
    title: Option<String>,
}

impl RemoteRoom {
    pub fn new(id: i64) -> Self {
        Self { id, title: None }
    }

    pub fn with_title(id: i64, title: Option<String>) -> Self {
        Self { id, title }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Group chat title, when Telegram sent one.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl Room for RemoteRoom {
    fn join(&self, _username: Option<&str>, _password: Option<&str>) -> Result<()> {
        Err(Error::rooms_not_supported())
    }

    fn create(&self) -> Result<()> {
        Err(Error::rooms_not_supported())
    }

    fn leave(&self, _reason: Option<&str>) -> Result<()> {
        Err(Error::rooms_not_supported())
    }

    fn destroy(&self) -> Result<()> {
        Err(Error::rooms_not_supported())
    }

    fn joined(&self) -> Result<bool> {
        Err(Error::rooms_not_supported())
    }

    fn exists(&self) -> Result<bool> {
        Err(Error::rooms_not_supported())
    }

    fn topic(&self) -> Result<Option<String>> {
        Err(Error::rooms_not_supported())
    }

    fn occupants(&self) -> Result<Vec<RoomMember>> {
        Err(Error::rooms_not_supported())
    }

    fn invite(&self, _people: &[Identifier]) -> Result<()> {
        Err(Error::rooms_not_supported())
    }
}

impl From<&RawChat> for RemoteRoom {
    fn from(c: &RawChat) -> Self {
        Self::with_title(c.id, c.kind.title().map(str::to_string))
    }
}

impl PartialEq for RemoteRoom {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RemoteRoom {}

impl hash::Hash for RemoteRoom {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RemoteRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A person as seen posting in one group chat.
///
/// The room association is an observation made while handling a single
/// message, not a membership record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomMember {
    person: RemotePerson,
    room: RemoteRoom,
}

impl RoomMember {
    pub fn new(person: RemotePerson, room: RemoteRoom) -> Self {
        Self { person, room }
    }

    pub fn id(&self) -> i64 {
        self.person.id()
    }

    pub fn person_identity(&self) -> &RemotePerson {
        &self.person
    }

    pub fn room(&self) -> &RemoteRoom {
        &self.room
    }

    pub fn first_name(&self) -> Option<&str> {
        self.person.first_name()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.person.last_name()
    }

    pub fn username(&self) -> Option<&str> {
        self.person.username()
    }
}

impl Person for RoomMember {
    fn id(&self) -> i64 {
        self.person.id()
    }

    fn nick(&self) -> Option<&str> {
        self.person.nick()
    }

    fn fullname(&self) -> String {
        self.person.fullname()
    }
}

impl fmt::Display for RoomMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.person.id())
    }
}

/// Any addressable Telegram identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Person(RemotePerson),
    Room(RemoteRoom),
    Occupant(RoomMember),
}

impl Identifier {
    /// Chat id messages to this identity are delivered to.
    ///
    /// Occupants are addressed privately through their user id.
    pub fn id(&self) -> i64 {
        match self {
            Self::Person(p) => p.id(),
            Self::Room(r) => r.id(),
            Self::Occupant(o) => o.id(),
        }
    }

    pub fn is_room(&self) -> bool {
        matches!(self, Self::Room(_))
    }

    /// Person view of this identity, if it is one.
    pub fn as_person(&self) -> Option<&dyn Person> {
        match self {
            Self::Person(p) => Some(p as &dyn Person),
            Self::Occupant(o) => Some(o as &dyn Person),
            Self::Room(_) => None,
        }
    }
}

impl FromStr for Identifier {
    type Err = Error;

    /// Parse a textual id: positive ids are people, zero and negative ids are rooms.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('+'))
            .unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidIdentifier(s.to_string()));
        }
        let id = trimmed
            .parse::<i64>()
            .map_err(|_| Error::InvalidIdentifier(s.to_string()))?;

        if id > 0 {
            Ok(Self::Person(RemotePerson::new(id)))
        } else {
            Ok(Self::Room(RemoteRoom::new(id)))
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl From<RemotePerson> for Identifier {
    fn from(p: RemotePerson) -> Self {
        Self::Person(p)
    }
}

impl From<RemoteRoom> for Identifier {
    fn from(r: RemoteRoom) -> Self {
        Self::Room(r)
    }
}

impl From<RoomMember> for Identifier {
    fn from(m: RoomMember) -> Self {
        Self::Occupant(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> RemotePerson {
        RemotePerson::with_names(
            42,
            Some("Alice".to_string()),
            Some("Liddell".to_string()),
            Some("alice".to_string()),
        )
    }

    #[test]
    fn people_compare_by_id_only() {
        let bare = RemotePerson::new(42);
        assert_eq!(alice(), bare);
        assert_ne!(alice(), RemotePerson::new(43));
    }

    #[test]
    fn fullname_joins_first_and_last() {
        assert_eq!(alice().fullname(), "Alice Liddell");
        let first_only = RemotePerson::with_names(1, Some("Bob".to_string()), None, None);
        assert_eq!(first_only.fullname(), "Bob");
        assert_eq!(RemotePerson::new(1).fullname(), "");
    }

    #[test]
    fn person_accessors_render_the_id() {
        let p = alice();
        assert_eq!(p.person(), "42");
        assert_eq!(p.aclattr(), "42");
        assert_eq!(p.nick(), Some("alice"));
        assert_eq!(p.client(), None);
        assert_eq!(p.to_string(), "42");
    }

    #[test]
    fn room_member_delegates_to_person() {
        let room = RemoteRoom::with_title(-100, Some("Tea party".to_string()));
        let m = RoomMember::new(alice(), room.clone());
        assert_eq!(m.id(), 42);
        assert_eq!(m.fullname(), "Alice Liddell");
        assert_eq!(m.nick(), Some("alice"));
        assert_eq!(m.room(), &room);
        assert_eq!(m.room().title(), Some("Tea party"));
        assert_eq!(Identifier::from(m).id(), 42);
    }

    #[test]
    fn parses_positive_ids_as_people() {
        for s in ["1", " 42 ", "+7", "9223372036854775807"] {
            let id: Identifier = s.parse().unwrap();
            assert!(matches!(id, Identifier::Person(_)), "{s}");
            assert_eq!(id.id(), s.trim().parse::<i64>().unwrap());
        }
    }

    #[test]
    fn parses_non_positive_ids_as_rooms() {
        for s in ["0", "-1", "\t-1001234567890\n"] {
            let id: Identifier = s.parse().unwrap();
            assert!(matches!(id, Identifier::Room(_)), "{s}");
        }
    }

    #[test]
    fn rejects_non_numeric_ids() {
        for s in ["", "   ", "abc", "@alice", "12a", "1.5", "--1", "-", "1_000", "99999999999999999999"] {
            let err = s.parse::<Identifier>().unwrap_err();
            assert!(matches!(err, Error::InvalidIdentifier(_)), "{s}");
        }
    }

    #[test]
    fn every_room_operation_is_unsupported() {
        let room = RemoteRoom::with_title(-5, Some("g".to_string()));
        let unsupported = |r: Result<()>| matches!(r, Err(Error::RoomsNotSupported(_)));

        assert!(unsupported(room.join(None, None)));
        assert!(unsupported(room.create()));
        assert!(unsupported(room.leave(Some("bye"))));
        assert!(unsupported(room.destroy()));
        assert!(unsupported(room.invite(&[Identifier::Person(alice())])));
        assert!(matches!(room.joined(), Err(Error::RoomsNotSupported(_))));
        assert!(matches!(room.exists(), Err(Error::RoomsNotSupported(_))));
        assert!(matches!(room.topic(), Err(Error::RoomsNotSupported(_))));
        assert!(matches!(room.occupants(), Err(Error::RoomsNotSupported(_))));

        // Identity data is untouched.
        assert_eq!(room.id(), -5);
        assert_eq!(room.title(), Some("g"));
    }

    #[test]
    fn unsupported_error_explains_why() {
        let msg = Error::rooms_not_supported().to_string();
        assert!(msg.contains("not supported on Telegram"));
    }
}

//! Incoming events as seen by the flood gate.
//!
//! The gate never talks to a bot framework directly. Whatever the transport
//! delivers is adapted to the [`FloodEvent`] trait, which exposes just enough
//! to resolve an identity and apply the event-kind policies.

/// Numeric identifier of a user, group, or channel.
pub type IdentityId = i64;

/// The shape of an incoming update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new message in a private chat or group
    Message,
    /// An edit of a previously sent message
    EditedMessage,
    /// A post in a channel
    ChannelPost,
    /// An edit of a channel post
    EditedChannelPost,
    /// An inline-keyboard button press
    CallbackQuery,
}

impl EventKind {
    /// Whether this kind originates from a channel.
    pub fn is_channel(&self) -> bool {
        matches!(self, EventKind::ChannelPost | EventKind::EditedChannelPost)
    }

    /// Whether this kind is an edit of existing content.
    pub fn is_edit(&self) -> bool {
        matches!(self, EventKind::EditedMessage | EventKind::EditedChannelPost)
    }

    /// Whether this kind is a callback-style event.
    pub fn is_callback(&self) -> bool {
        matches!(self, EventKind::CallbackQuery)
    }
}

/// An event the limiter can evaluate.
///
/// For callback events, `sender_id` is the user who pressed the button and
/// `chat_id` is the chat of the message the button is attached to, if any.
pub trait FloodEvent {
    /// The kind of update.
    fn kind(&self) -> EventKind;

    /// The user that produced the event, if known.
    fn sender_id(&self) -> Option<IdentityId>;

    /// The chat (group, channel, private chat) the event belongs to.
    fn chat_id(&self) -> Option<IdentityId>;

    /// Text payload of the event, if any.
    fn text(&self) -> Option<&str> {
        None
    }

    /// Resolve the registry key for this event.
    ///
    /// With `consider_user` the sender is tracked, falling back to the chat
    /// when there is no sender (anonymous admins, channel posts). Otherwise the
    /// whole chat shares one status, falling back to the sender.
    fn identity(&self, consider_user: bool) -> Option<IdentityId> {
        if consider_user {
            self.sender_id().or_else(|| self.chat_id())
        } else {
            self.chat_id().or_else(|| self.sender_id())
        }
    }

    /// Whether the event carries a non-empty text payload.
    fn has_text(&self) -> bool {
        self.text().is_some_and(|t| !t.is_empty())
    }
}

/// A plain event value implementing [`FloodEvent`].
///
/// Useful when the bot framework's own types should not leak into the
/// limiter, and throughout the tests.
///
/// # Example
/// ```
/// use flood_throttle::{EventKind, FloodEvent, Update};
///
/// let update = Update::message(-100123, 42).with_text("hello");
/// assert_eq!(update.kind(), EventKind::Message);
/// assert_eq!(update.identity(true), Some(42));
/// assert_eq!(update.identity(false), Some(-100123));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub kind: EventKind,
    pub sender: Option<IdentityId>,
    pub chat: Option<IdentityId>,
    pub text: Option<String>,
}

impl Update {
    /// A new message from `sender` in `chat`.
    pub fn message(chat: IdentityId, sender: IdentityId) -> Self {
        Self {
            kind: EventKind::Message,
            sender: Some(sender),
            chat: Some(chat),
            text: None,
        }
    }

    /// An edited message from `sender` in `chat`.
    pub fn edited_message(chat: IdentityId, sender: IdentityId) -> Self {
        Self {
            kind: EventKind::EditedMessage,
            ..Self::message(chat, sender)
        }
    }

    /// A channel post. Channel posts have no sender.
    pub fn channel_post(channel: IdentityId) -> Self {
        Self {
            kind: EventKind::ChannelPost,
            sender: None,
            chat: Some(channel),
            text: None,
        }
    }

    /// A callback query from `sender`, optionally attached to a message in `chat`.
    pub fn callback_query(sender: IdentityId, chat: Option<IdentityId>) -> Self {
        Self {
            kind: EventKind::CallbackQuery,
            sender: Some(sender),
            chat,
            text: None,
        }
    }

    /// Attach a text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl FloodEvent for Update {
    fn kind(&self) -> EventKind {
        self.kind
    }

    fn sender_id(&self) -> Option<IdentityId> {
        self.sender
    }

    fn chat_id(&self) -> Option<IdentityId> {
        self.chat
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_sender_when_considering_user() {
        let update = Update::message(-1001, 7);
        assert_eq!(update.identity(true), Some(7));
        assert_eq!(update.identity(false), Some(-1001));
    }

    #[test]
    fn test_identity_falls_back_when_sender_missing() {
        let post = Update::channel_post(-1002);
        assert_eq!(post.identity(true), Some(-1002));
        assert_eq!(post.identity(false), Some(-1002));
    }

    #[test]
    fn test_callback_without_message_uses_sender() {
        let cq = Update::callback_query(99, None);
        assert!(cq.kind().is_callback());
        assert_eq!(cq.identity(false), Some(99));
    }

    #[test]
    fn test_no_identity() {
        let update = Update {
            kind: EventKind::Message,
            sender: None,
            chat: None,
            text: None,
        };
        assert_eq!(update.identity(true), None);
    }

    #[test]
    fn test_has_text() {
        assert!(!Update::message(1, 2).has_text());
        assert!(!Update::message(1, 2).with_text("").has_text());
        assert!(Update::message(1, 2).with_text("hi").has_text());
    }

    #[test]
    fn test_kind_classification() {
        assert!(EventKind::ChannelPost.is_channel());
        assert!(EventKind::EditedChannelPost.is_channel());
        assert!(EventKind::EditedChannelPost.is_edit());
        assert!(EventKind::EditedMessage.is_edit());
        assert!(!EventKind::Message.is_edit());
        assert!(!EventKind::Message.is_channel());
    }
}

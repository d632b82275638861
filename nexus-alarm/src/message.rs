//! Message classes and the values handed out by a receive.

use core::fmt;

/// Which channel a message travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MsgKind {
    /// Ordinary message, delivered in FIFO order.
    #[default]
    Normal,
    /// Priority message. At most one is held at a time and it is always
    /// delivered before any queued normal message.
    Alarm,
}

impl MsgKind {
    /// Returns `true` for [`MsgKind::Alarm`].
    #[inline]
    pub const fn is_alarm(self) -> bool {
        matches!(self, MsgKind::Alarm)
    }

    /// Returns `true` for [`MsgKind::Normal`].
    #[inline]
    pub const fn is_normal(self) -> bool {
        matches!(self, MsgKind::Normal)
    }
}

impl fmt::Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MsgKind::Normal => write!(f, "normal"),
            MsgKind::Alarm => write!(f, "alarm"),
        }
    }
}

/// A received message, tagged with the channel it came from.
///
/// The payload is moved out of the queue untouched: whatever was passed to
/// `send` is exactly what comes back here.
///
/// # Example
///
/// ```
/// use nexus_alarm::{AlarmQueue, Delivery, MsgKind};
///
/// let q = AlarmQueue::new();
/// q.send("wake up", MsgKind::Alarm).unwrap();
///
/// match q.recv().unwrap() {
///     Delivery::Alarm(msg) => assert_eq!(msg, "wake up"),
///     Delivery::Normal(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery<T> {
    /// The payload held in the alarm slot.
    Alarm(T),
    /// The oldest payload on the normal channel.
    Normal(T),
}

impl<T> Delivery<T> {
    /// Returns the channel this message was delivered from.
    #[inline]
    pub const fn kind(&self) -> MsgKind {
        match self {
            Delivery::Alarm(_) => MsgKind::Alarm,
            Delivery::Normal(_) => MsgKind::Normal,
        }
    }

    /// Returns `true` if this message came from the alarm slot.
    #[inline]
    pub const fn is_alarm(&self) -> bool {
        matches!(self, Delivery::Alarm(_))
    }

    /// Returns `true` if this message came from the normal channel.
    #[inline]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Delivery::Normal(_))
    }

    /// Returns a reference to the payload.
    #[inline]
    pub const fn get(&self) -> &T {
        match self {
            Delivery::Alarm(v) | Delivery::Normal(v) => v,
        }
    }

    /// Returns the payload, discarding the class.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Delivery::Alarm(v) | Delivery::Normal(v) => v,
        }
    }

    /// Splits into class and payload.
    #[inline]
    pub fn into_parts(self) -> (MsgKind, T) {
        let kind = self.kind();
        (kind, self.into_inner())
    }
}

/// Occupancy of a queue, taken under its lock.
///
/// ```text
///              send(Normal)             send(Alarm)
///   Empty ──────────────────► NormalOnly ─────────► Both
///     │                           ▲                  │
///     │ send(Alarm)               │ recv (alarm)     │
///     ▼                           └──────────────────┘
///   AlarmOnly ── recv ──► Empty
/// ```
///
/// A receive always leaves the alarm side first when both are occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// Nothing pending.
    Empty,
    /// Only normal messages pending.
    NormalOnly,
    /// Only the alarm slot is occupied.
    AlarmOnly,
    /// Alarm slot occupied and normal messages pending.
    Both,
}

impl QueueState {
    pub(crate) const fn from_parts(has_normal: bool, has_alarm: bool) -> Self {
        match (has_normal, has_alarm) {
            (false, false) => QueueState::Empty,
            (true, false) => QueueState::NormalOnly,
            (false, true) => QueueState::AlarmOnly,
            (true, true) => QueueState::Both,
        }
    }

    /// Returns `true` if the alarm slot is occupied.
    #[inline]
    pub const fn has_alarm(self) -> bool {
        matches!(self, QueueState::AlarmOnly | QueueState::Both)
    }

    /// Returns `true` if at least one normal message is pending.
    #[inline]
    pub const fn has_normal(self) -> bool {
        matches!(self, QueueState::NormalOnly | QueueState::Both)
    }
}

//! Error types for queue operations.
//!
//! Every error that stems from a send carries the rejected payload so the
//! caller gets ownership back.

use core::fmt;

/// Error returned by [`AlarmQueue::send`](crate::AlarmQueue::send).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError<T> {
    /// The normal channel could not grow to hold the message.
    NoRoom(T),

    /// The queue has been closed.
    Closed(T),
}

impl<T> SendError<T> {
    /// Returns the message that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            SendError::NoRoom(v) | SendError::Closed(v) => v,
        }
    }

    /// Returns `true` if this error is the `NoRoom` variant.
    pub fn is_no_room(&self) -> bool {
        matches!(self, SendError::NoRoom(_))
    }

    /// Returns `true` if this error is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NoRoom(_) => write!(f, "no room for normal message"),
            SendError::Closed(_) => write!(f, "queue closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned by [`AlarmQueue::try_send`](crate::AlarmQueue::try_send).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// An alarm is already waiting to be received.
    ///
    /// The message is returned so it can be retried or handled.
    AlarmPending(T),

    /// The normal channel could not grow to hold the message.
    NoRoom(T),

    /// The queue has been closed.
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Returns the message that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::AlarmPending(v) | TrySendError::NoRoom(v) | TrySendError::Closed(v) => v,
        }
    }

    /// Returns `true` if this error is the `AlarmPending` variant.
    pub fn is_alarm_pending(&self) -> bool {
        matches!(self, TrySendError::AlarmPending(_))
    }

    /// Returns `true` if this error is the `NoRoom` variant.
    pub fn is_no_room(&self) -> bool {
        matches!(self, TrySendError::NoRoom(_))
    }

    /// Returns `true` if this error is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }
}

impl<T> From<SendError<T>> for TrySendError<T> {
    fn from(err: SendError<T>) -> Self {
        match err {
            SendError::NoRoom(v) => TrySendError::NoRoom(v),
            SendError::Closed(v) => TrySendError::Closed(v),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::AlarmPending(_) => write!(f, "alarm slot occupied"),
            TrySendError::NoRoom(_) => write!(f, "no room for normal message"),
            TrySendError::Closed(_) => write!(f, "queue closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

/// Error returned by [`AlarmQueue::send_timeout`](crate::AlarmQueue::send_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTimeoutError<T> {
    /// The alarm slot stayed occupied for the whole timeout.
    Timeout(T),

    /// The normal channel could not grow to hold the message.
    NoRoom(T),

    /// The queue has been closed.
    Closed(T),
}

impl<T> SendTimeoutError<T> {
    /// Returns the message that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            SendTimeoutError::Timeout(v) | SendTimeoutError::NoRoom(v) | SendTimeoutError::Closed(v) => v,
        }
    }

    /// Returns `true` if this error is the `Timeout` variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendTimeoutError::Timeout(_))
    }

    /// Returns `true` if this error is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, SendTimeoutError::Closed(_))
    }
}

impl<T> From<SendError<T>> for SendTimeoutError<T> {
    fn from(err: SendError<T>) -> Self {
        match err {
            SendError::NoRoom(v) => SendTimeoutError::NoRoom(v),
            SendError::Closed(v) => SendTimeoutError::Closed(v),
        }
    }
}

impl<T> fmt::Display for SendTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendTimeoutError::Timeout(_) => write!(f, "timed out waiting for alarm slot"),
            SendTimeoutError::NoRoom(_) => write!(f, "no room for normal message"),
            SendTimeoutError::Closed(_) => write!(f, "queue closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for SendTimeoutError<T> {}

/// Error returned by [`AlarmQueue::recv`](crate::AlarmQueue::recv).
///
/// The queue has been closed and nothing remains to be received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue closed")
    }
}

impl std::error::Error for RecvError {}

/// Error returned by [`AlarmQueue::try_recv`](crate::AlarmQueue::try_recv).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing pending, but the queue is still open.
    Empty,

    /// The queue has been closed and nothing remains.
    Closed,
}

impl TryRecvError {
    /// Returns `true` if this error is the `Empty` variant.
    pub fn is_empty(&self) -> bool {
        matches!(self, TryRecvError::Empty)
    }

    /// Returns `true` if this error is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryRecvError::Closed)
    }
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::Empty => write!(f, "queue empty"),
            TryRecvError::Closed => write!(f, "queue closed"),
        }
    }
}

impl std::error::Error for TryRecvError {}

/// Error returned by [`AlarmQueue::recv_timeout`](crate::AlarmQueue::recv_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    /// Nothing arrived before the timeout.
    Timeout,

    /// The queue has been closed and nothing remains.
    Closed,
}

impl RecvTimeoutError {
    /// Returns `true` if this error is the `Timeout` variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RecvTimeoutError::Timeout)
    }

    /// Returns `true` if this error is the `Closed` variant.
    pub fn is_closed(&self) -> bool {
        matches!(self, RecvTimeoutError::Closed)
    }
}

impl fmt::Display for RecvTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvTimeoutError::Timeout => write!(f, "timed out waiting for message"),
            RecvTimeoutError::Closed => write!(f, "queue closed"),
        }
    }
}

impl std::error::Error for RecvTimeoutError {}

/// Status taxonomy reported through a [`Handle`](crate::Handle).
///
/// Each variant is a local, recoverable condition: the queue's contents are
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum QueueError {
    /// The handle does not refer to a queue.
    #[error("queue handle is not initialized")]
    Uninitialized,

    /// A send was attempted without a payload.
    #[error("cannot send an empty message")]
    NullMessage,

    /// The normal channel could not grow to hold the message.
    #[error("no room for normal message")]
    NoRoom,

    /// A receive was attempted without an output slot.
    #[error("no output slot to receive into")]
    NoMessage,

    /// Queue storage could not be allocated.
    #[error("out of memory creating queue")]
    OutOfMemory,

    /// The queue has been closed.
    #[error("queue closed")]
    Closed,
}

impl<T> From<&SendError<T>> for QueueError {
    fn from(err: &SendError<T>) -> Self {
        match err {
            SendError::NoRoom(_) => QueueError::NoRoom,
            SendError::Closed(_) => QueueError::Closed,
        }
    }
}

impl From<RecvError> for QueueError {
    fn from(_: RecvError) -> Self {
        QueueError::Closed
    }
}

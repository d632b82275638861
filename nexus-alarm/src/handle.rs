//! Nullable handle surface.
//!
//! [`Handle`] reports the flat [`QueueError`] taxonomy: a handle may be
//! uninitialized, a send may carry no payload, and a receive may have no
//! output slot. Each of those is a reported error rather than something the
//! type system rules out, so callers porting status-code driven code keep
//! the same checks.
//!
//! Checks run in a fixed order: handle first, then the payload or output
//! slot, then the queue operation itself.

use core::fmt;
use std::sync::Arc;

use crate::error::QueueError;
use crate::message::MsgKind;
use crate::queue::AlarmQueue;

/// Normal-channel reservation used by [`Handle::create`].
pub const DEFAULT_CAPACITY: usize = 16;

/// A shareable, possibly uninitialized reference to an [`AlarmQueue`].
///
/// Clones refer to the same queue. The queue is released once the last
/// handle referring to it is dropped or destroyed.
///
/// # Example
///
/// ```
/// use nexus_alarm::{Handle, MsgKind, QueueError};
///
/// let q = Handle::create().unwrap();
///
/// q.send(Some("A"), MsgKind::Alarm).unwrap();
/// q.send(Some("B"), MsgKind::Normal).unwrap();
///
/// let mut out = None;
/// assert_eq!(q.recv(Some(&mut out)), Ok(MsgKind::Alarm));
/// assert_eq!(out, Some("A"));
/// assert_eq!(q.recv(Some(&mut out)), Ok(MsgKind::Normal));
/// assert_eq!(out, Some("B"));
/// assert_eq!(q.size(), 0);
///
/// let err = q.send(None, MsgKind::Normal).unwrap_err();
/// assert_eq!(err.error(), QueueError::NullMessage);
/// ```
pub struct Handle<T> {
    queue: Option<Arc<AlarmQueue<T>>>,
}

impl<T> Handle<T> {
    /// Creates a new empty queue and returns a handle to it.
    ///
    /// # Errors
    ///
    /// [`QueueError::OutOfMemory`] if the queue storage cannot be reserved.
    pub fn create() -> Result<Self, QueueError> {
        AlarmQueue::try_with_capacity(DEFAULT_CAPACITY).map(Self::from_queue)
    }

    /// Returns a handle that refers to no queue.
    ///
    /// Every operation on it reports [`QueueError::Uninitialized`] or a zero
    /// count.
    pub const fn uninit() -> Self {
        Self { queue: None }
    }

    /// Wraps an existing queue.
    pub fn from_queue(queue: AlarmQueue<T>) -> Self {
        Self::from_arc(Arc::new(queue))
    }

    /// Wraps an already shared queue.
    pub fn from_arc(queue: Arc<AlarmQueue<T>>) -> Self {
        Self { queue: Some(queue) }
    }

    /// Returns `true` if this handle refers to a queue.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.queue.is_some()
    }

    /// Returns the underlying queue, if any.
    #[inline]
    pub fn queue(&self) -> Option<&Arc<AlarmQueue<T>>> {
        self.queue.as_ref()
    }

    /// Sends `msg` on the channel selected by `kind`.
    ///
    /// Blocks while an alarm is pending if `kind` is [`MsgKind::Alarm`]; see
    /// [`AlarmQueue::send`].
    ///
    /// # Errors
    ///
    /// - [`QueueError::Uninitialized`] if the handle refers to no queue.
    /// - [`QueueError::NullMessage`] if `msg` is `None`.
    /// - [`QueueError::NoRoom`] if the normal channel could not grow.
    /// - [`QueueError::Closed`] if the queue was destroyed through another
    ///   handle.
    ///
    /// The payload, if any, is returned inside [`Rejected`].
    pub fn send(&self, msg: Option<T>, kind: MsgKind) -> Result<(), Rejected<T>> {
        let Some(queue) = &self.queue else {
            return Err(Rejected::new(QueueError::Uninitialized, msg));
        };
        let Some(msg) = msg else {
            return Err(Rejected::new(QueueError::NullMessage, None));
        };

        queue.send(msg, kind).map_err(|err| {
            let error = QueueError::from(&err);
            Rejected::new(error, Some(err.into_inner()))
        })
    }

    /// Receives the next message into `out`, blocking while the queue is
    /// empty, and reports which channel it came from.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Uninitialized`] if the handle refers to no queue.
    /// - [`QueueError::NoMessage`] if `out` is `None`. Does not block.
    /// - [`QueueError::Closed`] if the queue was destroyed and is drained.
    ///
    /// `out` is only written on success.
    pub fn recv(&self, out: Option<&mut Option<T>>) -> Result<MsgKind, QueueError> {
        let queue = self.queue.as_ref().ok_or(QueueError::Uninitialized)?;
        let out = out.ok_or(QueueError::NoMessage)?;

        let (kind, msg) = queue.recv()?.into_parts();
        *out = Some(msg);
        Ok(kind)
    }

    /// Returns the number of pending messages, or `0` for an uninitialized
    /// handle.
    pub fn size(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.len())
    }

    /// Returns `1` if an alarm is pending, otherwise `0` (also for an
    /// uninitialized handle).
    pub fn alarm_present(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.alarms())
    }

    /// Closes the queue and detaches this handle from it.
    ///
    /// Threads blocked on the queue through other handles are woken: alarm
    /// senders get [`QueueError::Closed`], receivers drain what is left and
    /// then get [`QueueError::Closed`]. Afterwards this handle is
    /// uninitialized. Calling it on an uninitialized handle does nothing.
    pub fn destroy(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.close();
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::uninit()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.queue {
            Some(queue) => f.debug_tuple("Handle").field(queue).finish(),
            None => f.write_str("Handle(<uninit>)"),
        }
    }
}

/// A failed [`Handle::send`]: the status plus the payload, if one was given.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rejected<T> {
    error: QueueError,
    msg: Option<T>,
}

impl<T> Rejected<T> {
    fn new(error: QueueError, msg: Option<T>) -> Self {
        Self { error, msg }
    }

    /// Returns why the send failed.
    #[inline]
    pub fn error(&self) -> QueueError {
        self.error
    }

    /// Returns the payload that could not be sent.
    pub fn into_inner(self) -> Option<T> {
        self.msg
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .field("has_msg", &self.msg.is_some())
            .finish()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> std::error::Error for Rejected<T> {}

impl<T> From<Rejected<T>> for QueueError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}

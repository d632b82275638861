//! The typed blocking queue.

use core::fmt;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{
    QueueError, RecvError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError,
    TrySendError,
};
use crate::message::{Delivery, MsgKind, QueueState};

/// Everything guarded by the queue lock.
struct State<T> {
    normal: VecDeque<T>,
    alarm: Option<T>,
    closed: bool,
}

impl<T> State<T> {
    fn with_normal(normal: VecDeque<T>) -> Self {
        Self {
            normal,
            alarm: None,
            closed: false,
        }
    }

    /// Pending count: normal messages plus the alarm slot.
    #[inline]
    fn len(&self) -> usize {
        self.normal.len() + usize::from(self.alarm.is_some())
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.alarm.is_none() && self.normal.is_empty()
    }
}

/// Outcome of a guarded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Ready,
    Closed,
    TimedOut,
}

/// A blocking queue with a FIFO normal channel and a single alarm slot.
///
/// Any number of threads may send and receive through a shared reference
/// (wrap the queue in an [`Arc`](std::sync::Arc) to share it). All state
/// transitions happen under one lock; two condition variables wake
/// receivers when the queue becomes non-empty and alarm senders when the
/// slot frees up.
///
/// # Example
///
/// ```
/// use nexus_alarm::{AlarmQueue, Delivery, MsgKind};
///
/// let q = AlarmQueue::new();
///
/// q.send("a", MsgKind::Alarm).unwrap();
/// q.send("b", MsgKind::Normal).unwrap();
/// assert_eq!(q.len(), 2);
///
/// assert_eq!(q.recv().unwrap(), Delivery::Alarm("a"));
/// assert_eq!(q.recv().unwrap(), Delivery::Normal("b"));
/// assert_eq!(q.len(), 0);
/// ```
pub struct AlarmQueue<T> {
    state: CachePadded<Mutex<State<T>>>,
    /// Signaled when the queue goes from empty to non-empty.
    not_empty: Condvar,
    /// Signaled when a receive clears the alarm slot.
    alarm_free: Condvar,
}

impl<T> AlarmQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::from_normal(VecDeque::new())
    }

    /// Creates an empty queue with room for `capacity` normal messages
    /// reserved up front.
    ///
    /// This is a pre-allocation, not a bound: the normal channel keeps
    /// growing past it.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails. Use [`try_with_capacity`] to get an
    /// error instead.
    ///
    /// [`try_with_capacity`]: AlarmQueue::try_with_capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_normal(VecDeque::with_capacity(capacity))
    }

    /// Creates an empty queue with `capacity` normal slots reserved,
    /// reporting [`QueueError::OutOfMemory`] if the reservation fails.
    ///
    /// # Example
    ///
    /// ```
    /// use nexus_alarm::{AlarmQueue, QueueError};
    ///
    /// assert!(AlarmQueue::<u64>::try_with_capacity(64).is_ok());
    /// assert_eq!(
    ///     AlarmQueue::<u64>::try_with_capacity(usize::MAX).err(),
    ///     Some(QueueError::OutOfMemory),
    /// );
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, QueueError> {
        let mut normal = VecDeque::new();
        normal.try_reserve_exact(capacity).map_err(|err| {
            tracing::warn!(capacity, %err, "alarm queue reservation failed");
            QueueError::OutOfMemory
        })?;
        Ok(Self::from_normal(normal))
    }

    fn from_normal(normal: VecDeque<T>) -> Self {
        Self {
            state: CachePadded::new(Mutex::new(State::with_normal(normal))),
            not_empty: Condvar::new(),
            alarm_free: Condvar::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------------

    /// Sends a message, blocking if it is an alarm and the slot is taken.
    ///
    /// - [`MsgKind::Normal`] appends to the normal channel and never blocks.
    /// - [`MsgKind::Alarm`] waits until the alarm slot is empty, then
    ///   installs the message. There is no timeout: a receiver has to drain
    ///   the slot (or the queue has to be closed) for this to return.
    ///
    /// Either way one blocked receiver is woken.
    ///
    /// # Errors
    ///
    /// - [`SendError::NoRoom`] if the normal channel could not grow.
    /// - [`SendError::Closed`] if the queue is closed, including while an
    ///   alarm send is waiting.
    ///
    /// The message is handed back inside the error and the queue is left
    /// unchanged.
    pub fn send(&self, msg: T, kind: MsgKind) -> Result<(), SendError<T>> {
        let mut state = self.state.lock();

        if kind.is_alarm() {
            match self.wait_alarm_slot(&mut state, None) {
                Wait::Ready => {}
                Wait::Closed | Wait::TimedOut => return Err(SendError::Closed(msg)),
            }
        } else if state.closed {
            return Err(SendError::Closed(msg));
        }

        self.install(&mut state, msg, kind)
    }

    /// Sends an alarm. Shorthand for `send(msg, MsgKind::Alarm)`.
    ///
    /// # Errors
    ///
    /// See [`send`](AlarmQueue::send).
    #[inline]
    pub fn send_alarm(&self, msg: T) -> Result<(), SendError<T>> {
        self.send(msg, MsgKind::Alarm)
    }

    /// Sends a normal message. Shorthand for `send(msg, MsgKind::Normal)`.
    ///
    /// # Errors
    ///
    /// See [`send`](AlarmQueue::send).
    #[inline]
    pub fn send_normal(&self, msg: T) -> Result<(), SendError<T>> {
        self.send(msg, MsgKind::Normal)
    }

    /// Attempts to send without blocking.
    ///
    /// # Errors
    ///
    /// - [`TrySendError::AlarmPending`] if `kind` is alarm and the slot is
    ///   occupied.
    /// - [`TrySendError::NoRoom`] if the normal channel could not grow.
    /// - [`TrySendError::Closed`] if the queue is closed.
    ///
    /// # Example
    ///
    /// ```
    /// use nexus_alarm::{AlarmQueue, MsgKind, TrySendError};
    ///
    /// let q = AlarmQueue::new();
    ///
    /// assert!(q.try_send(1, MsgKind::Alarm).is_ok());
    /// assert!(matches!(q.try_send(2, MsgKind::Alarm), Err(TrySendError::AlarmPending(2))));
    /// assert!(q.try_send(3, MsgKind::Normal).is_ok());
    /// ```
    pub fn try_send(&self, msg: T, kind: MsgKind) -> Result<(), TrySendError<T>> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(TrySendError::Closed(msg));
        }
        if kind.is_alarm() && state.alarm.is_some() {
            return Err(TrySendError::AlarmPending(msg));
        }

        self.install(&mut state, msg, kind).map_err(TrySendError::from)
    }

    /// Sends a message, waiting at most `timeout` for the alarm slot.
    ///
    /// Normal messages never wait, so for them this behaves like
    /// [`send`](AlarmQueue::send).
    ///
    /// # Errors
    ///
    /// - [`SendTimeoutError::Timeout`] if the alarm slot stayed occupied.
    /// - [`SendTimeoutError::NoRoom`] if the normal channel could not grow.
    /// - [`SendTimeoutError::Closed`] if the queue is closed.
    pub fn send_timeout(
        &self,
        msg: T,
        kind: MsgKind,
        timeout: Duration,
    ) -> Result<(), SendTimeoutError<T>> {
        let mut state = self.state.lock();

        if kind.is_alarm() {
            match self.wait_alarm_slot(&mut state, Instant::now().checked_add(timeout)) {
                Wait::Ready => {}
                Wait::Closed => return Err(SendTimeoutError::Closed(msg)),
                Wait::TimedOut => return Err(SendTimeoutError::Timeout(msg)),
            }
        } else if state.closed {
            return Err(SendTimeoutError::Closed(msg));
        }

        self.install(&mut state, msg, kind)
            .map_err(SendTimeoutError::from)
    }

    /// Stores `msg` on its channel and wakes one receiver.
    ///
    /// Caller holds the lock, has checked `closed`, and for alarms has
    /// observed an empty slot.
    fn install(&self, state: &mut State<T>, msg: T, kind: MsgKind) -> Result<(), SendError<T>> {
        match kind {
            MsgKind::Alarm => {
                debug_assert!(state.alarm.is_none());
                state.alarm = Some(msg);
            }
            MsgKind::Normal => {
                if let Err(err) = state.normal.try_reserve(1) {
                    tracing::warn!(pending = state.len(), %err, "normal channel cannot grow");
                    return Err(SendError::NoRoom(msg));
                }
                state.normal.push_back(msg);
            }
        }

        self.not_empty.notify_one();
        Ok(())
    }

    /// Waits until the alarm slot is empty.
    ///
    /// Closing takes precedence over a free slot so no alarm is accepted
    /// after close.
    fn wait_alarm_slot(
        &self,
        state: &mut MutexGuard<'_, State<T>>,
        deadline: Option<Instant>,
    ) -> Wait {
        let mut timed_out = false;
        loop {
            if state.closed {
                return Wait::Closed;
            }
            if state.alarm.is_none() {
                return Wait::Ready;
            }
            if timed_out {
                return Wait::TimedOut;
            }

            tracing::trace!("alarm slot occupied, sender waiting");
            timed_out = wait_on(&self.alarm_free, state, deadline);
        }
    }

    // ------------------------------------------------------------------------
    // Receive
    // ------------------------------------------------------------------------

    /// Receives a message, blocking while the queue is empty.
    ///
    /// A pending alarm is always returned before any normal message,
    /// regardless of arrival order. Receiving an alarm wakes one sender
    /// waiting for the slot.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError`] once the queue is closed and fully drained.
    /// Messages queued before [`close`](AlarmQueue::close) are still handed
    /// out first.
    ///
    /// # Example
    ///
    /// ```
    /// use nexus_alarm::{AlarmQueue, Delivery};
    /// use std::sync::Arc;
    /// use std::thread;
    ///
    /// let q = Arc::new(AlarmQueue::new());
    /// let tx = Arc::clone(&q);
    ///
    /// thread::spawn(move || tx.send_normal(42).unwrap());
    ///
    /// assert_eq!(q.recv().unwrap(), Delivery::Normal(42));
    /// ```
    pub fn recv(&self) -> Result<Delivery<T>, RecvError> {
        let mut state = self.state.lock();

        match self.wait_not_empty(&mut state, None) {
            Wait::Ready => self.take(&mut state).ok_or(RecvError),
            Wait::Closed | Wait::TimedOut => Err(RecvError),
        }
    }

    /// Attempts to receive without blocking.
    ///
    /// # Errors
    ///
    /// - [`TryRecvError::Empty`] if nothing is pending.
    /// - [`TryRecvError::Closed`] if the queue is closed and drained.
    pub fn try_recv(&self) -> Result<Delivery<T>, TryRecvError> {
        let mut state = self.state.lock();

        match self.take(&mut state) {
            Some(msg) => Ok(msg),
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Receives a message, waiting at most `timeout` for one to arrive.
    ///
    /// # Errors
    ///
    /// - [`RecvTimeoutError::Timeout`] if nothing arrived in time.
    /// - [`RecvTimeoutError::Closed`] if the queue is closed and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Delivery<T>, RecvTimeoutError> {
        let mut state = self.state.lock();

        match self.wait_not_empty(&mut state, Instant::now().checked_add(timeout)) {
            Wait::Ready => self.take(&mut state).ok_or(RecvTimeoutError::Closed),
            Wait::Closed => Err(RecvTimeoutError::Closed),
            Wait::TimedOut => Err(RecvTimeoutError::Timeout),
        }
    }

    /// Removes the highest-priority message. Caller holds the lock.
    fn take(&self, state: &mut State<T>) -> Option<Delivery<T>> {
        if let Some(msg) = state.alarm.take() {
            self.alarm_free.notify_one();
            return Some(Delivery::Alarm(msg));
        }

        state.normal.pop_front().map(Delivery::Normal)
    }

    /// Waits until at least one message is pending.
    ///
    /// Pending messages take precedence over `closed` so a closed queue
    /// still drains.
    fn wait_not_empty(
        &self,
        state: &mut MutexGuard<'_, State<T>>,
        deadline: Option<Instant>,
    ) -> Wait {
        let mut timed_out = false;
        loop {
            if !state.is_empty() {
                return Wait::Ready;
            }
            if state.closed {
                return Wait::Closed;
            }
            if timed_out {
                return Wait::TimedOut;
            }

            tracing::trace!("queue empty, receiver waiting");
            timed_out = wait_on(&self.not_empty, state, deadline);
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the number of pending messages, counting the alarm slot.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Returns `true` if the alarm slot is occupied.
    pub fn alarm_present(&self) -> bool {
        self.state.lock().alarm.is_some()
    }

    /// Returns the number of pending alarms: always `0` or `1`.
    pub fn alarms(&self) -> usize {
        usize::from(self.alarm_present())
    }

    /// Returns the occupancy of both channels from a single locked read.
    pub fn state(&self) -> QueueState {
        let state = self.state.lock();
        QueueState::from_parts(!state.normal.is_empty(), state.alarm.is_some())
    }

    // ------------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------------

    /// Closes the queue and wakes every blocked thread.
    ///
    /// Afterwards sends fail with `Closed` (alarm senders already waiting
    /// for the slot get their message back), and receivers drain whatever
    /// is still queued before reporting `Closed`.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was
    /// already closed.
    ///
    /// # Example
    ///
    /// ```
    /// use nexus_alarm::{AlarmQueue, Delivery};
    ///
    /// let q = AlarmQueue::new();
    /// q.send_normal(1).unwrap();
    ///
    /// assert!(q.close());
    /// assert!(!q.close());
    /// assert!(q.send_normal(2).is_err());
    ///
    /// assert_eq!(q.recv().unwrap(), Delivery::Normal(1));
    /// assert!(q.recv().is_err());
    /// ```
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        let pending = state.len();
        drop(state);

        let receivers = self.not_empty.notify_all();
        let senders = self.alarm_free.notify_all();
        tracing::debug!(pending, receivers, senders, "alarm queue closed");
        true
    }

    /// Returns `true` if [`close`](AlarmQueue::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Parks on `cond` until notified or `deadline` passes. Returns `true` on
/// timeout. `None` waits indefinitely.
#[inline]
fn wait_on<T>(cond: &Condvar, guard: &mut MutexGuard<'_, T>, deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => cond.wait_until(guard, deadline).timed_out(),
        None => {
            cond.wait(guard);
            false
        }
    }
}

impl<T> Default for AlarmQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AlarmQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AlarmQueue")
            .field("normal", &state.normal.len())
            .field("alarm", &state.alarm.is_some())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for AlarmQueue<T> {
    fn drop(&mut self) {
        // Undelivered payloads are dropped with the state.
        let pending = self.state.get_mut().len();
        if pending > 0 {
            tracing::debug!(pending, "alarm queue dropped with undelivered messages");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    // ============================================================================
    // Basic Operations
    // ============================================================================

    #[test]
    fn basic_send_recv() {
        let q = AlarmQueue::<u64>::new();

        q.send(1, MsgKind::Normal).unwrap();
        q.send(2, MsgKind::Normal).unwrap();
        q.send(3, MsgKind::Normal).unwrap();

        assert_eq!(q.recv().unwrap(), Delivery::Normal(1));
        assert_eq!(q.recv().unwrap(), Delivery::Normal(2));
        assert_eq!(q.recv().unwrap(), Delivery::Normal(3));
    }

    #[test]
    fn alarm_then_normal_scenario() {
        let q = AlarmQueue::new();

        assert!(q.send("A", MsgKind::Alarm).is_ok());
        assert!(q.send("B", MsgKind::Normal).is_ok());

        assert_eq!(q.recv().unwrap(), Delivery::Alarm("A"));
        assert_eq!(q.recv().unwrap(), Delivery::Normal("B"));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn try_send_try_recv() {
        let q = AlarmQueue::<u64>::new();

        assert!(matches!(q.try_recv(), Err(TryRecvError::Empty)));

        assert!(q.try_send(1, MsgKind::Alarm).is_ok());
        assert!(matches!(
            q.try_send(2, MsgKind::Alarm),
            Err(TrySendError::AlarmPending(2))
        ));
        assert!(q.try_send(3, MsgKind::Normal).is_ok());

        assert_eq!(q.try_recv().unwrap(), Delivery::Alarm(1));
        assert_eq!(q.try_recv().unwrap(), Delivery::Normal(3));
        assert!(matches!(q.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn with_capacity_is_not_a_limit() {
        let q = AlarmQueue::with_capacity(2);
        for i in 0..100u32 {
            q.send_normal(i).unwrap();
        }
        assert_eq!(q.len(), 100);
    }

    #[test]
    fn try_with_capacity_reports_out_of_memory() {
        let err = AlarmQueue::<u64>::try_with_capacity(usize::MAX).unwrap_err();
        assert_eq!(err, QueueError::OutOfMemory);

        let q = AlarmQueue::<u64>::try_with_capacity(16).unwrap();
        assert!(q.is_empty());
    }

    // ============================================================================
    // Priority
    // ============================================================================

    #[test]
    fn alarm_beats_earlier_normals() {
        let q = AlarmQueue::new();

        for i in 0..10u32 {
            q.send_normal(i).unwrap();
        }
        q.send_alarm(99).unwrap();

        assert_eq!(q.recv().unwrap(), Delivery::Alarm(99));
        for i in 0..10 {
            assert_eq!(q.recv().unwrap(), Delivery::Normal(i));
        }
    }

    #[test]
    fn alarm_slot_refills_after_drain() {
        let q = AlarmQueue::new();

        q.send_normal(1u32).unwrap();
        q.send_alarm(10).unwrap();
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(10));

        q.send_alarm(20).unwrap();
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(20));
        assert_eq!(q.recv().unwrap(), Delivery::Normal(1));
    }

    // ============================================================================
    // Size / State Queries
    // ============================================================================

    #[test]
    fn len_counts_both_channels() {
        let q = AlarmQueue::new();
        assert_eq!(q.len(), 0);
        assert!(q.is_empty());

        q.send_normal(1u8).unwrap();
        q.send_normal(2).unwrap();
        assert_eq!(q.len(), 2);

        q.send_alarm(3).unwrap();
        assert_eq!(q.len(), 3);
        assert_eq!(q.alarms(), 1);

        q.recv().unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.alarms(), 0);

        q.recv().unwrap();
        q.recv().unwrap();
        assert!(q.is_empty());
    }

    #[test]
    fn state_transitions() {
        let q = AlarmQueue::new();
        assert_eq!(q.state(), QueueState::Empty);

        q.send_normal(1u8).unwrap();
        assert_eq!(q.state(), QueueState::NormalOnly);

        q.send_alarm(2).unwrap();
        assert_eq!(q.state(), QueueState::Both);

        q.recv().unwrap();
        assert_eq!(q.state(), QueueState::NormalOnly);

        q.recv().unwrap();
        assert_eq!(q.state(), QueueState::Empty);

        q.send_alarm(3).unwrap();
        assert_eq!(q.state(), QueueState::AlarmOnly);
        assert!(q.alarm_present());

        q.recv().unwrap();
        assert_eq!(q.state(), QueueState::Empty);
        assert!(!q.alarm_present());
    }

    // ============================================================================
    // Identity
    // ============================================================================

    #[test]
    fn payload_identity_preserved() {
        let q = AlarmQueue::new();

        let a = Box::new(1u64);
        let b = Box::new(2u64);
        let a_ptr: *const u64 = &*a;
        let b_ptr: *const u64 = &*b;

        q.send(b, MsgKind::Normal).unwrap();
        q.send(a, MsgKind::Alarm).unwrap();

        let first = q.recv().unwrap().into_inner();
        let second = q.recv().unwrap().into_inner();

        assert!(std::ptr::eq(&*first, a_ptr));
        assert!(std::ptr::eq(&*second, b_ptr));
    }

    #[test]
    fn arc_payload_not_cloned() {
        let q = AlarmQueue::new();
        let payload = Arc::new(String::from("shared"));

        q.send_alarm(Arc::clone(&payload)).unwrap();
        assert_eq!(Arc::strong_count(&payload), 2);

        let got = q.recv().unwrap().into_inner();
        assert!(Arc::ptr_eq(&got, &payload));
        assert_eq!(Arc::strong_count(&payload), 2);
    }

    // ============================================================================
    // Blocking Behavior
    // ============================================================================

    #[test]
    fn recv_blocks_until_send() {
        let q = Arc::new(AlarmQueue::<u64>::new());
        let rx = Arc::clone(&q);

        let start = Instant::now();
        let handle = thread::spawn(move || rx.recv().unwrap());

        thread::sleep(Duration::from_millis(50));
        q.send_normal(42).unwrap();

        assert_eq!(handle.join().unwrap(), Delivery::Normal(42));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn second_alarm_blocks_until_recv() {
        let q = Arc::new(AlarmQueue::<u64>::new());
        q.send_alarm(1).unwrap();

        let tx = Arc::clone(&q);
        let start = Instant::now();
        let handle = thread::spawn(move || {
            tx.send_alarm(2).unwrap(); // Should block
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.len(), 1);
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(1));

        let waited = handle.join().unwrap();
        assert!(waited >= Duration::from_millis(50));
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(2));
    }

    #[test]
    fn normal_send_never_blocks_on_alarm() {
        let q = AlarmQueue::new();
        q.send_alarm(0u32).unwrap();

        // Slot is occupied; normal sends must still go straight through.
        for i in 1..=100 {
            q.send_normal(i).unwrap();
        }
        assert_eq!(q.len(), 101);
    }

    // ============================================================================
    // Timeouts
    // ============================================================================

    #[test]
    fn recv_timeout_expires_on_empty() {
        let q = AlarmQueue::<u64>::new();

        let start = Instant::now();
        let err = q.recv_timeout(Duration::from_millis(30)).unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn recv_timeout_returns_pending() {
        let q = AlarmQueue::new();
        q.send_normal(5u8).unwrap();

        assert_eq!(
            q.recv_timeout(Duration::from_millis(10)).unwrap(),
            Delivery::Normal(5)
        );
    }

    #[test]
    fn send_timeout_expires_on_occupied_slot() {
        let q = AlarmQueue::new();
        q.send_alarm(1u64).unwrap();

        let err = q
            .send_timeout(2, MsgKind::Alarm, Duration::from_millis(30))
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.into_inner(), 2);

        // Queue untouched
        assert_eq!(q.len(), 1);
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(1));
    }

    #[test]
    fn send_timeout_succeeds_when_slot_frees() {
        let q = Arc::new(AlarmQueue::<u64>::new());
        q.send_alarm(1).unwrap();

        let rx = Arc::clone(&q);
        let drainer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            rx.recv().unwrap()
        });

        q.send_timeout(2, MsgKind::Alarm, Duration::from_secs(5))
            .unwrap();

        assert_eq!(drainer.join().unwrap(), Delivery::Alarm(1));
        assert_eq!(q.recv().unwrap(), Delivery::Alarm(2));
    }

    #[test]
    fn send_timeout_normal_does_not_wait() {
        let q = AlarmQueue::new();
        q.send_alarm(1u64).unwrap();

        q.send_timeout(2, MsgKind::Normal, Duration::ZERO).unwrap();
        assert_eq!(q.len(), 2);
    }

    // ============================================================================
    // Close
    // ============================================================================

    #[test]
    fn close_rejects_sends() {
        let q = AlarmQueue::new();
        assert!(q.close());
        assert!(q.is_closed());

        assert!(matches!(q.send_normal(1u8), Err(SendError::Closed(1))));
        assert!(matches!(q.send_alarm(2), Err(SendError::Closed(2))));
        assert!(matches!(
            q.try_send(3, MsgKind::Normal),
            Err(TrySendError::Closed(3))
        ));
        assert!(matches!(q.try_recv(), Err(TryRecvError::Closed)));
        assert!(q.recv().is_err());
    }

    #[test]
    fn recv_drains_before_error_when_closed() {
        let q = AlarmQueue::new();

        q.send_normal(1u8).unwrap();
        q.send_alarm(2).unwrap();
        q.close();

        assert_eq!(q.recv().unwrap(), Delivery::Alarm(2));
        assert_eq!(q.recv().unwrap(), Delivery::Normal(1));
        assert!(q.recv().is_err());
        assert!(matches!(
            q.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Closed)
        ));
    }

    #[test]
    fn recv_wakes_on_close() {
        let q = Arc::new(AlarmQueue::<u64>::new());
        let rx = Arc::clone(&q);

        let handle = thread::spawn(move || rx.recv());

        thread::sleep(Duration::from_millis(50));
        q.close();

        // Should complete, not hang
        assert_eq!(handle.join().unwrap(), Err(RecvError));
    }

    #[test]
    fn blocked_alarm_sender_gets_message_back_on_close() {
        let q = Arc::new(AlarmQueue::<String>::new());
        q.send_alarm("first".to_string()).unwrap();

        let tx = Arc::clone(&q);
        let handle = thread::spawn(move || tx.send_alarm("second".to_string()));

        thread::sleep(Duration::from_millis(50));
        q.close();

        match handle.join().unwrap() {
            Err(SendError::Closed(s)) => assert_eq!(s, "second"),
            other => panic!("expected Closed, got {other:?}"),
        }

        // The alarm already in the slot is still delivered.
        assert_eq!(q.recv().unwrap(), Delivery::Alarm("first".to_string()));
    }

    // ============================================================================
    // Drop Behavior
    // ============================================================================

    #[test]
    fn values_dropped_on_queue_drop() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct DropCounter;
        impl Drop for DropCounter {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);

        let q = AlarmQueue::new();
        q.send_normal(DropCounter).unwrap();
        q.send_normal(DropCounter).unwrap();
        q.send_alarm(DropCounter).unwrap();

        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);

        drop(q);

        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_send_returns_value() {
        let q = AlarmQueue::new();
        q.send_alarm("hello".to_string()).unwrap();

        match q.try_send("world".to_string(), MsgKind::Alarm) {
            Err(TrySendError::AlarmPending(s)) => assert_eq!(s, "world"),
            _ => panic!("expected AlarmPending error"),
        }

        q.close();

        match q.send_normal("test".to_string()) {
            Err(SendError::Closed(s)) => assert_eq!(s, "test"),
            _ => panic!("expected Closed error"),
        }
    }

    // ============================================================================
    // Cross-Thread
    // ============================================================================

    #[test]
    fn fifo_ordering_cross_thread() {
        let q = Arc::new(AlarmQueue::<u64>::new());
        let rx = Arc::clone(&q);

        let handle = thread::spawn(move || {
            let mut expected = 0u64;
            while expected < 10_000 {
                let val = rx.recv().unwrap().into_inner();
                assert_eq!(val, expected, "FIFO order violated");
                expected += 1;
            }
        });

        for i in 0..10_000 {
            q.send_normal(i).unwrap();
        }

        handle.join().unwrap();
    }

    #[test]
    fn many_receivers_each_woken() {
        let q = Arc::new(AlarmQueue::<u64>::new());

        let receivers: Vec<_> = (0..4)
            .map(|_| {
                let rx = Arc::clone(&q);
                thread::spawn(move || rx.recv().unwrap().into_inner())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        for i in 0..4 {
            q.send_normal(i).unwrap();
        }

        let mut got: Vec<u64> = receivers.into_iter().map(|h| h.join().unwrap()).collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }

    #[test]
    fn alarm_ping_pong_completes() {
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let q = Arc::new(AlarmQueue::<u64>::new());
            let tx = Arc::clone(&q);

            let producer = thread::spawn(move || {
                for i in 0..1000 {
                    tx.send_alarm(i).unwrap();
                }
            });

            for i in 0..1000 {
                assert_eq!(q.recv().unwrap(), Delivery::Alarm(i));
            }

            producer.join().unwrap();
            done_tx.send(()).unwrap();
        });

        let result = done_rx.recv_timeout(Duration::from_secs(5));
        assert!(result.is_ok(), "Test timed out - possible deadlock!");

        handle.join().unwrap();
    }

    #[test]
    fn debug_does_not_expose_payloads() {
        let q = AlarmQueue::new();
        q.send_normal(1u8).unwrap();
        let s = format!("{q:?}");
        assert!(s.contains("AlarmQueue"));
        assert!(s.contains("normal: 1"));
    }
}

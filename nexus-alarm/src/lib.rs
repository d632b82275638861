//! A blocking message queue with two classes of message: normal messages
//! delivered in FIFO order, and a single-slot alarm that always jumps the
//! line.
//!
//! # Model
//!
//! ```text
//!                       ┌──────────────────────────────┐
//!  send(m, Normal) ───► │ normal: m1 → m2 → ... → mN   │ ──┐
//!                       ├──────────────────────────────┤   ├──► recv()
//!  send(a, Alarm)  ───► │ alarm slot: [ a ]            │ ──┘
//!   (waits while full)  └──────────────────────────────┘
//!                            one lock, two condvars
//! ```
//!
//! - The normal channel is unbounded and strictly FIFO.
//! - The alarm slot holds at most one message. A second alarm send blocks
//!   until a receiver drains the first.
//! - A receive returns the alarm whenever one is pending, no matter how many
//!   normal messages arrived before it.
//! - A receive on an empty queue blocks until something is sent.
//!
//! Payloads are moved in and moved out. The queue never clones them, so a
//! `Box` or `Arc` that goes in is the same allocation that comes out.
//!
//! # Example
//!
//! ```
//! use nexus_alarm::{AlarmQueue, Delivery, MsgKind};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let q = Arc::new(AlarmQueue::new());
//!
//! let producer = {
//!     let q = Arc::clone(&q);
//!     thread::spawn(move || {
//!         q.send("status ok", MsgKind::Normal).unwrap();
//!         q.send("overheating", MsgKind::Alarm).unwrap();
//!     })
//! };
//! producer.join().unwrap();
//!
//! // The alarm was sent last but comes out first.
//! assert_eq!(q.recv().unwrap(), Delivery::Alarm("overheating"));
//! assert_eq!(q.recv().unwrap(), Delivery::Normal("status ok"));
//! ```
//!
//! # Wait / Wake Protocol
//!
//! ```text
//! Receiver:                          Sender:
//! ─────────────────────              ─────────────────────
//! lock                               lock
//! while empty && !closed:            [alarm] while slot full && !closed:
//!     wait(not_empty)                    wait(alarm_free)
//! take alarm, else pop front         install, notify_one(not_empty)
//! [alarm taken] notify_one(alarm_free)
//! unlock                             unlock
//! ```
//!
//! Every wait re-tests its condition after waking, so spurious wakeups and
//! races between several waiters are harmless. Because the condition is
//! checked and the wait begun under the same lock, a notification sent after
//! a waiter started waiting is never missed.
//!
//! # Shutdown
//!
//! Blocking calls have no timeout by default. [`AlarmQueue::close`] (or
//! [`Handle::destroy`]) wakes everything: alarm senders stuck on the slot get
//! their message back, receivers drain what is left and then see `Closed`.
//! Timed variants ([`AlarmQueue::send_timeout`], [`AlarmQueue::recv_timeout`])
//! and non-blocking ones ([`AlarmQueue::try_send`], [`AlarmQueue::try_recv`])
//! are available when waiting forever is not acceptable.
//!
//! # Handles
//!
//! [`Handle`] is a clonable, possibly-uninitialized reference to a queue that
//! reports the flat [`QueueError`] status set (`Uninitialized`,
//! `NullMessage`, `NoRoom`, `NoMessage`, `OutOfMemory`, `Closed`). Use it
//! where a missing queue, payload, or output slot is a runtime condition
//! rather than something the types can rule out.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber: `trace`
//! when a thread starts waiting, `debug` on close and when a queue is dropped
//! with undelivered messages, `warn` when storage cannot grow.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod handle;
mod message;
mod queue;

pub use error::{
    QueueError, RecvError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError,
    TrySendError,
};
pub use handle::{Handle, Rejected, DEFAULT_CAPACITY};
pub use message::{Delivery, MsgKind, QueueState};
pub use queue::AlarmQueue;

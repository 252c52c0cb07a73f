//! Actor-based monitoring
//!
//! Every registered target gets its own [`monitor::TargetMonitor`] running as
//! an independent tokio task. Monitors never share device connections; the
//! only state they share is the cooldown tracker and the dispatcher.
//!
//! ```text
//!  Registry ──commands──▶ TargetMonitor(A)   TargetMonitor(B)   ...
//!                             │                  │
//!                        poll collector     poll collector
//!                             │                  │
//!                           evaluate ──▶ CooldownTracker (shared)
//!                             │
//!                      NotificationDispatcher ──▶ NotificationChannel
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each monitor has an mpsc command channel (start, stop,
//!    check now, update interval, shutdown)
//! 2. **Request/Response**: oneshot channels carry answers back
//! 3. **Shared status**: the last snapshot sits behind a `RwLock` so status
//!    reads never wait for a slow poll

pub mod messages;
pub mod monitor;

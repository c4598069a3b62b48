//! Session runtime: the [`SessionManager`] and the collaborators it is
//! built from.
//!
//! - [`session`]: per-session bookkeeping, zone checks, lifecycle hooks.
//!   Start here.
//! - [`clock`]: [`Clock`] trait with [`SystemClock`] and [`ManualClock`],
//!   plus the [`Throttle`] gate used by periodic checks.
//! - [`task`]: read-only view of the agent's current task and edited files.
//! - [`notify`]: best-effort group-chat notifications.

pub mod clock;
pub mod notify;
pub mod session;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock, Throttle};
pub use notify::{HttpNotifier, NoopNotifier, Notifier};
pub use session::{CompactionType, SessionManager, SessionState};
pub use task::{FileTaskSource, FixedTask, TaskSource};

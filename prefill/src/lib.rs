//! Synthetic-data prefill for a Galaxy API instance.
//!
//! [`Orchestrator`] drives a run: it optionally flushes the backing store,
//! creates users and games concurrently, then builds friendships and
//! purchases on top of them. Remote services are reached through the traits
//! in [`api`], so a run can be pointed at the real HTTP endpoints or at
//! in-process fakes.

pub mod api;
pub mod fanout;
pub mod flush;
pub mod friends;
pub mod games;
pub mod orchestrator;
pub mod purchases;
pub mod sampling;
pub mod session;
pub mod users;


pub use orchestrator::{AbortError, Orchestrator, RunState, Services};

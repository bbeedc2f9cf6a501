//! # nextver_events
//!
//! Event composition engine for nextver.
//!
//! Components never call each other directly. They register interest in
//! typed channels and combine channels with operators whose timing semantics
//! are precise enough to express every ordering dependency of the
//! application (configuration before git, git before cache, and so on).
//!
//! # Architecture
//!
//! - **Channels**: root [`Channel`] nodes, one per [`Event`] marker, held by a [`Hub`]
//! - **Sinks**: [`Sink::Unschedulable`] runs inline, [`Sink::Schedulable`] is deferred
//! - **Emission context**: per-emission [`EmitContext`] that linearises deferred work
//! - **Fan-out**: registration-ordered, snapshot-based multicast ([`FanOut`], [`Node`])
//! - **Caching**: [`Cached`] nodes with [`Retain::Latest`], [`Retain::Earliest`], [`Retain::First`]
//! - **Lifetime**: [`Once`], one value per registration
//! - **Filter/map**: [`Where`], [`Transform`]
//! - **Pairing**: [`Zip`] / [`And`]
//! - **Gate-rescope**: [`GateRescope`] with a [`Replay`] strategy
//!
//! ```text
//!   producer ──emit──► Channel ──► Cached/Where/Zip/GateRescope ──► ... ──► handler
//!                        │            (unschedulable, inline)              (schedulable,
//!                        └──────────── EmitContext ◄── deferred jobs ───────  drained after)
//! ```
//!
//! # Example
//!
//! ```rust
//! use nextver_events::{event, ops, Hub};
//!
//! event! { pub Configured: String = "configured" }
//! event! { pub Started: u32 = "started" }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), nextver_events::EventError> {
//! let hub = Hub::new();
//! let pairs = ops::once_every_replay_first(&hub.source::<Started>()?, &hub.source::<Configured>()?);
//! ops::on(&pairs, |(run, config)| {
//!     println!("run {run} with {config}");
//!     Ok(())
//! });
//!
//! hub.emit::<Configured>("release".to_string()).await?;
//! hub.emit::<Started>(1).await?;
//! # Ok(())
//! # }
//! ```

pub mod caching;
pub mod context;
pub mod error;
pub mod fanout;
pub mod filter;
pub mod gate;
pub mod hub;
pub mod lifetime;
pub mod ops;
pub mod sink;
pub mod subscription;
pub mod zip;

// Re-export main types for convenience
pub use caching::{Cached, Retain};
pub use context::EmitContext;
pub use error::{EventError, EventResult};
pub use fanout::{Channel, FanOut, Inspect, Inspection, Node, PassThrough};
pub use filter::{Transform, Where};
pub use gate::{GateRescope, Replay};
pub use hub::{Event, Hub};
pub use lifetime::Once;
pub use sink::{Emittable, Payload, Sink, Source};
pub use subscription::{CompositeSubscription, SerialSubscription, Subscription};
pub use zip::{And, Zip};

//! tidepool: adaptive object pool.
//!
//! Lends out expensive-to-build members and decides on its own when to add
//! or drop members, based on how many are borrowed. The pool:
//!
//! - Plans capacity toward a target utilization, within size bounds and a
//!   per-step scale cap
//! - Debounces shrinking with a cooldown window
//! - Retries fetches with exponential backoff, then reports overload
//! - Resets members on creation and on every return
//!
//! # Architecture
//!
//! ```text
//! ObjectPool
//!   ├── Capacity planner (pure: occupancy + pending delta → signed scale)
//!   ├── Pool state (one tokio Mutex)
//!   │     ├── idle: VecDeque<Member>      (FIFO)
//!   │     ├── borrowed: VecDeque<Member>
//!   │     └── cooling flag ← cleared by a detached cooldown task
//!   └── Admission control
//!         fetch  = plan(+1) → scale → pop idle (retry with backoff) → Overload
//!         remand = plan(-1) → scale → reset → borrowed → idle
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tidepool::{ObjectPool, PoolConfig, PoolMember};
//!
//! #[derive(Default)]
//! struct Splitter {
//!     digest: Option<String>,
//! }
//!
//! impl PoolMember for Splitter {
//!     type Args = String;
//!
//!     fn initialize(&mut self, digest: String) {
//!         self.digest = Some(digest);
//!     }
//!
//!     fn reset(&mut self) {
//!         self.digest = None;
//!     }
//! }
//!
//! # async fn run() -> tidepool::PoolResult<()> {
//! let pool = ObjectPool::new(Splitter::default, PoolConfig::default())?;
//! pool.prewarm().await?;
//!
//! let splitter = pool.fetch().await?;
//! splitter.initialize("hello, world".to_string());
//! pool.remand(&splitter).await?;
//!
//! let words = pool
//!     .with_lease(|splitter| async move {
//!         splitter.initialize("hello, world, again".to_string());
//!         let count = splitter.lock().digest.as_deref().map_or(0, |d| d.split(',').count());
//!         count
//!     })
//!     .await?;
//! assert_eq!(words, 3);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lease;
pub mod member;
pub mod planner;
pub mod pool;

pub use config::{PoolConfig, ScalingPolicy};
pub use error::{PoolError, PoolResult};
pub use lease::Lease;
pub use member::{Member, MemberId, PoolMember};
pub use planner::Occupancy;
pub use pool::{Factory, ObjectPool, PoolStats};

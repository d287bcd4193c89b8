//! Object pool: membership state and admission control.
//!
//! Every public operation that changes membership runs the same sequence:
//! ask the planner for a signed scale amount under the lock, apply it with
//! `scale` (which takes the lock again), then act on the idle/borrowed
//! queues. Fetch retries with exponential backoff and never sleeps while
//! holding the lock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::member::{Member, MemberId, PoolMember};
use crate::planner::{self, Occupancy};

/// Produces a fresh member. Called with the pool lock held.
pub type Factory<M> = Arc<dyn Fn() -> M + Send + Sync>;

/// Membership guarded by the pool lock.
struct PoolState<M> {
    /// Members available for fetch, oldest first.
    idle: VecDeque<Member<M>>,
    /// Members currently lent out.
    borrowed: VecDeque<Member<M>>,
    /// Set after a shrink; scaling is suppressed until the cooldown clears it.
    cooling: bool,
    next_id: u64,
}

impl<M> PoolState<M> {
    fn new() -> Self {
        Self {
            idle: VecDeque::new(),
            borrowed: VecDeque::new(),
            cooling: false,
            next_id: 1,
        }
    }

    fn size(&self) -> usize {
        self.idle.len() + self.borrowed.len()
    }

    fn occupancy(&self) -> Occupancy {
        Occupancy {
            size: self.size(),
            borrowed: self.borrowed.len(),
        }
    }

    fn allocate_id(&mut self) -> MemberId {
        let id = MemberId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Idle members followed by borrowed members.
    fn members(&self) -> Vec<Member<M>> {
        self.idle.iter().chain(self.borrowed.iter()).cloned().collect()
    }
}

/// Point-in-time pool statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoolStats {
    /// Members available for fetch.
    pub idle: usize,
    /// Members currently lent out.
    pub borrowed: usize,
    /// Total members (idle + borrowed).
    pub size: usize,
    /// `borrowed / size`, rounded to two decimals.
    pub utilization: f64,
    /// Whether scaling is suppressed by a shrink cooldown.
    pub cooling: bool,
}

/// A bounded pool of reusable members that resizes itself with demand.
///
/// The pool starts empty; call `prewarm` once inside a tokio runtime to
/// reach `desired_size`. Cloning an `ObjectPool` yields another handle to
/// the same pool.
pub struct ObjectPool<M: PoolMember> {
    state: Arc<Mutex<PoolState<M>>>,
    config: Arc<PoolConfig>,
    factory: Factory<M>,
}

impl<M: PoolMember> Clone for ObjectPool<M> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<M: PoolMember> ObjectPool<M> {
    /// Create an empty pool. Fails if `config` does not validate.
    pub fn new<F>(factory: F, config: PoolConfig) -> PoolResult<Self>
    where
        F: Fn() -> M + Send + Sync + 'static,
    {
        config.validate()?;
        debug!(
            policy = %config.policy,
            desired = config.desired_size,
            min = config.min_size,
            max = config.max_size,
            "object pool created"
        );
        Ok(Self {
            state: Arc::new(Mutex::new(PoolState::new())),
            config: Arc::new(config),
            factory: Arc::new(factory),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Grow the pool to `desired_size`, bypassing the planner.
    ///
    /// Only tops up: calling it again on a warm pool does nothing.
    pub async fn prewarm(&self) -> PoolResult<()> {
        let size = self.size().await;
        let needed = self.config.desired_size.saturating_sub(size);
        self.scale(needed as i64).await?;
        info!(desired = self.config.desired_size, warmed = needed, "object pool warmed");
        Ok(())
    }

    /// Planner output for a pending usage change, evaluated against the
    /// current occupancy.
    pub async fn plan(&self, pending_delta: i64) -> i64 {
        let state = self.state.lock().await;
        planner::plan(&self.config, state.occupancy(), pending_delta)
    }

    /// Add (`amount > 0`) or remove (`amount < 0`) idle members.
    ///
    /// Does nothing while a shrink cooldown is active. A shrink with a
    /// non-zero cooldown starts one. Removing more members than are idle is
    /// an invariant violation and leaves the pool untouched. Growth is not
    /// clamped here; the planner and `prewarm` keep it within `max_size`.
    pub async fn scale(&self, amount: i64) -> PoolResult<()> {
        let mut state = self.state.lock().await;

        if amount == 0 {
            return Ok(());
        }
        if state.cooling {
            debug!(amount, "scale suppressed during cooldown");
            return Ok(());
        }

        if amount < 0 {
            let remove = amount.unsigned_abs() as usize;
            if remove > state.idle.len() {
                error!(
                    remove,
                    idle = state.idle.len(),
                    borrowed = state.borrowed.len(),
                    "shrink exceeds idle members"
                );
                return Err(PoolError::Invariant(format!(
                    "cannot remove {remove} member(s) with only {} idle",
                    state.idle.len()
                )));
            }

            if !self.config.cooldown.is_zero() {
                state.cooling = true;
                self.spawn_cooldown_clear();
            }

            for _ in 0..remove {
                state.idle.pop_front();
            }
            debug!(removed = remove, size = state.size(), "object pool shrunk");
        } else {
            for _ in 0..amount {
                let id = state.allocate_id();
                let member = Member::new(id, (self.factory)());
                member.reset();
                state.idle.push_back(member);
            }
            debug!(added = amount, size = state.size(), "object pool grown");
        }

        Ok(())
    }

    /// Clear `cooling` once the cooldown has elapsed.
    ///
    /// Detached: holds only a weak reference, so a dropped pool is not
    /// kept alive and a failure here never reaches callers.
    fn spawn_cooldown_clear(&self) {
        let state = Arc::downgrade(&self.state);
        let cooldown = self.config.cooldown;

        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            if let Some(state) = state.upgrade() {
                state.lock().await.cooling = false;
                debug!(cooldown_ms = cooldown.as_millis() as u64, "object pool cooldown cleared");
            }
        });
    }

    /// Plan for `delta` more borrowers, then apply the plan.
    async fn regulate(&self, delta: i64) -> PoolResult<()> {
        let amount = self.plan(delta).await;
        self.scale(amount).await
    }

    /// Borrow an idle member.
    ///
    /// Makes up to `retry_times` attempts (at least one), sleeping between
    /// them with the configured backoff. Returns `PoolError::Overload` when
    /// every attempt finds the idle queue empty.
    pub async fn fetch(&self) -> PoolResult<Member<M>> {
        self.regulate(1).await?;

        let attempts = self.config.retry_times.max(1);
        let mut interval = self.config.retry_interval;

        for attempt in 1..=attempts {
            {
                let mut state = self.state.lock().await;
                if let Some(member) = state.idle.pop_front() {
                    state.borrowed.push_back(member.clone());
                    debug!(
                        member = %member.id(),
                        attempt,
                        borrowed = state.borrowed.len(),
                        size = state.size(),
                        "member fetched"
                    );
                    return Ok(member);
                }
            }

            if attempt < attempts {
                debug!(
                    attempt,
                    wait_ms = interval.as_millis() as u64,
                    "no idle member, backing off"
                );
                tokio::time::sleep(interval).await;
                interval = backoff(interval, self.config.retry_backoff);
            }
        }

        warn!(attempts, max = self.config.max_size, "object pool overloaded");
        Err(PoolError::Overload { attempts })
    }

    /// Return a borrowed member, resetting it before it becomes idle.
    ///
    /// Capacity is planned for the post-return occupancy before the member
    /// is checked. Fails with `PoolError::NotBorrowed` for members this pool
    /// does not currently lend out.
    pub async fn remand(&self, member: &Member<M>) -> PoolResult<()> {
        self.regulate(-1).await?;

        let mut state = self.state.lock().await;
        let Some(position) = state.borrowed.iter().position(|m| m.ptr_eq(member)) else {
            warn!(member = %member.id(), "remand of a member that is not borrowed");
            return Err(PoolError::NotBorrowed(member.id()));
        };

        member.reset();
        if let Some(returned) = state.borrowed.remove(position) {
            state.idle.push_back(returned);
        }
        debug!(
            member = %member.id(),
            borrowed = state.borrowed.len(),
            size = state.size(),
            "member remanded"
        );
        Ok(())
    }

    pub async fn size(&self) -> usize {
        self.state.lock().await.size()
    }

    /// `borrowed / size` rounded to two decimals; 0 for an empty pool.
    pub async fn utilization(&self) -> f64 {
        let state = self.state.lock().await;
        planner::utilization(state.borrowed.len() as i64, state.size() as i64)
    }

    pub async fn is_cooling(&self) -> bool {
        self.state.lock().await.cooling
    }

    pub async fn idle_count(&self) -> usize {
        self.state.lock().await.idle.len()
    }

    pub async fn borrowed_count(&self) -> usize {
        self.state.lock().await.borrowed.len()
    }

    pub async fn is_idle(&self, member: &Member<M>) -> bool {
        self.state.lock().await.idle.iter().any(|m| m.ptr_eq(member))
    }

    pub async fn is_borrowed(&self, member: &Member<M>) -> bool {
        self.state.lock().await.borrowed.iter().any(|m| m.ptr_eq(member))
    }

    /// Consistent snapshot of all members, idle first.
    pub async fn members(&self) -> Vec<Member<M>> {
        self.state.lock().await.members()
    }

    /// Best-effort snapshot that never waits: `None` while the lock is held
    /// elsewhere. Meant for diagnostics.
    pub fn try_members(&self) -> Option<Vec<Member<M>>> {
        self.state.try_lock().ok().map(|state| state.members())
    }

    /// Map `f` over every member, idle first.
    ///
    /// The lock is held only while the member list is copied; `f` runs
    /// outside it and may observe members that have since changed hands.
    pub async fn project<R, F>(&self, f: F) -> Vec<R>
    where
        F: FnMut(&Member<M>) -> R,
    {
        self.members().await.iter().map(f).collect()
    }

    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats {
            idle: state.idle.len(),
            borrowed: state.borrowed.len(),
            size: state.size(),
            utilization: planner::utilization(state.borrowed.len() as i64, state.size() as i64),
            cooling: state.cooling,
        }
    }

    /// Log pool statistics at info level.
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        info!(
            idle = stats.idle,
            borrowed = stats.borrowed,
            size = stats.size,
            utilization = stats.utilization,
            cooling = stats.cooling,
            policy = %self.config.policy,
            "object pool stats"
        );
    }
}

impl<M: PoolMember> std::fmt::Debug for ObjectPool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Next retry interval; saturates instead of overflowing.
fn backoff(interval: Duration, multiplier: f64) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * multiplier).unwrap_or(Duration::MAX)
}

//! Scoped acquisition: members that find their own way back to the pool.

use std::future::Future;
use std::ops::Deref;

use tracing::warn;

use crate::error::PoolResult;
use crate::member::{Member, PoolMember};
use crate::pool::ObjectPool;

/// A fetched member that is remanded when the lease ends.
///
/// Call `release` to remand and observe the result. A lease dropped
/// without `release` (early return, `?`, panic, cancelled task) remands
/// its member from a task spawned on the current tokio runtime.
pub struct Lease<M: PoolMember> {
    pool: ObjectPool<M>,
    member: Member<M>,
    armed: bool,
}

impl<M: PoolMember> Lease<M> {
    pub fn member(&self) -> &Member<M> {
        &self.member
    }

    /// Remand the member now.
    pub async fn release(mut self) -> PoolResult<()> {
        let result = self.pool.remand(&self.member).await;
        self.armed = false;
        result
    }
}

impl<M: PoolMember> Deref for Lease<M> {
    type Target = Member<M>;

    fn deref(&self) -> &Member<M> {
        &self.member
    }
}

impl<M: PoolMember> Drop for Lease<M> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(member = %self.member.id(), "lease dropped outside a tokio runtime, member stays borrowed");
            return;
        };

        let pool = self.pool.clone();
        let member = self.member.clone();
        runtime.spawn(async move {
            if let Err(e) = pool.remand(&member).await {
                warn!(member = %member.id(), error = %e, "remand of dropped lease failed");
            }
        });
    }
}

impl<M: PoolMember> ObjectPool<M> {
    /// Fetch a member wrapped in a `Lease`.
    pub async fn lease(&self) -> PoolResult<Lease<M>> {
        let member = self.fetch().await?;
        Ok(Lease {
            pool: self.clone(),
            member,
            armed: true,
        })
    }

    /// Run `f` with a fetched member and remand it afterwards.
    ///
    /// The member goes back to the pool on every exit path, including a
    /// panic inside `f` or cancellation of the returned future.
    pub async fn with_lease<F, Fut, T>(&self, f: F) -> PoolResult<T>
    where
        F: FnOnce(Member<M>) -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.lease().await?;
        let output = f(lease.member().clone()).await;
        lease.release().await?;
        Ok(output)
    }
}

//! Admission control for requests, upstream fetches and render jobs.
//!
//! Three independent semaphores bound the three kinds of work. Permits are
//! owned guards: dropping one (on success, error or panic unwinding)
//! returns it to its pool.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use tile_common::{TileError, TileResult};

/// Pool sizes. Zero is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub clients: usize,
    pub network: usize,
    pub cpu: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// Requests being served.
    Client,
    /// Upstream fetches in flight.
    Network,
    /// Rasterization and encoding jobs.
    Cpu,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pool::Client => "client",
            Pool::Network => "network",
            Pool::Cpu => "cpu",
        };
        f.write_str(name)
    }
}

/// Free permits per pool at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub clients: usize,
    pub network: usize,
    pub cpu: usize,
}

#[derive(Debug)]
pub struct ConcurrencyGovernor {
    limits: PoolLimits,
    clients: Arc<Semaphore>,
    network: Arc<Semaphore>,
    cpu: Arc<Semaphore>,
}

impl ConcurrencyGovernor {
    pub fn new(limits: PoolLimits) -> Self {
        let limits = PoolLimits {
            clients: limits.clients.max(1),
            network: limits.network.max(1),
            cpu: limits.cpu.max(1),
        };
        Self {
            limits,
            clients: Arc::new(Semaphore::new(limits.clients)),
            network: Arc::new(Semaphore::new(limits.network)),
            cpu: Arc::new(Semaphore::new(limits.cpu)),
        }
    }

    /// Effective pool sizes after clamping.
    pub fn limits(&self) -> PoolLimits {
        self.limits
    }

    fn semaphore(&self, pool: Pool) -> &Arc<Semaphore> {
        match pool {
            Pool::Client => &self.clients,
            Pool::Network => &self.network,
            Pool::Cpu => &self.cpu,
        }
    }

    /// Wait for a permit from `pool`. Waiters are served in FIFO order.
    ///
    /// A saturated client pool is worth a warning: requests are now
    /// queueing in front of the service.
    pub async fn acquire(&self, pool: Pool) -> TileResult<OwnedSemaphorePermit> {
        let semaphore = self.semaphore(pool);
        if pool == Pool::Client && semaphore.available_permits() == 0 {
            warn!(
                limit = self.limits.clients,
                "Client pool saturated, request is waiting for a slot"
            );
        }
        semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TileError::Internal(format!("{} pool is closed", pool)))
    }

    pub fn available(&self) -> PoolSnapshot {
        PoolSnapshot {
            clients: self.clients.available_permits(),
            network: self.network.available_permits(),
            cpu: self.cpu.available_permits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limits(clients: usize, network: usize, cpu: usize) -> PoolLimits {
        PoolLimits {
            clients,
            network,
            cpu,
        }
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let governor = ConcurrencyGovernor::new(limits(0, 0, 0));
        assert_eq!(governor.limits(), limits(1, 1, 1));
        assert_eq!(
            governor.available(),
            PoolSnapshot {
                clients: 1,
                network: 1,
                cpu: 1
            }
        );
    }

    #[tokio::test]
    async fn test_permits_return_on_drop() {
        let governor = ConcurrencyGovernor::new(limits(2, 3, 4));

        let a = governor.acquire(Pool::Network).await.unwrap();
        let b = governor.acquire(Pool::Cpu).await.unwrap();
        assert_eq!(governor.available().network, 2);
        assert_eq!(governor.available().cpu, 3);
        assert_eq!(governor.available().clients, 2);

        drop(a);
        drop(b);
        assert_eq!(governor.available().network, 3);
        assert_eq!(governor.available().cpu, 4);
    }

    #[tokio::test]
    async fn test_saturated_pool_waits() {
        let governor = Arc::new(ConcurrencyGovernor::new(limits(1, 1, 1)));
        let held = governor.acquire(Pool::Client).await.unwrap();

        let waiter = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.acquire(Pool::Client).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_pools_are_independent() {
        let governor = ConcurrencyGovernor::new(limits(1, 1, 1));
        let _client = governor.acquire(Pool::Client).await.unwrap();
        let _network = governor.acquire(Pool::Network).await.unwrap();
        let cpu = tokio::time::timeout(Duration::from_millis(100), governor.acquire(Pool::Cpu)).await;
        assert!(cpu.is_ok());
    }
}

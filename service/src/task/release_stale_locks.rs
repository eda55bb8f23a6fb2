//! [`ReleaseStaleLocks`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::cascade,
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`ReleaseStaleLocks`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between stale [`cascade::Lock`]s sweeps.
    pub interval: time::Duration,

    /// Timeout after which a held [`cascade::Lock`] is considered stale.
    pub timeout: time::Duration,
}

/// [`Task`] for releasing [`cascade::Lock`]s left behind by cascade runs
/// that died before releasing them.
#[derive(Clone, Copy, Debug)]
pub struct ReleaseStaleLocks<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ReleaseStaleLocks<Self>, Config>>> for Service<Db>
where
    ReleaseStaleLocks<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ReleaseStaleLocks<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ReleaseStaleLocks {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::ReleaseStaleLocks` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for ReleaseStaleLocks<Service<Db>>
where
    Db: Database<
        Delete<By<cascade::Lock, cascade::AcquisitionDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline =
            cascade::AcquisitionDateTime::now() - self.config.timeout;
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`ReleaseStaleLocks`] execution.
pub type ExecutionError = Traced<database::Error>;

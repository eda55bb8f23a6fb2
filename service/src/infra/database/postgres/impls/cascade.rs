//! Cascade-lock [`Database`] implementations.

use common::operations::{By, Delete, Lock};
use tracerr::Traced;

use crate::{
    domain::{cascade, document},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Lock<By<cascade::Lock, document::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<cascade::Lock, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let target: document::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO cascade_locks (target, acquired_at) \
            VALUES ($1::VARCHAR, NOW()) \
            ON CONFLICT (target) DO NOTHING";
        self.exec(SQL, &[&target])
            .await
            .map_err(tracerr::wrap!())
            .map(|inserted| inserted > 0)
    }
}

impl<C> Database<Delete<By<cascade::Lock, document::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cascade::Lock, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let target: document::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM cascade_locks \
            WHERE target = $1::VARCHAR";
        self.exec(SQL, &[&target])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<cascade::Lock, cascade::AcquisitionDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cascade::Lock, cascade::AcquisitionDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: cascade::AcquisitionDateTime = by.into_inner();

        const SQL: &str = "\
            DELETE FROM cascade_locks \
            WHERE acquired_at < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

//! [`Document`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Patch, Select, Update};
use postgres_types::Json;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{document, Document},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Decodes a [`Document`] from the provided [`Row`].
fn decode(row: &Row) -> Document {
    Document {
        id: row.get("id"),
        type_name: row.get("type"),
        fields: row.get::<_, Json<document::Fields>>("fields").0,
        revision: row.get("revision"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Document>, document::VersionId>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Document>, document::VersionId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: document::VersionId = by.into_inner();

        const SQL: &str = "\
            SELECT id, type, fields, revision, created_at \
            FROM documents \
            WHERE id = $1::VARCHAR \
            LIMIT 1";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(decode))
    }
}

impl<C> Database<Select<By<Vec<Document>, read::document::Referencing>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Document>, read::document::Referencing>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::document::Referencing {
            target,
            lifecycle,
            type_name,
        } = by.into_inner();
        let drafts = lifecycle == document::Lifecycle::Draft;

        // The path matches the same reference shape as
        // `Fields::references()`: a `_ref` member of a top-level object, or
        // of an element of a top-level array.
        const SQL: &str = "\
            SELECT id, type, fields, revision, created_at \
            FROM documents \
            WHERE jsonb_path_exists(\
                      fields, \
                      '$.* ? (@.\"_ref\" == $target)', \
                      jsonb_build_object('target', $1::VARCHAR)) \
              AND (id LIKE 'drafts.%') = $2::BOOL \
              AND ($3::VARCHAR IS NULL \
                   OR type = $3::VARCHAR) \
            ORDER BY id";
        Ok(self
            .query(SQL, &[&target, &drafts, &type_name])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(decode)
            .collect())
    }
}

impl<C>
    Database<
        Select<By<Vec<document::VersionId>, read::document::Referencing>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<document::VersionId>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<document::VersionId>, read::document::Referencing>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::document::Referencing {
            target,
            lifecycle,
            type_name,
        } = by.into_inner();
        let drafts = lifecycle == document::Lifecycle::Draft;

        const SQL: &str = "\
            SELECT id \
            FROM documents \
            WHERE jsonb_path_exists(\
                      fields, \
                      '$.* ? (@.\"_ref\" == $target)', \
                      jsonb_build_object('target', $1::VARCHAR)) \
              AND (id LIKE 'drafts.%') = $2::BOOL \
              AND ($3::VARCHAR IS NULL \
                   OR type = $3::VARCHAR) \
            ORDER BY id";
        Ok(self
            .query(SQL, &[&target, &drafts, &type_name])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Document>, read::document::OfType>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Document>, read::document::OfType>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::document::OfType {
            type_name,
            lifecycle,
        } = by.into_inner();
        let drafts = lifecycle == document::Lifecycle::Draft;

        const SQL: &str = "\
            SELECT id, type, fields, revision, created_at \
            FROM documents \
            WHERE type = $1::VARCHAR \
              AND (id LIKE 'drafts.%') = $2::BOOL \
            ORDER BY id";
        Ok(self
            .query(SQL, &[&type_name, &drafts])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(decode)
            .collect())
    }
}

impl<C> Database<Select<By<read::document::PublishState, document::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::document::PublishState;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::document::PublishState, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: document::Id = by.into_inner();
        let published = document::VersionId::published(id.clone());
        let draft = document::VersionId::draft(id);

        const SQL: &str = "\
            SELECT EXISTS(SELECT 1 \
                          FROM documents \
                          WHERE id = $1::VARCHAR) AS published, \
                   EXISTS(SELECT 1 \
                          FROM documents \
                          WHERE id = $2::VARCHAR) AS draft";
        self.query_opt(SQL, &[&published, &draft])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                let row = row.expect("always exists");
                read::document::PublishState {
                    published: row.get("published"),
                    draft: row.get("draft"),
                }
            })
    }
}

impl<C> Database<Insert<Document>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Document>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(doc): Insert<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(doc)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Document>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(doc): Update<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        let Document {
            id,
            type_name,
            fields,
            revision,
            created_at,
        } = doc;

        const SQL: &str = "\
            INSERT INTO documents (id, type, fields, revision, created_at) \
            VALUES ($1::VARCHAR, $2::VARCHAR, $3::JSONB, $4::UUID, \
                    $5::TIMESTAMPTZ) \
            ON CONFLICT (id) DO UPDATE \
            SET type = EXCLUDED.type, \
                fields = EXCLUDED.fields, \
                revision = EXCLUDED.revision, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[&id, &type_name, &Json(&fields), &revision, &created_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Patch<document::Unset>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Patch(unset): Patch<document::Unset>,
    ) -> Result<Self::Ok, Self::Err> {
        let document::Unset { id, fields } = unset;

        const SQL: &str = "\
            UPDATE documents \
            SET fields = fields - $2::TEXT[] \
            WHERE id = $1::VARCHAR";
        self.exec(SQL, &[&id, &fields])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Document, document::VersionId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Document, document::VersionId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: document::VersionId = by.into_inner();

        const SQL: &str = "\
            DELETE FROM documents \
            WHERE id = $1::VARCHAR";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

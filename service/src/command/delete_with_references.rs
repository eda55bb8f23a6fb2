//! [`Command`] for deleting a [`Document`] along with its references.

use common::operations::{By, Delete, Lock};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{cascade, document, Document},
    infra::{database, Database},
    query::connected,
    read, Query, Service,
};

use super::{unpublish_document, CascadeSummary, Command, UnpublishDocument};

/// [`Command`] for deleting both versions of a [`Document`] after
/// unpublishing every published [`Document`] connected to it.
///
/// Connected [`Document`]s are discovered once, up front, and unpublished
/// one by one in a stable order. The first failure aborts the run, leaving
/// the already processed prefix in place.
#[derive(Clone, Debug)]
pub struct DeleteWithReferences {
    /// Logical [`document::Id`] of the [`Document`] to delete.
    pub id: document::Id,

    /// [`document::TypeName`] of the [`Document`] to delete.
    pub type_name: document::TypeName,
}

impl<Db> Command<DeleteWithReferences> for Service<Db>
where
    Db: Database<
            Lock<By<cascade::Lock, document::Id>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<cascade::Lock, document::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Document, document::VersionId>>,
            Err = Traced<database::Error>,
        >,
    Self: Command<
            UnpublishDocument,
            Ok = (),
            Err = Traced<unpublish_document::ExecutionError>,
        > + Query<
            connected::Documents,
            Ok = read::document::Connected,
            Err = Traced<database::Error>,
        >,
{
    type Ok = CascadeSummary;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteWithReferences,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteWithReferences { id, type_name } = cmd;

        if !self.config().schema.accepts(&type_name) {
            return Err(tracerr::new!(E::UnsupportedType(type_name)));
        }

        // Avoid concurrent cascades over the same target.
        let acquired = self
            .database()
            .execute(Lock(By::new(id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !acquired {
            return Err(tracerr::new!(E::CascadeInProgress(id)));
        }

        let outcome = async {
            let connected = self
                .execute(connected::Documents {
                    id: id.clone(),
                    type_name,
                })
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            let affected = connected.into_affected(id.clone());
            let unpublished = affected.len() - 1;

            // The target itself is hard-deleted below instead of being
            // retired into the draft slot.
            for doc in affected.into_iter().filter(|doc| *doc != id) {
                self.execute(UnpublishDocument { id: doc })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }

            self.database()
                .execute(Delete(By::<Document, _>::new(
                    document::VersionId::published(id.clone()),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            self.database()
                .execute(Delete(By::<Document, _>::new(
                    document::VersionId::draft(id.clone()),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok(CascadeSummary { unpublished })
        }
        .await;

        // The lock is released regardless of the cascade outcome.
        let released = self
            .database()
            .execute(Delete(By::<cascade::Lock, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop);

        match (outcome, released) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Err(e), Ok(()) | Err(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Error of [`DeleteWithReferences`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Another cascade over the same target is already running.
    #[display("`Document(id: {_0})` is already being cascaded")]
    CascadeInProgress(#[error(not(source))] document::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Document`]s of the type cannot be targeted by the cascade.
    #[display("`Document(type: {_0})` cannot be a cascade target")]
    UnsupportedType(#[error(not(source))] document::TypeName),
}

//! [`Command`] for unpublishing a [`Document`] along with its references.

use common::operations::{By, Delete, Lock};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Document;
use crate::{
    domain::{cascade, document},
    infra::{database, Database},
    query::connected,
    read, Query, Service,
};

use super::{unpublish_document, CascadeSummary, Command, UnpublishDocument};

/// [`Command`] for unpublishing a [`Document`] after unpublishing every
/// published [`Document`] connected to it.
///
/// Unlike [`DeleteWithReferences`], the target itself is retired into the
/// draft slot as well, so its content survives the run.
///
/// [`DeleteWithReferences`]: super::DeleteWithReferences
#[derive(Clone, Debug)]
pub struct UnpublishWithReferences {
    /// Logical [`document::Id`] of the [`Document`] to unpublish.
    pub id: document::Id,

    /// [`document::TypeName`] of the [`Document`] to unpublish.
    pub type_name: document::TypeName,
}

impl<Db> Command<UnpublishWithReferences> for Service<Db>
where
    Db: Database<
            Lock<By<cascade::Lock, document::Id>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<cascade::Lock, document::Id>>,
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
        cmd: UnpublishWithReferences,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UnpublishWithReferences { id, type_name } = cmd;

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
            // The target closing the list is not counted, even though it is
            // unpublished too.
            let unpublished = affected.len() - 1;

            for doc in affected {
                self.execute(UnpublishDocument { id: doc })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }

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

/// Error of [`UnpublishWithReferences`] [`Command`] execution.
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

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::{
        infra::database::stub::{self, Stub},
        Command as _,
    };

    use super::{ExecutionError, UnpublishWithReferences};

    fn unpublish(id: &str, type_name: &str) -> UnpublishWithReferences {
        UnpublishWithReferences {
            id: id.parse().unwrap(),
            type_name: type_name.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn retires_target_along_with_connected_documents() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({"name": "Calgary"})));
        db.put(stub::document(
            "comm-1",
            "community",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "sh-1",
            "showHome",
            json!({"city": {"_ref": "city-1"}}),
        ));

        let service = stub::service(db.clone());
        let summary = service
            .execute(unpublish("city-1", "city"))
            .await
            .unwrap();

        assert_eq!(summary.unpublished, 2);

        // Every affected document, the target included, becomes a draft.
        for id in ["city-1", "comm-1", "sh-1"] {
            assert!(db.get(id).is_none(), "`{id}` must be unpublished");
            assert!(
                db.get(&format!("drafts.{id}")).is_some(),
                "`drafts.{id}` must exist",
            );
        }
        assert!(!db.locked("city-1"));
    }

    #[tokio::test]
    async fn reports_connected_count_for_community_target() {
        let db = Stub::default();
        db.put(stub::document("comm-1", "community", json!({})));
        db.put(stub::document(
            "fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}}),
        ));

        let service = stub::service(db.clone());
        let summary = service
            .execute(unpublish("comm-1", "community"))
            .await
            .unwrap();

        assert_eq!(summary.unpublished, 1);
        assert!(db.get("drafts.fp-1").is_some());
        assert!(db.get("drafts.comm-1").is_some());
    }

    #[tokio::test]
    async fn leaves_documents_referencing_only_communities_published() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({})));
        db.put(stub::document(
            "comm-1",
            "community",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}}),
        ));
        db.put(stub::document(
            "qp-1",
            "quickPossession",
            json!({"community": {"_ref": "comm-1"}}),
        ));

        let service = stub::service(db.clone());
        let summary =
            service.execute(unpublish("city-1", "city")).await.unwrap();

        // Only the community is connected to the city. Documents hanging
        // off the community alone are out of the cascade's scope and keep
        // their published versions.
        assert_eq!(summary.unpublished, 1);
        assert!(db.get("drafts.city-1").is_some());
        assert!(db.get("drafts.comm-1").is_some());
        assert!(db.get("fp-1").is_some());
        assert!(db.get("qp-1").is_some());
        assert!(db.get("drafts.fp-1").is_none());
        assert!(db.get("drafts.qp-1").is_none());
    }

    #[tokio::test]
    async fn succeeds_with_zero_count_on_unpublished_target() {
        let db = Stub::default();
        db.put(stub::document("drafts.city-1", "city", json!({})));

        let service = stub::service(db.clone());
        let summary = service
            .execute(unpublish("city-1", "city"))
            .await
            .unwrap();

        assert_eq!(summary.unpublished, 0);
        assert_eq!(db.inserts(), 0);
        assert_eq!(db.deletes(), 0);
        assert!(!db.locked("city-1"));
    }

    #[tokio::test]
    async fn rejects_not_cascaded_types() {
        let db = Stub::default();

        let service = stub::service(db.clone());
        let result = service.execute(unpublish("sh-1", "showHome")).await;

        assert!(matches!(
            result.unwrap_err().as_ref(),
            ExecutionError::UnsupportedType(_),
        ));
        assert!(!db.locked("sh-1"));
    }

    #[tokio::test]
    async fn stops_on_first_failure_keeping_processed_prefix() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({})));
        db.put(stub::document(
            "comm-1",
            "community",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "fp-1",
            "floorPlans",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.fail_insert("drafts.comm-1");

        let service = stub::service(db.clone());
        let result = service.execute(unpublish("city-1", "city")).await;

        assert!(result.is_err());
        // `floorPlans` precede communities in the affected list.
        assert!(db.get("drafts.fp-1").is_some());
        assert!(db.get("fp-1").is_none());
        // The failed document and the not yet reached target stay published.
        assert!(db.get("comm-1").is_some());
        assert!(db.get("city-1").is_some());
        assert!(!db.locked("city-1"));
    }
}

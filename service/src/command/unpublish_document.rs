//! [`Command`] for unpublishing a single [`Document`].

use common::operations::{
    By, Commit, Delete, Insert, Patch, Select, Transact, Transacted,
};
use tracerr::Traced;

use crate::{
    domain::{document, Document},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for retiring the published version of a [`Document`] into the
/// draft slot.
///
/// Reference fields of drafts still pointing at the published version are
/// unset first, so they never dangle once the published id is retired.
/// Succeeds without any effect when nothing is published under the id.
#[derive(Clone, Debug)]
pub struct UnpublishDocument {
    /// Logical [`document::Id`] of the [`Document`] to unpublish.
    pub id: document::Id,
}

impl<Db> Command<UnpublishDocument> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Document>, document::VersionId>>,
            Ok = Option<Document>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Document>, read::document::Referencing>>,
            Ok = Vec<Document>,
            Err = Traced<database::Error>,
        > + Database<Insert<Document>, Err = Traced<database::Error>>
        + Database<
            Delete<By<Document, document::VersionId>>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Patch<document::Unset>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UnpublishDocument,
    ) -> Result<Self::Ok, Self::Err> {
        let UnpublishDocument { id } = cmd;

        let Some(published) = self
            .database()
            .execute(Select(By::<Option<Document>, _>::new(
                document::VersionId::published(id.clone()),
            )))
            .await
            .map_err(tracerr::wrap!())?
        else {
            // Nothing is published under the id, so nothing to retire.
            return Ok(());
        };

        let drafts = self
            .database()
            .execute(Select(By::<Vec<Document>, _>::new(
                read::document::Referencing {
                    target: id.clone(),
                    lifecycle: document::Lifecycle::Draft,
                    type_name: None,
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;

        // Reference cleanup happens in a single transaction, so other
        // drafts never observe a partially cleaned state.
        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;
        for draft in &drafts {
            let fields = draft.fields.referencing(&id);
            if fields.is_empty() {
                continue;
            }
            tx.execute(Patch(document::Unset {
                id: draft.id.clone(),
                fields,
            }))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        // The published content is preserved under the draft id, replacing
        // any draft stored there.
        self.database()
            .execute(Insert(published.to_draft()))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        self.database()
            .execute(Delete(By::<Document, _>::new(
                document::VersionId::published(id),
            )))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Error of [`UnpublishDocument`] [`Command`] execution.
pub type ExecutionError = database::Error;

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::{
        infra::database::stub::{self, Stub},
        Command as _,
    };

    use super::UnpublishDocument;

    fn unpublish(id: &str) -> UnpublishDocument {
        UnpublishDocument {
            id: id.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn no_ops_when_nothing_is_published() {
        let db = Stub::default();
        db.put(stub::document(
            "drafts.comm-1",
            "community",
            json!({"name": "Alpine"}),
        ));

        let service = stub::service(db.clone());
        service.execute(unpublish("comm-1")).await.unwrap();

        assert!(db.get("drafts.comm-1").is_some());
        assert_eq!(db.commits(), 0);
        assert_eq!(db.inserts(), 0);
        assert_eq!(db.deletes(), 0);
        assert_eq!(db.patches(), 0);
    }

    #[tokio::test]
    async fn retires_published_version_into_draft_slot() {
        let db = Stub::default();
        let published =
            stub::document("comm-1", "community", json!({"name": "Alpine"}));
        db.put(published.clone());
        db.put(stub::document(
            "drafts.fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}, "name": "The Aspen"}),
        ));
        db.put(stub::document(
            "fp-2",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}}),
        ));

        let service = stub::service(db.clone());
        service.execute(unpublish("comm-1")).await.unwrap();

        // The published version is gone, its content lives in the draft.
        assert!(db.get("comm-1").is_none());
        let draft = db.get("drafts.comm-1").unwrap();
        assert_eq!(draft.fields, published.fields);
        assert_eq!(draft.revision, published.revision);
        assert_eq!(draft.created_at, published.created_at);

        // The referencing draft is cleaned, other fields are kept.
        let referrer = db.get("drafts.fp-1").unwrap();
        assert!(!referrer.fields.references(&"comm-1".parse().unwrap()));
        assert_eq!(
            serde_json::to_value(&referrer.fields).unwrap(),
            json!({"name": "The Aspen"}),
        );

        // Published referencing documents are not touched.
        assert!(db
            .get("fp-2")
            .unwrap()
            .fields
            .references(&"comm-1".parse().unwrap()));

        assert_eq!(db.commits(), 1);
        assert_eq!(db.patches(), 1);
    }

    #[tokio::test]
    async fn leaves_unrelated_drafts_untouched() {
        let db = Stub::default();
        db.put(stub::document("comm-1", "community", json!({})));
        db.put(stub::document(
            "drafts.fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-2"}, "label": "comm-1"}),
        ));

        let service = stub::service(db.clone());
        service.execute(unpublish("comm-1")).await.unwrap();

        assert_eq!(
            serde_json::to_value(&db.get("drafts.fp-1").unwrap().fields)
                .unwrap(),
            json!({"community": {"_ref": "comm-2"}, "label": "comm-1"}),
        );
        assert_eq!(db.patches(), 0);
    }

    #[tokio::test]
    async fn commits_cleanup_even_without_referencing_drafts() {
        let db = Stub::default();
        db.put(stub::document("comm-1", "community", json!({"v": 1})));

        let service = stub::service(db.clone());
        service.execute(unpublish("comm-1")).await.unwrap();

        assert!(db.get("comm-1").is_none());
        assert!(db.get("drafts.comm-1").is_some());
        assert_eq!(db.commits(), 1);
        assert_eq!(db.patches(), 0);
    }

    #[tokio::test]
    async fn replaces_existing_draft_with_published_content() {
        let db = Stub::default();
        let published =
            stub::document("comm-1", "community", json!({"v": "published"}));
        db.put(published.clone());
        db.put(stub::document(
            "drafts.comm-1",
            "community",
            json!({"v": "stale draft"}),
        ));

        let service = stub::service(db.clone());
        service.execute(unpublish("comm-1")).await.unwrap();

        let draft = db.get("drafts.comm-1").unwrap();
        assert_eq!(draft.fields, published.fields);
        assert_eq!(draft.revision, published.revision);
    }

    #[tokio::test]
    async fn aborts_before_version_swap_when_commit_fails() {
        let db = Stub::default();
        db.put(stub::document("comm-1", "community", json!({"v": 1})));
        db.put(stub::document(
            "drafts.fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}}),
        ));
        db.fail_commit();

        let service = stub::service(db.clone());
        let result = service.execute(unpublish("comm-1")).await;

        assert!(result.is_err());
        assert!(db.get("comm-1").is_some());
        assert!(db.get("drafts.comm-1").is_none());
        assert_eq!(db.inserts(), 0);
        assert_eq!(db.deletes(), 0);
    }
}

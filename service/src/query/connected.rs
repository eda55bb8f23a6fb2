//! Discovery [`Query`] of the [`Document`]s connected to a cascade target.

use common::operations::{By, Select};
use futures::future;
use tracerr::Traced;

use crate::{
    domain::{document, Document},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] discovering all the published [`Document`]s connected to a
/// reference cascade target.
///
/// Collects published [`Document`]s of the configured related content types
/// carrying a reference to the target, and, for a city target, published
/// communities referencing it. Communities are not expanded further: a
/// [`Document`] referencing only a discovered community is not connected to
/// the city itself.
#[derive(Clone, Debug)]
pub struct Documents {
    /// Logical [`document::Id`] of the cascade target.
    pub id: document::Id,

    /// [`document::TypeName`] of the cascade target.
    pub type_name: document::TypeName,
}

impl<Db> Query<Documents> for Service<Db>
where
    Db: Database<
        Select<By<Vec<document::VersionId>, read::document::Referencing>>,
        Ok = Vec<document::VersionId>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::document::Connected;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Documents) -> Result<Self::Ok, Self::Err> {
        let Documents { id, type_name } = query;
        let schema = &self.config().schema;

        let published = |type_name: &document::TypeName| {
            self.database().execute(Select(
                By::<Vec<document::VersionId>, _>::new(
                    read::document::Referencing {
                        target: id.clone(),
                        lifecycle: document::Lifecycle::Published,
                        type_name: Some(type_name.clone()),
                    },
                ),
            ))
        };

        let related =
            future::try_join_all(schema.related.iter().map(&published));
        let communities = async {
            if type_name == schema.city {
                published(&schema.community).await
            } else {
                Ok(Vec::new())
            }
        };
        let (related, communities) = future::try_join(related, communities)
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::document::Connected {
            related: related
                .into_iter()
                .flatten()
                .map(|version| version.id)
                .collect(),
            communities: communities
                .into_iter()
                .map(|version| version.id)
                .collect(),
        })
    }
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::{
        domain::document,
        infra::database::stub::{self, Stub},
        Query as _,
    };

    use super::Documents;

    fn target(id: &str, type_name: &str) -> Documents {
        Documents {
            id: id.parse().unwrap(),
            type_name: type_name.parse().unwrap(),
        }
    }

    fn raw(ids: &[document::Id]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn follows_configured_leaf_type_order() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({"name": "Calgary"})));
        db.put(stub::document(
            "sh-1",
            "showHome",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "fp-1",
            "floorPlans",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "comm-1",
            "community",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "drafts.fp-2",
            "floorPlans",
            json!({"city": {"_ref": "city-1"}}),
        ));

        let service = stub::service(db);
        let connected = service
            .execute(target("city-1", "city"))
            .await
            .unwrap();

        assert_eq!(raw(&connected.related), ["fp-1", "sh-1"]);
        assert_eq!(raw(&connected.communities), ["comm-1"]);
    }

    #[tokio::test]
    async fn skips_documents_referencing_only_communities() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({"name": "Calgary"})));
        db.put(stub::document(
            "comm-1",
            "community",
            json!({"city": {"_ref": "city-1"}}),
        ));
        db.put(stub::document(
            "qp-1",
            "quickPossession",
            json!({"community": {"_ref": "comm-1"}}),
        ));

        let service = stub::service(db);
        let connected = service
            .execute(target("city-1", "city"))
            .await
            .unwrap();

        assert_eq!(raw(&connected.related), Vec::<String>::new());
        assert_eq!(raw(&connected.communities), ["comm-1"]);
    }

    #[tokio::test]
    async fn community_target_collects_no_communities() {
        let db = Stub::default();
        db.put(stub::document("comm-1", "community", json!({})));
        db.put(stub::document(
            "comm-2",
            "community",
            json!({"adjacent": {"_ref": "comm-1"}}),
        ));
        db.put(stub::document(
            "fp-1",
            "floorPlans",
            json!({"community": {"_ref": "comm-1"}}),
        ));

        let service = stub::service(db);
        let connected = service
            .execute(target("comm-1", "community"))
            .await
            .unwrap();

        assert_eq!(raw(&connected.related), ["fp-1"]);
        assert_eq!(raw(&connected.communities), Vec::<String>::new());
    }

    #[tokio::test]
    async fn is_idempotent() {
        let db = Stub::default();
        db.put(stub::document("city-1", "city", json!({})));
        db.put(stub::document(
            "sh-1",
            "showHome",
            json!({"city": {"_ref": "city-1"}}),
        ));

        let service = stub::service(db.clone());
        let first = service
            .execute(target("city-1", "city"))
            .await
            .unwrap();
        let second = service
            .execute(target("city-1", "city"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(db.inserts(), 0);
        assert_eq!(db.deletes(), 0);
        assert_eq!(db.patches(), 0);
    }
}

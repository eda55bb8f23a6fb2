//! In-memory [`Database`] stub for tests.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Patch, Select, Transact,
};
use tracerr::Traced;

use crate::{
    domain::{cascade, document, Document, Schema},
    infra::{
        database::{
            self,
            postgres::{self, connection},
        },
        Database,
    },
    read,
    task::release_stale_locks,
    Config, Service,
};

/// In-memory [`Database`] double for driving [`Service`] tests.
///
/// [`Document`] versions and cascade locks are keyed by their raw store
/// representation, so selections come out ordered by id, the way the SQL
/// implementation orders them.
///
/// [`Transact`]ing a [`Stub`] yields a clone sharing its state, so
/// transactional operations are not isolated from the rest of the [`Stub`].
#[derive(Clone, Debug, Default)]
pub struct Stub {
    /// Shared [`State`] of this [`Stub`].
    state: Arc<Mutex<State>>,
}

/// State of a [`Stub`].
#[derive(Debug, Default)]
struct State {
    /// Stored [`Document`] versions, keyed by raw store id.
    documents: BTreeMap<String, Document>,

    /// Held cascade locks, keyed by target id.
    locks: BTreeMap<String, cascade::AcquisitionDateTime>,

    /// Raw store ids failing [`Insert`] operations.
    broken_inserts: BTreeSet<String>,

    /// Indicator whether [`Commit`] operations fail.
    broken_commits: bool,

    /// Number of performed [`Commit`] operations.
    commits: usize,

    /// Number of performed [`Document`] version [`Delete`] operations.
    deletes: usize,

    /// Number of performed [`Document`] version [`Insert`] operations.
    inserts: usize,

    /// Number of performed [`Patch`] operations.
    patches: usize,
}

impl Stub {
    /// Stores the provided [`Document`] version.
    pub fn put(&self, doc: Document) {
        drop(self.state().documents.insert(doc.id.to_string(), doc));
    }

    /// Returns the stored [`Document`] version under the provided raw store
    /// id, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Document> {
        self.state().documents.get(id).cloned()
    }

    /// Seeds a cascade lock held over the provided target.
    pub fn lock(&self, target: &str) {
        self.lock_at(target, cascade::AcquisitionDateTime::now());
    }

    /// Seeds a cascade lock held over the provided target since the provided
    /// time.
    pub fn lock_at(&self, target: &str, at: cascade::AcquisitionDateTime) {
        drop(self.state().locks.insert(target.to_owned(), at));
    }

    /// Releases the cascade lock held over the provided target, if any.
    pub fn unlock(&self, target: &str) {
        drop(self.state().locks.remove(target));
    }

    /// Indicates whether a cascade lock is held over the provided target.
    #[must_use]
    pub fn locked(&self, target: &str) -> bool {
        self.state().locks.contains_key(target)
    }

    /// Makes every following [`Commit`] operation fail.
    pub fn fail_commit(&self) {
        self.state().broken_commits = true;
    }

    /// Makes every following [`Insert`] of the provided raw store id fail.
    pub fn fail_insert(&self, id: &str) {
        drop(self.state().broken_inserts.insert(id.to_owned()));
    }

    /// Number of [`Commit`] operations performed by this [`Stub`].
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state().commits
    }

    /// Number of [`Document`] version [`Delete`] operations performed by this
    /// [`Stub`].
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.state().deletes
    }

    /// Number of [`Document`] version [`Insert`] operations performed by this
    /// [`Stub`].
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.state().inserts
    }

    /// Number of [`Patch`] operations performed by this [`Stub`].
    #[must_use]
    pub fn patches(&self) -> usize {
        self.state().patches
    }

    /// Locks the [`State`] of this [`Stub`].
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Selects the stored [`Document`] versions matching the provided
    /// selection, ordered by raw store id.
    fn referencing(&self, sel: &read::document::Referencing) -> Vec<Document> {
        self.state()
            .documents
            .values()
            .filter(|doc| {
                doc.id.lifecycle == sel.lifecycle
                    && sel
                        .type_name
                        .as_ref()
                        .map_or(true, |t| doc.type_name == *t)
                    && doc.fields.references(&sel.target)
            })
            .cloned()
            .collect()
    }
}

/// Builds a [`Document`] version from the provided raw parts.
///
/// # Panics
///
/// If any of the provided parts is not a valid one.
#[must_use]
pub fn document(
    id: &str,
    type_name: &str,
    fields: serde_json::Value,
) -> Document {
    let serde_json::Value::Object(members) = fields else {
        panic!("JSON object expected");
    };
    Document::new(id.parse().unwrap(), type_name.parse().unwrap(), members.into())
}

/// Builds a [`Service`] executing its operations over the provided [`Stub`].
#[must_use]
pub fn service(db: Stub) -> Service<Stub> {
    let (service, _bg) = Service::new(
        Config {
            schema: Schema::default(),
            release_stale_locks: release_stale_locks::Config {
                interval: Duration::from_secs(600),
                timeout: Duration::from_secs(3600),
            },
        },
        db,
    );
    service
}

impl Database<Select<By<Option<Document>, document::VersionId>>> for Stub {
    type Ok = Option<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Document>, document::VersionId>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.get(&by.into_inner().to_string()))
    }
}

impl Database<Select<By<Vec<Document>, read::document::Referencing>>>
    for Stub
{
    type Ok = Vec<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Document>, read::document::Referencing>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.referencing(&by.into_inner()))
    }
}

impl
    Database<
        Select<By<Vec<document::VersionId>, read::document::Referencing>>,
    > for Stub
{
    type Ok = Vec<document::VersionId>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<document::VersionId>, read::document::Referencing>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .referencing(&by.into_inner())
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }
}

impl Database<Select<By<Vec<Document>, read::document::OfType>>> for Stub {
    type Ok = Vec<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Document>, read::document::OfType>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sel = by.into_inner();
        Ok(self
            .state()
            .documents
            .values()
            .filter(|doc| {
                doc.id.lifecycle == sel.lifecycle
                    && doc.type_name == sel.type_name
            })
            .cloned()
            .collect())
    }
}

impl Database<Select<By<read::document::PublishState, document::Id>>>
    for Stub
{
    type Ok = read::document::PublishState;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::document::PublishState, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let state = self.state();
        Ok(read::document::PublishState {
            published: state
                .documents
                .contains_key(&document::VersionId::published(id.clone())
                    .to_string()),
            draft: state
                .documents
                .contains_key(&document::VersionId::draft(id).to_string()),
        })
    }
}

impl Database<Insert<Document>> for Stub {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(doc): Insert<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        let raw = doc.id.to_string();
        let mut state = self.state();
        if state.broken_inserts.contains(&raw) {
            return Err(error());
        }
        state.inserts += 1;
        drop(state.documents.insert(raw, doc));
        Ok(())
    }
}

impl Database<Patch<document::Unset>> for Stub {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Patch(unset): Patch<document::Unset>,
    ) -> Result<Self::Ok, Self::Err> {
        let document::Unset { id, fields } = unset;
        let mut state = self.state();
        state.patches += 1;
        if let Some(doc) = state.documents.get_mut(&id.to_string()) {
            let mut members: serde_json::Map<_, _> = doc.fields.clone().into();
            for name in &fields {
                drop(members.remove(AsRef::<str>::as_ref(name)));
            }
            doc.fields = members.into();
        }
        Ok(())
    }
}

impl Database<Delete<By<Document, document::VersionId>>> for Stub {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Document, document::VersionId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let raw = by.into_inner().to_string();
        let mut state = self.state();
        state.deletes += 1;
        drop(state.documents.remove(&raw));
        Ok(())
    }
}

impl Database<Lock<By<cascade::Lock, document::Id>>> for Stub {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<cascade::Lock, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let target = by.into_inner().to_string();
        let mut state = self.state();
        if state.locks.contains_key(&target) {
            return Ok(false);
        }
        drop(
            state
                .locks
                .insert(target, cascade::AcquisitionDateTime::now()),
        );
        Ok(true)
    }
}

impl Database<Delete<By<cascade::Lock, document::Id>>> for Stub {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cascade::Lock, document::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.state().locks.remove(&by.into_inner().to_string()));
        Ok(())
    }
}

impl Database<Delete<By<cascade::Lock, cascade::AcquisitionDateTime>>>
    for Stub
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cascade::Lock, cascade::AcquisitionDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        self.state().locks.retain(|_, at| *at >= deadline);
        Ok(())
    }
}

impl Database<Transact> for Stub {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Stub {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        if state.broken_commits {
            return Err(error());
        }
        state.commits += 1;
        Ok(())
    }
}

/// Returns the error every broken [`Stub`] operation resolves to.
fn error() -> Traced<database::Error> {
    tracerr::new!(database::Error::Postgres(postgres::Error::PoolError(
        connection::PoolError::Closed,
    )))
}

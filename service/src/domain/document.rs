//! [`Document`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, sync::LazyLock};

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use xxhash_rust::xxh3;

/// Prefix of raw store ids referring to draft [`Document`] versions.
const DRAFT_PREFIX: &str = "drafts.";

/// Single stored version of a content document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Document {
    /// [`VersionId`] of this [`Document`].
    pub id: VersionId,

    /// [`TypeName`] of the content type of this [`Document`].
    pub type_name: TypeName,

    /// Top-level [`Fields`] of this [`Document`].
    pub fields: Fields,

    /// [`Revision`] of the content of this [`Document`].
    pub revision: Revision,

    /// [`DateTime`] of this [`Document`] version creation.
    pub created_at: CreationDateTime,
}

impl Document {
    /// Creates a new [`Document`] with the provided parameters, calculating
    /// its [`Revision`].
    #[must_use]
    pub fn new(id: VersionId, type_name: TypeName, fields: Fields) -> Self {
        let revision = Revision::new(&type_name, &fields);
        Self {
            id,
            type_name,
            fields,
            revision,
            created_at: CreationDateTime::now(),
        }
    }

    /// Returns a copy of this [`Document`] placed into the draft slot.
    ///
    /// The content, its [`Revision`] and the creation time are preserved as
    /// is.
    #[must_use]
    pub fn to_draft(&self) -> Self {
        Self {
            id: self.id.as_draft(),
            ..self.clone()
        }
    }
}

/// Logical ID of a [`Document`], shared by all its versions.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] from the provided `value`, if it represents a
    /// valid one.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        Self::check(&value).then_some(Self(value))
    }

    /// Checks whether the provided `value` represents a valid [`Id`].
    fn check(value: impl AsRef<str>) -> bool {
        /// Regular expression for checking [`Id`]'s invariants:
        /// - only ASCII alphanumerics, `.`, `_` and `-` are allowed;
        /// - must be from 1 to 128 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[0-9A-Za-z._-]{1,128}$").expect("valid regex")
        });

        let value = value.as_ref();
        // A logical ID is never draft-prefixed, otherwise draft ids of
        // different documents could collide.
        REGEX.is_match(value) && !value.starts_with(DRAFT_PREFIX)
    }
}

impl FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `document::Id`")
    }
}

/// Lifecycle slot occupied by a [`Document`] version.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// Publicly visible version.
    Published,

    /// Work-in-progress version, invisible to the public.
    Draft,
}

/// ID of a concrete [`Document`] version: a logical [`Id`] bound to the
/// [`Lifecycle`] slot it occupies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VersionId {
    /// Logical [`Id`] of the [`Document`].
    pub id: Id,

    /// [`Lifecycle`] slot occupied by the version.
    pub lifecycle: Lifecycle,
}

impl VersionId {
    /// Creates a new [`VersionId`] referring to the published version under
    /// the provided [`Id`].
    #[must_use]
    pub const fn published(id: Id) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Published,
        }
    }

    /// Creates a new [`VersionId`] referring to the draft version under the
    /// provided [`Id`].
    #[must_use]
    pub const fn draft(id: Id) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Draft,
        }
    }

    /// Returns a [`VersionId`] referring to the published version under the
    /// same [`Id`].
    #[must_use]
    pub fn as_published(&self) -> Self {
        Self::published(self.id.clone())
    }

    /// Returns a [`VersionId`] referring to the draft version under the same
    /// [`Id`].
    #[must_use]
    pub fn as_draft(&self) -> Self {
        Self::draft(self.id.clone())
    }
}

/// Formats this [`VersionId`] as the raw store id: draft versions are
/// prefixed, published ones are not.
impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lifecycle {
            Lifecycle::Published => write!(f, "{}", self.id),
            Lifecycle::Draft => write!(f, "{DRAFT_PREFIX}{}", self.id),
        }
    }
}

impl FromStr for VersionId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lifecycle, id) = match s.strip_prefix(DRAFT_PREFIX) {
            Some(rest) => (Lifecycle::Draft, rest),
            None => (Lifecycle::Published, s),
        };
        Id::new(id)
            .map(|id| Self { id, lifecycle })
            .ok_or("invalid `document::VersionId`")
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for VersionId {
    accepts!(VARCHAR, TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        <&str>::from_sql(ty, raw)?.parse().map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for VersionId {
    accepts!(VARCHAR, TEXT);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.to_string().to_sql(ty, w)
    }
}

/// Name of a content type of [`Document`]s.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
#[serde(try_from = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Creates a new [`TypeName`] from the provided `value`, if it
    /// represents a valid one.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        Self::check(&value).then_some(Self(value))
    }

    /// Checks whether the provided `value` represents a valid [`TypeName`].
    fn check(value: impl AsRef<str>) -> bool {
        /// Regular expression for checking [`TypeName`]'s invariants:
        /// - must start with an ASCII letter;
        /// - may continue with ASCII alphanumerics and `_`;
        /// - must be from 1 to 64 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Za-z][0-9A-Za-z_]{0,63}$").expect("valid regex")
        });

        REGEX.is_match(value.as_ref())
    }
}

impl FromStr for TypeName {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `document::TypeName`")
    }
}

impl TryFrom<String> for TypeName {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Name of a top-level field of a [`Document`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct FieldName(String);

/// Content of a [`Document`] version: its top-level fields as a JSON
/// object.
#[derive(Clone, Debug, Deserialize, Eq, From, Into, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(serde_json::Map<String, Value>);

impl Fields {
    /// Name of the object member carrying the target [`Id`] of a reference.
    const REF: &'static str = "_ref";

    /// Returns the names of the top-level fields of this [`Fields`]
    /// carrying a reference to the provided [`Id`], sorted by name.
    #[must_use]
    pub fn referencing(&self, id: &Id) -> Vec<FieldName> {
        self.0
            .iter()
            .filter(|(_, value)| Self::refers(value, id))
            .map(|(name, _)| FieldName::from(name.clone()))
            .collect()
    }

    /// Indicates whether any top-level field of this [`Fields`] carries a
    /// reference to the provided [`Id`].
    #[must_use]
    pub fn references(&self, id: &Id) -> bool {
        self.0.values().any(|value| Self::refers(value, id))
    }

    /// Checks whether the provided `value` carries a reference to the
    /// provided [`Id`]: either being a reference object itself, or
    /// containing one among its array elements.
    fn refers(value: &Value, id: &Id) -> bool {
        match value {
            Value::Object(_) => Self::points_at(value, id),
            Value::Array(elements) => {
                elements.iter().any(|element| Self::points_at(element, id))
            }
            Value::Null | Value::Bool(_) | Value::Number(_)
            | Value::String(_) => false,
        }
    }

    /// Checks whether the provided `value` is a reference object pointing at
    /// the provided [`Id`].
    fn points_at(value: &Value, id: &Id) -> bool {
        value
            .as_object()
            .and_then(|members| members.get(Self::REF))
            .and_then(Value::as_str)
            .is_some_and(|target| target == AsRef::<str>::as_ref(id))
    }
}

/// Revision of the content of a [`Document`] version.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, FromStr, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Revision(Uuid);

impl Revision {
    /// Calculates a [`Revision`] of the provided [`Fields`] under the
    /// provided [`TypeName`].
    ///
    /// Equal content always yields an equal [`Revision`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn new(type_name: &TypeName, fields: &Fields) -> Self {
        use std::hash::Hash as _;

        // WARNING: Avoid changing the hashed representation, because it will
        //          be a breaking change requiring to migrate all the
        //          existing revisions in the database to the new format.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        AsRef::<str>::as_ref(type_name).hash(&mut hasher);
        serde_json::to_string(fields)
            .expect("infallible")
            .hash(&mut hasher);

        Self(Uuid::from_u128(hasher.digest128()))
    }
}

/// Removal of top-level fields from a [`Document`] version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Unset {
    /// [`VersionId`] of the [`Document`] to remove the fields of.
    pub id: VersionId,

    /// [`FieldName`]s of the fields to remove.
    pub fields: Vec<FieldName>,
}

/// [`DateTime`] of a [`Document`] version creation.
pub type CreationDateTime = DateTimeOf<(Document, unit::Creation)>;

#[cfg(test)]
mod spec {
    use serde_json::json;

    use super::{
        Document, FieldName, Fields, Id, Revision, TypeName, VersionId,
    };

    fn id(value: &str) -> Id {
        Id::new(value).unwrap()
    }

    fn field(name: &str) -> FieldName {
        FieldName::from(name.to_owned())
    }

    fn type_name(value: &str) -> TypeName {
        TypeName::new(value).unwrap()
    }

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(members) => Fields::from(members),
            _ => panic!("JSON object expected"),
        }
    }

    #[test]
    fn id_accepts_valid_values() {
        for value in ["city-1", "a", "Foo_bar.baz", &"x".repeat(128)] {
            assert!(Id::new(value).is_some(), "`{value}` must be valid");
        }
    }

    #[test]
    fn id_rejects_invalid_values() {
        for value in
            ["", " ", "city 1", "city/1", "drafts.city-1", &"x".repeat(129)]
        {
            assert!(Id::new(value).is_none(), "`{value}` must be invalid");
        }
    }

    #[test]
    fn version_id_round_trips_raw_store_ids() {
        let draft: VersionId = "drafts.city-1".parse().unwrap();
        assert_eq!(draft, VersionId::draft(id("city-1")));
        assert_eq!(draft.to_string(), "drafts.city-1");

        let published: VersionId = "city-1".parse().unwrap();
        assert_eq!(published, VersionId::published(id("city-1")));
        assert_eq!(published.to_string(), "city-1");

        assert!("drafts.".parse::<VersionId>().is_err());
    }

    #[test]
    fn version_id_retags_lifecycle() {
        let published = VersionId::published(id("city-1"));
        assert_eq!(published.as_draft().to_string(), "drafts.city-1");
        assert_eq!(published.as_draft().as_published(), published);
    }

    #[test]
    fn fields_detect_direct_references() {
        let fields = fields(json!({
            "name": "Alpine",
            "city": {"_ref": "city-1"},
        }));

        assert!(fields.references(&id("city-1")));
        assert_eq!(fields.referencing(&id("city-1")), vec![field("city")]);
        assert!(!fields.references(&id("city-2")));
        assert_eq!(fields.referencing(&id("city-2")), vec![]);
    }

    #[test]
    fn fields_detect_references_in_arrays() {
        let fields = fields(json!({
            "communities": [{"_ref": "comm-1"}, {"_ref": "comm-2"}],
        }));

        assert!(fields.references(&id("comm-2")));
        assert_eq!(
            fields.referencing(&id("comm-2")),
            vec![field("communities")],
        );
    }

    #[test]
    fn fields_report_every_referencing_field_sorted_by_name() {
        let fields = fields(json!({
            "city": {"_ref": "city-1"},
            "area": {"_ref": "city-1"},
            "other": {"_ref": "city-2"},
        }));

        assert_eq!(
            fields.referencing(&id("city-1")),
            vec![field("area"), field("city")],
        );
    }

    #[test]
    fn fields_ignore_plain_values_matching_target() {
        let fields = fields(json!({
            "name": "city-1",
            "code": {"ref": "city-1"},
            "tags": ["city-1"],
            "nested": {"inner": {"_ref": "city-1"}},
        }));

        assert!(!fields.references(&id("city-1")));
        assert_eq!(fields.referencing(&id("city-1")), vec![]);
    }

    #[test]
    fn revision_reflects_content() {
        let city = type_name("city");

        let revision = Revision::new(&city, &fields(json!({"name": "A"})));
        assert_eq!(
            revision,
            Revision::new(&city, &fields(json!({"name": "A"}))),
        );
        assert_ne!(
            revision,
            Revision::new(&city, &fields(json!({"name": "B"}))),
        );
        assert_ne!(
            revision,
            Revision::new(&type_name("town"), &fields(json!({"name": "A"}))),
        );
    }

    #[test]
    fn document_draft_copy_preserves_content() {
        let doc = Document::new(
            VersionId::published(id("city-1")),
            type_name("city"),
            fields(json!({"name": "Alpine"})),
        );

        let draft = doc.to_draft();
        assert_eq!(draft.id, doc.id.as_draft());
        assert_eq!(draft.type_name, doc.type_name);
        assert_eq!(draft.fields, doc.fields);
        assert_eq!(draft.revision, doc.revision);
        assert_eq!(draft.created_at, doc.created_at);
    }
}

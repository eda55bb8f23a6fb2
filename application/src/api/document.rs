//! GraphQL [`Document`] definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{command, domain, read};

use crate::{api, api::scalar, Context};

/// A single version of a content document.
#[derive(Clone, Debug, From)]
pub struct Document(domain::Document);

/// A single version of a content document.
#[graphql_object(context = Context)]
impl Document {
    /// ID of this `Document` version.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Document.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> VersionId {
        self.0.id.clone().into()
    }

    /// Name of the content type of this `Document`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Document.typeName",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn type_name(&self) -> TypeName {
        self.0.type_name.clone().into()
    }

    /// Top-level fields of this `Document` version.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Document.fields",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn fields(&self) -> Json {
        self.0.fields.clone().into()
    }

    /// Revision of the content of this `Document` version.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Document.revision",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn revision(&self) -> Revision {
        self.0.revision.into()
    }

    /// `DateTime` when this `Document` version was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Document.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Logical ID of a `Document`, shared by its published and draft versions.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "Id", with = scalar::Via::<domain::document::Id>)]
pub struct Id(domain::document::Id);

/// ID of a concrete `Document` version.
///
/// Draft versions carry the `drafts.` prefix, published ones are bare.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VersionId",
    with = scalar::Via::<domain::document::VersionId>,
)]
pub struct VersionId(domain::document::VersionId);

/// Name of a content type of `Document`s.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TypeName",
    with = scalar::Via::<domain::document::TypeName>,
)]
pub struct TypeName(domain::document::TypeName);

/// Revision of the content of a `Document` version.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "Revision",
    with = scalar::Via::<domain::document::Revision>,
)]
pub struct Revision(domain::document::Revision);

/// Top-level fields of a `Document` version, as a JSON object.
#[derive(Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(name = "Json", with = json)]
pub struct Json(domain::document::Fields);

mod json {
    //! Conversions of [`Json`] to/from a GraphQL scalar value.

    use juniper::{
        InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
        ScalarValue, Value,
    };

    use super::Json;

    /// Converts the provided [`Json`] into a GraphQL [`Value`].
    pub(super) fn to_output<S: ScalarValue>(json: &Json) -> Value<S> {
        value(&serde_json::Value::Object(json.0.clone().into()))
    }

    /// Parses a [`Json`] from the provided [`InputValue`].
    ///
    /// Only JSON objects form a valid [`Json`], matching the shape of
    /// `Document` fields.
    pub(super) fn from_input<S: ScalarValue>(
        input: &InputValue<S>,
    ) -> Result<Json, String> {
        match parse(input)? {
            serde_json::Value::Object(members) => Ok(Json(members.into())),
            found @ (serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_)
            | serde_json::Value::Array(_)) => Err(format!(
                "Cannot parse input scalar `Json`: expected object, \
                 found: {found}",
            )),
        }
    }

    /// Parses the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Errors if the token is not a string, an integer or a float.
    pub(super) fn parse_token<S: ScalarValue>(
        token: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(token)
            .or_else(|_| <i32 as ParseScalarValue<S>>::from_str(token))
            .or_else(|_| <f64 as ParseScalarValue<S>>::from_str(token))
    }

    /// Converts the provided [`serde_json::Value`] into a GraphQL [`Value`].
    ///
    /// Integers not fitting into [`i32`] are represented as floats.
    fn value<S: ScalarValue>(json: &serde_json::Value) -> Value<S> {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::scalar(*v),
            serde_json::Value::Number(num) => num
                .as_i64()
                .and_then(|int| i32::try_from(int).ok())
                .map(Value::scalar)
                .or_else(|| num.as_f64().map(Value::scalar))
                .unwrap_or(Value::Null),
            serde_json::Value::String(v) => Value::scalar(v.clone()),
            serde_json::Value::Array(elements) => {
                Value::list(elements.iter().map(value).collect())
            }
            serde_json::Value::Object(members) => {
                let mut out = juniper::Object::with_capacity(members.len());
                for (name, v) in members {
                    drop(out.add_field(name.clone(), value(v)));
                }
                Value::object(out)
            }
        }
    }

    /// Parses the provided [`InputValue`] into a [`serde_json::Value`].
    fn parse<S: ScalarValue>(
        input: &InputValue<S>,
    ) -> Result<serde_json::Value, String> {
        match input {
            InputValue::Null => Ok(serde_json::Value::Null),
            InputValue::Scalar(scalar) => scalar
                .as_int()
                .map(serde_json::Value::from)
                .or_else(|| scalar.as_float().map(serde_json::Value::from))
                .or_else(|| scalar.as_bool().map(serde_json::Value::from))
                .or_else(|| scalar.as_str().map(serde_json::Value::from))
                .ok_or_else(|| {
                    format!(
                        "Cannot parse input scalar `Json`: unsupported \
                         scalar value: {scalar}",
                    )
                }),
            InputValue::Enum(name) => {
                Ok(serde_json::Value::from(name.clone()))
            }
            InputValue::Variable(name) => Err(format!(
                "Cannot parse input scalar `Json`: unresolved variable \
                 `{name}`",
            )),
            InputValue::List(elements) => elements
                .iter()
                .map(|element| parse(&element.item))
                .collect::<Result<_, _>>()
                .map(serde_json::Value::Array),
            InputValue::Object(members) => members
                .iter()
                .map(|(name, member)| {
                    parse(&member.item).map(|v| (name.item.clone(), v))
                })
                .collect::<Result<_, _>>()
                .map(serde_json::Value::Object),
        }
    }
}

/// Publish state of a logical `Document` ID.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct PublishState {
    /// Indicator whether a published version exists.
    pub published: bool,

    /// Indicator whether a draft version exists.
    pub draft: bool,
}

impl From<read::document::PublishState> for PublishState {
    fn from(state: read::document::PublishState) -> Self {
        let read::document::PublishState { published, draft } = state;
        Self { published, draft }
    }
}

/// Published `Document`s connected to a cascade target.
#[derive(Clone, Debug, From)]
pub struct ConnectedDocuments(read::document::Connected);

/// Published `Document`s a reference cascade over the target would
/// unpublish.
#[graphql_object(context = Context)]
impl ConnectedDocuments {
    /// IDs of the published `Document`s referencing the target.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ConnectedDocuments.related",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn related(&self) -> Vec<Id> {
        self.0.related.iter().cloned().map(Into::into).collect()
    }

    /// IDs of the published communities referencing the target.
    ///
    /// Empty unless the target is a city.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ConnectedDocuments.communities",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn communities(&self) -> Vec<Id> {
        self.0.communities.iter().cloned().map(Into::into).collect()
    }
}

/// Outcome of a reference cascade run.
#[derive(Clone, Copy, Debug, From)]
pub struct CascadeSummary(command::CascadeSummary);

/// Outcome of a reference cascade run.
#[graphql_object(context = Context)]
impl CascadeSummary {
    /// Number of `Document`s the cascade retired into the draft slot.
    ///
    /// The cascade target itself is not counted.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "CascadeSummary.unpublished",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn unpublished(&self) -> i32 {
        i32::try_from(self.0.unpublished).unwrap_or(i32::MAX)
    }
}

/// Operator action available on a `Document`.
///
/// The studio shell renders these descriptors in place of its built-in
/// actions and runs the matching mutation on invoke.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Action {
    /// Kind of this `Action`.
    pub kind: ActionKind,

    /// Label to render this `Action` with.
    pub label: String,

    /// Label to render while this `Action` is running.
    pub busy_label: String,

    /// Tone to style this `Action` with.
    pub tone: ActionTone,

    /// Indicator whether this `Action` is currently unavailable.
    pub disabled: bool,

    /// Message to confirm with the operator before running this `Action`.
    pub confirmation_message: String,
}

impl Action {
    /// Builds the descriptor of the delete `Action`.
    #[must_use]
    pub fn delete() -> Self {
        Self {
            kind: ActionKind::Delete,
            label: "Delete".into(),
            busy_label: "Deleting...".into(),
            tone: ActionTone::Critical,
            disabled: false,
            confirmation_message: "Deleting this document will unpublish \
                                   every document referencing it. Drafts of \
                                   the unpublished documents are kept."
                .into(),
        }
    }

    /// Builds the descriptor of the unpublish `Action`.
    ///
    /// The `Action` is disabled while no published version exists.
    #[must_use]
    pub fn unpublish(state: &read::document::PublishState) -> Self {
        Self {
            kind: ActionKind::Unpublish,
            label: "Unpublish".into(),
            busy_label: "Unpublishing...".into(),
            tone: ActionTone::Caution,
            disabled: !state.published,
            confirmation_message: "Unpublishing this document will also \
                                   unpublish every document referencing it. \
                                   Drafts of the unpublished documents are \
                                   kept."
                .into(),
        }
    }
}

/// Kind of an `Action` on a `Document`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum ActionKind {
    /// Hard deletion of both versions of the `Document`.
    Delete,

    /// Retirement of the `Document` into its draft slot.
    Unpublish,
}

/// Tone the studio shell styles an `Action` with.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum ActionTone {
    /// Reversible, but attention-worthy `Action`.
    Caution,

    /// Destructive `Action`.
    Critical,
}

#[cfg(test)]
mod spec {
    use juniper::{
        graphql_input_value, graphql_value, DefaultScalarValue, InputValue,
    };
    use serde_json::json;
    use service::{domain::document, read};

    use super::{json as scalar_json, Action, ActionKind, ActionTone, Json};

    fn fields(value: serde_json::Value) -> document::Fields {
        let serde_json::Value::Object(members) = value else {
            panic!("not a JSON object");
        };
        members.into()
    }

    #[test]
    fn outputs_nested_structure() {
        let json = Json(fields(json!({
            "featured": true,
            "gallery": [{"_ref": "img-1"}],
            "name": "Calgary",
            "population": 1_300_000,
            "price": 499.9,
        })));

        assert_eq!(
            scalar_json::to_output::<DefaultScalarValue>(&json),
            graphql_value!({
                "featured": true,
                "gallery": [{"_ref": "img-1"}],
                "name": "Calgary",
                "population": 1_300_000,
                "price": 499.9,
            }),
        );
    }

    #[test]
    fn outputs_large_integers_as_floats() {
        let json = Json(fields(json!({"size": 3_000_000_000_u64})));

        assert_eq!(
            scalar_json::to_output::<DefaultScalarValue>(&json),
            graphql_value!({"size": 3_000_000_000.0}),
        );
    }

    #[test]
    fn parses_object_input() {
        let input: InputValue = graphql_input_value!({
            "city": {"_ref": "city-1"},
            "name": "Crestmont",
        });

        let json = scalar_json::from_input(&input).unwrap();

        assert_eq!(
            serde_json::Value::Object(json.0.into()),
            json!({"city": {"_ref": "city-1"}, "name": "Crestmont"}),
        );
    }

    #[test]
    fn rejects_non_object_input() {
        let input: InputValue = graphql_input_value!(["city-1"]);

        assert!(scalar_json::from_input(&input).is_err());
    }

    #[test]
    fn delete_action_is_never_disabled() {
        let action = Action::delete();

        assert_eq!(action.kind, ActionKind::Delete);
        assert_eq!(action.tone, ActionTone::Critical);
        assert!(!action.disabled);
    }

    #[test]
    fn unpublish_action_is_disabled_without_published_version() {
        let published = read::document::PublishState {
            published: true,
            draft: false,
        };
        let draft_only = read::document::PublishState {
            published: false,
            draft: true,
        };

        assert!(!Action::unpublish(&published).disabled);
        assert!(Action::unpublish(&draft_only).disabled);
    }
}

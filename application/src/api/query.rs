//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain::document, query, read, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Document` version with the specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "document",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn document(
        id: api::document::VersionId,
        ctx: &Context,
    ) -> Result<Option<api::Document>, Error> {
        ctx.service()
            .execute(query::document::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|doc| doc.map(Into::into))
    }

    /// Returns the publish state of the `Document` with the specified
    /// logical ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "publishState",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn publish_state(
        id: api::document::Id,
        ctx: &Context,
    ) -> Result<api::document::PublishState, Error> {
        ctx.service()
            .execute(query::document::PublishState::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the operator `Action`s available on the `Document` with the
    /// specified ID.
    ///
    /// `Document`s of content types not participating in reference cascades
    /// have no special `Action`s, so an empty list is returned for them and
    /// the studio shell falls back to its built-in actions.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "documentActions",
            id = %id,
            otel.name = Self::SPAN_NAME,
            type_name = %type_name,
        ),
    )]
    pub async fn document_actions(
        id: api::document::Id,
        type_name: api::document::TypeName,
        ctx: &Context,
    ) -> Result<Vec<api::document::Action>, Error> {
        if !ctx.service().config().schema.accepts(&type_name.into()) {
            return Ok(Vec::new());
        }

        let state = ctx
            .service()
            .execute(query::document::PublishState::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(vec![
            api::document::Action::delete(),
            api::document::Action::unpublish(&state),
        ])
    }

    /// Returns the published `Document`s connected to the `Document` with
    /// the specified ID.
    ///
    /// This is exactly the set of `Document`s a reference cascade over it
    /// would unpublish.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "connectedDocuments",
            id = %id,
            otel.name = Self::SPAN_NAME,
            type_name = %type_name,
        ),
    )]
    pub async fn connected_documents(
        id: api::document::Id,
        type_name: api::document::TypeName,
        ctx: &Context,
    ) -> Result<api::document::ConnectedDocuments, Error> {
        ctx.service()
            .execute(query::connected::Documents {
                id: id.into(),
                type_name: type_name.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the published `Document`s of the specified content type,
    /// optionally narrowed down to the ones referencing the given ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "publishedDocuments",
            otel.name = Self::SPAN_NAME,
            referencing = ?referencing.as_ref().map(ToString::to_string),
            type_name = %type_name,
        ),
    )]
    pub async fn published_documents(
        type_name: api::document::TypeName,
        referencing: Option<api::document::Id>,
        ctx: &Context,
    ) -> Result<Vec<api::Document>, Error> {
        let documents = if let Some(target) = referencing {
            ctx.service()
                .execute(query::document::Referencing::by(
                    read::document::Referencing {
                        target: target.into(),
                        lifecycle: document::Lifecycle::Published,
                        type_name: Some(type_name.into()),
                    },
                ))
                .await
        } else {
            ctx.service()
                .execute(query::document::OfType::by(read::document::OfType {
                    type_name: type_name.into(),
                    lifecycle: document::Lifecycle::Published,
                }))
                .await
        }
        .map_err(AsError::into_error)
        .map_err(ctx.error())?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

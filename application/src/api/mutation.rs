//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Deletes both versions of the `Document` with the specified ID after
    /// unpublishing every published `Document` connected to it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CASCADE_IN_PROGRESS` - another cascade over the `Document` with
    ///                           the provided ID is running already;
    /// - `UNSUPPORTED_DOCUMENT_TYPE` - `Document`s of the provided type do
    ///                                 not participate in reference
    ///                                 cascades.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteWithReferences",
            id = %id,
            otel.name = Self::SPAN_NAME,
            type_name = %type_name,
        ),
    )]
    pub async fn delete_with_references(
        id: api::document::Id,
        type_name: api::document::TypeName,
        ctx: &Context,
    ) -> Result<api::document::CascadeSummary, Error> {
        ctx.service()
            .execute(command::DeleteWithReferences {
                id: id.into(),
                type_name: type_name.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Unpublishes the `Document` with the specified ID along with every
    /// published `Document` connected to it.
    ///
    /// Each unpublished `Document` is retired into its draft slot, with the
    /// fields referencing the target removed from the drafts.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CASCADE_IN_PROGRESS` - another cascade over the `Document` with
    ///                           the provided ID is running already;
    /// - `UNSUPPORTED_DOCUMENT_TYPE` - `Document`s of the provided type do
    ///                                 not participate in reference
    ///                                 cascades.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "unpublishWithReferences",
            id = %id,
            otel.name = Self::SPAN_NAME,
            type_name = %type_name,
        ),
    )]
    pub async fn unpublish_with_references(
        id: api::document::Id,
        type_name: api::document::TypeName,
        ctx: &Context,
    ) -> Result<api::document::CascadeSummary, Error> {
        ctx.service()
            .execute(command::UnpublishWithReferences {
                id: id.into(),
                type_name: type_name.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::delete_with_references::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CASCADE_IN_PROGRESS"]
                #[status = CONFLICT]
                #[message = "Another cascade over the `Document` with the \
                             provided ID is running already"]
                CascadeInProgress,

                #[code = "UNSUPPORTED_DOCUMENT_TYPE"]
                #[status = BAD_REQUEST]
                #[message = "`Document`s of the provided type do not \
                             participate in reference cascades"]
                UnsupportedType,
            }
        }

        Some(match self {
            Self::CascadeInProgress(_) => Error::CascadeInProgress.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::UnsupportedType(_) => Error::UnsupportedType.into(),
        })
    }
}

impl AsError for command::unpublish_with_references::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CASCADE_IN_PROGRESS"]
                #[status = CONFLICT]
                #[message = "Another cascade over the `Document` with the \
                             provided ID is running already"]
                CascadeInProgress,

                #[code = "UNSUPPORTED_DOCUMENT_TYPE"]
                #[status = BAD_REQUEST]
                #[message = "`Document`s of the provided type do not \
                             participate in reference cascades"]
                UnsupportedType,
            }
        }

        Some(match self {
            Self::CascadeInProgress(_) => Error::CascadeInProgress.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::UnsupportedType(_) => Error::UnsupportedType.into(),
        })
    }
}

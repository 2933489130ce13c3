//! Custom extractors for request validation

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    Json,
};
use schemars::JsonSchema;
use validator::{Validate, ValidationErrors};

use crate::types::error::AppError;

/// Custom JSON extractor that validates the payload
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // First extract JSON; a body without Content-Type is still read as JSON
        let payload = if req.headers().contains_key(CONTENT_TYPE) {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(|err| match err {
                    JsonRejection::MissingJsonContentType(_) => AppError::new(
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        "expected Content-Type: application/json",
                    ),
                    other => {
                        AppError::bad_request(format!("invalid JSON body: {}", other.body_text()))
                    }
                })?;
            payload
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|err| AppError::bad_request(err.body_text()))?;
            serde_json::from_slice::<T>(&body)
                .map_err(|err| AppError::bad_request(format!("invalid JSON body: {err}")))?
        };

        // Then validate
        payload
            .validate()
            .map_err(|errors| AppError::bad_request(first_message(&errors)))?;

        Ok(Self(payload))
    }
}

/// First custom message among the validation errors
fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .into_values()
        .filter_map(|field_errors| field_errors.first())
        .find_map(|error| error.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "request validation failed".to_string())
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        // Delegate to Json<T>'s implementation since ValidatedJson has the same structure
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        // Document validation error responses
        AppError::inferred_responses(ctx, operation)
    }
}

/// Query string extractor whose rejections use the API error envelope
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err: QueryRejection| AppError::bad_request(err.body_text()))?;

        Ok(Self(query))
    }
}

impl<T> OperationInput for ValidatedQuery<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Query::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

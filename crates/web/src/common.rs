use axum::{
    extract::{OriginalUri, Query, Request},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use escort::{EscortError, ValidationError};
use model::ExampleData;
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VecResponse<T> {
    pub data: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> VecResponse<T> {
    pub fn non_paginated(data: Vec<T>) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn hateoas(self) -> hateoas::Response<Self> {
        hateoas::Response::new(self)
    }
}

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn schema_no_example<T: JsonSchema + Serialize>(
    Query(_params): Query<SchemaParams>,
) -> impl IntoResponse {
    Json(schema_for!(T))
}

pub(crate) async fn route_not_implemented(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_implemented(req.method(), original_uri.path())
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responses -

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_information: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            detailed_information: None,
        }
    }

    pub fn not_implemented(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("i dunno what happened here :/");
        self.with_message(message)
    }

    pub fn with_detailed_information(mut self, message: impl Into<String>) -> Self {
        self.detailed_information = Some(message.into());
        self
    }
}

/// Rule violations keep the wording the companion app shows its users.
impl From<ValidationError> for RouteErrorResponse {
    fn from(value: ValidationError) -> Self {
        let response = Self::new(StatusCode::BAD_REQUEST);
        match value {
            ValidationError::EmptyRoute => {
                response.with_message("No route available for simulation.")
            }
            ValidationError::NoCheckpoints => response
                .with_message("Please add at least one checkpoint before starting simulation."),
            ValidationError::InvalidCoordinate => response.with_message("Invalid coordinates."),
            ValidationError::CheckpointNotNearRoute => {
                response.with_message("Checkpoint must be near the route!")
            }
            ValidationError::CheckpointNotPending => {
                response.with_message("This checkpoint has already been passed.")
            }
            ValidationError::SimulationActive => {
                response.with_message("Not available while the simulation is running.")
            }
            ValidationError::SosSessionOpen => {
                Self::new(StatusCode::CONFLICT).with_message("An SOS confirmation is pending.")
            }
            ValidationError::EmptyPhoneNumber => {
                response.with_message("Please enter a valid phone number")
            }
            ValidationError::DuplicateContact => {
                response.with_message("This contact already exists")
            }
            ValidationError::LastContact => {
                response.with_message("Please add at least one contact")
            }
        }
    }
}

impl From<EscortError> for RouteErrorResponse {
    fn from(value: EscortError) -> Self {
        match value {
            EscortError::Validation(why) => Self::from(why),
            EscortError::JourneyNotFound => Self::new(StatusCode::NOT_FOUND)
                .with_message("The requested journey does not exist."),
            EscortError::CheckpointNotFound => Self::new(StatusCode::NOT_FOUND)
                .with_message("The requested checkpoint does not exist."),
            EscortError::ContactNotFound => Self::new(StatusCode::NOT_FOUND)
                .with_message("The requested contact does not exist."),
            EscortError::SosNotOpen => Self::new(StatusCode::CONFLICT)
                .with_message("There is no open SOS session to confirm."),
            EscortError::PermissionDenied => Self::new(StatusCode::FORBIDDEN)
                .with_message("Location permission was not granted."),
            EscortError::Collaborator(why) => Self::new(StatusCode::BAD_GATEWAY)
                .with_message("A collaborating service failed.")
                .with_detailed_information(format!("{}", why)),
            EscortError::SendError(_) | EscortError::ResponseError(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_default_message()
            }
        }
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_the_app_wording() {
        let response = RouteErrorResponse::from(ValidationError::DuplicateContact);
        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.message.as_deref(),
            Some("This contact already exists")
        );

        let response = RouteErrorResponse::from(ValidationError::CheckpointNotNearRoute);
        assert_eq!(
            response.message.as_deref(),
            Some("Checkpoint must be near the route!")
        );

        let response = RouteErrorResponse::from(ValidationError::LastContact);
        assert_eq!(
            response.message.as_deref(),
            Some("Please add at least one contact")
        );
    }

    #[test]
    fn missing_resources_map_to_not_found() {
        let response = RouteErrorResponse::from(EscortError::JourneyNotFound);
        assert_eq!(response.status_code, StatusCode::NOT_FOUND);

        let response = RouteErrorResponse::from(EscortError::SosNotOpen);
        assert_eq!(response.status_code, StatusCode::CONFLICT);
    }
}

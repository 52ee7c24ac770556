use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use tower_http::cors::CorsLayer;
use vinsure::services::{Prediction, ServiceError, VehicleData};

use crate::auth::{auth_middleware, require_train, ApiKeyAuth};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Serialize)]
pub struct PredictResponse {
    prediction: u8,
    label: &'static str,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            prediction: prediction.value,
            label: prediction.label(),
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    };
    (status, Json(body)).into_response()
}

fn error_status(error: &ServiceError) -> (StatusCode, &'static str) {
    match error {
        ServiceError::NoModelAvailable => (StatusCode::SERVICE_UNAVAILABLE, "no_model"),
        ServiceError::SchemaMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

fn service_error_response(error: &ServiceError) -> Response {
    let (status, code) = error_status(error);
    error_response(status, code, &error.to_string())
}

fn page(body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n<html>\n",
            "<head><title>Vehicle Insurance Interest</title></head>\n",
            "<body>\n<h1>Vehicle Insurance Interest</h1>\n{}\n</body>\n</html>\n",
        ),
        body
    )
}

fn form_page(result: Option<&str>) -> String {
    let inputs: String = VehicleData::FIELDS
        .iter()
        .map(|field| {
            format!(
                "<label>{field} <input type=\"text\" name=\"{field}\" required></label><br>\n"
            )
        })
        .collect();
    let result = result
        .map(|text| format!("<p id=\"result\">{}</p>\n", escape_html(text)))
        .unwrap_or_default();
    page(&format!(
        concat!(
            "<form method=\"post\" action=\"/\">\n",
            "{}<button type=\"submit\">Predict</button>\n</form>\n{}",
        ),
        inputs, result
    ))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.check().await)
}

async fn index() -> Html<String> {
    Html(form_page(None))
}

async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let result = match VehicleData::from_fields(&fields) {
        Ok(data) => state.prediction.predict(&data).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(prediction) => Html(form_page(Some(prediction.label()))).into_response(),
        Err(e) => {
            let (status, _) = error_status(&e);
            (status, Html(form_page(Some(&e.to_string())))).into_response()
        },
    }
}

async fn predict_json(State(state): State<AppState>, Json(data): Json<VehicleData>) -> Response {
    match state.prediction.predict(&data).await {
        Ok(prediction) => Json(PredictResponse::from(prediction)).into_response(),
        Err(e) => service_error_response(&e),
    }
}

async fn train(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.training.try_lock() else {
        return error_response(
            StatusCode::CONFLICT,
            "training_in_progress",
            "A training run is already in progress",
        );
    };

    match state.pipeline.run().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Training pipeline failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                &format!("{:#}", e),
            )
        },
    }
}

pub fn build_router(state: AppState) -> Router {
    build_router_with_auth(state, ApiKeyAuth::from_env())
}

pub fn build_router_with_auth(state: AppState, api_key_auth: ApiKeyAuth) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let train_routes = Router::new()
        .route("/train", get(train))
        .route_layer(middleware::from_fn(require_train));

    let predict_routes = Router::new()
        .route("/", get(index).post(predict_form))
        .route("/api/v1/predict", post(predict_json));

    let protected = Router::new()
        .merge(train_routes)
        .merge(predict_routes)
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::Extension(api_key_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Prediction and health only
    Predict,
    /// Prediction plus training runs
    Train,
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub scope: KeyScope,
}

#[derive(Clone, Default)]
pub struct ApiKeyAuth {
    predict_keys: HashSet<String>,
    train_keys: HashSet<String>,
}

impl ApiKeyAuth {
    pub fn new<I, J>(predict_keys: I, train_keys: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            predict_keys: predict_keys.into_iter().collect(),
            train_keys: train_keys.into_iter().collect(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            keys_from_env("VINSURE_SERVER__API_KEYS_RO"),
            keys_from_env("VINSURE_SERVER__API_KEYS_RW"),
        )
    }

    pub fn is_enabled(&self) -> bool {
        !self.predict_keys.is_empty() || !self.train_keys.is_empty()
    }

    pub fn authenticate(&self, token: &str) -> Option<AuthContext> {
        if self.train_keys.contains(token) {
            Some(AuthContext {
                scope: KeyScope::Train,
            })
        } else if self.predict_keys.contains(token) {
            Some(AuthContext {
                scope: KeyScope::Predict,
            })
        } else {
            None
        }
    }
}

fn keys_from_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let auth = request.extensions().get::<ApiKeyAuth>().cloned();

    let Some(auth) = auth else {
        return next.run(request).await;
    };

    if !auth.is_enabled() {
        return next.run(request).await;
    }

    // API Gateway authorizer header (Lambda)
    if let Some(scope_header) = request.headers().get("x-auth-scope") {
        if let Ok(scope_str) = scope_header.to_str() {
            let scope = match scope_str {
                "read-write" | "rw" => KeyScope::Train,
                _ => KeyScope::Predict,
            };
            let mut request = request;
            request.extensions_mut().insert(AuthContext { scope });
            return next.run(request).await;
        }
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) => match auth.authenticate(token) {
            Some(context) => {
                let mut request = request;
                request.extensions_mut().insert(context);
                next.run(request).await
            },
            None => (StatusCode::UNAUTHORIZED, "Invalid API key").into_response(),
        },
        None => (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response(),
    }
}

/// Reject keys without the training scope
pub async fn require_train(request: Request, next: Next) -> Response {
    if let Some(context) = request.extensions().get::<AuthContext>() {
        if context.scope != KeyScope::Train {
            return (StatusCode::FORBIDDEN, "Training access required").into_response();
        }
    }
    next.run(request).await
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::DependencyError;

/// Non-standard "login time-out" status used for expired tokens.
const TOKEN_EXPIRED_STATUS: u16 = 440;

/// Authentication error type.
///
/// Every entry point of the service fails with one of these; none of them is
/// fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No signing configuration for the requesting client
    #[error("Unknown client application")]
    UnknownClient,
    /// Unknown user, wrong password or inactive user
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// User is on the blacklist
    #[error("User is blocked")]
    UserBlocked,
    /// Bad signature, malformed payload or wrong kind of token
    #[error("Token is not valid")]
    InvalidToken,
    /// Access token has expired
    #[error("Access token has expired")]
    TokenExpired,
    /// Refresh token has expired
    #[error("Refresh token has expired")]
    RefreshTokenExpired,
    /// Signing configuration cannot be used (decryption, bad key material)
    #[error("Signing configuration error: {0}")]
    ConfigurationError(String),
    /// Cache, store or user directory failed or timed out
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::UnknownClient => "unknown_client",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserBlocked => "user_blocked",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::RefreshTokenExpired => "refresh_token_expired",
            AuthError::ConfigurationError(_) => "configuration_error",
            AuthError::DependencyUnavailable(_) => "dependency_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UnknownClient | AuthError::InvalidCredentials | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::UserBlocked => StatusCode::FORBIDDEN,
            AuthError::TokenExpired | AuthError::RefreshTokenExpired => {
                StatusCode::from_u16(TOKEN_EXPIRED_STATUS).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            AuthError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the error points at a deployment or key-management defect
    /// rather than a client mistake.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, AuthError::ConfigurationError(_))
    }
}

impl From<DependencyError> for AuthError {
    fn from(e: DependencyError) -> Self {
        AuthError::DependencyUnavailable(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, refresh and authorization-information flows.
//!
//! Every flow starts by resolving the requesting client's signing
//! configuration and fails closed: any collaborator error ends the request
//! with an [`AuthError`] and no token is issued.

use std::sync::Arc;
use std::time::Duration;

use super::claims::TokenClaims;
use super::codec::{IssuedTokens, TokenCodec, TokenError};
use super::directory::UserDirectory;
use super::error::AuthError;
use crate::error::bounded;
use crate::models::{
    AuthenticationResult, ClientSigningConfig, UserGrant, UsernameAuthorities,
};
use crate::storage::{ClientConfigurationStore, ClientLookupError, UserBlacklist};

const USER_DIRECTORY: &str = "user directory";

/// Which kind of token a caller is expected to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Refresh,
}

pub struct AuthenticationService {
    clients: Arc<ClientConfigurationStore>,
    blacklist: UserBlacklist,
    directory: Arc<dyn UserDirectory>,
    codec: TokenCodec,
    timeout: Duration,
}

impl AuthenticationService {
    /// - `timeout`: Deadline for each user directory call.
    pub fn new(
        clients: Arc<ClientConfigurationStore>,
        blacklist: UserBlacklist,
        directory: Arc<dyn UserDirectory>,
        timeout: Duration,
    ) -> Self {
        Self {
            clients,
            blacklist,
            directory,
            codec: TokenCodec::new(),
            timeout,
        }
    }

    pub fn blacklist(&self) -> &UserBlacklist {
        &self.blacklist
    }

    pub fn clients(&self) -> &ClientConfigurationStore {
        &self.clients
    }

    /// Authenticate a user for a client application and issue a token pair.
    pub async fn login(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthenticationResult, AuthError> {
        let config = self.client_config(client_id).await?;

        let grant = bounded(
            USER_DIRECTORY,
            self.timeout,
            self.directory.verify_credentials(username, password),
        )
        .await?
        .ok_or_else(|| {
            tracing::info!(client_id, username, "Login rejected: invalid credentials");
            AuthError::InvalidCredentials
        })?;

        self.ensure_not_blocked(username)?;

        let result = self.issue(&config, username, &grant)?;
        tracing::info!(client_id, username, jti = %result.jwt_id, "User logged in");
        Ok(result)
    }

    /// Exchange a refresh token for a fresh token pair.
    ///
    /// Authorities are re-read from the user directory. The presented refresh
    /// token is not revoked and stays usable until its own expiry.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> Result<AuthenticationResult, AuthError> {
        let config = self.client_config(client_id).await?;
        let username = self.validated_username(refresh_token, &config, TokenKind::Refresh)?;

        self.ensure_not_blocked(&username)?;

        let grant = bounded(
            USER_DIRECTORY,
            self.timeout,
            self.directory.current_authorities(&username),
        )
        .await?
        .ok_or_else(|| {
            tracing::info!(client_id, username = %username, "Refresh rejected: user no longer exists");
            AuthError::InvalidToken
        })?;

        let result = self.issue(&config, &username, &grant)?;
        tracing::info!(client_id, username = %username, jti = %result.jwt_id, "Tokens refreshed");
        Ok(result)
    }

    /// Project the authorization data carried by an access token.
    pub async fn authorization_information(
        &self,
        access_token: &str,
        client_id: &str,
    ) -> Result<UsernameAuthorities, AuthError> {
        let config = self.client_config(client_id).await?;
        let claims = self.validated(access_token, &config, TokenKind::Access)?;
        let username = claims
            .username()
            .ok_or(AuthError::InvalidToken)?
            .to_string();

        self.ensure_not_blocked(&username)?;

        Ok(UsernameAuthorities {
            authorities: claims.authorities(),
            additional_info: claims.additional().clone(),
            username,
        })
    }

    async fn client_config(&self, client_id: &str) -> Result<Arc<ClientSigningConfig>, AuthError> {
        self.clients.get(client_id).await.map_err(|e| match e {
            ClientLookupError::NotFound(_) => {
                tracing::info!(client_id, "Unknown client application");
                AuthError::UnknownClient
            }
            ClientLookupError::Dependency(e) => {
                tracing::warn!(client_id, error = %e, "Client configuration unavailable");
                AuthError::from(e)
            }
            ClientLookupError::Configuration { reason, .. } => {
                configuration_error(client_id, reason)
            }
        })
    }

    fn ensure_not_blocked(&self, username: &str) -> Result<(), AuthError> {
        let blocked = self.blacklist.is_blocked(username).map_err(|e| {
            tracing::warn!(username, error = %e, "Blacklist unavailable");
            AuthError::from(e)
        })?;
        if blocked {
            tracing::info!(username, "Blocked user rejected");
            return Err(AuthError::UserBlocked);
        }
        Ok(())
    }

    fn validated(
        &self,
        token: &str,
        config: &ClientSigningConfig,
        expected: TokenKind,
    ) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.validate(token, config).map_err(|e| match e {
            TokenError::TokenExpired => match expected {
                TokenKind::Access => AuthError::TokenExpired,
                TokenKind::Refresh => AuthError::RefreshTokenExpired,
            },
            TokenError::Configuration(reason) => configuration_error(&config.client_id, reason),
            TokenError::InvalidSignature | TokenError::MalformedToken(_) => {
                tracing::debug!(client_id = %config.client_id, error = %e, "Token rejected");
                AuthError::InvalidToken
            }
        })?;

        let kind = if claims.is_refresh_token() {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        };
        if kind != expected {
            tracing::debug!(client_id = %config.client_id, ?kind, "Wrong kind of token presented");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    fn validated_username(
        &self,
        token: &str,
        config: &ClientSigningConfig,
        expected: TokenKind,
    ) -> Result<String, AuthError> {
        self.validated(token, config, expected)?
            .username()
            .map(str::to_string)
            .ok_or(AuthError::InvalidToken)
    }

    fn issue(
        &self,
        config: &ClientSigningConfig,
        username: &str,
        grant: &UserGrant,
    ) -> Result<AuthenticationResult, AuthError> {
        let IssuedTokens {
            claims,
            access_token,
            refresh_token,
        } = self
            .codec
            .issue(config, username, &grant.authorities, &grant.additional_info)
            .map_err(|e| configuration_error(&config.client_id, e.to_string()))?;

        Ok(AuthenticationResult {
            jwt_id: claims.access_claims.jwt_id().unwrap_or_default().to_string(),
            access_token,
            refresh_token,
            token_type: config.token_type.clone(),
            expires_in: config.access_token_validity_seconds,
            scope: config.scope.clone(),
            additional_info: claims.additional_claims,
        })
    }
}

fn configuration_error(client_id: &str, reason: String) -> AuthError {
    tracing::error!(client_id, reason = %reason, "Client signing configuration is unusable");
    AuthError::ConfigurationError(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::algorithm::SignatureAlgorithm;
    use crate::auth::cipher::SecretCipher;
    use crate::error::DependencyError;
    use crate::models::SigningSecret;
    use crate::storage::{Cache, InMemoryClientConfigStore, LruTtlCache};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    const RSA_PRIVATE: &str = include_str!("../../testdata/rsa_private.pem");
    const RSA_PUBLIC: &str = include_str!("../../testdata/rsa_public.pem");

    /// Directory with fixed users, all sharing the password "pw".
    #[derive(Default)]
    struct StaticDirectory {
        users: Mutex<HashMap<String, UserGrant>>,
        delay: Option<Duration>,
    }

    impl StaticDirectory {
        fn with_user(self, username: &str, grant: UserGrant) -> Self {
            if let Ok(mut users) = self.users.lock() {
                users.insert(username.to_string(), grant);
            }
            self
        }

        fn set_user(&self, username: &str, grant: Option<UserGrant>) {
            let mut users = self.users.lock().unwrap();
            match grant {
                Some(grant) => users.insert(username.to_string(), grant),
                None => users.remove(username),
            };
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl UserDirectory for StaticDirectory {
        async fn verify_credentials(
            &self,
            username: &str,
            password: &str,
        ) -> Result<Option<UserGrant>, DependencyError> {
            self.pause().await;
            if password != "pw" {
                return Ok(None);
            }
            Ok(self.users.lock().unwrap().get(username).cloned())
        }

        async fn current_authorities(
            &self,
            username: &str,
        ) -> Result<Option<UserGrant>, DependencyError> {
            self.pause().await;
            Ok(self.users.lock().unwrap().get(username).cloned())
        }
    }

    /// Directory that is always down.
    struct DownDirectory;

    #[async_trait]
    impl UserDirectory for DownDirectory {
        async fn verify_credentials(
            &self,
            _username: &str,
            _password: &str,
        ) -> Result<Option<UserGrant>, DependencyError> {
            Err(DependencyError::Unavailable(USER_DIRECTORY, "connection refused".to_string()))
        }

        async fn current_authorities(
            &self,
            _username: &str,
        ) -> Result<Option<UserGrant>, DependencyError> {
            Err(DependencyError::Unavailable(USER_DIRECTORY, "connection refused".to_string()))
        }
    }

    fn hmac_client(client_id: &str, secret: &str) -> ClientSigningConfig {
        ClientSigningConfig {
            client_id: client_id.to_string(),
            signature_algorithm: SignatureAlgorithm::HS256,
            signing_secret: SigningSecret::parse(secret).unwrap(),
            verification_key: None,
            access_token_validity_seconds: 250,
            refresh_token_validity_seconds: 500,
            token_type: "Bearer".to_string(),
            scope: None,
        }
    }

    fn alice() -> UserGrant {
        UserGrant::new(["user"]).with_info("name", "Alice")
    }

    fn service_with(
        clients: Vec<ClientSigningConfig>,
        directory: Arc<dyn UserDirectory>,
        cipher: SecretCipher,
    ) -> AuthenticationService {
        let store = ClientConfigurationStore::new(
            Arc::new(InMemoryClientConfigStore::with_clients(clients)),
            Arc::new(LruTtlCache::new(16, Some(Duration::from_secs(300)))),
            cipher,
            Duration::from_millis(200),
        );
        AuthenticationService::new(
            Arc::new(store),
            UserBlacklist::in_memory(),
            directory,
            Duration::from_millis(200),
        )
    }

    fn service() -> AuthenticationService {
        service_with(
            vec![hmac_client("app1", "s3cr3t"), hmac_client("app2", "other")],
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            SecretCipher::plaintext_only(),
        )
    }

    fn payload(token: &str) -> Value {
        let encoded = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).unwrap()).unwrap()
    }

    /// Token pair for alice issued long enough ago that both have expired.
    async fn expired_pair(service: &AuthenticationService) -> IssuedTokens {
        let config = service.clients().get("app1").await.unwrap();
        TokenCodec::new()
            .issue_at(
                &config,
                "alice",
                &BTreeSet::from(["user".to_string()]),
                &Default::default(),
                Utc::now().timestamp() - 1_000,
            )
            .unwrap()
    }

    #[tokio::test]
    async fn login_issues_tokens_for_valid_credentials() {
        let service = service();
        let result = service.login("app1", "alice", "pw").await.unwrap();

        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.expires_in, 250);
        assert_eq!(result.additional_info.get("name"), Some(&json!("Alice")));

        let access = payload(&result.access_token);
        assert_eq!(access["username"], "alice");
        assert_eq!(access["authorities"], json!(["user"]));
        assert_eq!(access["jti"], json!(result.jwt_id));
        assert_eq!(
            access["exp"].as_i64().unwrap() - access["iat"].as_i64().unwrap(),
            250
        );

        let refresh = payload(&result.refresh_token);
        assert_eq!(refresh["ati"], access["jti"]);
        assert!(refresh["exp"].as_i64() > access["exp"].as_i64());
        assert!(refresh.get("authorities").is_none());
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_and_unknown_clients() {
        let service = service();
        assert_eq!(
            service.login("app1", "alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            service.login("app1", "mallory", "pw").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            service.login("nope", "alice", "pw").await,
            Err(AuthError::UnknownClient)
        );
    }

    #[tokio::test]
    async fn blacklisted_user_cannot_log_in() {
        let service = service();
        assert!(service.blacklist().add("alice"));

        assert_eq!(
            service.login("app1", "alice", "pw").await,
            Err(AuthError::UserBlocked)
        );

        assert!(service.blacklist().remove("alice"));
        assert!(service.login("app1", "alice", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn login_then_authorization_information_round_trips() {
        let service = service();
        let result = service.login("app1", "alice", "pw").await.unwrap();

        let info = service
            .authorization_information(&result.access_token, "app1")
            .await
            .unwrap();
        assert_eq!(info.username, "alice");
        assert_eq!(info.authorities, BTreeSet::from(["user".to_string()]));
        assert_eq!(info.additional_info.get("name"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn tokens_do_not_cross_clients() {
        let service = service();
        let result = service.login("app1", "alice", "pw").await.unwrap();

        assert_eq!(
            service
                .authorization_information(&result.access_token, "app2")
                .await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            service.refresh(&result.refresh_token, "app2").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn token_kinds_are_not_interchangeable() {
        let service = service();
        let result = service.login("app1", "alice", "pw").await.unwrap();

        assert_eq!(
            service.refresh(&result.access_token, "app1").await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            service
                .authorization_information(&result.refresh_token, "app1")
                .await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn refresh_issues_fresh_pair_with_current_authorities() {
        let directory = Arc::new(StaticDirectory::default().with_user("alice", alice()));
        let service = service_with(
            vec![hmac_client("app1", "s3cr3t")],
            directory.clone(),
            SecretCipher::plaintext_only(),
        );
        let first = service.login("app1", "alice", "pw").await.unwrap();

        directory.set_user("alice", Some(UserGrant::new(["user", "admin"])));
        let second = service.refresh(&first.refresh_token, "app1").await.unwrap();

        assert_ne!(second.jwt_id, first.jwt_id);
        let info = service
            .authorization_information(&second.access_token, "app1")
            .await
            .unwrap();
        assert_eq!(
            info.authorities,
            BTreeSet::from(["admin".to_string(), "user".to_string()])
        );

        // The old refresh token is not revoked
        assert!(service.refresh(&first.refresh_token, "app1").await.is_ok());
    }

    #[tokio::test]
    async fn refresh_fails_for_removed_or_blocked_users() {
        let directory = Arc::new(StaticDirectory::default().with_user("alice", alice()));
        let service = service_with(
            vec![hmac_client("app1", "s3cr3t")],
            directory.clone(),
            SecretCipher::plaintext_only(),
        );
        let result = service.login("app1", "alice", "pw").await.unwrap();

        service.blacklist().add("alice");
        assert_eq!(
            service.refresh(&result.refresh_token, "app1").await,
            Err(AuthError::UserBlocked)
        );
        assert_eq!(
            service
                .authorization_information(&result.access_token, "app1")
                .await,
            Err(AuthError::UserBlocked)
        );

        service.blacklist().remove("alice");
        directory.set_user("alice", None);
        assert_eq!(
            service.refresh(&result.refresh_token, "app1").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn expired_tokens_are_distinct_from_garbage() {
        let service = service();
        let expired = expired_pair(&service).await;

        assert_eq!(
            service.refresh(&expired.refresh_token, "app1").await,
            Err(AuthError::RefreshTokenExpired)
        );
        assert_eq!(
            service
                .authorization_information(&expired.access_token, "app1")
                .await,
            Err(AuthError::TokenExpired)
        );
        assert_eq!(
            service.refresh("not-a-token", "app1").await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            service.authorization_information("a.b.c", "app1").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn result_carries_client_scope() {
        let mut scoped = hmac_client("app1", "s3cr3t");
        scoped.scope = Some("read write".to_string());
        let service = service_with(
            vec![scoped],
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            SecretCipher::plaintext_only(),
        );

        let result = service.login("app1", "alice", "pw").await.unwrap();
        assert_eq!(result.scope.as_deref(), Some("read write"));
        assert_eq!(payload(&result.access_token)["scope"], "read write");
    }

    #[tokio::test]
    async fn rsa_clients_round_trip() {
        let rsa = ClientSigningConfig {
            signature_algorithm: SignatureAlgorithm::RS256,
            signing_secret: SigningSecret::parse(RSA_PRIVATE).unwrap(),
            verification_key: Some(RSA_PUBLIC.to_string()),
            ..hmac_client("rsa-app", "")
        };
        let service = service_with(
            vec![rsa],
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            SecretCipher::plaintext_only(),
        );

        let result = service.login("rsa-app", "alice", "pw").await.unwrap();
        let info = service
            .authorization_information(&result.access_token, "rsa-app")
            .await
            .unwrap();
        assert_eq!(info.username, "alice");
    }

    #[tokio::test]
    async fn encrypted_secrets_resolve_with_the_right_master_key() {
        let stored = SecretCipher::new("master").encrypt(b"s3cr3t").unwrap();
        let directory = Arc::new(StaticDirectory::default().with_user("alice", alice()));

        let good = service_with(
            vec![hmac_client("app1", &stored)],
            directory.clone(),
            SecretCipher::new("master"),
        );
        assert!(good.login("app1", "alice", "pw").await.is_ok());

        let bad = service_with(
            vec![hmac_client("app1", &stored)],
            directory,
            SecretCipher::new("not-the-master"),
        );
        let err = bad.login("app1", "alice", "pw").await.unwrap_err();
        assert!(err.is_configuration_defect());
    }

    #[tokio::test]
    async fn unsupported_algorithm_is_rejected_on_load() {
        let mut es512 = hmac_client("app1", "irrelevant");
        es512.signature_algorithm = SignatureAlgorithm::ES512;
        es512.verification_key = Some("irrelevant".to_string());
        let service = service_with(
            vec![es512],
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            SecretCipher::plaintext_only(),
        );

        assert!(matches!(
            service.login("app1", "alice", "pw").await,
            Err(AuthError::ConfigurationError(_))
        ));
        assert!(!service.clients().contains("app1"));
    }

    /// Blacklist cache that cannot be read.
    struct UnreadableCache;

    impl Cache<bool> for UnreadableCache {
        fn get(&self, _key: &str) -> Option<bool> {
            None
        }
        fn try_get(&self, _key: &str) -> Result<Option<bool>, DependencyError> {
            Err(DependencyError::Unavailable("blacklist cache", "down".to_string()))
        }
        fn put(&self, _key: &str, _value: bool) -> bool {
            false
        }
        fn remove(&self, _key: &str) -> bool {
            false
        }
        fn contains(&self, _key: &str) -> bool {
            false
        }
        fn clear(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn unreadable_blacklist_fails_closed() {
        let store = ClientConfigurationStore::new(
            Arc::new(InMemoryClientConfigStore::with_clients([hmac_client(
                "app1", "s3cr3t",
            )])),
            Arc::new(LruTtlCache::new(16, None)),
            SecretCipher::plaintext_only(),
            Duration::from_millis(200),
        );
        let service = AuthenticationService::new(
            Arc::new(store),
            UserBlacklist::new(Arc::new(UnreadableCache)),
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            Duration::from_millis(200),
        );

        assert!(matches!(
            service.login("app1", "alice", "pw").await,
            Err(AuthError::DependencyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn dependency_failures_fail_closed() {
        let down = service_with(
            vec![hmac_client("app1", "s3cr3t")],
            Arc::new(DownDirectory),
            SecretCipher::plaintext_only(),
        );
        assert!(matches!(
            down.login("app1", "alice", "pw").await,
            Err(AuthError::DependencyUnavailable(_))
        ));

        let slow = StaticDirectory {
            delay: Some(Duration::from_secs(5)),
            ..StaticDirectory::default()
        }
        .with_user("alice", alice());
        let slow = service_with(
            vec![hmac_client("app1", "s3cr3t")],
            Arc::new(slow),
            SecretCipher::plaintext_only(),
        );
        assert!(matches!(
            slow.login("app1", "alice", "pw").await,
            Err(AuthError::DependencyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn invalidated_client_picks_up_rotated_secret() {
        let durable = Arc::new(InMemoryClientConfigStore::with_clients([hmac_client(
            "app1", "old",
        )]));
        let store = ClientConfigurationStore::new(
            durable.clone(),
            Arc::new(LruTtlCache::new(16, None)),
            SecretCipher::plaintext_only(),
            Duration::from_millis(200),
        );
        let service = AuthenticationService::new(
            Arc::new(store),
            UserBlacklist::in_memory(),
            Arc::new(StaticDirectory::default().with_user("alice", alice())),
            Duration::from_millis(200),
        );
        let before = service.login("app1", "alice", "pw").await.unwrap();

        durable.insert(hmac_client("app1", "new")).await;
        assert!(service.clients().invalidate("app1"));

        assert_eq!(
            service
                .authorization_information(&before.access_token, "app1")
                .await,
            Err(AuthError::InvalidToken)
        );
        let after = service.login("app1", "alice", "pw").await.unwrap();
        assert!(service
            .authorization_information(&after.access_token, "app1")
            .await
            .is_ok());
    }
}

//! Integration tests for the provider adapter and the login round trip.

#[cfg(test)]
mod integration_tests {
    use crate::{
        CallbackValidator, LaunchStateEncoder, OidcClient, StatePayload, StateTokenCodec,
        random_token,
    };
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use launch_bridge_core::{
        AuthFailure, IdentityError, OidcProvider, ProviderConfig, ProviderKind,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT_ID: &str = "bridge_client";
    const SECRET: &str = "integration-test-secret-0123456789abcdef";

    async fn setup_mock_provider(kind: ProviderKind) -> (MockServer, ProviderConfig) {
        let mock_server = MockServer::start().await;

        let config = ProviderConfig {
            provider_id: "mock".to_string(),
            kind,
            base_url: mock_server.uri(),
            client_id: CLIENT_ID.to_string(),
            client_secret: "mock_secret".to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            ..ProviderConfig::default()
        };

        (mock_server, config)
    }

    fn id_token(audience: &str, nonce: Option<&str>) -> String {
        let mut claims = serde_json::json!({
            "sub": "user-42",
            "iss": "https://issuer.example.com",
            "aud": audience,
            "email": "learner@example.com",
            "email_verified": true,
            "name": "Ada Learner",
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        if let Some(nonce) = nonce {
            claims["nonce"] = serde_json::json!(nonce);
        }

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"issuer-key"),
        )
        .unwrap()
    }

    async fn mount_token_endpoint(server: &MockServer, token_path: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(token_path.to_string()))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth_code"))
            .and(body_string_contains("client_id=bridge_client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_code_exchange_success() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Logto).await;
        mount_token_endpoint(
            &mock_server,
            "/oidc/token",
            serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "id_token": id_token(CLIENT_ID, Some("n0nce")),
            }),
        )
        .await;

        let client = OidcClient::new(config).unwrap();
        let session = client.exchange_code("auth_code").await.unwrap();

        assert_eq!(session.identity.provider_id, "mock");
        assert_eq!(session.identity.subject, "user-42");
        assert_eq!(
            session.identity.email,
            Some("learner@example.com".to_string())
        );
        assert_eq!(session.identity.display_name, Some("Ada Learner".to_string()));
        assert_eq!(session.nonce, Some("n0nce".to_string()));
        assert_eq!(session.access_token, "mock_access_token");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_auth0_token_path() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Auth0).await;
        mount_token_endpoint(
            &mock_server,
            "/oauth/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
                "id_token": id_token(CLIENT_ID, None),
            }),
        )
        .await;

        let client = OidcClient::new(config).unwrap();
        let session = client.exchange_code("auth_code").await.unwrap();
        assert_eq!(session.nonce, None);
    }

    #[tokio::test]
    async fn test_token_endpoint_error() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Generic).await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Authorization code expired"
            })))
            .mount(&mock_server)
            .await;

        let client = OidcClient::new(config).unwrap();
        let result = client.exchange_code("auth_code").await;

        match result {
            Err(IdentityError::ProviderError(message)) => {
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("Expected provider error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_missing_id_token_rejected() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Generic).await;
        mount_token_endpoint(
            &mock_server,
            "/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
            }),
        )
        .await;

        let client = OidcClient::new(config).unwrap();
        assert!(matches!(
            client.exchange_code("auth_code").await,
            Err(IdentityError::ProviderError(_))
        ));
    }

    #[tokio::test]
    async fn test_id_token_for_other_client_rejected() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Generic).await;
        mount_token_endpoint(
            &mock_server,
            "/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
                "id_token": id_token("someone_else", None),
            }),
        )
        .await;

        let client = OidcClient::new(config).unwrap();
        assert!(matches!(
            client.exchange_code("auth_code").await,
            Err(IdentityError::ProviderError(_))
        ));
    }

    #[tokio::test]
    async fn test_user_info_enriches_identity() {
        let (mock_server, mut config) = setup_mock_provider(ProviderKind::Logto).await;
        config.fetch_userinfo = true;
        mount_token_endpoint(
            &mock_server,
            "/oidc/token",
            serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "id_token": id_token(CLIENT_ID, None),
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/oidc/me"))
            .and(header("authorization", "Bearer mock_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "user-42",
                "email": "ada@example.com",
                "name": "Ada Lovelace",
                "roles": ["learner"]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OidcClient::new(config).unwrap();
        let session = client.exchange_code("auth_code").await.unwrap();

        assert_eq!(session.identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(session.identity.display_name.as_deref(), Some("Ada Lovelace"));
        let metadata = session.identity.metadata.unwrap();
        assert_eq!(metadata["userinfo"]["roles"][0], "learner");
        assert_eq!(metadata["email_verified"], true);
    }

    #[tokio::test]
    async fn test_user_info_for_other_subject_rejected() {
        let (mock_server, mut config) = setup_mock_provider(ProviderKind::Auth0).await;
        config.fetch_userinfo = true;
        mount_token_endpoint(
            &mock_server,
            "/oauth/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
                "id_token": id_token(CLIENT_ID, None),
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "someone-else"
            })))
            .mount(&mock_server)
            .await;

        let client = OidcClient::new(config).unwrap();
        assert!(matches!(
            client.exchange_code("auth_code").await,
            Err(IdentityError::ProviderError(_))
        ));
    }

    #[tokio::test]
    async fn test_user_info_not_fetched_by_default() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Logto).await;
        mount_token_endpoint(
            &mock_server,
            "/oidc/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
                "id_token": id_token(CLIENT_ID, None),
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/oidc/me"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = OidcClient::new(config).unwrap();
        let session = client.exchange_code("auth_code").await.unwrap();
        assert_eq!(session.identity.display_name.as_deref(), Some("Ada Learner"));
    }

    #[test]
    fn test_end_session_url() {
        let back = Url::parse("http://localhost:3000/lti-required").unwrap();

        let config = ProviderConfig {
            kind: ProviderKind::Auth0,
            base_url: "https://tenant.auth0.com".to_string(),
            client_id: CLIENT_ID.to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            ..ProviderConfig::default()
        };
        let url = OidcClient::new(config)
            .unwrap()
            .end_session_url(&back)
            .unwrap();
        assert_eq!(url.path(), "/oidc/logout");
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], CLIENT_ID);
        assert_eq!(params["post_logout_redirect_uri"], "http://localhost:3000/lti-required");

        let generic = ProviderConfig {
            base_url: "https://idp.example.com".to_string(),
            client_id: CLIENT_ID.to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(OidcClient::new(generic).unwrap().end_session_url(&back), None);
    }

    #[test]
    fn test_explicit_endpoints_override_kind() {
        let config = ProviderConfig {
            kind: ProviderKind::Logto,
            base_url: "https://tenant.logto.app".to_string(),
            client_id: CLIENT_ID.to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            authorize_endpoint: Some("https://sso.example.com/custom/authorize".to_string()),
            ..ProviderConfig::default()
        };

        let client = OidcClient::new(config).unwrap();
        let url = client.build_authorize_url("s", None);
        assert_eq!(url.host_str(), Some("sso.example.com"));
        assert_eq!(url.path(), "/custom/authorize");
    }

    #[tokio::test]
    async fn test_full_login_round_trip() {
        let (mock_server, config) = setup_mock_provider(ProviderKind::Logto).await;
        let codec = Arc::new(StateTokenCodec::new(SECRET).unwrap());
        let validator = CallbackValidator::new(codec.clone());
        let client = OidcClient::new(config).unwrap();

        // Launch: mint the attempt and send the browser off.
        let csrf = random_token();
        let nonce = random_token();
        let cookie = codec
            .create(
                &StatePayload {
                    csrf: csrf.clone(),
                    nonce: Some(nonce.clone()),
                },
                Duration::seconds(600),
            )
            .unwrap();
        let redirect = client.build_authorize_url(
            &LaunchStateEncoder::encode(&csrf, "XYZ123"),
            Some(&nonce),
        );

        let params: HashMap<_, _> = redirect.query_pairs().into_owned().collect();
        assert_eq!(params.get("nonce"), Some(&nonce));

        // Provider echoes state untouched and issues a token bound to the nonce.
        mount_token_endpoint(
            &mock_server,
            "/oidc/token",
            serde_json::json!({
                "access_token": "a",
                "token_type": "Bearer",
                "id_token": id_token(CLIENT_ID, Some(&nonce)),
            }),
        )
        .await;

        let validated = validator
            .validate(Some(&cookie), params.get("state").map(String::as_str))
            .await
            .unwrap();
        assert_eq!(validated.launch_context, "XYZ123");

        let session = client.exchange_code("auth_code").await.unwrap();
        validator
            .reconcile_nonce(validated.nonce.as_deref(), session.nonce.as_deref())
            .unwrap();
    }

    #[tokio::test]
    async fn test_substituted_id_token_fails_nonce_check() {
        let codec = Arc::new(StateTokenCodec::new(SECRET).unwrap());
        let validator = CallbackValidator::new(codec);

        assert_eq!(
            validator.reconcile_nonce(Some(&random_token()), Some("replayed-nonce")),
            Err(AuthFailure::NonceMismatch)
        );
    }
}

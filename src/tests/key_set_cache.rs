#[cfg(test)]
mod test {
    use std::sync::Arc;

    use httpmock::Method::GET;
    use httpmock::MockServer;
    use jsonwebtoken::jwk::JwkSet;
    use jsonwebtoken::Algorithm;
    use serde_json::Value;

    use crate::cache::key_set_cache::{select_key, DEFAULT_KEY_ID};
    use crate::error::{FaultKind, KeyRetrievalError};
    use crate::tests::common::{key_set_cache, mock_jwks, JWKS_K1, JWKS_K2, JWKS_PATH, JWKS_ROTATED};

    #[tokio::test]
    async fn matching_key_is_fetched_once_and_cached() {
        let server = MockServer::start_async().await;
        let jwks = mock_jwks(&server, JWKS_K1).await;
        let cache = key_set_cache(&server, Some("k1"));

        let first = cache.verification_key().await.expect("key k1");
        assert_eq!(first.key_id.as_deref(), Some("k1"));
        assert_eq!(first.algorithm, Algorithm::RS256);

        let second = cache.verification_key().await.expect("cached key k1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(jwks.calls_async().await, 1);
    }

    #[tokio::test]
    async fn missing_key_id_is_not_cached_and_fetched_again() {
        let server = MockServer::start_async().await;
        let without_k1 = mock_jwks(&server, JWKS_K2).await;
        let cache = key_set_cache(&server, Some("k1"));

        let err = cache.verification_key().await.expect_err("k1 is absent");
        assert!(matches!(err, KeyRetrievalError::KeyNotFound(ref kid) if kid == "k1"));
        assert_eq!(err.kind(), FaultKind::KeyNotFound);
        assert_eq!(without_k1.calls_async().await, 1);

        // authority publishes k1 now
        without_k1.delete_async().await;
        let with_k1 = mock_jwks(&server, JWKS_K1).await;

        let key = cache.verification_key().await.expect("k1 after refetch");
        assert_eq!(key.key_id.as_deref(), Some("k1"));
        cache.verification_key().await.expect("cached k1");
        assert_eq!(with_k1.calls_async().await, 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_fetch() {
        let server = MockServer::start_async().await;
        let jwks = mock_jwks(&server, JWKS_K1).await;
        let cache = key_set_cache(&server, Some("k1"));

        let before = cache.verification_key().await.expect("key");
        cache.invalidate().await;
        let after = cache.verification_key().await.expect("key");

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(jwks.calls_async().await, 2);
    }

    #[tokio::test]
    async fn invalidate_stale_keeps_a_newer_key() {
        let server = MockServer::start_async().await;
        let jwks = mock_jwks(&server, JWKS_K1).await;
        let cache = key_set_cache(&server, Some("k1"));

        let old = cache.verification_key().await.expect("key");
        cache.invalidate().await;
        let current = cache.verification_key().await.expect("key");

        cache.invalidate_stale(&old).await;
        let still = cache.verification_key().await.expect("key");
        assert!(Arc::ptr_eq(&current, &still));
        assert_eq!(jwks.calls_async().await, 2);
    }

    #[tokio::test]
    async fn error_status_is_a_transport_fault() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(JWKS_PATH);
                then.status(503);
            })
            .await;
        let cache = key_set_cache(&server, Some("k1"));

        let err = cache.verification_key().await.expect_err("503");
        assert!(matches!(err, KeyRetrievalError::Status(status) if status.as_u16() == 503));
        assert_eq!(err.kind(), FaultKind::Transport);
    }

    #[tokio::test]
    async fn unparseable_key_set_is_a_protocol_fault() {
        let server = MockServer::start_async().await;
        mock_jwks(&server, "<html>maintenance</html>").await;
        let cache = key_set_cache(&server, Some("k1"));

        let err = cache.verification_key().await.expect_err("not a key set");
        assert!(matches!(err, KeyRetrievalError::MalformedKeySet(_)));
        assert_eq!(err.kind(), FaultKind::Protocol);
    }

    #[test]
    fn unconfigured_key_id_prefers_default_then_first_key() {
        let rotated: JwkSet = serde_json::from_str(JWKS_ROTATED).unwrap();
        let first = select_key(&rotated, None).expect("first key");
        assert_eq!(first.key_id.as_deref(), Some("k2"));

        let mut doc: Value = serde_json::from_str(JWKS_ROTATED).unwrap();
        doc["keys"][1]["kid"] = Value::String(DEFAULT_KEY_ID.to_owned());
        let with_default: JwkSet = serde_json::from_value(doc).unwrap();
        let chosen = select_key(&with_default, None).expect("default key");
        assert_eq!(chosen.key_id.as_deref(), Some(DEFAULT_KEY_ID));
    }

    #[test]
    fn empty_key_set_reports_default_key_id() {
        let empty: JwkSet = serde_json::from_str(r#"{"keys":[]}"#).unwrap();
        let err = select_key(&empty, None).expect_err("nothing to select");
        assert!(matches!(err, KeyRetrievalError::KeyNotFound(ref kid) if kid == DEFAULT_KEY_ID));
    }
}

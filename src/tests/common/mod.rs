// tests/common/mod.rs
pub use serde_json::json;

use std::sync::Arc;

use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde_json::Value;

use crate::cache::key_set_cache::KeySetCache;
use crate::helpers::time::now_i64;
use crate::sources::daps::{AssertionSettings, DapsTokenAcquirer};
use crate::sources::identity::CertificateIdentity;
use crate::sources::jwks::HttpKeySetSource;
use crate::TokenProvider;

pub const DAPS_K1_PEM: &str = include_str!("../fixtures/daps_k1.pem");
pub const DAPS_K2_PEM: &str = include_str!("../fixtures/daps_k2.pem");
pub const CONNECTOR_PEM: &str = include_str!("../fixtures/connector.pem");
pub const CONNECTOR_JWK: &str = include_str!("../fixtures/connector_jwk.json");
pub const JWKS_K1: &str = include_str!("../fixtures/jwks_k1.json");
pub const JWKS_K2: &str = include_str!("../fixtures/jwks_k2.json");
pub const JWKS_ROTATED: &str = include_str!("../fixtures/jwks_rotated.json");

pub const TOKEN_PATH: &str = "/token";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";
pub const DAPS_ISSUER: &str = "https://daps.example.org";
pub const SKI: [u8; 3] = [0xAB, 0xCD, 0x0E];
pub const AKI: [u8; 2] = [0x01, 0xFF];

pub type HttpTokenProvider = TokenProvider<DapsTokenAcquirer<CertificateIdentity>, HttpKeySetSource>;

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// DAT claims expiring `exp_offset_secs` from now (negative for the past).
pub fn dat_claims(exp_offset_secs: i64) -> Value {
    let now = now_i64();
    json!({
        "iss": DAPS_ISSUER,
        "sub": "AB:CD:0E:keyid:01:FF",
        "aud": "idsc:IDS_CONNECTORS_ALL",
        "iat": now,
        "exp": now + exp_offset_secs,
        "@type": "ids:DatPayload",
        "securityProfile": "idsc:BASE_SECURITY_PROFILE",
    })
}

/// Sign `claims` as the authority would with the key behind `pem`.
pub fn mint_token(pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("test key");
    jsonwebtoken::encode(&header, claims, &key).expect("signed token")
}

pub fn connector_identity() -> CertificateIdentity {
    CertificateIdentity::from_rsa_pem(CONNECTOR_PEM.as_bytes(), Some(SKI.to_vec()), Some(AKI.to_vec()))
        .expect("connector identity")
}

pub fn key_set_cache(server: &MockServer, key_id: Option<&str>) -> Arc<KeySetCache<HttpKeySetSource>> {
    Arc::new(KeySetCache::new(
        HttpKeySetSource::new(server.url(JWKS_PATH), build_reqwest_client()),
        key_id.map(str::to_owned),
    ))
}

pub fn provider(server: &MockServer, identity: CertificateIdentity) -> HttpTokenProvider {
    let acquirer = DapsTokenAcquirer::new(build_reqwest_client(), identity, AssertionSettings::default());
    TokenProvider::new(server.url(TOKEN_PATH), acquirer, key_set_cache(server, Some("k1")))
}

pub async fn mock_jwks<'a>(server: &'a MockServer, body: &str) -> Mock<'a> {
    let body = body.to_owned();
    server
        .mock_async(|when, then| {
            when.method(GET).path(JWKS_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .body(body);
        })
        .await
}

pub async fn mock_token<'a>(server: &'a MockServer, token: &str) -> Mock<'a> {
    let token = token.to_owned();
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TOKEN_PATH)
                .header("Content-Type", "application/x-www-form-urlencoded");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "access_token": token,
                    "token_type": "bearer",
                    "expires_in": 3600,
                }));
        })
        .await
}

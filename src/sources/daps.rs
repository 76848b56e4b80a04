use jsonwebtoken::Header;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DapsError;
use crate::helpers::time::now_i64;
use crate::sources::identity::{CertificateIdentity, ConnectorIdentity};
use crate::sources::AcquireToken;

pub const DEFAULT_AUDIENCE: &str = "idsc:IDS_CONNECTORS_ALL";
pub const DEFAULT_SCOPE: &str = "idsc:IDS_CONNECTOR_ATTRIBUTES_ALL";
pub const DEFAULT_ASSERTION_TTL_SECONDS: u64 = 60;

const IDS_CONTEXT: &str = "https://w3id.org/idsa/contexts/context.jsonld";
const DAT_REQUEST_TYPE: &str = "ids:DatRequestToken";
const GRANT_TYPE: &str = "client_credentials";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const TOKEN_FIELD: &str = "access_token";

#[derive(Debug, Clone)]
pub struct AssertionSettings {
    pub audience: String,
    pub scope: String,
    pub ttl_seconds: u64,
}

impl Default for AssertionSettings {
    fn default() -> Self {
        Self {
            audience: DEFAULT_AUDIENCE.to_owned(),
            scope: DEFAULT_SCOPE.to_owned(),
            ttl_seconds: DEFAULT_ASSERTION_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Serialize)]
struct DatRequestClaims<'a> {
    #[serde(rename = "@context")]
    context: &'a str,
    #[serde(rename = "@type")]
    type_name: &'a str,
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    nbf: i64,
    exp: i64,
}

/// Token exchange with the DAPS: client-credentials grant authenticated by a
/// client assertion signed with the connector key.
#[derive(Debug)]
pub struct DapsTokenAcquirer<I = CertificateIdentity> {
    client: Client,
    identity: I,
    settings: AssertionSettings,
}

impl<I: ConnectorIdentity> DapsTokenAcquirer<I> {
    pub fn new(client: Client, identity: I, settings: AssertionSettings) -> Self {
        Self { client, identity, settings }
    }

    /// Sign a short lived DAT request naming this connector as issuer and subject.
    pub fn client_assertion(&self) -> Result<String, DapsError> {
        let connector_id = self.identity.connector_id()?;
        let now = now_i64();
        let claims = DatRequestClaims {
            context: IDS_CONTEXT,
            type_name: DAT_REQUEST_TYPE,
            iss: &connector_id,
            sub: &connector_id,
            aud: &self.settings.audience,
            iat: now,
            nbf: now,
            exp: now + self.settings.ttl_seconds as i64,
        };

        let header = Header::new(self.identity.signing_algorithm());
        jsonwebtoken::encode(&header, &claims, self.identity.signing_key())
            .map_err(DapsError::ClientAssertion)
    }
}

impl<I: ConnectorIdentity> AcquireToken for DapsTokenAcquirer<I> {
    async fn acquire_token(&self, endpoint: &str) -> Result<String, DapsError> {
        let assertion = self.client_assertion()?;
        let form = [
            ("grant_type", GRANT_TYPE),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
            ("scope", self.settings.scope.as_str()),
        ];

        debug!(url = %endpoint, "requesting DAT");
        let response = self.client.post(endpoint).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %endpoint, %status, "DAPS refused token request");
            return Err(DapsError::Connection(format!("DAPS responded with status {status}")));
        }

        let body = response.text().await?;
        extract_token(&body)
    }
}

fn extract_token(body: &str) -> Result<String, DapsError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| DapsError::EmptyResponse(format!("response body is not JSON: {e}")))?;

    json.get(TOKEN_FIELD)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| DapsError::EmptyResponse(format!("response has no '{TOKEN_FIELD}' field")))
}

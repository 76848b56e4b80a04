use std::fmt;

use jsonwebtoken::{Algorithm, EncodingKey};

use crate::error::DapsError;

/// Identity material of this connector, supplied by whatever manages the keystore.
pub trait ConnectorIdentity: Send + Sync {
    /// Raw bytes of the certificate's Subject Key Identifier extension.
    fn subject_key_identifier(&self) -> Option<&[u8]>;
    /// Raw bytes of the certificate's Authority Key Identifier extension.
    fn authority_key_identifier(&self) -> Option<&[u8]>;
    fn signing_key(&self) -> &EncodingKey;

    fn signing_algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    /// Connector id as the authority knows it: `SKI:keyid:AKI`.
    fn connector_id(&self) -> Result<String, DapsError> {
        let ski = self.subject_key_identifier().ok_or_else(|| {
            DapsError::MissingCertExtension("Subject Key Identifier".to_owned())
        })?;
        let aki = self.authority_key_identifier().ok_or_else(|| {
            DapsError::MissingCertExtension("Authority Key Identifier".to_owned())
        })?;

        Ok(format!(
            "{}:keyid:{}",
            format_key_identifier(ski),
            format_key_identifier(aki)
        ))
    }
}

/// Identity assembled from an already loaded private key and the key
/// identifier extensions of its certificate.
pub struct CertificateIdentity {
    subject_key_identifier: Option<Vec<u8>>,
    authority_key_identifier: Option<Vec<u8>>,
    signing_key: EncodingKey,
    algorithm: Algorithm,
}

impl fmt::Debug for CertificateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateIdentity")
            .field("subject_key_identifier", &self.subject_key_identifier.as_deref().map(format_key_identifier))
            .field("authority_key_identifier", &self.authority_key_identifier.as_deref().map(format_key_identifier))
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl CertificateIdentity {
    pub fn new(
        signing_key: EncodingKey,
        subject_key_identifier: Option<Vec<u8>>,
        authority_key_identifier: Option<Vec<u8>>,
    ) -> Self {
        Self {
            subject_key_identifier,
            authority_key_identifier,
            signing_key,
            algorithm: Algorithm::RS256,
        }
    }

    pub fn from_rsa_pem(
        pem: &[u8],
        subject_key_identifier: Option<Vec<u8>>,
        authority_key_identifier: Option<Vec<u8>>,
    ) -> Result<Self, DapsError> {
        let signing_key = EncodingKey::from_rsa_pem(pem).map_err(DapsError::ClientAssertion)?;
        Ok(Self::new(signing_key, subject_key_identifier, authority_key_identifier))
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

impl ConnectorIdentity for CertificateIdentity {
    fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_identifier.as_deref()
    }

    fn authority_key_identifier(&self) -> Option<&[u8]> {
        self.authority_key_identifier.as_deref()
    }

    fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }

    fn signing_algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// Upper-case hex, one colon between bytes: `AB:0C:FF`.
pub fn format_key_identifier(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// Inverse of [`format_key_identifier`]; colons are optional.
pub fn parse_key_identifier(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(value.trim().replace(':', ""))
}

use super::AuthError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, EncodingKey};

const PEM_LINE_WIDTH: usize = 64;
const DER_SEQUENCE_TAG: u8 = 0x30;
const PKCS8_LABEL: &str = "PRIVATE KEY";

/// Produces base64url-encoded signatures over arbitrary payloads.
pub trait Signer: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Result<String, AuthError>;
}

/// RSASSA-PKCS1-v1_5 / SHA-256 signer over a PEM-encoded PKCS8 private key.
///
/// The key is imported on every call, so a malformed key fails each signing
/// attempt the same way rather than only at construction.
#[derive(Clone)]
pub struct RsaPemSigner {
    pem: String,
}

impl RsaPemSigner {
    pub fn new(pem: impl Into<String>) -> Self {
        Self { pem: pem.into() }
    }

    fn import_key(&self) -> Result<EncodingKey, AuthError> {
        let der = decode_pem_body(&self.pem)?;
        if der.first() != Some(&DER_SEQUENCE_TAG) {
            return Err(AuthError::InvalidPrivateKey(
                "key body is not a DER sequence".to_string(),
            ));
        }
        let canonical = encode_pem(PKCS8_LABEL, &der);
        EncodingKey::from_rsa_pem(canonical.as_bytes())
            .map_err(|e| AuthError::InvalidPrivateKey(format!("key import rejected: {}", e)))
    }
}

impl Signer for RsaPemSigner {
    fn sign(&self, payload: &[u8]) -> Result<String, AuthError> {
        let key = self.import_key()?;
        jsonwebtoken::crypto::sign(payload, &key, Algorithm::RS256).map_err(|e| match e.kind() {
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                AuthError::InvalidPrivateKey(e.to_string())
            }
            _ => AuthError::JwtSigningFailed(e.to_string()),
        })
    }
}

/// Strip PEM armor and whitespace, then base64-decode the remaining body.
///
/// Keys supplied through environment variables often carry literal `\n`
/// escapes instead of newlines; both forms are accepted.
pub(crate) fn decode_pem_body(pem: &str) -> Result<Vec<u8>, AuthError> {
    let normalized = pem.replace("\\n", "\n");
    let body: String = normalized
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();

    if body.is_empty() {
        return Err(AuthError::InvalidPrivateKey("empty key body".to_string()));
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| AuthError::InvalidPrivateKey(format!("base64 decode failed: {}", e)))
}

fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {}-----\n", label);
    for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII so every chunk is valid UTF-8
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {}-----\n", label));
    pem
}

//! Structural validation of EIP-2335 keystore JSON documents.
//!
//! This crate never decrypts or otherwise inspects keystore *content* — it
//! only checks that the document has the shape EIP-2335 requires. Modelled
//! on the teacher's `eth2_keystore` crate (same concern, same dependency
//! footprint: `serde`/`serde_json`, no crypto crates pulled in here because
//! none of that machinery is exercised), but replacing decryption with a
//! pure schema walk that names the offending field in its error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One of the three `crypto` sub-modules (`kdf`, `checksum`, `cipher`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoModule {
    pub function: String,
    pub params: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The `crypto` object: key derivation, checksum and cipher parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crypto {
    pub kdf: CryptoModule,
    pub checksum: CryptoModule,
    pub cipher: CryptoModule,
}

/// A structurally-valid EIP-2335 keystore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keystore {
    pub crypto: Crypto,
    pub path: String,
    pub uuid: String,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

/// Why a keystore document was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum KeystoreError {
    /// The input was not valid JSON at all.
    MalformedJson(String),
    /// The input was valid JSON but violated the EIP-2335 schema.
    /// The string names the offending field, e.g. `"crypto.kdf.function"`.
    SchemaViolation(String),
}

impl fmt::Display for KeystoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeystoreError::MalformedJson(e) => write!(f, "malformed JSON: {}", e),
            KeystoreError::SchemaViolation(field) => {
                write!(f, "schema violation: {}", field)
            }
        }
    }
}

impl std::error::Error for KeystoreError {}

fn require_object<'a>(value: &'a Value, field: &str) -> Result<&'a serde_json::Map<String, Value>, KeystoreError> {
    value
        .as_object()
        .ok_or_else(|| KeystoreError::SchemaViolation(field.to_string()))
}

fn require_string(obj: &serde_json::Map<String, Value>, key: &str, field: &str) -> Result<String, KeystoreError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| KeystoreError::SchemaViolation(field.to_string()))
}

fn parse_crypto_module(obj: &serde_json::Map<String, Value>, name: &str) -> Result<CryptoModule, KeystoreError> {
    let module = obj
        .get(name)
        .ok_or_else(|| KeystoreError::SchemaViolation(format!("crypto.{}", name)))?;
    let module = require_object(module, &format!("crypto.{}", name))?;

    let function = require_string(module, "function", &format!("crypto.{}.function", name))?;
    if function.is_empty() {
        return Err(KeystoreError::SchemaViolation(format!(
            "crypto.{}.function",
            name
        )));
    }

    let params = module
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| KeystoreError::SchemaViolation(format!("crypto.{}.params", name)))?;

    let message = module.get("message").and_then(Value::as_str).map(str::to_string);

    Ok(CryptoModule {
        function,
        params,
        message,
    })
}

/// `^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$`, checked
/// by hand rather than pulling in a regex dependency for one shape.
fn is_valid_uuid(s: &str) -> bool {
    fn is_lower_hex(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    let groups: Vec<&str> = s.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];

    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths.iter())
            .all(|(g, len)| g.len() == *len && is_lower_hex(g))
}

/// Parses and structurally validates a keystore document.
///
/// Returns [`KeystoreError::MalformedJson`] if `bytes` is not valid JSON at
/// all, or [`KeystoreError::SchemaViolation`] naming the first offending
/// field if the JSON is well-formed but does not satisfy the EIP-2335
/// schema. Runs in time and space linear in `bytes.len()`.
pub fn validate(bytes: &[u8]) -> Result<Keystore, KeystoreError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| KeystoreError::MalformedJson(e.to_string()))?;
    let obj = require_object(&value, "")?;

    let crypto_value = obj
        .get("crypto")
        .ok_or_else(|| KeystoreError::SchemaViolation("crypto".to_string()))?;
    let crypto_obj = require_object(crypto_value, "crypto")?;

    let crypto = Crypto {
        kdf: parse_crypto_module(crypto_obj, "kdf")?,
        checksum: parse_crypto_module(crypto_obj, "checksum")?,
        cipher: parse_crypto_module(crypto_obj, "cipher")?,
    };

    let path = require_string(obj, "path", "path")?;
    if path.is_empty() {
        return Err(KeystoreError::SchemaViolation("path".to_string()));
    }

    let uuid = require_string(obj, "uuid", "uuid")?;
    if !is_valid_uuid(&uuid) {
        return Err(KeystoreError::SchemaViolation("uuid".to_string()));
    }

    let version = obj
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| KeystoreError::SchemaViolation("version".to_string()))?;
    if version < 1 {
        return Err(KeystoreError::SchemaViolation("version".to_string()));
    }

    let description = obj.get("description").and_then(Value::as_str).map(str::to_string);
    let pubkey = obj.get("pubkey").and_then(Value::as_str).map(str::to_string);

    Ok(Keystore {
        crypto,
        path,
        uuid,
        version,
        description,
        pubkey,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fixture() -> serde_json::Value {
        serde_json::json!({
            "crypto": {
                "kdf": {"function": "scrypt", "params": {"n": 262144}, "message": ""},
                "checksum": {"function": "sha256", "params": {}},
                "cipher": {"function": "aes-128-ctr", "params": {"iv": "264daa3f303d7259501c93d997d84fe6"}}
            },
            "path": "m/12381/3600/0/0/0",
            "uuid": "1d85ae20-35c5-4611-98e8-aa14a633906f",
            "version": 4,
            "pubkey": "b89bebc699769726a318c8e9971bd3171297c61aea4a6578a7a4f94b547dcba5bac16a89108b6b6a1fe3695d1a874a0b"
        })
    }

    #[test]
    fn accepts_a_valid_keystore() {
        let bytes = serde_json::to_vec(&valid_fixture()).unwrap();
        let keystore = validate(&bytes).expect("should validate");
        assert_eq!(keystore.version, 4);
        assert_eq!(keystore.pubkey.as_deref(), Some(valid_fixture()["pubkey"].as_str().unwrap()));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = validate(b"{not json").unwrap_err();
        assert!(matches!(err, KeystoreError::MalformedJson(_)));
    }

    #[test]
    fn rejects_empty_kdf_function() {
        let mut fixture = valid_fixture();
        fixture["crypto"]["kdf"]["function"] = serde_json::json!("");
        let bytes = serde_json::to_vec(&fixture).unwrap();
        let err = validate(&bytes).unwrap_err();
        assert_eq!(err, KeystoreError::SchemaViolation("crypto.kdf.function".to_string()));
    }

    #[test]
    fn rejects_bad_uuid_format() {
        let mut fixture = valid_fixture();
        fixture["uuid"] = serde_json::json!("not-a-uuid");
        let bytes = serde_json::to_vec(&fixture).unwrap();
        let err = validate(&bytes).unwrap_err();
        assert_eq!(err, KeystoreError::SchemaViolation("uuid".to_string()));
    }

    #[test]
    fn rejects_version_below_one() {
        let mut fixture = valid_fixture();
        fixture["version"] = serde_json::json!(0);
        let bytes = serde_json::to_vec(&fixture).unwrap();
        let err = validate(&bytes).unwrap_err();
        assert_eq!(err, KeystoreError::SchemaViolation("version".to_string()));
    }

    #[test]
    fn rejects_missing_crypto_module() {
        let mut fixture = valid_fixture();
        fixture["crypto"].as_object_mut().unwrap().remove("cipher");
        let bytes = serde_json::to_vec(&fixture).unwrap();
        let err = validate(&bytes).unwrap_err();
        assert_eq!(err, KeystoreError::SchemaViolation("crypto.cipher".to_string()));
    }

    #[test]
    fn validation_is_idempotent() {
        let bytes = serde_json::to_vec(&valid_fixture()).unwrap();
        let first = validate(&bytes);
        let second = validate(&bytes);
        assert_eq!(first, second);
    }
}

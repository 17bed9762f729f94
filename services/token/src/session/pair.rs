use serde::{Deserialize, Serialize};

/// Token pair delivered to the client on issuance and rotation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access: String,
    /// Opaque refresh secret
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// Rotation input. Accepts the capitalised field names older clients send.
#[derive(Clone, Deserialize)]
pub struct RotationRequest {
    /// Previously issued access token
    #[serde(alias = "Access")]
    pub access: String,
    /// Refresh secret paired with `access`
    #[serde(alias = "Refresh")]
    pub refresh: String,
}

impl std::fmt::Debug for RotationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationRequest").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_both_casings() {
        let lower: RotationRequest =
            serde_json::from_str(r#"{"access":"a","refresh":"r"}"#).unwrap();
        let upper: RotationRequest =
            serde_json::from_str(r#"{"Access":"a","Refresh":"r"}"#).unwrap();
        assert_eq!(lower.access, upper.access);
        assert_eq!(lower.refresh, upper.refresh);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let pair = TokenPair {
            access: "aaa".into(),
            refresh: "rrr".into(),
        };
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("aaa"));
        assert!(!rendered.contains("rrr"));
    }
}

use anyhow::anyhow;
use reqwest::StatusCode;

/// OAuth2 error body (RFC 6749 section 5.2) as returned by the token endpoint.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct TokenErrorResponse {
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
    // Some gateways answer with {"message": ...} instead
    #[serde(default)]
    pub(crate) message: Option<String>,
}

pub(crate) fn format_auth_error(
    status: StatusCode,
    url: &str,
    e: &TokenErrorResponse,
) -> anyhow::Error {
    let code = e.error.as_deref().unwrap_or("");
    let detail = e
        .error_description
        .as_deref()
        .or(e.message.as_deref())
        .unwrap_or("");

    if code == "invalid_client" || status == StatusCode::UNAUTHORIZED {
        return anyhow!(
            "Lightcast rejected the client credentials (HTTP {}).\n- Check LCAPI_USER (client id) and LCAPI_PASS (client secret)\n- Make sure the credentials are not expired or revoked\n\nServer message: {} {}\nrequest: {}",
            status.as_u16(),
            code,
            detail,
            url
        );
    }

    if code == "invalid_scope" {
        return anyhow!(
            "Lightcast refused the requested scope (HTTP {}).\n- Your contract may not include Core LMI access\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            detail,
            url
        );
    }

    anyhow!(
        "authentication failed: HTTP {} for url ({})\n{}\n{}",
        status.as_u16(),
        url,
        code,
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> TokenErrorResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn invalid_client_points_at_credentials() {
        let e = body(r#"{"error":"invalid_client"}"#);
        let msg = format_auth_error(StatusCode::BAD_REQUEST, "http://auth/token", &e).to_string();
        assert!(msg.contains("LCAPI_USER"));
        assert!(msg.contains("invalid_client"));
    }

    #[test]
    fn invalid_scope_mentions_contract() {
        let e = body(r#"{"error":"invalid_scope","error_description":"agnitio"}"#);
        let msg = format_auth_error(StatusCode::BAD_REQUEST, "http://auth/token", &e).to_string();
        assert!(msg.contains("scope"));
        assert!(msg.contains("agnitio"));
    }

    #[test]
    fn other_errors_keep_status_and_url() {
        let e = body(r#"{"message":"maintenance"}"#);
        let msg = format_auth_error(StatusCode::SERVICE_UNAVAILABLE, "http://auth/token", &e)
            .to_string();
        assert!(msg.contains("HTTP 503"));
        assert!(msg.contains("http://auth/token"));
        assert!(msg.contains("maintenance"));
    }
}

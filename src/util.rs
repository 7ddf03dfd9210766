use serde_json::Value;
use std::time::Duration;

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Compact JSON for diagnostics; `null` when there is no payload.
pub(crate) fn payload_for_log(payload: Option<&Value>) -> String {
    payload
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Waits shorter than this are not worth a spinner.
pub(crate) const SPINNER_THRESHOLD: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urljoin_handles_slashes() {
        assert_eq!(
            urljoin("https://agnitio.emsicloud.com/", "meta"),
            "https://agnitio.emsicloud.com/meta"
        );
        assert_eq!(urljoin("http://h:1", "/meta/definitions"), "http://h:1/meta/definitions");
        assert_eq!(urljoin("http://h:1/", "https://other/x"), "https://other/x");
    }

    #[test]
    fn payload_for_log_is_compact() {
        assert_eq!(payload_for_log(None), "null");
        assert_eq!(
            payload_for_log(Some(&json!({"metrics": []}))),
            r#"{"metrics":[]}"#
        );
    }
}

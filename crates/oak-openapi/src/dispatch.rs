//! Credential-derived authentication and HTTP dispatch.

use crate::error::{OpenApiError, Result};
use crate::request::ApiRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use oak_core::{consts, CallResult, Credentials};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Value prefixes added to credential headers when missing, keyed by
/// upper-cased header name (e.g. `AUTHORIZATION -> "Bearer "`).
pub type HeaderValuePrefixes = HashMap<String, String>;

/// Credential key renames applied before prefixing, keyed by upper-cased
/// credential name (e.g. `TOKEN -> AUTHORIZATION`).
pub type HeaderAlias = HashMap<String, String>;

/// Hook that takes over all authentication headers for a request.
pub type SetCustomAuthHeaders =
    Arc<dyn Fn(&Credentials, &mut ApiRequest) -> anyhow::Result<()> + Send + Sync>;

/// Apply credential entries as request headers: upper-case the key, rename
/// through the alias table, prepend a registered value prefix when absent,
/// then collapse a `USERNAME`/`PASSWORD` pair into one Basic Authorization
/// header.
pub fn set_authentication_headers(
    credentials: &Credentials,
    request: &mut ApiRequest,
    prefixes: &HeaderValuePrefixes,
    aliases: &HeaderAlias,
) {
    let mut names: Vec<&String> = credentials.keys().collect();
    names.sort();

    for name in names {
        let mut header = name.to_uppercase();
        if let Some(alias) = aliases.get(&header) {
            header = alias.to_uppercase();
        }

        let mut value = credentials[name].clone();
        if let Some(prefix) = prefixes.get(&header) {
            if !value.starts_with(prefix.as_str()) {
                value = format!("{prefix}{value}");
            }
        }

        request.set_header(&header, value);
    }

    compose_basic_auth(request);
}

/// A `USERNAME`/`PASSWORD` header pair is sent as a single
/// `Authorization: Basic base64(username:password)` header.
fn compose_basic_auth(request: &mut ApiRequest) {
    let (Some(username), Some(password)) = (
        request.headers.get(consts::BASIC_AUTH_USERNAME),
        request.headers.get(consts::BASIC_AUTH_PASSWORD),
    ) else {
        return;
    };

    let encoded = BASE64.encode(format!("{username}:{password}"));
    request.headers.remove(consts::BASIC_AUTH_USERNAME);
    request.headers.remove(consts::BASIC_AUTH_PASSWORD);
    request.set_header("Authorization", format!("{}{encoded}", consts::BASIC_AUTH));
}

/// Default the scheme to https and strip a trailing slash before parsing.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let trimmed = with_scheme
        .strip_suffix('/')
        .unwrap_or(with_scheme.as_str());

    Ok(Url::parse(trimmed)?)
}

/// Authenticate and dispatch a request, collecting `(status, body)`.
///
/// The client enforces the invocation timeout as a total deadline; the
/// response body is read fully into memory.
pub async fn execute_with_credentials(
    credentials: &Credentials,
    mut request: ApiRequest,
    prefixes: &HeaderValuePrefixes,
    aliases: &HeaderAlias,
    custom_auth: Option<&SetCustomAuthHeaders>,
    timeout_secs: u64,
) -> Result<CallResult> {
    match custom_auth {
        Some(hook) => {
            hook(credentials, &mut request)
                .map_err(|err| OpenApiError::AuthError(err.to_string()))?;
        }
        None => set_authentication_headers(credentials, &mut request, prefixes, aliases),
    }

    let mut url = normalize_url(&request.url)?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(request.query.iter());
    }

    info!(method = %request.method, url = %url, "dispatching request");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|err| OpenApiError::Other(format!("invalid HTTP method: {err}")))?;

    let mut builder = client.request(method, url);

    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    if !request.cookies.is_empty() {
        let cookie = request
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header("Cookie", cookie);
    }

    if let Some(body) = request.body.take() {
        builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status_code = response.status().as_u16();

    let body = match response.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => {
            // The status already arrived; a torn body is not fatal.
            warn!("failed to read response body: {err}");
            Vec::new()
        }
    };

    debug!(status = status_code, bytes = body.len(), "received response");

    Ok(CallResult { status_code, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(entries: &[(&str, &str)]) -> Credentials {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn username_password_compose_basic_auth() {
        let mut request = ApiRequest::default();
        set_authentication_headers(
            &creds(&[("username", "sawit"), ("password", "wa")]),
            &mut request,
            &HeaderValuePrefixes::new(),
            &HeaderAlias::new(),
        );

        assert!(!request.headers.contains_key("USERNAME"));
        assert!(!request.headers.contains_key("PASSWORD"));
        let value = &request.headers["AUTHORIZATION"];
        let encoded = value.strip_prefix("Basic ").unwrap();
        assert_eq!(BASE64.decode(encoded).unwrap(), b"sawit:wa");
    }

    #[test]
    fn bearer_prefix_is_idempotent() {
        let mut prefixes = HeaderValuePrefixes::new();
        prefixes.insert("AUTHORIZATION".to_string(), consts::BEARER_AUTH.to_string());

        let mut request = ApiRequest::default();
        set_authentication_headers(
            &creds(&[("AUTHORIZATION", "Bearer x")]),
            &mut request,
            &prefixes,
            &HeaderAlias::new(),
        );
        assert_eq!(request.headers["AUTHORIZATION"], "Bearer x");

        let mut request = ApiRequest::default();
        set_authentication_headers(
            &creds(&[("authorization", "x")]),
            &mut request,
            &prefixes,
            &HeaderAlias::new(),
        );
        assert_eq!(request.headers["AUTHORIZATION"], "Bearer x");
    }

    #[test]
    fn alias_renames_credential_header() {
        let mut aliases = HeaderAlias::new();
        aliases.insert("TOKEN".to_string(), "Authorization".to_string());
        let mut prefixes = HeaderValuePrefixes::new();
        prefixes.insert("AUTHORIZATION".to_string(), consts::BEARER_AUTH.to_string());

        let mut request = ApiRequest::default();
        set_authentication_headers(
            &creds(&[("TOKEN", "abc123")]),
            &mut request,
            &prefixes,
            &aliases,
        );

        assert!(!request.headers.contains_key("TOKEN"));
        assert_eq!(request.headers["AUTHORIZATION"], "Bearer abc123");
    }

    #[test]
    fn url_scheme_defaults_to_https() {
        let url = normalize_url("grafana.example.com/api/").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.as_str(), "https://grafana.example.com/api");

        let url = normalize_url("http://grafana.example.com").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[tokio::test]
    async fn dispatch_collects_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/org/invites")
            .match_header("authorization", "Bearer t0k3n")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let mut prefixes = HeaderValuePrefixes::new();
        prefixes.insert("AUTHORIZATION".to_string(), consts::BEARER_AUTH.to_string());

        let request = ApiRequest {
            method: "POST".to_string(),
            url: format!("{}/api/org/invites", server.url()),
            ..Default::default()
        };

        let result = execute_with_credentials(
            &creds(&[("AUTHORIZATION", "t0k3n")]),
            request,
            &prefixes,
            &HeaderAlias::new(),
            None,
            30,
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn custom_auth_hook_owns_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("x-custom", "set-by-hook")
            .with_status(204)
            .create_async()
            .await;

        let hook: SetCustomAuthHeaders = Arc::new(|_, request| {
            request.set_header("X-Custom", "set-by-hook");
            Ok(())
        });

        let request = ApiRequest {
            method: "GET".to_string(),
            url: format!("{}/ping", server.url()),
            ..Default::default()
        };

        let result = execute_with_credentials(
            &Credentials::new(),
            request,
            &HeaderValuePrefixes::new(),
            &HeaderAlias::new(),
            Some(&hook),
            30,
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(result.status_code, 204);
    }

    #[tokio::test]
    async fn failing_custom_auth_hook_fails_the_call() {
        let hook: SetCustomAuthHeaders =
            Arc::new(|_, _| anyhow::bail!("no prefixes to pair with the token"));

        let request = ApiRequest {
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            ..Default::default()
        };

        let err = execute_with_credentials(
            &Credentials::new(),
            request,
            &HeaderValuePrefixes::new(),
            &HeaderAlias::new(),
            Some(&hook),
            5,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OpenApiError::AuthError(_)));
    }
}

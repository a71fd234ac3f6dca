use serde::Serialize;
use url::Url;

use crate::{Error, IDENTIFIER_SELECT, OPENID_NS, STEAM_URL};

/// The fixed `checkid_setup` parameter set sent to Steam when starting a
/// login.
#[derive(Serialize)]
struct AuthRequest<'a> {
    #[serde(rename = "openid.mode")]
    mode: &'static str,
    #[serde(rename = "openid.ns")]
    ns: &'static str,
    #[serde(rename = "openid.identity")]
    identity: &'static str,
    #[serde(rename = "openid.claimed_id")]
    claimed_id: &'static str,
    #[serde(rename = "openid.return_to")]
    return_to: &'a str,
    #[serde(rename = "openid.realm")]
    realm: &'a str,
}

impl<'a> AuthRequest<'a> {
    fn new(realm: &'a str, return_to: &'a str) -> Self {
        Self {
            mode: "checkid_setup",
            ns: OPENID_NS,
            identity: IDENTIFIER_SELECT,
            claimed_id: IDENTIFIER_SELECT,
            return_to,
            realm,
        }
    }
}

/// Builds the URL to which users should be redirected to start the login
/// process.
///
/// `realm` is your application's origin (e.g. `https://example.com`);
/// `return_path` is the path Steam will redirect back to after login and must
/// start with `/`. After login, pass the full callback URL together with the
/// same `realm` and `return_path` to
/// [`validate_callback_url`](crate::validate_callback_url) — the validator
/// requires an exact match.
#[tracing::instrument(level = "trace", skip_all)]
pub fn create_auth_url<T: AsRef<str>, U: AsRef<str>>(
    realm: T,
    return_path: U,
) -> Result<Url, Error> {
    let (realm, return_path) = (realm.as_ref(), return_path.as_ref());

    if !return_path.starts_with('/') {
        return Err(Error::InvalidReturnPath);
    }

    let return_to = format!("{realm}{return_path}");
    let qs = serde_urlencoded::to_string(AuthRequest::new(realm, &return_to))?;

    let mut url = Url::parse(STEAM_URL)?; // Shouldn't happen
    url.set_query(Some(&qs));

    Ok(url)
}

/// Holds a prebuilt auth URL and turns it into a redirect response.
#[derive(Debug, Clone)]
pub struct Redirector {
    url: Url,
}

impl Redirector {
    pub fn new<T: AsRef<str>, U: AsRef<str>>(realm: T, return_path: U) -> Result<Self, Error> {
        create_auth_url(realm, return_path).map(|url| Self { url })
    }

    /// Creates an HTTP 302 response pointing at the Steam login page.
    pub fn create_response(&self) -> http::Result<http::Response<()>> {
        http::Response::builder()
            .status(http::StatusCode::FOUND)
            .header(http::header::LOCATION, self.url.as_str())
            .body(())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn auth_url_has_fixed_openid_params() {
        let url = create_auth_url("https://example.com", "/steam/callback").unwrap();

        assert_eq!(url.host_str(), Some("steamcommunity.com"));
        assert_eq!(url.path(), "/openid/login");

        let params = query_map(&url);
        assert_eq!(params["openid.mode"], "checkid_setup");
        assert_eq!(params["openid.ns"], "http://specs.openid.net/auth/2.0");
        assert_eq!(params["openid.identity"], params["openid.claimed_id"]);
        assert_eq!(
            params["openid.identity"],
            "http://specs.openid.net/auth/2.0/identifier_select"
        );
        assert_eq!(
            params["openid.return_to"],
            "https://example.com/steam/callback"
        );
        assert_eq!(params["openid.realm"], "https://example.com");
    }

    #[test]
    fn return_path_must_start_with_slash() {
        let err = create_auth_url("https://example.com", "no-leading-slash").unwrap_err();
        assert!(matches!(err, Error::InvalidReturnPath));
    }

    #[test]
    fn redirector_builds_found_response() {
        let redirector = Redirector::new("http://localhost:8080", "/callback").unwrap();
        let response = redirector.create_response().unwrap();

        assert_eq!(response.status(), http::StatusCode::FOUND);
        assert_eq!(
            response.headers()[http::header::LOCATION],
            redirector.url().as_str()
        );
    }
}

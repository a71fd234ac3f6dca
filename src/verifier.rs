//! Callback validation.
//!
//! Steam sends the user back to the relying party with an OpenID 2.0
//! positive assertion in the query string. That query string is attacker
//! controlled, so it is checked against a fixed assertion shape before the
//! `check_authentication` round trip with Steam: exact field set, duplicate
//! detection on the raw string, signed-field set, fixed protocol values,
//! nonce freshness and claimed-id format. The first failing check aborts the
//! whole validation.

use std::{collections::HashSet, sync::LazyLock, time::Duration};

use chrono::{DateTime, Utc};
use regex::Regex;
use url::Url;

use crate::{Error, ASSOC_HANDLE, OPENID_NS, STEAM_URL};

/// Default tolerance between the current time and the timestamp embedded in
/// `openid.response_nonce`.
pub const DEFAULT_ALLOWED_SKEW: Duration = Duration::from_millis(20_000);

/// Default timeout for the `check_authentication` round trip.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// The fields a positive assertion must carry, each exactly once, and no
/// others.
const REQUIRED_FIELDS: [&str; 10] = [
    "openid.ns",
    "openid.mode",
    "openid.op_endpoint",
    "openid.claimed_id",
    "openid.identity",
    "openid.return_to",
    "openid.response_nonce",
    "openid.assoc_handle",
    "openid.signed",
    "openid.sig",
];

/// The fields Steam is expected to have signed, i.e. the exact set
/// `openid.signed` must list.
const SIGNED_FIELDS: [&str; 7] = [
    "signed",
    "op_endpoint",
    "claimed_id",
    "identity",
    "return_to",
    "response_nonce",
    "assoc_handle",
];

/// The only response body Steam sends for a valid assertion.
const VALID_RESPONSE: &str = "ns:http://specs.openid.net/auth/2.0\nis_valid:true\n";

/// Whitelist for the raw callback query string: the percent-encodings Steam
/// actually produces (`:` `/` `?` `=` `,` `+`) plus unreserved characters and
/// the `=`/`&` separators. Anything else, including unlisted
/// percent-encodings, is rejected before the query is interpreted.
static ALLOWED_QUERY_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(%3A|%2F|%3F|%3D|%2C|%2B|[a-z0-9._=&-])+$").expect("valid regex")
});

/// Whitelist for the decoded `openid.signed` value.
static ALLOWED_SIGNED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z,_]+$").expect("valid regex"));

/// A claimed identifier is a Steam profile URL whose last segment is a
/// 17-digit SteamID64 starting with `765`.
static CLAIMED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://steamcommunity\.com/openid/id/(765[0-9]{14})$").expect("valid regex")
});

/// Validates the login details Steam returns after users have gone through
/// the 'sign in with Steam' page.
///
/// [`Verifier::from_url()`] runs every local check and hands back an
/// [`http::Request`] for the `check_authentication` round trip; send it with
/// the HTTP client of your choice and pass the response body to
/// [`Verifier::verify_response()`] to obtain the SteamID64. With the
/// `reqwest` feature enabled, [`validate_callback_url()`] does both steps.
///
/// # Example
///
/// ```rust,no_run
/// # fn send(_: http::Request<Vec<u8>>) -> String { unimplemented!() }
/// # fn main() -> Result<(), steam_openid::Error> {
/// # let callback_url = "";
/// let (request, verifier) = steam_openid::Verifier::from_url(
///     callback_url,
///     "https://example.com",
///     "/steam/callback",
///     steam_openid::DEFAULT_ALLOWED_SKEW,
/// )?;
/// let response_body = send(request); // any HTTP client
/// let steam_id = verifier.verify_response(response_body)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Verifier {
    steam_id: u64,
}

impl Verifier {
    /// Runs all local checks on a callback URL and constructs the
    /// verification request for Steam.
    ///
    /// `realm` and `return_path` must be the exact values the auth URL was
    /// created with; the callback is bound to `realm + return_path`. The
    /// timestamp inside `openid.response_nonce` may differ from the current
    /// time by at most `allowed_skew`.
    ///
    /// The returned request is a POST to [`STEAM_URL`] carrying the
    /// assertion with `openid.mode` flipped to `check_authentication`. When
    /// sending it yourself, treat a non-success status as a failed
    /// verification; on success, pass the response body to
    /// [`verify_response`](Self::verify_response).
    pub fn from_url<T, U, V>(
        response_url: T,
        realm: U,
        return_path: V,
        allowed_skew: Duration,
    ) -> Result<(http::Request<Vec<u8>>, Self), Error>
    where
        T: AsRef<str>,
        U: AsRef<str>,
        V: AsRef<str>,
    {
        let url = Url::parse(response_url.as_ref())?;
        let return_to = format!("{}{}", realm.as_ref(), return_path.as_ref());

        // Binds the callback to the exact endpoint we expect, independent of
        // anything the query claims.
        if !url.as_str().starts_with(&format!("{return_to}?")) {
            return Err(Error::ReturnPathMismatch);
        }

        let raw_query = url.query().unwrap_or_default();
        let fields: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        validate_query_shape(raw_query, &fields)?;
        validate_assertion(&fields, &return_to)?;
        validate_response_nonce(field(&fields, "openid.response_nonce")?, allowed_skew)?;
        let steam_id = validate_claimed_id(field(&fields, "openid.claimed_id")?)?;

        let request = build_verify_request(&fields)?;

        Ok((request, Self { steam_id }))
    }

    /// Interprets Steam's response to the verification request.
    ///
    /// Steam answers a valid assertion with exactly
    /// `"ns:http://specs.openid.net/auth/2.0\nis_valid:true\n"`; any other
    /// body is a rejection.
    pub fn verify_response<S: AsRef<str>>(self, response_body: S) -> Result<u64, Error> {
        if response_body.as_ref() != VALID_RESPONSE {
            return Err(Error::RemoteVerificationFailed);
        }

        Ok(self.steam_id)
    }
}

/// Looks up a field in the parsed query. Only called for names guaranteed
/// present by [`validate_query_shape`].
fn field<'f>(fields: &'f [(String, String)], name: &str) -> Result<&'f str, Error> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .ok_or(Error::UnexpectedField)
}

/// Structural checks: character whitelist and duplicate detection on the raw
/// query string, then an exact field-set match on the parsed form.
///
/// Duplicates must be detected on the raw string. Parsing collapses repeated
/// keys, so a map-based check would miss a second, attacker-supplied
/// occurrence of a security-relevant field.
fn validate_query_shape(raw_query: &str, fields: &[(String, String)]) -> Result<(), Error> {
    if !ALLOWED_QUERY_CHARS.is_match(raw_query) {
        return Err(Error::InvalidCharacters);
    }

    for name in REQUIRED_FIELDS {
        let marker = format!("{name}=");
        if raw_query.matches(marker.as_str()).count() > 1 {
            return Err(Error::DuplicateRequiredField(name));
        }
    }

    // A missing required field surfaces here too, as does any extra field.
    // The pair count must match as well: a repeated key collapses in the key
    // set but not in the pair list, and a bare `&name` repeat (no `=`) is
    // invisible to the raw-string check above.
    let keys: HashSet<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
    if fields.len() != REQUIRED_FIELDS.len()
        || keys.len() != REQUIRED_FIELDS.len()
        || !REQUIRED_FIELDS.iter().all(|f| keys.contains(f))
    {
        return Err(Error::UnexpectedField);
    }

    Ok(())
}

/// Semantic checks: the signed-field set and the fixed protocol values.
fn validate_assertion(fields: &[(String, String)], return_to: &str) -> Result<(), Error> {
    let signed = field(fields, "openid.signed")?;
    if !ALLOWED_SIGNED_CHARS.is_match(signed) {
        return Err(Error::InvalidSignedCharacters);
    }

    let listed: Vec<&str> = signed.split(',').collect();
    let unique: HashSet<&str> = listed.iter().copied().collect();

    // Checking the deduplicated cardinality as well means a duplicated name
    // cannot stand in for a required one it displaced.
    if listed.len() != SIGNED_FIELDS.len()
        || unique.len() != SIGNED_FIELDS.len()
        || !unique.iter().all(|f| SIGNED_FIELDS.contains(f))
    {
        return Err(Error::UnexpectedSignedField);
    }

    if field(fields, "openid.ns")? != OPENID_NS {
        return Err(Error::InvalidNamespace);
    }

    if field(fields, "openid.mode")? != "id_res" {
        return Err(Error::InvalidMode);
    }

    if field(fields, "openid.op_endpoint")? != STEAM_URL {
        return Err(Error::InvalidEndpoint);
    }

    if field(fields, "openid.claimed_id")? != field(fields, "openid.identity")? {
        return Err(Error::ClaimedIdIdentityMismatch);
    }

    if field(fields, "openid.return_to")? != return_to {
        return Err(Error::ReturnToMismatch);
    }

    if field(fields, "openid.assoc_handle")? != ASSOC_HANDLE {
        return Err(Error::InvalidAssocHandle);
    }

    Ok(())
}

/// Bounds replay of old callbacks: the nonce starts with a 20-character
/// RFC 3339 timestamp that must be close to the current time.
fn validate_response_nonce(nonce: &str, allowed_skew: Duration) -> Result<(), Error> {
    let timestamp = nonce.get(..20).ok_or(Error::InvalidNonceFormat)?;
    let nonce_time =
        DateTime::parse_from_rfc3339(timestamp).map_err(|_| Error::NonceParseFailure)?;

    let skew_ms = (Utc::now() - nonce_time.with_timezone(&Utc))
        .num_milliseconds()
        .unsigned_abs();

    if u128::from(skew_ms) > allowed_skew.as_millis() {
        return Err(Error::NonceOutOfSkew);
    }

    Ok(())
}

/// Extracts the SteamID64 from the claimed identifier.
fn validate_claimed_id(claimed_id: &str) -> Result<u64, Error> {
    let captures = CLAIMED_ID
        .captures(claimed_id)
        .ok_or(Error::InvalidClaimedIdFormat)?;

    captures[1].parse().map_err(|_| Error::InvalidClaimedIdFormat)
}

/// Re-encodes the assertion, with `openid.mode` flipped to
/// `check_authentication`, as the verification POST for Steam.
fn build_verify_request(fields: &[(String, String)]) -> Result<http::Request<Vec<u8>>, Error> {
    let form: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| {
            if k == "openid.mode" {
                (k.as_str(), "check_authentication")
            } else {
                (k.as_str(), v.as_str())
            }
        })
        .collect();

    let body = serde_urlencoded::to_string(form)?.into_bytes();

    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(STEAM_URL)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)?;

    Ok(request)
}

/// Validates a Steam login callback and returns the user's SteamID64.
///
/// Runs every local check on `response_url` and then re-verifies the
/// assertion with Steam. Uses [`DEFAULT_ALLOWED_SKEW`] for nonce freshness
/// and [`DEFAULT_VERIFY_TIMEOUT`] for the round trip; see
/// [`validate_callback_url_with()`] to override either.
///
/// Every call performs a fresh round trip — the nonce and signature are
/// single-use, so results must not be cached. Any error means the login is
/// not authenticated.
#[cfg(feature = "reqwest")]
pub async fn validate_callback_url<T, U, V>(
    client: &reqwest::Client,
    response_url: T,
    realm: U,
    return_path: V,
) -> Result<u64, Error>
where
    T: AsRef<str>,
    U: AsRef<str>,
    V: AsRef<str>,
{
    validate_callback_url_with(
        client,
        response_url,
        realm,
        return_path,
        DEFAULT_ALLOWED_SKEW,
        DEFAULT_VERIFY_TIMEOUT,
    )
    .await
}

/// [`validate_callback_url()`] with explicit nonce skew and network timeout.
#[cfg(feature = "reqwest")]
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(realm = realm.as_ref(), return_path = return_path.as_ref()),
    err(level = "debug")
)]
pub async fn validate_callback_url_with<T, U, V>(
    client: &reqwest::Client,
    response_url: T,
    realm: U,
    return_path: V,
    allowed_skew: Duration,
    timeout: Duration,
) -> Result<u64, Error>
where
    T: AsRef<str>,
    U: AsRef<str>,
    V: AsRef<str>,
{
    verify_at(
        client,
        STEAM_URL,
        response_url.as_ref(),
        realm.as_ref(),
        return_path.as_ref(),
        allowed_skew,
        timeout,
    )
    .await
}

/// The `check_authentication` round trip, with the endpoint parameterized so
/// tests can point it at a mock server.
#[cfg(feature = "reqwest")]
async fn verify_at(
    client: &reqwest::Client,
    endpoint: &str,
    response_url: &str,
    realm: &str,
    return_path: &str,
    allowed_skew: Duration,
    timeout: Duration,
) -> Result<u64, Error> {
    let (request, verifier) = Verifier::from_url(response_url, realm, return_path, allowed_skew)?;

    // Reuse the prebuilt request wholesale (only the endpoint differs, so
    // tests can substitute a mock server) to keep both paths in sync.
    let (parts, body) = request.into_parts();

    let response = client
        .request(parts.method, endpoint)
        .headers(parts.headers)
        .body(body)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;

    let body = response.text().await?;
    tracing::debug!(body = %body.trim_end(), "check_authentication response");

    verifier.verify_response(body)
}

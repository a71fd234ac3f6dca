use thiserror::Error;

/// Everything that can go wrong while building an auth URL or validating a
/// callback.
///
/// Validation errors are deliberately fine-grained: each check in the
/// callback pipeline has its own variant, so callers can branch on the kind
/// without matching on message strings. Any error means "not authenticated" —
/// there is no partial success.
#[derive(Debug, Error)]
pub enum Error {
    /// The return path passed to [`create_auth_url`](crate::create_auth_url)
    /// did not start with `/`.
    #[error("return path must start with '/'")]
    InvalidReturnPath,

    /// The callback URL does not start with `realm + return_path + "?"`.
    #[error("callback URL does not match the expected return path")]
    ReturnPathMismatch,

    /// The raw callback query string contains characters outside the
    /// whitelist.
    #[error("callback query string contains invalid characters")]
    InvalidCharacters,

    /// A required field occurs more than once in the raw query string.
    #[error("required field `{0}` occurs more than once in the callback query")]
    DuplicateRequiredField(&'static str),

    /// The callback query's field set is not exactly the required field set
    /// (a field is missing, or an extra one is present).
    #[error("callback query fields do not match the required field set")]
    UnexpectedField,

    /// `openid.signed` contains characters other than letters, commas and
    /// underscores.
    #[error("`openid.signed` contains invalid characters")]
    InvalidSignedCharacters,

    /// `openid.signed` does not list exactly the expected signed fields.
    #[error("`openid.signed` does not match the required signed field set")]
    UnexpectedSignedField,

    /// `openid.ns` is not the OpenID 2.0 namespace.
    #[error("`openid.ns` is not the OpenID 2.0 namespace")]
    InvalidNamespace,

    /// `openid.mode` is not `id_res`.
    #[error("`openid.mode` is not `id_res`")]
    InvalidMode,

    /// `openid.op_endpoint` is not Steam's login endpoint.
    #[error("`openid.op_endpoint` is not the Steam login endpoint")]
    InvalidEndpoint,

    /// `openid.claimed_id` and `openid.identity` differ.
    #[error("`openid.claimed_id` does not equal `openid.identity`")]
    ClaimedIdIdentityMismatch,

    /// `openid.return_to` does not equal `realm + return_path`.
    #[error("`openid.return_to` does not match the expected return URL")]
    ReturnToMismatch,

    /// `openid.assoc_handle` is not the constant handle Steam's stateless
    /// deployment uses.
    #[error("`openid.assoc_handle` is not the expected handle")]
    InvalidAssocHandle,

    /// `openid.response_nonce` is shorter than 20 characters.
    #[error("`openid.response_nonce` is too short to contain a timestamp")]
    InvalidNonceFormat,

    /// The first 20 characters of `openid.response_nonce` are not an RFC 3339
    /// timestamp.
    #[error("failed to parse timestamp in `openid.response_nonce`")]
    NonceParseFailure,

    /// The nonce timestamp is further from the current time than the allowed
    /// skew.
    #[error("`openid.response_nonce` timestamp is outside the allowed skew")]
    NonceOutOfSkew,

    /// `openid.claimed_id` is not of the form
    /// `https://steamcommunity.com/openid/id/<17-digit id starting with 765>`.
    #[error("`openid.claimed_id` is not a valid Steam claimed identifier")]
    InvalidClaimedIdFormat,

    /// The callback URL (or realm) could not be parsed as a URL.
    #[error("bad callback url: {0}")]
    BadUrl(#[from] url::ParseError),

    /// Internal error re-encoding the verification request body. Should never
    /// happen; please file a bug if it does.
    #[error("failed to encode verification request body: {0}")]
    ParseQueryString(#[from] serde_urlencoded::ser::Error),

    /// Internal error assembling the verification `http::Request`. Should
    /// never happen; please file a bug if it does.
    #[error("failed to build verification request: {0}")]
    BuildHttpRequest(#[from] http::Error),

    /// The verification round trip failed at the transport level, or Steam
    /// answered with a non-success status.
    #[cfg(feature = "reqwest")]
    #[error("network error during verification: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Steam answered the `check_authentication` request, but did not assert
    /// the signature as valid.
    #[error("steam rejected the authentication assertion")]
    RemoteVerificationFailed,
}

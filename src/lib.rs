//! Implement a 'login with Steam' feature on your website.
//!
//! Steam acts as an OpenID 2.0 provider; this crate implements the relying
//! party side of that flow. There are two halves:
//!
//! 1. Obtain the URL users should be redirected to in order to log in:
//!
//! ```rust
//! let url = steam_openid::create_auth_url("https://example.com", "/steam/callback").unwrap();
//! // redirect the user to `url`
//! ```
//!
//! 2. When Steam sends the user back to `/steam/callback`, validate the full
//!    callback URL. This checks the assertion's shape (exact field set,
//!    duplicate smuggling, nonce freshness, claimed-id format, ...) and then
//!    re-verifies it with Steam over HTTP:
//!
//! ```rust,no_run
//! # async fn callback(callback_url: &str) -> Result<(), steam_openid::Error> {
//! let client = reqwest::Client::new();
//! let steam_id = steam_openid::validate_callback_url(
//!     &client,
//!     callback_url,
//!     "https://example.com",
//!     "/steam/callback",
//! )
//! .await?;
//! println!("logged in SteamID64: {steam_id}");
//! # Ok(())
//! # }
//! ```
//!
//! Any error means the login attempt must be treated as unauthenticated.
//!
//! If you don't want to use `reqwest` (disable the default `reqwest`
//! feature), [`Verifier`] exposes the same pipeline sans-io: it hands you an
//! [`http::Request`] to send with a client of your choice and interprets the
//! response body for you. See the demo server for a complete application.

mod error;
mod redirector;
mod verifier;

pub use error::Error;
pub use redirector::{create_auth_url, Redirector};
#[cfg(feature = "reqwest")]
pub use verifier::{validate_callback_url, validate_callback_url_with};
pub use verifier::{Verifier, DEFAULT_ALLOWED_SKEW, DEFAULT_VERIFY_TIMEOUT};

/// Steam's OpenID 2.0 endpoint. Serves both the interactive login page and
/// the `check_authentication` verification requests.
pub const STEAM_URL: &str = "https://steamcommunity.com/openid/login";

/// The OpenID 2.0 protocol namespace.
pub(crate) const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";

/// OpenID 2.0 "identifier select" constant, sent when the provider picks the
/// identity (Steam fills in the user's profile URL).
pub(crate) const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// The association handle Steam's classic (stateless) OpenID deployment
/// echoes back. Anything else indicates a non-standard or forged request.
pub(crate) const ASSOC_HANDLE: &str = "1234567890";

//! Minimal web server demonstrating the full login flow.
//!
//! Run with `cargo run --example server` and open <http://localhost:8080>.

use axum::extract::{OriginalUri, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

const REALM: &str = "http://localhost:8080";
const RETURN_PATH: &str = "/callback";

#[tokio::main]
async fn main() {
    let app = Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route(RETURN_PATH, get(callback))
        .with_state(reqwest::Client::new());

    println!("Starting server on {REALM}");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn index() -> Html<&'static str> {
    Html(
        "<a href=\"/login\">
            <img src=\"https://steamcommunity-a.akamaihd.net/public/images/signinthroughsteam/sits_01.png\">
        </a>",
    )
}

async fn login() -> Response {
    match steam_openid::create_auth_url(REALM, RETURN_PATH) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => Html(format!("<h1>Error</h1><p>Description: {e}</p>")).into_response(),
    }
}

async fn callback(State(client): State<reqwest::Client>, OriginalUri(uri): OriginalUri) -> Html<String> {
    // Reassemble the absolute URL Steam redirected to; the validator checks
    // it against `REALM + RETURN_PATH`.
    let callback_url = format!("{REALM}{uri}");

    match steam_openid::validate_callback_url(&client, &callback_url, REALM, RETURN_PATH).await {
        Ok(id) => Html(format!("<h1>Success</h1><p>Steam ID: {id}</p>")),
        Err(e) => Html(format!("<h1>Error</h1><p>Description: {e}</p>")),
    }
}

//! Identity provider pass-through.
//!
//! When `SCRAWL_IDENTITY_URL` and `SCRAWL_IDENTITY_TOKEN` are set, the
//! provider's userinfo endpoint supplies the display name used in the
//! room. The relay itself never sees the token; identity only decides
//! what name we announce.

use serde::Deserialize;
use std::env;

#[derive(Deserialize, Debug)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Resolve the display name: ask the identity provider when one is
/// configured, otherwise fall back to the name from the command line.
pub async fn resolve_display_name(fallback: &str) -> String {
    let (url, token) = match (
        env::var("SCRAWL_IDENTITY_URL"),
        env::var("SCRAWL_IDENTITY_TOKEN"),
    ) {
        (Ok(url), Ok(token)) => (url, token),
        _ => return fallback.to_string(),
    };

    match fetch_identity(&url, &token).await {
        Ok(identity) => pick_name(identity, fallback),
        Err(e) => {
            eprintln!("Identity lookup failed ({e}); using --name.");
            fallback.to_string()
        }
    }
}

async fn fetch_identity(url: &str, token: &str) -> Result<Identity, reqwest::Error> {
    reqwest::Client::new()
        .get(url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

fn pick_name(identity: Identity, fallback: &str) -> String {
    identity
        .name
        .or(identity.email)
        .unwrap_or_else(|| fallback.to_string())
}

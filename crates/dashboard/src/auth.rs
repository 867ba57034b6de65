//! Sign-in redirect for the music provider.

use reqwest::Url;
use thiserror::Error;

use crate::config::AuthConfig;

/// Scopes requested from the provider on sign-in.
pub const SPOTIFY_SCOPES: &[&str] = &[
    "user-read-email",
    "user-read-private",
    "user-read-playback-state",
    "user-read-currently-playing",
    "user-read-recently-played",
    "user-top-read",
    "playlist-read-private",
];

/// Path the provider returns the browser to after sign-in.
pub const RETURN_PATH: &str = "/dashboard";

#[derive(Debug, Error)]
pub enum AuthUrlError {
    #[error("OAuth authorize URL is not configured")]
    NotConfigured,

    #[error("Invalid OAuth URL: {0}")]
    InvalidUrl(String),
}

/// Build the redirect URL that starts the OAuth sign-in flow.
pub fn spotify_authorize_url(config: &AuthConfig) -> Result<Url, AuthUrlError> {
    if config.authorize_url.is_empty() {
        return Err(AuthUrlError::NotConfigured);
    }
    let redirect_to = format!(
        "{}{}",
        config.redirect_base_url.trim_end_matches('/'),
        RETURN_PATH
    );
    Url::parse(&redirect_to).map_err(|e| AuthUrlError::InvalidUrl(e.to_string()))?;
    let scopes = SPOTIFY_SCOPES.join(" ");

    Url::parse_with_params(
        &config.authorize_url,
        &[
            ("provider", config.provider.as_str()),
            ("redirect_to", redirect_to.as_str()),
            ("scopes", scopes.as_str()),
        ],
    )
    .map_err(|e| AuthUrlError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_authorize_url_carries_provider_scopes_and_return_url() {
        let config = Config::load_for_test(&[("auth.redirect_base_url", "https://admin.example.com/")])
            .unwrap();
        let url = spotify_authorize_url(&config.auth).unwrap();

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(params.contains(&("provider".into(), "spotify".into())));
        assert!(params.contains(&(
            "redirect_to".into(),
            "https://admin.example.com/dashboard".into()
        )));
        let scopes = &params.iter().find(|(k, _)| k == "scopes").unwrap().1;
        assert!(scopes.split(' ').any(|s| s == "user-read-recently-played"));
        assert_eq!(url.host_str(), Some("auth.example.com"));
    }

    #[test]
    fn test_missing_or_bad_urls() {
        let config = Config::load_for_test(&[("auth.authorize_url", "")]).unwrap();
        assert!(matches!(
            spotify_authorize_url(&config.auth),
            Err(AuthUrlError::NotConfigured)
        ));

        let config = Config::load_for_test(&[("auth.redirect_base_url", "not a url")]).unwrap();
        assert!(matches!(
            spotify_authorize_url(&config.auth),
            Err(AuthUrlError::InvalidUrl(_))
        ));
    }
}

//! Index credentials and site settings, read from the environment (and an
//! optional `.env` file).
//!
//! | variable          | default                               |
//! |-------------------|---------------------------------------|
//! | `ALGOLIA_APP_ID`  | `96TW5XP97E`                          |
//! | `ALGOLIA_API_KEY` | none, required                        |
//! | `ALGOLIA_INDEX`   | `prod_cartier_europe_fr_fr_products`  |
//! | `SITE_ORIGIN`     | `https://www.cartier.com`             |

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

const DEFAULT_APP_ID: &str = "96TW5XP97E";
const DEFAULT_INDEX: &str = "prod_cartier_europe_fr_fr_products";
const DEFAULT_ORIGIN: &str = "https://www.cartier.com";

#[derive(Deserialize)]
struct RawSettings {
    app_id: String,
    api_key: Option<String>,
    index: String,
    origin: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_id: String,
    pub api_key: String,
    pub index: String,
    pub origin: Url,
}

/// Where and how to query the index.
#[derive(Clone)]
pub struct Endpoint {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

pub fn load() -> Result<Settings> {
    let _ = dotenvy::dotenv();
    load_from(None)
}

/// `vars` replaces the process environment when given.
pub fn load_from(vars: Option<HashMap<String, String>>) -> Result<Settings> {
    let raw: RawSettings = Config::builder()
        .set_default("app_id", DEFAULT_APP_ID)?
        .set_default("index", DEFAULT_INDEX)?
        .set_default("origin", DEFAULT_ORIGIN)?
        .add_source(Environment::with_prefix("ALGOLIA").source(vars.clone()))
        .add_source(Environment::with_prefix("SITE").source(vars))
        .build()?
        .try_deserialize()
        .context("Invalid index settings")?;

    let api_key = match raw.api_key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => bail!(
            "Missing ALGOLIA_API_KEY. Create a .env file in the working directory and set:\n\
             ALGOLIA_API_KEY=xxxxxxxx"
        ),
    };
    let origin = Url::parse(raw.origin.trim())
        .with_context(|| format!("SITE_ORIGIN is not an absolute URL: {}", raw.origin))?;

    Ok(Settings {
        app_id: raw.app_id.trim().to_string(),
        api_key,
        index: raw.index.trim().to_string(),
        origin,
    })
}

impl Settings {
    pub fn endpoint(&self) -> Endpoint {
        let origin = self.origin.as_str().trim_end_matches('/');
        Endpoint {
            url: format!(
                "https://{}.algolia.net/1/indexes/{}/query",
                self.app_id.to_lowercase(),
                self.index
            ),
            headers: vec![
                ("X-Algolia-Application-Id".into(), self.app_id.clone()),
                ("X-Algolia-API-Key".into(), self.api_key.clone()),
                ("Content-Type".into(), "application/json".into()),
                ("Accept".into(), "*/*".into()),
                ("Origin".into(), origin.to_string()),
                ("Referer".into(), format!("{}/", origin)),
            ],
        }
    }
}

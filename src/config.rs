use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_LOGIN_URL: &str = "/login.html";
const DEFAULT_STORE_PATH: &str = ".moviemind/storage.json";
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base, without a trailing slash. Routes are appended as `/admin/...`.
    pub api_base_url: String,
    pub login_url: String,
    pub store_path: PathBuf,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_base(api_base_url.into()),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_base_url = non_empty_var("MOVIEMIND_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        reqwest::Url::parse(&api_base_url)
            .with_context(|| format!("MOVIEMIND_API_URL is not a valid URL: {}", api_base_url))?;

        let login_url =
            non_empty_var("MOVIEMIND_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
        let store_path = non_empty_var("MOVIEMIND_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
        let download_dir = non_empty_var("MOVIEMIND_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

        Ok(Self {
            api_base_url: trim_base(api_base_url),
            login_url,
            store_path,
            download_dir,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

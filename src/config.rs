use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/board.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub service_url: Option<String>,
    pub service_key: Option<String>,
    pub data_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let service_url = non_blank(env::var("INCENTIVE_SERVICE_URL").ok());
        let service_key = non_blank(env::var("INCENTIVE_SERVICE_KEY").ok());
        let data_path = env::var("INCENTIVE_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        Self {
            port,
            service_url,
            service_key,
            data_path,
        }
    }

    pub fn service(&self) -> Option<(&str, &str)> {
        match (self.service_url.as_deref(), self.service_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

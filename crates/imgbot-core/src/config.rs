use std::{
    env, fmt, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, inference::GenerationParameters, Result};

pub const DEFAULT_HF_API_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://your-vercel-app.vercel.app";
pub const WEBHOOK_PATH: &str = "/webhook";

/// Typed configuration, built once at startup and handed to each component.
#[derive(Clone)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub hf_api_key: String,

    // Inference
    pub hf_api_url: String,
    pub inference_timeout: Duration,
    pub generation: GenerationParameters,

    // Server
    pub public_base_url: String,
    pub listen_addr: String,
    pub port: u16,
    pub webhook_async: bool,
    pub skip_webhook_registration: bool,

    // Staging
    pub temp_dir: PathBuf,
}

impl Config {
    /// Load from the process environment, after merging a `.env` file if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| get(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_TOKEN environment variable is required".to_string())
            })?;
        let hf_api_key = get("HF_API_KEY").ok_or_else(|| {
            Error::Config("HF_API_KEY environment variable is required".to_string())
        })?;

        let hf_api_url = get("HF_API_URL").unwrap_or_else(|| DEFAULT_HF_API_URL.to_string());
        let inference_timeout =
            Duration::from_secs(parse_num(&get, "INFERENCE_TIMEOUT_SECS")?.unwrap_or(60));

        let defaults = GenerationParameters::default();
        let generation = GenerationParameters {
            num_inference_steps: parse_num(&get, "INFERENCE_STEPS")?
                .unwrap_or(defaults.num_inference_steps),
            guidance_scale: parse_num(&get, "GUIDANCE_SCALE")?.unwrap_or(defaults.guidance_scale),
        };

        let public_base_url = get("PUBLIC_BASE_URL")
            .or_else(|| get("VERCEL_URL"))
            .map(|u| normalize_base_url(&u))
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_num(&get, "PORT")?.unwrap_or(5000);
        let webhook_async = get("WEBHOOK_ASYNC").map(|v| is_truthy(&v)).unwrap_or(false);
        let skip_webhook_registration = get("SKIP_WEBHOOK_REGISTRATION")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        let temp_dir = get("TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Self {
            telegram_bot_token,
            hf_api_key,
            hf_api_url,
            inference_timeout,
            generation,
            public_base_url,
            listen_addr,
            port,
            webhook_async,
            skip_webhook_registration,
            temp_dir,
        })
    }

    /// The URL Telegram should POST updates to.
    pub fn webhook_url(&self) -> String {
        format!(
            "{}{WEBHOOK_PATH}",
            self.public_base_url.trim_end_matches('/')
        )
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_addr, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {e}")))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("hf_api_key", &"<redacted>")
            .field("hf_api_url", &self.hf_api_url)
            .field("inference_timeout", &self.inference_timeout)
            .field("generation", &self.generation)
            .field("public_base_url", &self.public_base_url)
            .field("listen_addr", &self.listen_addr)
            .field("port", &self.port)
            .field("webhook_async", &self.webhook_async)
            .field("skip_webhook_registration", &self.skip_webhook_registration)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

// Vercel exposes the bare host name, without a scheme.
fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {v:?}"))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

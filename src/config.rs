use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Base HAPI URL, e.g. `https://cdaweb.gsfc.nasa.gov/hapi`.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Show a progress bar while downloading bodies of known length.
    pub progress: bool,
}

impl ServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            verify: true,
            progress: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    timeout: Option<Duration>,
    verify: Option<bool>,
    progress: Option<bool>,
}

pub(crate) fn load_config(url: Option<String>) -> Result<ServerConfig> {
    resolve(url, |k| std::env::var(k).ok())
}

fn resolve<E>(url: Option<String>, env: E) -> Result<ServerConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut url = url.or_else(|| env("HAPI_URL"));
    let mut timeout = match env("HAPI_TIMEOUT") {
        Some(v) => Some(parse_timeout(&v).context("invalid HAPI_TIMEOUT")?),
        None => None,
    };
    let mut verify = env("HAPI_VERIFY").map(|v| parse_flag(&v));
    let mut progress = None;

    let rc_candidates = rc_candidates(&env);
    for rc_path in &rc_candidates {
        if rc_path.exists() {
            let cfg = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            url = url.or(cfg.url);
            timeout = timeout.or(cfg.timeout);
            verify = verify.or(cfg.verify);
            progress = cfg.progress;
            break;
        }
    }

    let Some(url) = url else {
        if !rc_candidates.is_empty() {
            bail!(
                "Missing configuration: url (set HAPI_URL or put `url:` in one of: {})",
                rc_candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        bail!("Missing configuration: url (set HAPI_URL or create .hapirc)");
    };

    Ok(ServerConfig {
        url,
        timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        verify: verify.unwrap_or(true),
        progress: progress.unwrap_or(false),
    })
}

fn parse_flag(v: &str) -> bool {
    !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

fn parse_timeout(v: &str) -> Result<Duration> {
    let secs: f64 = v
        .trim()
        .parse()
        .with_context(|| format!("timeout must be a number of seconds, got `{}`", v.trim()))?;
    if !secs.is_finite() || secs <= 0.0 {
        bail!("timeout must be positive, got `{}`", v.trim());
    }
    Ok(Duration::from_secs_f64(secs))
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_rc(&text)
}

fn parse_rc(text: &str) -> Result<RcConfig> {
    let mut cfg = RcConfig::default();

    // A key with an empty value takes its value from the next line.
    let mut pending_key: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(key) = pending_key.take() {
            if !looks_like_entry(line) {
                apply(&mut cfg, &key, strip_quotes(line))?;
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k.to_string());
            } else {
                apply(&mut cfg, k, v)?;
            }
        }
    }

    Ok(cfg)
}

// URLs contain ':' too, so only `key:` with a known key starts a new entry.
fn looks_like_entry(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(k, _)| matches!(k.trim(), "url" | "timeout" | "verify" | "progress"))
}

fn apply(cfg: &mut RcConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "url" => cfg.url = Some(value.to_string()),
        "timeout" => cfg.timeout = Some(parse_timeout(value)?),
        "verify" => cfg.verify = Some(parse_flag(value)),
        "progress" => cfg.progress = Some(parse_flag(value)),
        _ => {}
    }
    Ok(())
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates<E>(env: &E) -> Vec<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    // 1) HAPI_RC (explicit)
    // 2) ./.hapirc
    // 3) ~/.hapirc
    if let Some(p) = env("HAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".hapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".hapirc"));
    }
    v
}

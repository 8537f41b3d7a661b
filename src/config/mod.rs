//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    ffi::OsString,
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::{Date, macros::format_description};
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::categories::CategoryOrdering;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blogfront";
const ENV_PREFIX: &str = "BLOGFRONT";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PROJECT_ID: &str = "6z254rdc";
const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2024-01-01";
const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_ENTRY_LIMIT: usize = 512;
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

/// Command-line arguments for the blogfront binary.
#[derive(Debug, Parser)]
#[command(name = "blogfront", version, about = "Blog content service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGFRONT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// Parse `args`, treating an invocation without a subcommand as `serve`
    /// so the serve flags' environment bindings still apply.
    pub fn parse_or_serve<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let parsed = Self::parse_from(args.iter().cloned());
        if parsed.command.is_some() {
            return parsed;
        }
        Self::parse_from(args.into_iter().chain([OsString::from("serve")]))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Send a revalidation webhook call to a running service.
    Revalidate(RevalidateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SecretOverride {
    /// Shared secret for the revalidation webhook.
    #[arg(
        long = "revalidate-secret",
        env = "SANITY_REVALIDATE_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub revalidate_secret: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub secret: SecretOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the content backend (sanity|fixture).
    #[arg(long = "content-backend", value_name = "BACKEND")]
    pub content_backend: Option<String>,

    /// Override the dataset file read by the fixture backend.
    #[arg(
        long = "content-fixture-path",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub content_fixture_path: Option<PathBuf>,

    /// Override the content store project id.
    #[arg(long = "content-project-id", value_name = "ID")]
    pub content_project_id: Option<String>,

    /// Override the content store dataset.
    #[arg(long = "content-dataset", value_name = "DATASET")]
    pub content_dataset: Option<String>,

    /// Read through the content store's CDN.
    #[arg(
        long = "content-use-cdn",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub content_use_cdn: Option<bool>,

    /// Read token for private datasets.
    #[arg(
        long = "content-token",
        env = "SANITY_API_READ_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub content_token: Option<String>,

    /// Enable or disable the revalidation endpoint.
    #[arg(
        long = "revalidate-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub revalidate_enabled: Option<bool>,

    /// Enable or disable the fetch cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the fetch cache entry limit.
    #[arg(long = "cache-entry-limit", value_name = "COUNT")]
    pub cache_entry_limit: Option<usize>,

    /// Expire cached fetches after this many seconds.
    #[arg(long = "cache-max-age-seconds", value_name = "SECONDS")]
    pub cache_max_age_seconds: Option<u64>,

    /// Override the time zone used for date labels.
    #[arg(long = "site-timezone", value_name = "TZ")]
    pub site_timezone: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RevalidateArgs {
    #[command(flatten)]
    pub secret: SecretOverride,

    /// Base URL of the running service.
    #[arg(long, value_name = "URL")]
    pub url: Url,

    /// Slug of the post to revalidate in addition to the listing tags.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub revalidate: RevalidateSettings,
    pub cache: CacheSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub enum ContentSettings {
    Sanity(SanitySettings),
    Fixture { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitySettings {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RevalidateSettings {
    pub enabled: bool,
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub entry_limit: usize,
    pub max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub timezone: Tz,
    pub category_ordering: CategoryOrdering,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Revalidate(args)) => raw.apply_secret_override(&args.secret),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    revalidate: RawRevalidateSettings,
    cache: RawCacheSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.content_backend.as_ref() {
            self.content.backend = Some(backend.clone());
        }
        if let Some(path) = overrides.content_fixture_path.as_ref() {
            self.content.fixture_path = Some(path.clone());
        }
        if let Some(project_id) = overrides.content_project_id.as_ref() {
            self.content.project_id = Some(project_id.clone());
        }
        if let Some(dataset) = overrides.content_dataset.as_ref() {
            self.content.dataset = Some(dataset.clone());
        }
        if let Some(use_cdn) = overrides.content_use_cdn {
            self.content.use_cdn = Some(use_cdn);
        }
        if let Some(token) = overrides.content_token.as_ref() {
            self.content.token = Some(token.clone());
        }
        if let Some(enabled) = overrides.revalidate_enabled {
            self.revalidate.enabled = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_entry_limit {
            self.cache.entry_limit = Some(limit);
        }
        if let Some(seconds) = overrides.cache_max_age_seconds {
            self.cache.max_age_seconds = Some(seconds);
        }
        if let Some(timezone) = overrides.site_timezone.as_ref() {
            self.site.timezone = Some(timezone.clone());
        }

        self.apply_secret_override(&overrides.secret);
    }

    fn apply_secret_override(&mut self, overrides: &SecretOverride) {
        if let Some(secret) = overrides.revalidate_secret.as_ref() {
            self.revalidate.secret = Some(secret.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            revalidate,
            cache,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let revalidate = build_revalidate_settings(revalidate);
        let cache = build_cache_settings(cache)?;
        let site = build_site_settings(site)?;

        Ok(Self {
            server,
            logging,
            content,
            revalidate,
            cache,
            site,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let backend = non_empty(content.backend).unwrap_or_else(|| "sanity".to_string());
    match backend.as_str() {
        "sanity" => {}
        "fixture" => {
            let path = content.fixture_path.ok_or_else(|| {
                LoadError::invalid(
                    "content.fixture_path",
                    "required when content.backend is `fixture`",
                )
            })?;
            return Ok(ContentSettings::Fixture { path });
        }
        other => {
            return Err(LoadError::invalid(
                "content.backend",
                format!("unknown backend `{other}`, expected `sanity` or `fixture`"),
            ));
        }
    }

    let project_id =
        non_empty(content.project_id).unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
    if !project_id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        return Err(LoadError::invalid(
            "content.project_id",
            "may only contain lowercase letters, digits and dashes",
        ));
    }

    let dataset = non_empty(content.dataset).unwrap_or_else(|| DEFAULT_DATASET.to_string());
    if !dataset
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(LoadError::invalid(
            "content.dataset",
            "may only contain letters, digits, underscores and dashes",
        ));
    }

    let api_version = non_empty(content.api_version)
        .map(|value| value.trim_start_matches('v').to_string())
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    validate_api_version(&api_version)?;

    let timeout_secs = content
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings::Sanity(SanitySettings {
        project_id,
        dataset,
        api_version,
        use_cdn: content.use_cdn.unwrap_or(false),
        token: non_empty(content.token),
        timeout: Duration::from_secs(timeout_secs),
    }))
}

fn validate_api_version(version: &str) -> Result<(), LoadError> {
    if matches!(version, "1" | "X") {
        return Ok(());
    }
    Date::parse(version, format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|err| {
            LoadError::invalid(
                "content.api_version",
                format!("expected `1`, `X` or a YYYY-MM-DD date: {err}"),
            )
        })
}

fn build_revalidate_settings(revalidate: RawRevalidateSettings) -> RevalidateSettings {
    RevalidateSettings {
        enabled: revalidate.enabled.unwrap_or(true),
        secret: non_empty(revalidate.secret),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let entry_limit = cache.entry_limit.unwrap_or(DEFAULT_CACHE_ENTRY_LIMIT);
    let entry_limit = NonZeroUsize::new(entry_limit)
        .ok_or_else(|| LoadError::invalid("cache.entry_limit", "must be greater than zero"))?
        .get();

    if cache.max_age_seconds == Some(0) {
        return Err(LoadError::invalid(
            "cache.max_age_seconds",
            "must be greater than zero; omit it to keep entries until revalidation",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        entry_limit,
        max_age_seconds: cache.max_age_seconds,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let timezone = match non_empty(site.timezone) {
        Some(name) => name.parse::<Tz>().map_err(|err| {
            LoadError::invalid("site.timezone", format!("unknown time zone `{name}`: {err}"))
        })?,
        None => DEFAULT_TIMEZONE,
    };

    let defaults = CategoryOrdering::default();
    let category_ordering = CategoryOrdering {
        explicit_titles: site.category_titles.unwrap_or(defaults.explicit_titles),
        chapter_ordinals: site.chapter_ordinals.unwrap_or(defaults.chapter_ordinals),
        chapter_marker: site.chapter_marker.unwrap_or(defaults.chapter_marker),
    };

    Ok(SiteSettings {
        timezone,
        category_ordering,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    backend: Option<String>,
    fixture_path: Option<PathBuf>,
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    enabled: Option<bool>,
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    entry_limit: Option<usize>,
    max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    timezone: Option<String>,
    category_titles: Option<Vec<String>>,
    chapter_ordinals: Option<Vec<String>>,
    chapter_marker: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse_or_serve(std::env::args_os());
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn sanity(settings: &Settings) -> &SanitySettings {
        match &settings.content {
            ContentSettings::Sanity(sanity) => sanity,
            ContentSettings::Fixture { .. } => panic!("expected sanity backend"),
        }
    }

    #[test]
    fn defaults_point_at_production_dataset() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        let content = sanity(&settings);

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(content.project_id, "6z254rdc");
        assert_eq!(content.dataset, "production");
        assert_eq!(content.api_version, "2024-01-01");
        assert!(!content.use_cdn);
        assert!(settings.revalidate.enabled);
        assert!(settings.revalidate.secret.is_none());
        assert!(settings.cache.enabled);
        assert_eq!(settings.site.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(settings.site.category_ordering, CategoryOrdering::default());
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());
        raw.revalidate.secret = Some("from-file".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            secret: SecretOverride {
                revalidate_secret: Some("from-cli".to_string()),
            },
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.revalidate.secret.as_deref(), Some("from-cli"));
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let mut raw = RawSettings::default();
        raw.revalidate.secret = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.revalidate.secret.is_none());
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn fixture_backend_requires_path() {
        let mut raw = RawSettings::default();
        raw.content.backend = Some("fixture".to_string());
        let err = Settings::from_raw(raw.clone()).expect_err("missing path");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "content.fixture_path",
                ..
            }
        ));

        raw.content.fixture_path = Some(PathBuf::from("fixtures/blog.json"));
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(matches!(settings.content, ContentSettings::Fixture { .. }));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut raw = RawSettings::default();
        raw.content.backend = Some("postgres".to_string());
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.content.api_version = Some("yesterday".to_string());
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.site.timezone = Some("Mars/Olympus".to_string());
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.cache.entry_limit = Some(0);
        assert!(Settings::from_raw(raw).is_err());

        let mut raw = RawSettings::default();
        raw.cache.max_age_seconds = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn api_version_accepts_v_prefix() {
        let mut raw = RawSettings::default();
        raw.content.api_version = Some("v2021-10-21".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(sanity(&settings).api_version, "2021-10-21");
    }

    #[test]
    fn config_file_sections_are_layered() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(
            file,
            r#"
[server]
port = 8080

[cache]
max_age_seconds = 60

[site]
timezone = "UTC"
category_titles = ["B", "A"]
"#
        )
        .expect("write config");

        let args = CliArgs::parse_from([
            "blogfront",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
            "serve",
            "--server-port",
            "9090",
        ]);
        let settings = load(&args).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 9090);
        assert_eq!(settings.cache.max_age_seconds, Some(60));
        assert_eq!(settings.site.timezone, chrono_tz::UTC);
        assert_eq!(
            settings.site.category_ordering.explicit_titles,
            vec!["B".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_or_serve(["blogfront"]);
        assert!(matches!(args.command, Some(Command::Serve(_))));

        let args = CliArgs::parse_or_serve(["blogfront", "--config-file", "site.toml"]);
        assert!(matches!(args.command, Some(Command::Serve(_))));
        assert_eq!(
            args.config_file.as_deref(),
            Some(std::path::Path::new("site.toml"))
        );
    }

    #[test]
    fn bare_invocation_reads_secrets_from_env() {
        // SAFETY: no other test in this crate asserts on these variables.
        unsafe {
            std::env::set_var("SANITY_REVALIDATE_SECRET", "from-env");
            std::env::set_var("SANITY_API_READ_TOKEN", "read-token");
        }
        let bare = load(&CliArgs::parse_or_serve(["blogfront"]));
        let explicit = load(&CliArgs::parse_or_serve(["blogfront", "serve"]));
        unsafe {
            std::env::remove_var("SANITY_REVALIDATE_SECRET");
            std::env::remove_var("SANITY_API_READ_TOKEN");
        }

        let bare = bare.expect("bare settings");
        let explicit = explicit.expect("serve settings");
        assert_eq!(bare.revalidate.secret.as_deref(), Some("from-env"));
        assert_eq!(sanity(&bare).token.as_deref(), Some("read-token"));
        assert_eq!(bare.revalidate.secret, explicit.revalidate.secret);
    }

    #[test]
    fn parse_revalidate_arguments() {
        let args = CliArgs::parse_from([
            "blogfront",
            "revalidate",
            "--url",
            "http://127.0.0.1:3000",
            "--slug",
            "my-post",
            "--revalidate-secret",
            "s3cret",
        ]);

        match args.command.expect("revalidate command") {
            Command::Revalidate(revalidate) => {
                assert_eq!(revalidate.url.as_str(), "http://127.0.0.1:3000/");
                assert_eq!(revalidate.slug.as_deref(), Some("my-post"));
                assert_eq!(
                    revalidate.secret.revalidate_secret.as_deref(),
                    Some("s3cret")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "blogfront",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--content-backend",
            "fixture",
            "--content-fixture-path",
            "data/blog.json",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(serve.overrides.content_backend.as_deref(), Some("fixture"));
                assert_eq!(
                    serve.overrides.content_fixture_path.as_deref(),
                    Some(std::path::Path::new("data/blog.json"))
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }
}

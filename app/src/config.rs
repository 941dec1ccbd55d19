use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::{ops::Deref, sync::Arc, time::Duration};

pub const DEFAULT_JUDGE_BASE_URL: &str = "https://codeforces.com";

/// Periods and deadlines of the background machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How often connected users are queued for a verdict refresh.
    pub scan_interval: Duration,
    /// One judge call at most per request interval.
    pub request_interval: Duration,
    pub judge_timeout: Duration,
    pub room_tick_interval: Duration,
    pub heartbeat_interval: Duration,
    /// A connection that sends nothing (not even a pong) for this long is dropped.
    pub liveness_wait: Duration,
    pub write_wait: Duration,
    pub single_room_max_age: Duration,
    pub sweep_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(2),
            request_interval: Duration::from_millis(200),
            judge_timeout: Duration::from_secs(10),
            room_tick_interval: Duration::from_secs(2),
            heartbeat_interval: Duration::from_secs(30),
            liveness_wait: Duration::from_secs(40),
            write_wait: Duration::from_secs(10),
            single_room_max_age: Duration::from_secs(5 * 60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl Timings {
    fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            scan_interval: env_millis("POLL_SCAN_INTERVAL_MS", d.scan_interval)?,
            request_interval: env_millis("POLL_REQUEST_INTERVAL_MS", d.request_interval)?,
            judge_timeout: env_millis("JUDGE_TIMEOUT_MS", d.judge_timeout)?,
            room_tick_interval: env_millis("ROOM_TICK_INTERVAL_MS", d.room_tick_interval)?,
            heartbeat_interval: env_millis("WS_HEARTBEAT_INTERVAL_MS", d.heartbeat_interval)?,
            liveness_wait: env_millis("WS_LIVENESS_WAIT_MS", d.liveness_wait)?,
            write_wait: env_millis("WS_WRITE_WAIT_MS", d.write_wait)?,
            single_room_max_age: env_secs("SINGLE_ROOM_MAX_AGE_SECS", d.single_room_max_age)?,
            sweep_interval: env_secs("SINGLE_ROOM_SWEEP_INTERVAL_SECS", d.sweep_interval)?,
        })
    }
}

pub struct ConfigInner {
    pub db_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub judge_base_url: String,
    pub timings: Timings,
}

#[derive(Clone)]
pub struct Config(Arc<ConfigInner>);

impl Config {
    /// A local configuration with default timings.
    pub fn new(db_url: &str, jwt_secret: &str) -> Config {
        Self(Arc::new(ConfigInner {
            db_url: db_url.to_owned(),
            host: "127.0.0.1".into(),
            port: 8080,
            allowed_origin: "http://localhost:3000".into(),
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            judge_base_url: DEFAULT_JUDGE_BASE_URL.into(),
            timings: Timings::default(),
        }))
    }

    pub fn from_env() -> Result<Config> {
        let secret = required("JWT_SECRET")?;
        let v = ConfigInner {
            db_url: required("DATABASE_URL")?,
            host: required("HOST")?,
            port: required("PORT")?.parse().context("PORT is not a number")?,
            allowed_origin: required("ALLOWED_ORIGIN")?,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            judge_base_url: std::env::var("JUDGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_JUDGE_BASE_URL.into()),
            timings: Timings::from_env()?,
        };

        Ok(Self(Arc::new(v)))
    }

    pub fn with_timings(&self, timings: Timings) -> Config {
        Self(Arc::new(ConfigInner {
            db_url: self.db_url.clone(),
            host: self.host.clone(),
            port: self.port,
            allowed_origin: self.allowed_origin.clone(),
            encoding_key: self.encoding_key.clone(),
            decoding_key: self.decoding_key.clone(),
            judge_base_url: self.judge_base_url.clone(),
            timings,
        }))
    }

    pub fn get_server_url(&self) -> String {
        format!("{}:{}", self.0.host, self.0.port)
    }
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is not set in .env file"))
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(v) => Ok(Duration::from_millis(
            v.parse().with_context(|| format!("{key} is not a number"))?,
        )),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(v) => Ok(Duration::from_secs(
            v.parse().with_context(|| format!("{key} is not a number"))?,
        )),
        Err(_) => Ok(default),
    }
}

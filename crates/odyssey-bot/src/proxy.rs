//! Outbound proxies from `proxy.txt`.
//!
//! One entry per line, `username:password@host:port`. Malformed lines are
//! skipped with a warning; an account picks one proxy at random.

use crate::error::{OdysseyError, OdysseyResult};
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl ProxyDescriptor {
    /// Parse `username:password@host:port`. Returns `None` on any malformed part.
    pub fn parse(line: &str) -> Option<Self> {
        let (auth, endpoint) = line.trim().split_once('@')?;
        let (username, password) = auth.split_once(':')?;
        let (host, port) = endpoint.rsplit_once(':')?;
        if username.is_empty() || password.is_empty() || host.is_empty() {
            return None;
        }
        let port = port.parse::<u16>().ok().filter(|p| *p != 0)?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
        })
    }

    pub fn to_url(&self, scheme: &str) -> String {
        format!(
            "{scheme}://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    /// `host:port` without credentials, for log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Turn a `proxy.txt` line into a proxy URL, or `None` if the line is malformed.
pub fn format_proxy_url(line: &str, scheme: &str) -> Option<String> {
    ProxyDescriptor::parse(line).map(|p| p.to_url(scheme))
}

/// The set of valid proxies, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyDescriptor>,
}

impl ProxyPool {
    /// Parse pool contents, skipping blank and malformed lines.
    pub fn parse(contents: &str) -> Self {
        let proxies = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let parsed = ProxyDescriptor::parse(line);
                if parsed.is_none() {
                    warn!(line, "Skipping malformed proxy line");
                }
                parsed
            })
            .collect();
        Self { proxies }
    }

    pub fn load(path: &Path) -> OdysseyResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Load the pool, or fall back to an empty pool (direct connections) when
    /// the file does not exist.
    pub fn load_or_empty(path: &Path) -> OdysseyResult<Self> {
        match Self::load(path) {
            Err(OdysseyError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Proxy file not found, connecting directly");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn pick(&self) -> Option<&ProxyDescriptor> {
        self.proxies.choose(&mut rand::thread_rng())
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

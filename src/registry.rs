use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::version::Version;

pub const RUBYGEMS_URL: &str = "https://rubygems.org";

/// Answers "what versions exist for gem P". Injected so tests can supply
/// canned versions instead of the network.
pub trait Registry {
    /// Released (non-prerelease) versions, ascending. May be served from a
    /// per-run cache.
    fn versions(&self, name: &str) -> Result<Vec<Version>, RegistryError>;
}

#[derive(Clone, Debug, Error)]
#[error("registry lookup failed for {package}: {reason}")]
pub struct RegistryError {
    pub package: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct VersionRecord {
    number: String,
    #[serde(default)]
    prerelease: bool,
}

/// rubygems.org versions API client, blocking, cached per run.
pub struct RubygemsRegistry {
    base_url: String,
    client: reqwest::blocking::Client,
    cache: RefCell<HashMap<String, Vec<Version>>>,
}

impl RubygemsRegistry {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("gemup")
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache: RefCell::new(HashMap::new()),
        })
    }

    fn fetch(&self, name: &str) -> Result<Vec<Version>> {
        let records: Vec<VersionRecord> = self
            .client
            .get(format!("{}/api/v1/versions/{}.json", self.base_url, name))
            .send()
            .context("versions request")?
            .error_for_status()
            .context("versions status")?
            .json()
            .context("parse versions response")?;

        let mut versions = Vec::new();
        for record in records {
            if record.prerelease {
                continue;
            }
            // The registry owns its version strings; ignore ones this tool
            // cannot represent rather than failing the whole scan.
            if let Ok(v) = Version::parse(&record.number) {
                versions.push(v);
            }
        }
        versions.sort();
        Ok(versions)
    }
}

impl Registry for RubygemsRegistry {
    fn versions(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        let versions = self.fetch(name).map_err(|err| RegistryError {
            package: name.to_string(),
            reason: format!("{:#}", err),
        })?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), versions.clone());
        Ok(versions)
    }
}

use std::path::PathBuf;
use std::sync::{Arc, atomic::AtomicUsize};

use serde_json::json;
use zenoh::{Session, Wait};

use crate::{Builder, ParamError, Result, node::ZNodeBuilder};

#[derive(Debug, Default)]
pub struct GlobalCounter(AtomicUsize);

impl GlobalCounter {
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
pub struct ZContextBuilder {
    domain_id: usize,
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, serde_json::Value)>,
}

impl ZContextBuilder {
    /// Set the ROS domain ID
    pub fn with_domain_id(mut self, domain_id: usize) -> Self {
        self.domain_id = domain_id;
        self
    }

    /// Load configuration from a JSON5 file
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Add a JSON configuration override
    ///
    /// # Example
    /// ```ignore
    /// use serde_json::json;
    ///
    /// let ctx = ZContextBuilder::default()
    ///     .with_json("scouting/multicast/enabled", json!(false))
    ///     .with_json("connect/endpoints", json!(["tcp/127.0.0.1:7447"]))
    ///     .build()?;
    /// ```
    pub fn with_json<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.config_overrides.push((key.into(), value));
        self
    }

    /// Convenience method: disable multicast scouting
    pub fn disable_multicast_scouting(self) -> Self {
        self.with_json("scouting/multicast/enabled", json!(false))
    }

    /// Convenience method: connect to specific endpoints
    pub fn with_connect_endpoints<I, S>(self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints.into_iter().map(|s| s.into()).collect();
        self.with_json("connect/endpoints", json!(endpoints))
    }

    /// Convenience method: connect to localhost zenohd
    pub fn connect_to_local_zenohd(self) -> Self {
        self.with_connect_endpoints(["tcp/127.0.0.1:7447"])
    }

    /// Convenience method: set mode (peer, client, router)
    pub fn with_mode<S: Into<String>>(self, mode: S) -> Self {
        self.with_json("mode", json!(mode.into()))
    }

    /// Parse and apply overrides from environment variable
    ///
    /// Expected format: `key1=value1;key2=value2`, values are JSON5, e.g.
    /// `ROSZ_CONFIG_OVERRIDE='mode="client";connect/endpoints=["tcp/192.168.1.1:7447"]'`
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(overrides_str) = std::env::var("ROSZ_CONFIG_OVERRIDE") {
            tracing::debug!(
                "Applying config overrides from ROSZ_CONFIG_OVERRIDE: {}",
                overrides_str
            );
            self.config_overrides
                .extend(parse_overrides(&overrides_str)?);
        }
        Ok(self)
    }
}

/// Parse `key=value;key=value` pairs with JSON5 values.
fn parse_overrides(overrides: &str) -> Result<Vec<(String, serde_json::Value)>> {
    let mut parsed = Vec::new();
    for pair in overrides.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        // Split on first '=' only
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ParamError::Construction(format!(
                "Invalid ROSZ_CONFIG_OVERRIDE format: '{pair}'. Expected 'key=value'"
            )));
        };
        let (key, value) = (key.trim(), value.trim());
        let json_value = json5::from_str::<serde_json::Value>(value).map_err(|e| {
            ParamError::Construction(format!(
                "Failed to parse ROSZ_CONFIG_OVERRIDE value for key '{key}': {e} (value: {value})"
            ))
        })?;
        tracing::debug!("Override: {} = {}", key, json_value);
        parsed.push((key.to_string(), json_value));
    }
    Ok(parsed)
}

impl Builder for ZContextBuilder {
    type Output = ZContext;

    fn build(mut self) -> Result<ZContext> {
        // Priority order:
        // 1. Config file passed via with_config_file()
        // 2. ROSZ_CONFIG_FILE environment variable
        // 3. Default config
        let config_path = self
            .config_file
            .clone()
            .or_else(|| std::env::var("ROSZ_CONFIG_FILE").ok().map(PathBuf::from));
        let mut config = match config_path {
            Some(path) => zenoh::Config::from_file(&path).map_err(|e| {
                ParamError::Construction(format!("failed to load {}: {e}", path.display()))
            })?,
            None => zenoh::Config::default(),
        };

        self = self.apply_env_overrides()?;

        for (key, value) in self.config_overrides {
            let value_str = value.to_string();
            config.insert_json5(&key, &value_str).map_err(|e| {
                ParamError::Construction(format!(
                    "Failed to apply config override '{key}' = '{value_str}': {e}"
                ))
            })?;
        }

        let session = zenoh::open(config)
            .wait()
            .map_err(|e| ParamError::Construction(format!("failed to open session: {e}")))?;

        Ok(ZContext {
            session: Arc::new(session),
            counter: Arc::new(GlobalCounter::default()),
            domain_id: self.domain_id,
        })
    }
}

#[derive(Clone)]
pub struct ZContext {
    session: Arc<Session>,
    // Global counter for the participants
    counter: Arc<GlobalCounter>,
    domain_id: usize,
}

impl ZContext {
    pub fn create_node<S: AsRef<str>>(&self, name: S) -> ZNodeBuilder {
        ZNodeBuilder {
            domain_id: self.domain_id,
            name: name.as_ref().to_owned(),
            namespace: String::new(),
            session: self.session.clone(),
            counter: self.counter.clone(),
        }
    }

    /// The Zenoh session shared by every node of this context.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn shutdown(&self) -> Result<()> {
        Ok(self.session.close().wait()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let parsed =
            parse_overrides(r#"mode="client"; connect/endpoints=["tcp/10.0.0.1:7447"];"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("mode".to_string(), json!("client")));
        assert_eq!(parsed[1].1, json!(["tcp/10.0.0.1:7447"]));
    }

    #[test]
    fn test_parse_overrides_rejects_missing_equals() {
        let err = parse_overrides("mode").unwrap_err();
        assert!(matches!(err, ParamError::Construction(_)));
    }

    #[test]
    fn test_parse_overrides_rejects_bad_json5() {
        assert!(parse_overrides("mode={").is_err());
    }
}

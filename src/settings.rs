// src/settings.rs
//! Runtime configuration.
//!
//! Settings are layered with the `config` crate:
//! 1. an optional TOML file (`coupon-issuer.toml`, or an explicit path)
//! 2. `COUPON_*` environment variables, which win over the file
//!
//! The binary loads `.env` with `dotenv` first, so the usual
//! `COUPON_SIGNER_PRIVATE_KEY=...` line in `.env` works as well.
//!
//! | key                  | env var                     | default        |
//! |----------------------|-----------------------------|----------------|
//! | `signer_private_key` | `COUPON_SIGNER_PRIVATE_KEY` | none           |
//! | `coupon_class`       | `COUPON_COUPON_CLASS`       | `Presale`      |
//! | `workers`            | `COUPON_WORKERS`            | available CPUs |
//! | `issuer_address`     | `COUPON_ISSUER_ADDRESS`     | derived from key |

use crate::error::ConfigError;
use crate::models::actor::ActorIdentifier;
use crate::models::coupon::CouponClass;
use crate::services::coupon_issuer::IssuerConfig;
use crate::services::verifier::VerifierConfig;
use crate::wallet::key_management::IssuerKey;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Prefix of the environment variables read by [`Settings::load`].
pub const ENV_PREFIX: &str = "COUPON";

/// Base name of the optional configuration file in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "coupon-issuer";

/// Raw settings as read from file and environment.
#[derive(Clone, Deserialize, Default)]
pub struct Settings {
    /// Issuer private key, hex encoded.
    #[serde(default)]
    pub signer_private_key: Option<String>,

    /// Class number or name.
    #[serde(default)]
    pub coupon_class: Option<String>,

    #[serde(default)]
    pub workers: Option<usize>,

    /// Trusted issuer address for verification.
    #[serde(default)]
    pub issuer_address: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("signer_private_key", &self.signer_private_key.as_ref().map(|_| "<redacted>"))
            .field("coupon_class", &self.coupon_class)
            .field("workers", &self.workers)
            .field("issuer_address", &self.issuer_address)
            .finish()
    }
}

impl Settings {
    /// Loads settings from the process environment and an optional file.
    ///
    /// With `path = None`, `coupon-issuer.{toml,json,…}` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(path, None)
    }

    /// Same as [`Settings::load`] but with an explicit environment map in
    /// place of the process environment.
    pub fn from_sources(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::from(path).required(true)),
            None => Config::builder().add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Configured class, defaulting to `Presale`.
    pub fn coupon_class(&self) -> Result<CouponClass, ConfigError> {
        match &self.coupon_class {
            Some(text) => Ok(text.parse()?),
            None => Ok(CouponClass::Presale),
        }
    }

    /// Worker count, defaulting to the available parallelism.
    pub fn workers(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    /// Issuer key parsed from `signer_private_key`.
    pub fn issuer_key(&self) -> Result<IssuerKey, ConfigError> {
        let hex = self
            .signer_private_key
            .as_deref()
            .ok_or(ConfigError::Missing("signer_private_key"))?;
        Ok(IssuerKey::from_hex(hex)?)
    }

    /// Builds the configuration handed to the batch issuance driver.
    pub fn issuer_config(&self) -> Result<IssuerConfig, ConfigError> {
        Ok(IssuerConfig {
            key: self.issuer_key()?,
            default_class: self.coupon_class()?,
            workers: self.workers(),
        })
    }

    /// Builds the verifier configuration.
    ///
    /// Uses `issuer_address` when set, otherwise the address of the
    /// configured signer key.
    pub fn verifier_config(&self) -> Result<VerifierConfig, ConfigError> {
        let issuer = match &self.issuer_address {
            Some(address) => ActorIdentifier::parse(address)?,
            None => self.issuer_key()?.identity(),
        };
        Ok(VerifierConfig { issuer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        let mut map = config::Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        Some(map)
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::from_sources(None, env(&[])).unwrap();
        assert_eq!(settings.coupon_class().unwrap(), CouponClass::Presale);
        assert!(settings.workers() >= 1);
        assert!(matches!(settings.issuer_key(), Err(ConfigError::Missing("signer_private_key"))));
    }

    #[test]
    fn test_environment_settings() {
        let settings = Settings::from_sources(
            None,
            env(&[
                ("COUPON_SIGNER_PRIVATE_KEY", TEST_KEY),
                ("COUPON_COUPON_CLASS", "author"),
                ("COUPON_WORKERS", "3"),
            ]),
        )
        .unwrap();

        let issuer = settings.issuer_config().unwrap();
        assert_eq!(issuer.default_class, CouponClass::Author);
        assert_eq!(issuer.workers, 3);
        assert_eq!(issuer.key.identity().to_checksum(), TEST_ADDRESS);
        assert_eq!(settings.verifier_config().unwrap().issuer.to_checksum(), TEST_ADDRESS);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("coupon_class = \"0\"\nworkers = 2\n");
        let settings = Settings::from_sources(Some(file.path()), env(&[("COUPON_COUPON_CLASS", "1")])).unwrap();

        assert_eq!(settings.coupon_class().unwrap(), CouponClass::Author);
        assert_eq!(settings.workers(), 2);
    }

    #[test]
    fn test_invalid_values_reported() {
        let settings = Settings::from_sources(
            None,
            env(&[("COUPON_COUPON_CLASS", "9"), ("COUPON_SIGNER_PRIVATE_KEY", "0xdead")]),
        )
        .unwrap();

        assert!(matches!(settings.coupon_class(), Err(ConfigError::Encoding(_))));
        assert!(matches!(settings.issuer_key(), Err(ConfigError::Signing(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = Settings {
            signer_private_key: Some(TEST_KEY.to_string()),
            ..Settings::default()
        };
        assert!(!format!("{:?}", settings).contains(&TEST_KEY[2..]));
    }
}

//! Snapshot-repository settings codecs.
//!
//! Settings arrive as a byte stream in JSON or YAML. JSON is tried first; when
//! both decoders fail the YAML error is reported.

use crate::error::ConfigError;
use crate::multierror::MultiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;

/// Repository type written on the wire for S3 settings.
pub const S3_TYPE: &str = "s3";

pub const STORAGE_CLASSES: [&str; 3] = ["standard", "reduced_redundancy", "standard_ia"];

pub const CANNED_ACLS: [&str; 7] = [
    "private",
    "public-read",
    "public-read-write",
    "authenticated-read",
    "log-delivery-write",
    "bucket-owner-read",
    "bucket-owner-full-control",
];

pub const PROTOCOLS: [&str; 2] = ["http", "https"];

/// S3 repository settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub server_side_encryption: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canned_acl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_style_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle_retries: Option<bool>,
}

fn check_member(field: &str, value: Option<&str>, allowed: &[&str], merr: &mut MultiError) {
    if let Some(v) = value {
        if !allowed.contains(&v) {
            merr.push(format!(
                "{} {:?} is invalid, must be one of: {}",
                field,
                v,
                allowed.join(", ")
            ));
        }
    }
}

impl S3Config {
    /// Required fields first, then optional fields, each in declaration order.
    pub fn validate(&self) -> Result<(), MultiError> {
        let mut merr = MultiError::new("s3 repository settings");
        for (field, value) in [
            ("region", &self.region),
            ("bucket", &self.bucket),
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
        ] {
            if value.is_empty() {
                merr.push(format!("{} cannot be empty", field));
            }
        }

        check_member(
            "storage_class",
            self.storage_class.as_deref(),
            &STORAGE_CLASSES,
            &mut merr,
        );
        check_member("canned_acl", self.canned_acl.as_deref(), &CANNED_ACLS, &mut merr);
        check_member("protocol", self.protocol.as_deref(), &PROTOCOLS, &mut merr);
        if let Some(endpoint) = &self.endpoint {
            if let Err(e) = url::Url::parse(endpoint) {
                merr.push(format!("endpoint {:?} is not a valid url: {}", endpoint, e));
            }
        }
        merr.into_result()
    }
}

/// Parsed repository settings.
#[derive(Debug, Clone, PartialEq)]
pub enum RepositorySettings {
    S3(S3Config),
    /// Settings of any other repository type, passed through untouched.
    Generic {
        repository_type: String,
        settings: Map<String, Value>,
    },
}

impl RepositorySettings {
    pub fn repository_type(&self) -> &str {
        match self {
            RepositorySettings::S3(_) => S3_TYPE,
            RepositorySettings::Generic {
                repository_type, ..
            } => repository_type,
        }
    }

    pub fn validate(&self) -> Result<(), MultiError> {
        match self {
            RepositorySettings::S3(s3) => s3.validate(),
            RepositorySettings::Generic {
                repository_type,
                settings,
            } => {
                let mut merr = MultiError::new("repository settings");
                if repository_type.is_empty() {
                    merr.push("type cannot be empty");
                }
                if settings.is_empty() {
                    merr.push(ConfigError::Empty.to_string());
                }
                merr.into_result()
            }
        }
    }

    /// Settings object sent to the remote.
    pub fn settings_value(&self) -> Value {
        match self {
            RepositorySettings::S3(s3) => serde_json::to_value(s3).unwrap_or(Value::Null),
            RepositorySettings::Generic { settings, .. } => Value::Object(settings.clone()),
        }
    }
}

fn read_all(reader: Option<&mut dyn Read>) -> Result<Vec<u8>, ConfigError> {
    let reader = reader.ok_or(ConfigError::NilReader)?;
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(|e| ConfigError::Read(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConfigError> {
    serde_json::from_slice(bytes).or_else(|_| {
        serde_yaml::from_slice(bytes).map_err(|e| ConfigError::Format(e.to_string()))
    })
}

/// Parses S3 settings. Validation is left to [`S3Config::validate`].
pub fn parse_s3_config(reader: Option<&mut dyn Read>) -> Result<S3Config, ConfigError> {
    decode(&read_all(reader)?)
}

/// Parses an opaque settings map; an empty map is rejected.
pub fn parse_generic_config(reader: Option<&mut dyn Read>) -> Result<Map<String, Value>, ConfigError> {
    let map: Map<String, Value> = decode(&read_all(reader)?)?;
    if map.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(map)
}

/// Parses and validates settings for a repository of `repository_type`.
pub fn parse_settings(
    repository_type: &str,
    reader: Option<&mut dyn Read>,
) -> Result<RepositorySettings, ConfigError> {
    let settings = if repository_type == S3_TYPE {
        RepositorySettings::S3(parse_s3_config(reader)?)
    } else {
        RepositorySettings::Generic {
            repository_type: repository_type.to_string(),
            settings: parse_generic_config(reader)?,
        }
    };
    settings.validate()?;
    Ok(settings)
}

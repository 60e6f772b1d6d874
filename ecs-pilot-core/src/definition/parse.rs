//! Parsers for flat plugin settings
//!
//! CI plugins receive every setting as a string (lists are comma separated
//! before they reach us). Each entry here is one list element, e.g. a port
//! mapping `"8080 80"` or an environment variable `"KEY=value"`.

use aws_sdk_ecs::types::{
    CapacityProviderStrategyItem, Compatibility, EfsVolumeConfiguration, HostVolumeProperties,
    KeyValuePair, MountPoint, PortMapping, Secret, TaskDefinitionPlacementConstraint,
    TaskDefinitionPlacementConstraintType, TransportProtocol, Ulimit, UlimitName, Volume,
};
use serde::Deserialize;

use crate::error::ConfigError;

type Result<T> = std::result::Result<T, ConfigError>;

/// Splits a space separated entry into at most `n` trimmed parts
fn fields(entry: &str, n: usize) -> Vec<&str> {
    entry.trim().splitn(n, ' ').map(str::trim).collect()
}

fn parse_i32(setting: &'static str, field: &'static str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|e| ConfigError::InvalidNumber {
            setting,
            field,
            reason: format!("{} ({:?})", e, value),
        })
}

/// Parses a boolean the way CI settings spell them
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Splits `KEY=value` on the first `=`, trimming both sides
pub fn parse_key_value(setting: &'static str, entry: &str) -> Result<(String, String)> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::malformed(setting, entry, "KEY=value"))?;

    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// `name [source_path]`
pub fn parse_volume(entry: &str) -> Volume {
    let parts = fields(entry, 2);

    let mut volume = Volume::builder().name(parts[0]);
    if let Some(source_path) = parts.get(1) {
        volume = volume.host(HostVolumeProperties::builder().source_path(*source_path).build());
    }
    volume.build()
}

/// `name file_system_id root_directory`
pub fn parse_efs_volume(entry: &str) -> Result<Volume> {
    let parts = fields(entry, 3);
    if parts.len() < 3 {
        return Err(ConfigError::malformed(
            "efs_volumes",
            entry,
            "name file_system_id root_directory",
        ));
    }

    let efs = EfsVolumeConfiguration::builder()
        .file_system_id(parts[1])
        .root_directory(parts[2])
        .build()?;

    Ok(Volume::builder()
        .name(parts[0])
        .efs_volume_configuration(efs)
        .build())
}

/// `source_volume container_path read_only`
pub fn parse_mount_point(entry: &str) -> Result<MountPoint> {
    let parts = fields(entry, 3);
    if parts.len() < 3 {
        return Err(ConfigError::malformed(
            "mount_points",
            entry,
            "source_volume container_path read_only",
        ));
    }

    let read_only = parse_bool(parts[2]).ok_or_else(|| ConfigError::InvalidBool {
        setting: "mount_points",
        field: "readOnly",
        value: parts[2].to_string(),
    })?;

    Ok(MountPoint::builder()
        .source_volume(parts[0])
        .container_path(parts[1])
        .read_only(read_only)
        .build())
}

/// `host_port container_port`, always TCP
pub fn parse_port_mapping(entry: &str) -> Result<PortMapping> {
    let parts = fields(entry, 2);
    if parts.len() < 2 {
        return Err(ConfigError::malformed(
            "port_mappings",
            entry,
            "host_port container_port",
        ));
    }

    let host_port = parse_i32("port_mappings", "hostPort", parts[0])?;
    let container_port = parse_i32("port_mappings", "containerPort", parts[1])?;

    Ok(PortMapping::builder()
        .host_port(host_port)
        .container_port(container_port)
        .protocol(TransportProtocol::Tcp)
        .build())
}

/// `NAME=value`
pub fn parse_environment(entry: &str) -> Result<KeyValuePair> {
    let (name, value) = parse_key_value("environment", entry)?;
    Ok(KeyValuePair::builder().name(name).value(value).build())
}

/// `NAME=SOURCE_VAR` or `NAME`
///
/// The value is read from the plugin's own environment through `lookup`, so
/// CI secrets can be forwarded without appearing in the pipeline file.
/// Unset variables produce an empty value.
pub fn parse_secret_environment<F>(entry: &str, lookup: F) -> KeyValuePair
where
    F: Fn(&str) -> Option<String>,
{
    let (name, source) = match entry.split_once('=') {
        Some((name, source)) => (name.trim(), source.trim()),
        None => (entry.trim(), entry.trim()),
    };

    KeyValuePair::builder()
        .name(name)
        .value(lookup(source).unwrap_or_default())
        .build()
}

/// `NAME=secret_arn`
pub fn parse_secrets_manager(entry: &str) -> Result<Secret> {
    let (name, value_from) = parse_key_value("secrets_manager_environment", entry)?;
    Ok(Secret::builder().name(name).value_from(value_from).build()?)
}

/// `name soft_limit hard_limit`
pub fn parse_ulimit(entry: &str) -> Result<Ulimit> {
    let parts = fields(entry, 3);
    if parts.len() < 3 {
        return Err(ConfigError::malformed(
            "ulimits",
            entry,
            "name soft_limit hard_limit",
        ));
    }

    let soft_limit = parse_i32("ulimits", "softLimit", parts[1])?;
    let hard_limit = parse_i32("ulimits", "hardLimit", parts[2])?;

    Ok(Ulimit::builder()
        .name(UlimitName::from(parts[0]))
        .soft_limit(soft_limit)
        .hard_limit(hard_limit)
        .build()?)
}

#[derive(Debug, Deserialize)]
struct PlacementConstraintEntry {
    #[serde(rename = "type")]
    kind: String,
    expression: String,
}

/// JSON array of `{"type": ..., "expression": ...}`; `null` means none
pub fn parse_placement_constraints(json: &str) -> Result<Vec<TaskDefinitionPlacementConstraint>> {
    let entries: Option<Vec<PlacementConstraintEntry>> = serde_json::from_str(json)?;

    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            TaskDefinitionPlacementConstraint::builder()
                .r#type(TaskDefinitionPlacementConstraintType::from(c.kind.as_str()))
                .expression(c.expression)
                .build()
        })
        .collect())
}

/// `base weight capacity_provider`
pub fn parse_capacity_provider(entry: &str) -> Result<CapacityProviderStrategyItem> {
    let parts = fields(entry, 3);
    if parts.len() < 3 {
        return Err(ConfigError::malformed(
            "capacity_providers",
            entry,
            "base weight capacity_provider",
        ));
    }

    let base = parse_i32("capacity_provider", "Base integer", parts[0])?;
    let weight = parse_i32("capacity_provider", "Weight integer", parts[1])?;

    Ok(CapacityProviderStrategyItem::builder()
        .base(base)
        .weight(weight)
        .capacity_provider(parts[2])
        .build()?)
}

/// Space separated launch compatibilities, e.g. `"EC2 FARGATE"`
pub fn parse_compatibilities(value: &str) -> Vec<Compatibility> {
    value.split_whitespace().map(Compatibility::from).collect()
}

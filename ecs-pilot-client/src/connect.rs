//! Session construction
//!
//! Builds an ECS client from the connection settings every plugin shares.
//! Credential resolution itself is left to `aws-config`.

use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecs::config::Credentials;
use tracing::info;

use crate::AwsEcsClient;

/// Session name used when assuming a role
const SESSION_NAME: &str = "ecs-pilot";

/// How a plugin connects to AWS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// AWS region (e.g., "eu-west-1")
    pub region: String,
    /// Static access key; used only together with `secret_key`
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Role to assume on top of the base credentials
    pub user_role_arn: Option<String>,
}

impl ConnectionSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Fills unset credentials from the `ECS_*` and `AWS_*` aliases
    ///
    /// CI plugins historically accepted `ECS_ACCESS_KEY` / `AWS_ACCESS_KEY`
    /// (and the matching secret key and user role variables) in addition to
    /// their own settings.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_fallbacks(|name| std::env::var(name).ok())
    }

    fn with_fallbacks<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |current: Option<String>, suffix: &str| {
            current.filter(|v| !v.is_empty()).or_else(|| {
                ["ECS_", "AWS_"]
                    .iter()
                    .filter_map(|prefix| lookup(&format!("{}{}", prefix, suffix)))
                    .find(|v| !v.is_empty())
            })
        };

        Self {
            access_key: resolve(self.access_key, "ACCESS_KEY"),
            secret_key: resolve(self.secret_key, "SECRET_KEY"),
            user_role_arn: resolve(self.user_role_arn, "USER_ROLE_ARN"),
            region: self.region,
        }
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<Credentials> {
        match (self.access_key.as_deref(), self.secret_key.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(key, secret, None, None, "ecs-pilot-static"))
            }
            _ => None,
        }
    }
}

/// Creates an ECS client for `settings`
///
/// Static keys win when both are present; otherwise the default provider
/// chain (environment, shared config and SSO, container or instance
/// metadata) is used. A configured user role is assumed on top of either.
pub async fn connect(settings: &ConnectionSettings) -> AwsEcsClient {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));

    match settings.static_credentials() {
        Some(credentials) => {
            info!("Creating AWS session using AWS_ACCESS_KEY");
            loader = loader.credentials_provider(credentials);
        }
        None => {
            info!(
                "No valid AWS access key and/or secret provided. Falling back to shared config..."
            );
        }
    }

    let base = loader.load().await;

    let config = match settings.user_role_arn.as_deref().filter(|arn| !arn.is_empty()) {
        Some(role_arn) => {
            info!("Assuming role {}", role_arn);
            let provider = AssumeRoleProvider::builder(role_arn)
                .session_name(SESSION_NAME)
                .configure(&base)
                .build()
                .await;
            aws_sdk_ecs::config::Builder::from(&base)
                .credentials_provider(provider)
                .build()
        }
        None => aws_sdk_ecs::config::Builder::from(&base).build(),
    };

    AwsEcsClient::new(aws_sdk_ecs::Client::from_conf(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_explicit_settings_win_over_fallbacks() {
        let settings = ConnectionSettings {
            access_key: Some("AKIA_EXPLICIT".to_string()),
            ..ConnectionSettings::new("eu-west-1")
        }
        .with_fallbacks(env(&[("ECS_ACCESS_KEY", "AKIA_ECS")]));

        assert_eq!(settings.access_key.as_deref(), Some("AKIA_EXPLICIT"));
    }

    #[test]
    fn test_ecs_alias_preferred_over_aws_alias() {
        let settings = ConnectionSettings::new("eu-west-1").with_fallbacks(env(&[
            ("ECS_SECRET_KEY", "ecs-secret"),
            ("AWS_SECRET_KEY", "aws-secret"),
            ("AWS_ACCESS_KEY", "AKIA_AWS"),
            ("AWS_USER_ROLE_ARN", "arn:aws:iam::1:role/deploy"),
        ]));

        assert_eq!(settings.secret_key.as_deref(), Some("ecs-secret"));
        assert_eq!(settings.access_key.as_deref(), Some("AKIA_AWS"));
        assert_eq!(
            settings.user_role_arn.as_deref(),
            Some("arn:aws:iam::1:role/deploy")
        );
        assert_eq!(settings.region, "eu-west-1");
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let settings = ConnectionSettings {
            access_key: Some(String::new()),
            ..ConnectionSettings::new("us-east-1")
        }
        .with_fallbacks(env(&[("ECS_ACCESS_KEY", ""), ("AWS_ACCESS_KEY", "AKIA_AWS")]));

        assert_eq!(settings.access_key.as_deref(), Some("AKIA_AWS"));
    }

    #[test]
    fn test_static_credentials_need_both_halves() {
        let mut settings = ConnectionSettings::new("eu-west-1");
        settings.access_key = Some("AKIA".to_string());
        assert!(settings.static_credentials().is_none());

        settings.secret_key = Some("secret".to_string());
        let credentials = settings.static_credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKIA");
    }
}

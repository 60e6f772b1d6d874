//! Configuration module
//!
//! Plugin settings, given as flags or `PLUGIN_*` environment variables.

use clap::Parser;
use clap::builder::BoolishValueParser;
use ecs_pilot_client::ConnectionSettings;

use crate::deploy::DeploySettings;

/// Service update plugin configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "ecs-pilot-deploy")]
#[command(about = "Roll a new image out to an ECS service", long_about = None)]
pub struct Config {
    /// AWS access key
    #[arg(long, short = 'a', env = "PLUGIN_ACCESS_KEY")]
    pub access_key: Option<String>,

    /// AWS secret key
    #[arg(long, short = 'k', env = "PLUGIN_SECRET_KEY")]
    pub secret_key: Option<String>,

    /// AWS role to assume
    #[arg(long, env = "PLUGIN_USER_ROLE_ARN")]
    pub user_role_arn: Option<String>,

    /// AWS region
    #[arg(long, short = 'r', env = "PLUGIN_REGION", default_value = "eu-west-1")]
    pub region: String,

    /// ECS cluster
    #[arg(long, short = 'c', env = "PLUGIN_CLUSTER", default_value = "")]
    pub cluster: String,

    /// ECS service to update
    #[arg(long, short = 's', env = "PLUGIN_SERVICE", default_value = "")]
    pub service: String,

    /// Container whose image is replaced
    #[arg(long, short = 'n', env = "PLUGIN_CONTAINER_NAME", default_value = "")]
    pub container_name: String,

    /// New image repository (keeps the current one when empty)
    #[arg(long, short = 'i', env = "PLUGIN_DOCKER_IMAGE", default_value = "")]
    pub docker_image: String,

    /// New image tag (keeps the current one when empty)
    #[arg(long, short = 't', env = "PLUGIN_TAG", default_value = "")]
    pub tag: String,

    /// Register an unchanged revision when the container is not found
    #[arg(long, env = "PLUGIN_IGNORE_MISSING_CONTAINER", value_parser = BoolishValueParser::new())]
    pub ignore_missing_container: bool,

    /// Restart the service tasks without touching the task definition
    #[arg(long, env = "PLUGIN_FORCE_NEW_DEPLOYMENT", value_parser = BoolishValueParser::new())]
    pub force_new_deployment: bool,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cluster.is_empty() || self.service.is_empty() {
            anyhow::bail!("You need to provide both cluster and service parameters");
        }
        Ok(())
    }

    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            region: self.region.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            user_role_arn: self.user_role_arn.clone(),
        }
        .with_env_fallbacks()
    }

    pub fn deploy_settings(&self) -> DeploySettings {
        let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());

        DeploySettings {
            cluster: self.cluster.clone(),
            service: self.service.clone(),
            container_name: self.container_name.clone(),
            docker_image: non_empty(&self.docker_image),
            tag: non_empty(&self.tag),
            ignore_missing_container: self.ignore_missing_container,
            force_new_deployment: self.force_new_deployment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = Config::try_parse_from(["ecs-pilot-deploy", "--cluster", "prod"]).unwrap();
        assert!(config.validate().is_err());

        let config =
            Config::try_parse_from(["ecs-pilot-deploy", "-c", "prod", "-s", "api"]).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.region, "eu-west-1");
    }

    #[test]
    fn test_empty_image_settings_keep_current_values() {
        let config = Config::try_parse_from([
            "ecs-pilot-deploy",
            "-c",
            "prod",
            "-s",
            "api",
            "-n",
            "web",
            "-t",
            "v2",
        ])
        .unwrap();

        let settings = config.deploy_settings();
        assert_eq!(settings.docker_image, None);
        assert_eq!(settings.tag.as_deref(), Some("v2"));
        assert_eq!(settings.container_name, "web");
    }
}

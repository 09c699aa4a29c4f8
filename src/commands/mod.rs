//! Cloud resource commands built on the mapping engine.
//!
//! Each command is a small piece of configuration over [`crate::mapping`]:
//! a mapping table or an explicit setter list, the remote call to make, and
//! where the resulting identifier lives in the response.

mod alarm;
mod containers;
mod image;
mod instance;
mod registry;
mod tags;

pub use alarm::CreateAlarm;
pub use containers::StartContainers;
pub use image::{DeleteImage, DeleteSnapshot};
pub use instance::{CreateInstance, instance_state_checker};
pub use registry::CommandRegistry;
pub use tags::CreateTags;

use crate::config::Config;
use crate::mapping::{CoercionContext, MappingError, MappingResult, Params};
use crate::provider::{ApiImageCatalog, CloudApi};
use crate::resolver::Resolver;
use crate::retry::RetryPolicy;
use crate::traits::Output;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Declared parameter of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: false,
            description,
        }
    }
}

/// Everything a command needs to talk to the provider
pub struct Cloud {
    api: Arc<dyn CloudApi>,
    resolver: Resolver,
    retry: RetryPolicy,
    output: Arc<dyn Output>,
    check_timeout: Duration,
    check_interval: Duration,
}

impl Cloud {
    pub fn new(api: Arc<dyn CloudApi>, output: Arc<dyn Output>, config: &Config) -> Self {
        let catalog = Arc::new(ApiImageCatalog::new(Arc::clone(&api)));
        Self {
            resolver: Resolver::new(catalog, config.image_cache.capacity, config.image_cache_ttl()),
            retry: RetryPolicy::new(config.retry.max_attempts, config.retry_base_delay())
                .on_any_status(),
            check_timeout: config.checker_timeout(),
            check_interval: config.checker_interval(),
            api,
            output,
        }
    }

    pub fn api(&self) -> &dyn CloudApi {
        self.api.as_ref()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn output(&self) -> &dyn Output {
        self.output.as_ref()
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }
}

/// A resource/action pair exposed to users
pub trait CloudCommand: Send + Sync {
    /// Command name, e.g. `create-instance`
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn params(&self) -> &'static [ParamSpec];

    /// Build the provider request document without calling the provider
    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value>;

    /// Perform the command and return the identifier of the affected resource
    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud)
    -> MappingResult<String>;
}

/// Reject parameter maps missing a required parameter
pub fn check_required(command: &dyn CloudCommand, params: &Params) -> MappingResult<()> {
    for spec in command.params().iter().filter(|spec| spec.required) {
        match params.get(spec.name) {
            None | Some(Value::Null) => {
                return Err(MappingError::MissingParameter(spec.name.to_string()));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::provider::MockCloudApi;
    use crate::traits::{MockFileSystem, MockHttpClient, MockOutput};

    pub fn params(value: Value) -> Params {
        serde_json::from_value(value).unwrap()
    }

    pub fn ctx() -> CoercionContext {
        CoercionContext::new(Arc::new(MockFileSystem::new()), Arc::new(MockHttpClient::new()))
    }

    pub fn cloud(api: Arc<MockCloudApi>) -> Cloud {
        cloud_with_output(api, Arc::new(MockOutput::new()))
    }

    pub fn cloud_with_output(api: Arc<MockCloudApi>, output: Arc<MockOutput>) -> Cloud {
        let mut config = Config::default();
        config.retry.base_delay_millis = 1;
        config.checker.interval_secs = 0;
        config.checker.timeout_secs = 2;
        Cloud::new(api, output, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::params;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_required() {
        let command = DeleteSnapshot::new().unwrap();

        assert!(check_required(&command, &params(json!({"id": "snap-1"}))).is_ok());

        let err = check_required(&command, &params(json!({"id": null}))).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter 'id'");
    }
}

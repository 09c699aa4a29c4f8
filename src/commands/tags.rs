use super::{Cloud, CloudCommand, ParamSpec};
use crate::mapping::{CallExecutor, CoercionContext, MappingResult, MappingTable, Params, TypeTag};
use crate::provider::CreateTagsInput;
use serde_json::Value;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("resource", "Resource ids to tag"),
    ParamSpec::required("tags", "Tags as key:value"),
];

/// `create-tags`, retried while the provider throttles
pub struct CreateTags {
    table: MappingTable,
}

impl CreateTags {
    pub fn new() -> MappingResult<Self> {
        Ok(Self {
            table: MappingTable::builder(CreateTagsInput::shape())
                .map("resource", "Resources", TypeTag::StringSlice)
                .map("tags", "Tags", TypeTag::Tags)
                .build()?,
        })
    }
}

impl CloudCommand for CreateTags {
    fn name(&self) -> &'static str {
        "create-tags"
    }

    fn description(&self) -> &'static str {
        "Add or overwrite tags on resources"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value> {
        let mut request = self.table.new_request();
        self.table.inject(params, &mut request, ctx)?;
        Ok(request.to_value())
    }

    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud) -> MappingResult<String> {
        let mut resources = Vec::new();
        CallExecutor::new("CreateTags")
            .with_setters(self.table.setters(params))
            .execute(self.table.new_request(), ctx, |input: CreateTagsInput| {
                resources = input.resources.clone();
                cloud
                    .retry()
                    .run("CreateTags", || cloud.api().create_tags(input.clone()))
            })?;
        Ok(resources.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{cloud, ctx, params};
    use crate::mapping::MappingError;
    use crate::provider::{MockCloudApi, ProviderError};
    use serde_json::json;
    use std::sync::Arc;

    fn throttled() -> ProviderError {
        ProviderError::new(503, "RequestLimitExceeded", "rate exceeded")
    }

    #[test]
    fn test_render_tags() {
        let command = CreateTags::new().unwrap();

        let document = command
            .render(
                &params(json!({"resource": "i-1", "tags": ["env:prod", "url:http://x"]})),
                &mut ctx(),
            )
            .unwrap();

        assert_eq!(
            document,
            json!({
                "Resources": ["i-1"],
                "Tags": [{"Key": "env", "Value": "prod"}, {"Key": "url", "Value": "http://x"}]
            })
        );
    }

    #[test]
    fn test_malformed_tag_names_element() {
        let command = CreateTags::new().unwrap();

        let err = command
            .render(&params(json!({"resource": "i-1", "tags": ["env:prod", "broken"]})), &mut ctx())
            .unwrap_err();

        assert!(matches!(err, MappingError::Parameter { .. }));
        assert!(err.to_string().contains("'broken'"), "{}", err);
    }

    #[test]
    fn test_retries_throttled_calls() {
        let api = Arc::new(
            MockCloudApi::new()
                .fail_with("CreateTags", throttled())
                .fail_with("CreateTags", throttled()),
        );
        let command = CreateTags::new().unwrap();

        let id = command
            .run(
                &params(json!({"resource": ["i-1", "i-2"], "tags": "env:prod"})),
                &mut ctx(),
                &cloud(api.clone()),
            )
            .unwrap();

        assert_eq!(id, "i-1,i-2");
        assert_eq!(api.calls_to("CreateTags").len(), 3);
    }

    #[test]
    fn test_gives_up_after_five_attempts() {
        let mut api = MockCloudApi::new();
        for _ in 0..6 {
            api = api.fail_with("CreateTags", throttled());
        }
        let api = Arc::new(api);
        let command = CreateTags::new().unwrap();

        let err = command
            .run(
                &params(json!({"resource": "i-1", "tags": "env:prod"})),
                &mut ctx(),
                &cloud(api.clone()),
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "CreateTags: RequestLimitExceeded: rate exceeded");
        assert_eq!(api.calls_to("CreateTags").len(), 5);
    }
}

use super::{Cloud, CloudCommand, ParamSpec};
use crate::checker::{Checker, NOT_FOUND_STATE};
use crate::mapping::{
    CallExecutor, CoercionContext, FieldPath, MappingError, MappingResult, MappingTable, Params,
    Request, Setter, TypeTag, extract_id, populate,
};
use crate::provider::{
    CloudApi, CreateTagsInput, DescribeInstancesInput, ProviderResult, RunInstancesInput,
};
use crate::resolver::ImageQuery;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("image", "Image id, or an image query such as canonical:ubuntu:jammy"),
    ParamSpec::optional("type", "Instance type"),
    ParamSpec::optional("count", "Number of instances (default 1)"),
    ParamSpec::optional("keypair", "Key pair name"),
    ParamSpec::optional("subnet", "Subnet id"),
    ParamSpec::optional("ip", "Private IP address"),
    ParamSpec::optional("securitygroup", "Security group ids"),
    ParamSpec::optional("userdata", "User data file, URL or #inline script (templated)"),
    ParamSpec::optional("role", "Instance profile name"),
    ParamSpec::optional("lock", "Protect against API termination"),
    ParamSpec::optional("name", "Value of the Name tag"),
    ParamSpec::optional("wait", "Wait until the instance is running"),
];

/// `create-instance`: tag-driven injection into `RunInstancesInput`
pub struct CreateInstance {
    table: MappingTable,
    id_path: FieldPath,
}

impl CreateInstance {
    pub fn new() -> MappingResult<Self> {
        let table = MappingTable::builder(RunInstancesInput::shape())
            .map("image", "ImageId", TypeTag::Str)
            .map("type", "InstanceType", TypeTag::Str)
            .map("count", "MinCount,MaxCount", TypeTag::Int64)
            .map("keypair", "KeyName", TypeTag::Str)
            .map("subnet", "SubnetId", TypeTag::Str)
            .map("ip", "PrivateIpAddress", TypeTag::Str)
            .map("securitygroup", "SecurityGroupIds", TypeTag::StringSlice)
            .map("userdata", "UserData", TypeTag::UserDataToBase64)
            .map("role", "IamInstanceProfile.Name", TypeTag::Str)
            .map("lock", "DisableApiTermination", TypeTag::BoolAttribute)
            .build()?;

        Ok(Self {
            table,
            id_path: FieldPath::parse("Instances[0]InstanceId")?,
        })
    }

    fn with_defaults(params: &Params) -> Params {
        let mut params = params.clone();
        if params.get("count").is_none_or(Value::is_null) {
            params.insert("count".to_string(), json!(1));
        }
        params
    }

    fn executor(&self, params: &Params) -> CallExecutor {
        CallExecutor::new("RunInstances").with_setters(self.table.setters(params))
    }
}

impl CloudCommand for CreateInstance {
    fn name(&self) -> &'static str {
        "create-instance"
    }

    fn description(&self) -> &'static str {
        "Launch an instance"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value> {
        let params = Self::with_defaults(params);
        let mut request = self.table.new_request();
        self.executor(&params).prepare(&mut request, ctx)?;
        Ok(request.to_value())
    }

    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud) -> MappingResult<String> {
        let mut params = Self::with_defaults(params);

        let image = params.get("image").and_then(Value::as_str).map(str::to_string);
        if let Some(image) = image.filter(|image| !image.starts_with("ami-")) {
            let id = resolve_image(cloud, &image).map_err(|e| e.for_parameter("image"))?;
            cloud.output().info(&format!("Image {} resolved to {}", image, id));
            params.insert("image".to_string(), Value::String(id));
        }

        let output = self.executor(&params).execute(
            self.table.new_request(),
            ctx,
            |input: RunInstancesInput| cloud.api().run_instances(input),
        )?;
        let id = extract_id(&output, &self.id_path)?;

        let name: Option<String> = populate(&params, "name", ctx)?;
        if let Some(name) = name {
            CallExecutor::new("CreateTags")
                .with_setters(vec![
                    Setter::new(id.clone(), "Resources", TypeTag::StringSlice)?,
                    Setter::new(format!("Name:{}", name), "Tags", TypeTag::Tags)?,
                ])
                .execute(
                    Request::new(Arc::new(CreateTagsInput::shape())),
                    ctx,
                    |input: CreateTagsInput| {
                        cloud
                            .retry()
                            .run("CreateTags", || cloud.api().create_tags(input.clone()))
                    },
                )?;
            cloud.output().success(&format!("Tagged {} with Name={}", id, name));
        }

        let wait: Option<bool> = populate(&params, "wait", ctx)?;
        if wait.unwrap_or(false) {
            instance_state_checker(cloud.api(), &id, "running")
                .timeout(cloud.check_timeout())
                .interval(cloud.check_interval())
                .check(cloud.output())?;
        }

        Ok(id)
    }
}

fn resolve_image(cloud: &Cloud, image: &str) -> MappingResult<String> {
    let query: ImageQuery = image.parse()?;
    let (records, from_cache) = cloud.resolver().resolve(&query)?;
    let record = records
        .first()
        .ok_or_else(|| MappingError::Resolve(format!("no image found for '{}'", query)))?;
    info!(query = %query, image = %record.id, from_cache, "resolved image");
    Ok(record.id.clone())
}

/// Checker waiting for instance `instance_id` to reach `expected`.
///
/// A missing instance reports the `not-found` state, so waiting for
/// termination and waiting for creation use the same checker.
pub fn instance_state_checker<'a>(
    api: &'a dyn CloudApi,
    instance_id: &'a str,
    expected: &str,
) -> Checker<impl FnMut() -> ProviderResult<String> + 'a> {
    Checker::new(format!("instance {}", instance_id), expected, move || {
        let output = api.describe_instances(DescribeInstancesInput {
            instance_ids: vec![instance_id.to_string()],
        });
        match output {
            Ok(output) => Ok(output
                .instances
                .into_iter()
                .find(|instance| instance.instance_id == instance_id)
                .and_then(|instance| instance.state)
                .map(|state| state.name)
                .unwrap_or_else(|| NOT_FOUND_STATE.to_string())),
            Err(e) if e.is_not_found() => Ok(NOT_FOUND_STATE.to_string()),
            Err(e) => Err(e),
        }
    })
}

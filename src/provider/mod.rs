//! Remote call boundary.
//!
//! Typed request and response structs for the operations the bundled
//! commands use, in the provider's PascalCase wire naming, plus the
//! [`CloudApi`] trait standing in for the vendor SDK client.

use crate::mapping::StructShape;
use crate::resolver::{CatalogFilter, ImageCatalog, ImageRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error returned by the provider: HTTP status plus provider error code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// `InvalidInstanceID.NotFound`, `ClusterNotFoundException`, plain 404...
    pub fn is_not_found(&self) -> bool {
        self.status == 404 || self.code.contains("NotFound")
    }

    /// Throttling and server-side failures
    pub fn is_retryable(&self) -> bool {
        self.status == 429
            || self.status >= 500
            || matches!(
                self.code.as_str(),
                "Throttling" | "RequestLimitExceeded" | "ServiceUnavailable"
            )
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeBooleanValue {
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamInstanceProfileSpecification {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunInstancesInput {
    pub image_id: String,
    pub min_count: i64,
    pub max_count: i64,
    pub instance_type: Option<String>,
    pub key_name: Option<String>,
    pub subnet_id: Option<String>,
    pub private_ip_address: Option<String>,
    pub security_group_ids: Option<Vec<String>>,
    pub user_data: Option<String>,
    pub iam_instance_profile: Option<IamInstanceProfileSpecification>,
    pub disable_api_termination: Option<AttributeBooleanValue>,
}

impl RunInstancesInput {
    pub fn shape() -> StructShape {
        StructShape::new("RunInstancesInput")
            .leaves(&[
                "ImageId",
                "MinCount",
                "MaxCount",
                "InstanceType",
                "KeyName",
                "SubnetId",
                "PrivateIpAddress",
                "SecurityGroupIds",
                "UserData",
                "DisableApiTermination",
            ])
            .structure(
                "IamInstanceProfile",
                StructShape::new("IamInstanceProfileSpecification").leaf("Name"),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceState {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: String,
    pub state: Option<InstanceState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunInstancesOutput {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesInput {
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesOutput {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTagsInput {
    pub resources: Vec<String>,
    pub tags: Vec<Tag>,
}

impl CreateTagsInput {
    pub fn shape() -> StructShape {
        StructShape::new("CreateTagsInput").leaves(&["Resources", "Tags"])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EbsBlockDevice {
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockDeviceMapping {
    pub device_name: Option<String>,
    pub ebs: Option<EbsBlockDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    pub image_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub virtualization_type: String,
    #[serde(default)]
    pub root_device_type: String,
    pub creation_date: Option<String>,
    #[serde(default)]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
}

impl Image {
    pub fn snapshot_ids(&self) -> Vec<String> {
        self.block_device_mappings
            .iter()
            .filter_map(|m| m.ebs.as_ref()?.snapshot_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeImagesInput {
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    pub name_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeImagesOutput {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeregisterImageInput {
    pub image_id: String,
}

impl DeregisterImageInput {
    pub fn shape() -> StructShape {
        StructShape::new("DeregisterImageInput").leaf("ImageId")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteSnapshotInput {
    pub snapshot_id: String,
}

impl DeleteSnapshotInput {
    pub fn shape() -> StructShape {
        StructShape::new("DeleteSnapshotInput").leaf("SnapshotId")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateServiceInput {
    pub cluster: String,
    pub service: String,
    pub desired_count: Option<i64>,
    pub task_definition: Option<String>,
}

impl UpdateServiceInput {
    pub fn shape() -> StructShape {
        StructShape::new("UpdateServiceInput").leaves(&[
            "Cluster",
            "Service",
            "DesiredCount",
            "TaskDefinition",
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    pub service_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateServiceOutput {
    pub service: Option<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunTaskInput {
    pub cluster: String,
    pub task_definition: String,
    pub count: Option<i64>,
    pub started_by: Option<String>,
}

impl RunTaskInput {
    pub fn shape() -> StructShape {
        StructShape::new("RunTaskInput").leaves(&["Cluster", "TaskDefinition", "Count", "StartedBy"])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub task_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunTaskOutput {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricAlarmInput {
    pub alarm_name: String,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: String,
    pub comparison_operator: String,
    pub threshold: f64,
    pub evaluation_periods: i64,
    pub period: i64,
    pub alarm_description: Option<String>,
    pub dimensions: Option<Vec<Dimension>>,
    pub alarm_actions: Option<Vec<String>>,
}

impl PutMetricAlarmInput {
    pub fn shape() -> StructShape {
        StructShape::new("PutMetricAlarmInput").leaves(&[
            "AlarmName",
            "MetricName",
            "Namespace",
            "Statistic",
            "ComparisonOperator",
            "Threshold",
            "EvaluationPeriods",
            "Period",
            "AlarmDescription",
            "Dimensions",
            "AlarmActions",
        ])
    }
}

/// Provider client used by commands
pub trait CloudApi: Send + Sync {
    fn run_instances(&self, input: RunInstancesInput) -> ProviderResult<RunInstancesOutput>;
    fn describe_instances(
        &self,
        input: DescribeInstancesInput,
    ) -> ProviderResult<DescribeInstancesOutput>;
    fn create_tags(&self, input: CreateTagsInput) -> ProviderResult<()>;
    fn describe_images(&self, input: DescribeImagesInput) -> ProviderResult<DescribeImagesOutput>;
    fn deregister_image(&self, input: DeregisterImageInput) -> ProviderResult<()>;
    fn delete_snapshot(&self, input: DeleteSnapshotInput) -> ProviderResult<()>;
    fn update_service(&self, input: UpdateServiceInput) -> ProviderResult<UpdateServiceOutput>;
    fn run_task(&self, input: RunTaskInput) -> ProviderResult<RunTaskOutput>;
    fn put_metric_alarm(&self, input: PutMetricAlarmInput) -> ProviderResult<()>;
}

/// Image catalog backed by the provider's image listing
pub struct ApiImageCatalog {
    api: Arc<dyn CloudApi>,
}

impl ApiImageCatalog {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }
}

impl ImageCatalog for ApiImageCatalog {
    fn fetch(&self, filter: &CatalogFilter) -> Result<Vec<ImageRecord>> {
        let output = self.api.describe_images(DescribeImagesInput {
            image_ids: Vec::new(),
            owners: vec![filter.owner_id.clone()],
            name_pattern: Some(filter.name_pattern.clone()),
        })?;

        output
            .images
            .into_iter()
            .map(|image| {
                let created_at = match &image.creation_date {
                    Some(date) => DateTime::parse_from_rfc3339(date)
                        .with_context(|| {
                            format!("Invalid creation date for {}: {}", image.image_id, date)
                        })?
                        .with_timezone(&Utc),
                    None => DateTime::<Utc>::default(),
                };
                Ok(ImageRecord {
                    id: image.image_id,
                    name: image.name,
                    owner_id: image.owner_id,
                    architecture: image.architecture,
                    virtualization: image.virtualization_type,
                    store: image.root_device_type,
                    created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub use mock::MockCloudApi;

#[cfg(test)]
mod mock {
    use super::*;
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// In-memory provider recording every call.
    ///
    /// Responses are queued per operation name; an operation with nothing
    /// queued answers with its output type's default.
    #[derive(Default)]
    pub struct MockCloudApi {
        responses: Mutex<HashMap<String, VecDeque<ProviderResult<Value>>>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl MockCloudApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond_with(self, operation: &str, response: Value) -> Self {
            self.queue(operation, Ok(response));
            self
        }

        pub fn fail_with(self, operation: &str, error: ProviderError) -> Self {
            self.queue(operation, Err(error));
            self
        }

        fn queue(&self, operation: &str, response: ProviderResult<Value>) {
            self.responses
                .lock()
                .unwrap()
                .entry(operation.to_string())
                .or_default()
                .push_back(response);
        }

        pub fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, operation: &str) -> Vec<Value> {
            self.calls()
                .into_iter()
                .filter(|(name, _)| name == operation)
                .map(|(_, input)| input)
                .collect()
        }

        fn respond<I, O>(&self, operation: &str, input: &I) -> ProviderResult<O>
        where
            I: Serialize,
            O: DeserializeOwned + Default,
        {
            self.calls.lock().unwrap().push((
                operation.to_string(),
                serde_json::to_value(input).unwrap(),
            ));

            let next = self
                .responses
                .lock()
                .unwrap()
                .get_mut(operation)
                .and_then(VecDeque::pop_front);

            match next {
                None => Ok(O::default()),
                Some(Ok(value)) => Ok(serde_json::from_value(value).unwrap()),
                Some(Err(e)) => Err(e),
            }
        }
    }

    impl CloudApi for MockCloudApi {
        fn run_instances(&self, input: RunInstancesInput) -> ProviderResult<RunInstancesOutput> {
            self.respond("RunInstances", &input)
        }

        fn describe_instances(
            &self,
            input: DescribeInstancesInput,
        ) -> ProviderResult<DescribeInstancesOutput> {
            self.respond("DescribeInstances", &input)
        }

        fn create_tags(&self, input: CreateTagsInput) -> ProviderResult<()> {
            self.respond("CreateTags", &input)
        }

        fn describe_images(
            &self,
            input: DescribeImagesInput,
        ) -> ProviderResult<DescribeImagesOutput> {
            self.respond("DescribeImages", &input)
        }

        fn deregister_image(&self, input: DeregisterImageInput) -> ProviderResult<()> {
            self.respond("DeregisterImage", &input)
        }

        fn delete_snapshot(&self, input: DeleteSnapshotInput) -> ProviderResult<()> {
            self.respond("DeleteSnapshot", &input)
        }

        fn update_service(&self, input: UpdateServiceInput) -> ProviderResult<UpdateServiceOutput> {
            self.respond("UpdateService", &input)
        }

        fn run_task(&self, input: RunTaskInput) -> ProviderResult<RunTaskOutput> {
            self.respond("RunTask", &input)
        }

        fn put_metric_alarm(&self, input: PutMetricAlarmInput) -> ProviderResult<()> {
            self.respond("PutMetricAlarm", &input)
        }
    }
}

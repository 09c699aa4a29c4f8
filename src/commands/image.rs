use super::{Cloud, CloudCommand, ParamSpec};
use crate::mapping::{
    CallExecutor, CoercionContext, MappingError, MappingResult, MappingTable, Params, TypeTag,
    populate,
};
use crate::provider::{DeleteSnapshotInput, DeregisterImageInput, DescribeImagesInput};
use serde_json::{Value, json};
use tracing::debug;

const SNAPSHOT_PARAMS: &[ParamSpec] = &[ParamSpec::required("id", "Snapshot id")];

const IMAGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("id", "Image id"),
    ParamSpec::optional("delete-snapshots", "Also delete the snapshots backing the image"),
];

/// `delete-snapshot`
pub struct DeleteSnapshot {
    table: MappingTable,
}

impl DeleteSnapshot {
    pub fn new() -> MappingResult<Self> {
        Ok(Self {
            table: MappingTable::builder(DeleteSnapshotInput::shape())
                .map("id", "SnapshotId", TypeTag::Str)
                .build()?,
        })
    }
}

impl CloudCommand for DeleteSnapshot {
    fn name(&self) -> &'static str {
        "delete-snapshot"
    }

    fn description(&self) -> &'static str {
        "Delete a block storage snapshot"
    }

    fn params(&self) -> &'static [ParamSpec] {
        SNAPSHOT_PARAMS
    }

    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value> {
        let mut request = self.table.new_request();
        self.table.inject(params, &mut request, ctx)?;
        Ok(request.to_value())
    }

    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud) -> MappingResult<String> {
        let mut snapshot_id = String::new();
        CallExecutor::new("DeleteSnapshot")
            .with_setters(self.table.setters(params))
            .execute(self.table.new_request(), ctx, |input: DeleteSnapshotInput| {
                snapshot_id = input.snapshot_id.clone();
                cloud.api().delete_snapshot(input)
            })?;
        Ok(snapshot_id)
    }
}

/// `delete-image`: deregister an image, then optionally delete its
/// snapshots through `delete-snapshot`. The first failure aborts.
pub struct DeleteImage {
    table: MappingTable,
    delete_snapshot: DeleteSnapshot,
}

impl DeleteImage {
    pub fn new() -> MappingResult<Self> {
        Ok(Self {
            table: MappingTable::builder(DeregisterImageInput::shape())
                .map("id", "ImageId", TypeTag::Str)
                .build()?,
            delete_snapshot: DeleteSnapshot::new()?,
        })
    }

    fn snapshot_ids(&self, image_id: &str, cloud: &Cloud) -> MappingResult<Vec<String>> {
        let output = cloud
            .api()
            .describe_images(DescribeImagesInput {
                image_ids: vec![image_id.to_string()],
                ..Default::default()
            })
            .map_err(|e| MappingError::RemoteCall {
                call: "DescribeImages".to_string(),
                message: e.to_string(),
            })?;

        Ok(output
            .images
            .iter()
            .filter(|image| image.image_id == image_id)
            .flat_map(|image| image.snapshot_ids())
            .collect())
    }
}

impl CloudCommand for DeleteImage {
    fn name(&self) -> &'static str {
        "delete-image"
    }

    fn description(&self) -> &'static str {
        "Deregister a machine image"
    }

    fn params(&self) -> &'static [ParamSpec] {
        IMAGE_PARAMS
    }

    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value> {
        let mut request = self.table.new_request();
        self.table.inject(params, &mut request, ctx)?;
        Ok(request.to_value())
    }

    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud) -> MappingResult<String> {
        let image_id: Option<String> = populate(params, "id", ctx)?;
        let image_id = image_id.ok_or_else(|| MappingError::MissingParameter("id".to_string()))?;
        let delete_snapshots: Option<bool> = populate(params, "delete-snapshots", ctx)?;

        // snapshots are no longer listed once the image is gone
        let snapshots = if delete_snapshots.unwrap_or(false) {
            self.snapshot_ids(&image_id, cloud)?
        } else {
            Vec::new()
        };

        CallExecutor::new("DeregisterImage")
            .with_setters(self.table.setters(params))
            .execute(self.table.new_request(), ctx, |input: DeregisterImageInput| {
                cloud.api().deregister_image(input)
            })?;

        for snapshot in snapshots {
            debug!(image = %image_id, snapshot = %snapshot, "deleting image snapshot");
            self.delete_snapshot
                .run(&Params::from([("id".to_string(), json!(snapshot))]), ctx, cloud)?;
        }

        Ok(image_id)
    }
}

use super::{Cloud, CloudCommand, ParamSpec};
use crate::mapping::{
    CallExecutor, CoercionContext, FieldPath, FromParams, MappingError, MappingResult, Params,
    Request, Setter, TypeTag, extract_id, populate,
};
use crate::provider::{RunTaskInput, UpdateServiceInput};
use serde_json::Value;
use std::sync::Arc;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("cluster", "Cluster name"),
    ParamSpec::required("type", "'service' or 'task'"),
    ParamSpec::required("name", "Service name, or task definition for tasks"),
    ParamSpec::optional("count", "Desired number of containers (default 1)"),
];

const STARTED_BY: &str = "cloudmap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeploymentKind {
    Service,
    Task,
}

/// The command's own fields, filled from the parameter map
#[derive(Debug)]
struct StartContainersParams {
    cluster: Option<String>,
    kind: Option<String>,
    name: Option<String>,
    count: Option<i64>,
}

impl FromParams for StartContainersParams {
    fn from_params(params: &Params, ctx: &mut CoercionContext) -> MappingResult<Self> {
        Ok(Self {
            cluster: populate(params, "cluster", ctx)?,
            kind: populate(params, "type", ctx)?,
            name: populate(params, "name", ctx)?,
            count: populate(params, "count", ctx)?,
        })
    }
}

impl StartContainersParams {
    fn kind(&self) -> MappingResult<DeploymentKind> {
        match self.kind.as_deref() {
            Some("service") => Ok(DeploymentKind::Service),
            Some("task") => Ok(DeploymentKind::Task),
            other => Err(MappingError::coercion(
                other.unwrap_or_default(),
                "one of: service, task",
            )
            .for_parameter("type")),
        }
    }
}

/// `start-containers`: the request type and its setters depend on `type`
pub struct StartContainers {
    service_path: FieldPath,
    task_path: FieldPath,
}

impl StartContainers {
    pub fn new() -> MappingResult<Self> {
        Ok(Self {
            service_path: FieldPath::parse("Service.ServiceArn")?,
            task_path: FieldPath::parse("Tasks[0]TaskArn")?,
        })
    }

    fn plan(
        params: &Params,
        ctx: &mut CoercionContext,
    ) -> MappingResult<(DeploymentKind, CallExecutor, Request)> {
        let own = StartContainersParams::from_params(params, ctx)?;
        let kind = own.kind()?;
        let count = own.count.unwrap_or(1);

        let (executor, request) = match kind {
            DeploymentKind::Service => (
                CallExecutor::new("UpdateService").with_setters(vec![
                    Setter::optional(own.cluster, "Cluster", TypeTag::Str)?.for_param("cluster"),
                    Setter::optional(own.name, "Service", TypeTag::Str)?.for_param("name"),
                    Setter::new(count, "DesiredCount", TypeTag::Int64)?.for_param("count"),
                ]),
                Request::new(Arc::new(UpdateServiceInput::shape())),
            ),
            DeploymentKind::Task => (
                CallExecutor::new("RunTask").with_setters(vec![
                    Setter::optional(own.cluster, "Cluster", TypeTag::Str)?.for_param("cluster"),
                    Setter::optional(own.name, "TaskDefinition", TypeTag::Str)?.for_param("name"),
                    Setter::new(count, "Count", TypeTag::Int64)?.for_param("count"),
                    Setter::new(STARTED_BY, "StartedBy", TypeTag::Str)?,
                ]),
                Request::new(Arc::new(RunTaskInput::shape())),
            ),
        };
        Ok((kind, executor, request))
    }
}

impl CloudCommand for StartContainers {
    fn name(&self) -> &'static str {
        "start-containers"
    }

    fn description(&self) -> &'static str {
        "Scale up a container service or run a one-off task"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn render(&self, params: &Params, ctx: &mut CoercionContext) -> MappingResult<Value> {
        let (_, executor, mut request) = Self::plan(params, ctx)?;
        executor.prepare(&mut request, ctx)?;
        Ok(request.to_value())
    }

    fn run(&self, params: &Params, ctx: &mut CoercionContext, cloud: &Cloud) -> MappingResult<String> {
        let (kind, executor, request) = Self::plan(params, ctx)?;

        match kind {
            DeploymentKind::Service => {
                let output = executor.execute(request, ctx, |input: UpdateServiceInput| {
                    cloud.api().update_service(input)
                })?;
                extract_id(&output, &self.service_path)
            }
            DeploymentKind::Task => {
                let output = executor.execute(request, ctx, |input: RunTaskInput| {
                    cloud.api().run_task(input)
                })?;
                extract_id(&output, &self.task_path)
            }
        }
    }
}

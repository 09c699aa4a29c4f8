use super::{Cloud, CloudCommand, ParamSpec};
use crate::mapping::{CallExecutor, CoercionContext, MappingResult, MappingTable, Params, TypeTag};
use crate::provider::PutMetricAlarmInput;
use serde_json::Value;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("name", "Alarm name"),
    ParamSpec::required("metric", "Metric name"),
    ParamSpec::required("namespace", "Metric namespace"),
    ParamSpec::required("statistic", "SampleCount, Average, Sum, Minimum or Maximum"),
    ParamSpec::required("operator", "Comparison operator"),
    ParamSpec::required("threshold", "Threshold value"),
    ParamSpec::required("evaluation-periods", "Periods compared to the threshold"),
    ParamSpec::required("period", "Period in seconds"),
    ParamSpec::optional("description", "Alarm description"),
    ParamSpec::optional("dimensions", "Metric dimensions as name:value"),
    ParamSpec::optional("alarm-actions", "Actions to run when entering ALARM"),
];

/// `create-alarm`
pub struct CreateAlarm {
    table: MappingTable,
}

impl CreateAlarm {
    pub fn new() -> MappingResult<Self> {
        Ok(Self {
            table: MappingTable::builder(PutMetricAlarmInput::shape())
                .map("name", "AlarmName", TypeTag::Str)
                .map("metric", "MetricName", TypeTag::Str)
                .map("namespace", "Namespace", TypeTag::Str)
                .map("statistic", "Statistic", TypeTag::Str)
                .map("operator", "ComparisonOperator", TypeTag::Str)
                .map("threshold", "Threshold", TypeTag::Float)
                .map("evaluation-periods", "EvaluationPeriods", TypeTag::Int64)
                .map("period", "Period", TypeTag::Int64)
                .map("description", "AlarmDescription", TypeTag::Str)
                .map("dimensions", "Dimensions", TypeTag::Dimensions)
                .map("alarm-actions", "AlarmActions", TypeTag::StringSlice)
                .build()?,
        })
    }
}

impl CloudCommand for CreateAlarm {
    fn name(&self) -> &'static str {
        "create-alarm"
    }

    fn description(&self) -> &'static str {
        "Create or update a metric alarm"
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
        let mut alarm_name = String::new();
        CallExecutor::new("PutMetricAlarm")
            .with_setters(self.table.setters(params))
            .execute(self.table.new_request(), ctx, |input: PutMetricAlarmInput| {
                alarm_name = input.alarm_name.clone();
                cloud.api().put_metric_alarm(input)
            })?;
        Ok(alarm_name)
    }
}

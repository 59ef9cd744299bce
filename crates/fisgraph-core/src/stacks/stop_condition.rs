//! `StopCond`: the CloudWatch alarm every experiment stops on.

use crate::primitives::{EXPORT_STOP_CONDITION_ARN, UNIT_STOP_CONDITION};
use crate::resources::{AlarmSpec, Resource};
use crate::unit::{Materialized, ProvisioningUnit, UnitContext};
use crate::FisgraphError;

const ALARM_NAME: &str = "NetworkInAbnormal";

pub fn unit() -> ProvisioningUnit {
    ProvisioningUnit::new(UNIT_STOP_CONDITION, materialize).output(
        EXPORT_STOP_CONDITION_ARN,
        "The Arn of the Stop-Condition CloudWatch Alarm",
    )
}

/// Fires when inbound EC2 traffic drops below 10 bytes over one minute.
fn materialize(ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
    let deployment = ctx.deployment();
    let arn = format!(
        "arn:aws:cloudwatch:{}:{}:alarm:{}",
        deployment.region, deployment.account, ALARM_NAME
    );

    Ok(Materialized::new()
        .output(EXPORT_STOP_CONDITION_ARN, arn.clone())
        .resource(Resource::Alarm(AlarmSpec {
            logical_id: "cw-alarm".to_string(),
            alarm_name: ALARM_NAME.to_string(),
            arn,
            namespace: "AWS/EC2".to_string(),
            metric_name: "NetworkIn".to_string(),
            period_seconds: 60,
            threshold: 10,
            evaluation_periods: 1,
            datapoints_to_alarm: 1,
            comparison_operator: "LessThanThreshold".to_string(),
            treat_missing_data: "notBreaching".to_string(),
        })))
}

//! `FisLogs`: the CloudWatch log group and S3 bucket experiments log to.

use crate::primitives::{
    EXPORT_LOG_GROUP_ARN, EXPORT_S3_BUCKET_ARN, EXPORT_S3_BUCKET_NAME, UNIT_LOGS,
};
use crate::resources::{BucketSpec, LogGroupSpec, Resource};
use crate::unit::{Materialized, ProvisioningUnit, UnitContext};
use crate::FisgraphError;

pub fn unit() -> ProvisioningUnit {
    ProvisioningUnit::new(UNIT_LOGS, materialize)
        .output(EXPORT_LOG_GROUP_ARN, "The Arn of the logGroup")
        .output(EXPORT_S3_BUCKET_ARN, "The Arn of the S3 bucket")
        .output(EXPORT_S3_BUCKET_NAME, "The name of the S3 bucket")
}

fn materialize(ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
    let deployment = ctx.deployment();

    let log_group_name = deployment.physical_name(UNIT_LOGS, "fisLogGroup");
    let log_group_arn = format!(
        "arn:aws:logs:{}:{}:log-group:{}",
        deployment.region, deployment.account, log_group_name
    );

    // bucket names are lowercase only
    let bucket_name = deployment
        .physical_name(UNIT_LOGS, "fisS3Bucket")
        .to_ascii_lowercase();
    let bucket_arn = format!("arn:aws:s3:::{}", bucket_name);

    Ok(Materialized::new()
        .output(EXPORT_LOG_GROUP_ARN, log_group_arn.clone())
        .output(EXPORT_S3_BUCKET_ARN, bucket_arn.clone())
        .output(EXPORT_S3_BUCKET_NAME, bucket_name.clone())
        .resource(Resource::LogGroup(LogGroupSpec {
            logical_id: "fisLogGroup".to_string(),
            log_group_name,
            arn: log_group_arn,
        }))
        .resource(Resource::Bucket(BucketSpec {
            logical_id: "fisS3Bucket".to_string(),
            bucket_name,
            arn: bucket_arn,
        })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::{DeploymentContext, OutputName};

    #[test]
    fn bucket_name_is_lowercase() {
        let unit = unit();
        let registry = Registry::new();
        let deployment = DeploymentContext::new("123456789012", "eu-west-1");
        let produced = unit
            .materialize(&UnitContext::new(&unit, &registry, &deployment))
            .expect("materialize");

        let name = &produced.outputs[&OutputName::new(EXPORT_S3_BUCKET_NAME)];
        assert_eq!(name, "fis-fislogs-fiss3bucket");
        assert_eq!(
            produced.outputs[&OutputName::new(EXPORT_LOG_GROUP_ARN)],
            "arn:aws:logs:eu-west-1:123456789012:log-group:FIS-FisLogs-fisLogGroup"
        );
        assert_eq!(produced.resources.len(), 2);
    }
}

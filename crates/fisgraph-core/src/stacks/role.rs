//! `FisRole`: the IAM role FIS assumes to run experiments.
//!
//! Trust is limited to experiments of this account and region. Instance
//! actions are limited to instances tagged `FIS-Ready=true`.

use crate::primitives::{
    EXPORT_FIS_ROLE_ARN, EXPORT_S3_BUCKET_ARN, FIS_READY_TAG, FIS_SERVICE_PRINCIPAL, UNIT_LOGS,
    UNIT_ROLE,
};
use crate::resources::{Conditions, PolicyStatement, Resource, RoleSpec};
use crate::unit::{Materialized, ProvisioningUnit, UnitContext};
use crate::{FisgraphError, ResourceRef};

const INSTANCES: &str = "arn:aws:ec2:*:*:instance/*";

/// `(actions, resources, restricted to FIS-Ready instances)`
const STATEMENTS: &[(&[&str], &[&str], bool)] = &[
    (&["cloudwatch:DescribeAlarms"], &["*"], false),
    (&["ec2:DescribeInstances"], &["*"], false),
    (
        &[
            "ec2:RebootInstances",
            "ec2:StopInstances",
            "ec2:StartInstances",
            "ec2:TerminateInstances",
        ],
        &[INSTANCES],
        true,
    ),
    (&["ec2:SendSpotInstanceInterruptions"], &[INSTANCES], true),
    (&["ecs:ListContainerInstances", "ecs:DescribeClusters"], &["*"], false),
    (
        &["ecs:UpdateContainerInstancesState"],
        &["arn:aws:ecs:*:*:container-instance/*"],
        false,
    ),
    (&["ec2:DescribeInstances", "eks:DescribeNodegroup"], &["*"], false),
    (&["ec2:TerminateInstances"], &[INSTANCES], true),
    (&["rds:DescribeDBInstances", "rds:DescribeDbClusters"], &["*"], false),
    (&["rds:RebootDBInstance"], &["arn:aws:rds:*:*:db:*"], false),
    (&["rds:FailoverDBCluster"], &["arn:aws:rds:*:*:cluster:*"], false),
    (
        &[
            "ec2:DescribeInstances",
            "ssm:ListCommands",
            "ssm:CancelCommand",
            "ssm:PutParameter",
        ],
        &["*"],
        false,
    ),
    (
        &["ssm:StopAutomationExecution", "ssm:GetAutomationExecution"],
        &["*"],
        false,
    ),
    (&["ssm:StartAutomationExecution"], &["*"], false),
    (
        &["ssm:SendCommand"],
        &[INSTANCES, "arn:aws:ssm:*:*:document/*"],
        false,
    ),
    (&["iam:PassRole"], &["arn:aws:iam::*:role/*"], false),
    (&["iam:ListRoles"], &["*"], false),
];

/// Actions needed to inject API faults and deliver experiment logs.
const LOG_DELIVERY_ACTIONS: &[&str] = &[
    "fis:InjectApiInternalError",
    "fis:InjectApiThrottleError",
    "fis:InjectApiUnavailableError",
    "logs:CreateLogDelivery",
    "s3:GetBucketPolicy",
    "s3:PutBucketPolicy",
    "logs:PutResourcePolicy",
    "logs:DescribeResourcePolicies",
    "logs:DescribeLogGroups",
    "firehose:TagDeliveryStream",
    "iam:CreateServiceLinkedRole",
];

fn bucket_ref() -> ResourceRef {
    ResourceRef::new(UNIT_LOGS, EXPORT_S3_BUCKET_ARN)
}

pub fn unit() -> ProvisioningUnit {
    ProvisioningUnit::new(UNIT_ROLE, materialize)
        .depends_on(UNIT_LOGS)
        .imports(bucket_ref())
        .output(EXPORT_FIS_ROLE_ARN, "The Arn of the IAM role")
}

fn materialize(ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
    let deployment = ctx.deployment();
    let bucket_arn = ctx.import(&bucket_ref())?;

    let mut statements: Vec<PolicyStatement> = STATEMENTS
        .iter()
        .map(|(actions, resources, fis_ready)| {
            let statement = PolicyStatement::allow(actions, resources);
            if *fis_ready {
                statement.with_condition(
                    "StringEquals",
                    &format!("aws:ResourceTag/{}", FIS_READY_TAG),
                    "true",
                )
            } else {
                statement
            }
        })
        .collect();
    statements.push(PolicyStatement::allow(
        LOG_DELIVERY_ACTIONS,
        &["arn:aws:fis:*:*:experiment/*", "*", bucket_arn],
    ));

    let mut trust_conditions = Conditions::new();
    trust_conditions
        .entry("StringEquals".to_string())
        .or_default()
        .insert("aws:SourceAccount".to_string(), deployment.account.clone());
    trust_conditions.entry("ArnLike".to_string()).or_default().insert(
        "aws:SourceArn".to_string(),
        format!(
            "arn:aws:fis:{}:{}:experiment/*",
            deployment.region, deployment.account
        ),
    );

    let role_name = deployment.physical_name(UNIT_ROLE, "fis-role");
    let arn = deployment.role_arn(&role_name);

    Ok(Materialized::new()
        .output(EXPORT_FIS_ROLE_ARN, arn.clone())
        .resource(Resource::IamRole(RoleSpec {
            logical_id: "fis-role".to_string(),
            role_name,
            arn,
            assumed_by: vec![FIS_SERVICE_PRINCIPAL.to_string()],
            trust_conditions,
            statements,
        })))
}

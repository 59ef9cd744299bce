//! # Innate Primitives
//!
//! Hardcoded names and limits compiled into the binary.
//!
//! The export names below are consumed verbatim by the existing deployment's
//! resource graph and must never be renamed.

// =============================================================================
// UNIT IDENTIFIERS
// =============================================================================

/// Log group and S3 bucket for experiment logs.
pub const UNIT_LOGS: &str = "FisLogs";
/// IAM role assumed by FIS when running experiments.
pub const UNIT_ROLE: &str = "FisRole";
/// CloudWatch alarm used as stop condition.
pub const UNIT_STOP_CONDITION: &str = "StopCond";
/// SSM automation documents and their execution roles.
pub const UNIT_SSM_DOCS: &str = "FisSsmDocs";

pub const UNIT_EC2_INSTANCES: &str = "Ec2InstExp";
pub const UNIT_EC2_CONTROL_PLANE: &str = "Ec2APIExp";
pub const UNIT_NACL: &str = "NaclExp";
pub const UNIT_ASG: &str = "AsgExp";
pub const UNIT_EKS: &str = "EksExp";
pub const UNIT_SECURITY_GROUP: &str = "SecGroupExp";
pub const UNIT_IAM_ACCESS: &str = "IamAccExp";
pub const UNIT_LAMBDA: &str = "LambdaExp";

// =============================================================================
// EXPORT NAMES
// =============================================================================

pub const EXPORT_LOG_GROUP_ARN: &str = "fisLogGroupArn";
pub const EXPORT_S3_BUCKET_ARN: &str = "fisS3BucketArn";
pub const EXPORT_S3_BUCKET_NAME: &str = "fisS3BucketName";

pub const EXPORT_FIS_ROLE_ARN: &str = "FISIamRoleArn";
pub const EXPORT_STOP_CONDITION_ARN: &str = "StopConditionArn";

pub const EXPORT_NACL_DOC_NAME: &str = "NaclSSMADocName";
pub const EXPORT_SECGROUP_DOC_NAME: &str = "SecGroupSSMADocName";
pub const EXPORT_IAM_ACCESS_DOC_NAME: &str = "IamAccessSSMADocName";
pub const EXPORT_PUT_PARAMETER_DOC_NAME: &str = "PutParameterStoreSSMADocName";
pub const EXPORT_NACL_ROLE_ARN: &str = "SSMANaclRoleArn";
pub const EXPORT_SECGROUP_ROLE_ARN: &str = "SSMASecGroupRoleArn";
pub const EXPORT_IAM_ACCESS_ROLE_ARN: &str = "SSMAIamAccessRoleArn";
pub const EXPORT_PUT_PARAMETER_ROLE_ARN: &str = "SSMAPutParameterStoreRoleArn";

// =============================================================================
// CONTEXT PARAMETER KEYS
// =============================================================================

pub const PARAM_VPC_ID: &str = "vpc_id";
pub const PARAM_ASG_NAME: &str = "asg_name";
pub const PARAM_TARGET_ROLE_NAME: &str = "target_role_name";
pub const PARAM_SECURITY_GROUP_ID: &str = "security_group_id";
pub const PARAM_EKS_CLUSTER_NAME: &str = "eks_cluster_name";
pub const PARAM_SSM_PARAMETER_NAME: &str = "ssm_parameter_name";
pub const PARAM_S3_BUCKET_TO_DENY: &str = "s3-bucket-to-deny";

/// Every context key the catalog understands.
pub const KNOWN_PARAMS: [&str; 7] = [
    PARAM_VPC_ID,
    PARAM_ASG_NAME,
    PARAM_TARGET_ROLE_NAME,
    PARAM_SECURITY_GROUP_ID,
    PARAM_EKS_CLUSTER_NAME,
    PARAM_SSM_PARAMETER_NAME,
    PARAM_S3_BUCKET_TO_DENY,
];

// =============================================================================
// FIS CONSTANTS
// =============================================================================

/// Stop-condition source for CloudWatch alarms.
pub const STOP_SOURCE_ALARM: &str = "aws:cloudwatch:alarm";

/// Tag that opts an instance into fault injection.
pub const FIS_READY_TAG: &str = "FIS-Ready";

/// Service principal FIS assumes the experiment role with.
pub const FIS_SERVICE_PRINCIPAL: &str = "fis.amazonaws.com";

/// Upper bound of `PERCENT(n)` selection modes.
pub const MAX_SELECTION_PERCENT: u32 = 100;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of units in one dependency graph.
pub const MAX_UNITS: usize = 10_000;

/// Maximum length of a unit identifier.
pub const MAX_UNIT_ID_LENGTH: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_names_are_verbatim() {
        assert_eq!(EXPORT_FIS_ROLE_ARN, "FISIamRoleArn");
        assert_eq!(EXPORT_STOP_CONDITION_ARN, "StopConditionArn");
        assert_eq!(EXPORT_NACL_DOC_NAME, "NaclSSMADocName");
        assert_eq!(EXPORT_NACL_ROLE_ARN, "SSMANaclRoleArn");
    }

    #[test]
    fn known_params_are_unique() {
        let unique: std::collections::BTreeSet<_> = KNOWN_PARAMS.iter().collect();
        assert_eq!(unique.len(), KNOWN_PARAMS.len());
    }
}

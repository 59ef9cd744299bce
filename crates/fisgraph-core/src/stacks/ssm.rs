//! `FisSsmDocs`: the SSM automation documents behind the NACL, security
//! group, IAM access and parameter-store faults, plus one execution role per
//! document.
//!
//! Document bodies are YAML files kept outside the graph; a document record
//! only names its file.

use crate::primitives::*;
use crate::resources::{Conditions, DocumentSpec, PolicyStatement, Resource, RoleSpec};
use crate::unit::{Materialized, ProvisioningUnit, UnitContext};
use crate::{DeploymentContext, FisgraphError};

const LOG_ACTIONS: &[&str] = &[
    "logs:CreateLogStream",
    "logs:CreateLogGroup",
    "logs:PutLogEvents",
    "logs:DescribeLogGroups",
    "logs:DescribeLogStreams",
];

/// Automation roles are assumable by both SSM and IAM.
const AUTOMATION_PRINCIPALS: [&str; 2] = ["ssm.amazonaws.com", "iam.amazonaws.com"];

/// `(logical id, document file, export name)`
const DOCUMENTS: [(&str, &str, &str); 4] = [
    (
        "Nacl-SSM-Document",
        "documents/ssma-nacl-faults.yml",
        EXPORT_NACL_DOC_NAME,
    ),
    (
        "SecGroup-SSM-Document",
        "documents/security-groups-faults.yml",
        EXPORT_SECGROUP_DOC_NAME,
    ),
    (
        "IamAccess-SSM-Document",
        "documents/iam-access-faults.yml",
        EXPORT_IAM_ACCESS_DOC_NAME,
    ),
    (
        "ParameterStore-SSM-Document",
        "documents/ssma-put-config-parameterstore.yml",
        EXPORT_PUT_PARAMETER_DOC_NAME,
    ),
];

pub fn unit() -> ProvisioningUnit {
    let mut unit = ProvisioningUnit::new(UNIT_SSM_DOCS, materialize);
    for (_, _, export) in DOCUMENTS {
        unit = unit.output(export, "The name of the SSM Doc");
    }
    for export in [
        EXPORT_NACL_ROLE_ARN,
        EXPORT_SECGROUP_ROLE_ARN,
        EXPORT_IAM_ACCESS_ROLE_ARN,
        EXPORT_PUT_PARAMETER_ROLE_ARN,
    ] {
        unit = unit.output(export, "The Arn of the IAM role");
    }
    unit
}

fn materialize(ctx: &UnitContext<'_>) -> Result<Materialized, FisgraphError> {
    let deployment = ctx.deployment();
    let target_role = deployment.require(PARAM_TARGET_ROLE_NAME)?;
    let parameter_name = deployment.require(PARAM_SSM_PARAMETER_NAME)?;

    let target_role_arn = deployment.role_arn(target_role);
    let any_policy_arn = deployment.policy_arn("*");
    let parameter_arn = deployment.parameter_arn(parameter_name);

    let mut produced = Materialized::new();

    for (logical_id, path, export) in DOCUMENTS {
        let name = deployment.physical_name(UNIT_SSM_DOCS, logical_id);
        produced = produced.output(export, name.clone()).resource(Resource::SsmDocument(
            DocumentSpec {
                logical_id: logical_id.to_string(),
                name,
                document_type: "Automation".to_string(),
                document_format: "YAML".to_string(),
                content_path: path.to_string(),
            },
        ));
    }

    let roles = [
        (
            "ssma-nacl-role",
            EXPORT_NACL_ROLE_ARN,
            vec![
                PolicyStatement::allow(
                    &[
                        "ec2:DescribeInstances",
                        "ec2:CreateNetworkAcl",
                        "ec2:CreateTags",
                        "ec2:CreateNetworkAclEntry",
                        "ec2:DescribeSubnets",
                        "ec2:DescribeNetworkAcls",
                        "ec2:ReplaceNetworkAclAssociation",
                        "ec2:DeleteNetworkAcl",
                    ],
                    &["*"],
                ),
                PolicyStatement::allow(&["iam:ListRoles"], &["*"]),
                PolicyStatement::allow(LOG_ACTIONS, &["*"]),
            ],
        ),
        (
            "ssma-secgroup-role",
            EXPORT_SECGROUP_ROLE_ARN,
            vec![
                PolicyStatement::allow(
                    &[
                        "ec2:RevokeSecurityGroupIngress",
                        "ec2:AuthorizeSecurityGroupIngress",
                        "ec2:DescribeSecurityGroups",
                    ],
                    &["*"],
                ),
                PolicyStatement::allow(LOG_ACTIONS, &["*"]),
            ],
        ),
        (
            "ssma-iam-access-role",
            EXPORT_IAM_ACCESS_ROLE_ARN,
            vec![PolicyStatement::allow(
                &[
                    "iam:GetRole",
                    "iam:GetPolicy",
                    "iam:ListAttachedRolePolicies",
                    "iam:ListRoles",
                ],
                &[target_role_arn.as_str(), any_policy_arn.as_str()],
            )
            .with_sid("GetRoleandPolicyDetails")],
        ),
        (
            "ssma-put-parameterstore-role",
            EXPORT_PUT_PARAMETER_ROLE_ARN,
            vec![
                PolicyStatement::allow(
                    &["ssm:PutParameter"],
                    &[parameter_arn.as_str()],
                ),
                PolicyStatement::allow(LOG_ACTIONS, &["*"]),
            ],
        ),
    ];

    for (logical_id, export, statements) in roles {
        let role = automation_role(deployment, logical_id, statements);
        produced = produced
            .output(export, role.arn.clone())
            .resource(Resource::IamRole(role));
    }

    Ok(produced)
}

fn automation_role(
    deployment: &DeploymentContext,
    logical_id: &str,
    statements: Vec<PolicyStatement>,
) -> RoleSpec {
    let role_name = deployment.physical_name(UNIT_SSM_DOCS, logical_id);
    RoleSpec {
        logical_id: logical_id.to_string(),
        arn: deployment.role_arn(&role_name),
        role_name,
        assumed_by: AUTOMATION_PRINCIPALS.iter().map(|p| (*p).to_string()).collect(),
        trust_conditions: Conditions::new(),
        statements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::OutputName;

    fn deployment() -> DeploymentContext {
        DeploymentContext::new("123456789012", "us-east-1")
            .with_param(PARAM_TARGET_ROLE_NAME, "app-role")
            .with_param(PARAM_SSM_PARAMETER_NAME, "/chaos/config")
    }

    #[test]
    fn produces_every_declared_output() {
        let unit = unit();
        let registry = Registry::new();
        let deployment = deployment();
        let produced = unit
            .materialize(&UnitContext::new(&unit, &registry, &deployment))
            .expect("materialize");

        assert_eq!(produced.outputs.len(), 8);
        for decl in unit.declared_outputs() {
            assert!(produced.outputs.contains_key(&decl.name), "{}", decl.name);
        }
        assert_eq!(produced.resources.len(), 8);
        assert_eq!(
            produced.outputs[&OutputName::new(EXPORT_NACL_DOC_NAME)],
            "FIS-FisSsmDocs-Nacl-SSM-Document"
        );
    }

    #[test]
    fn parameter_role_is_scoped_to_parameter() {
        let unit = unit();
        let registry = Registry::new();
        let deployment = deployment();
        let produced = unit
            .materialize(&UnitContext::new(&unit, &registry, &deployment))
            .expect("materialize");

        let scoped = produced.resources.iter().any(|r| match r {
            Resource::IamRole(role) => role.statements.iter().any(|s| {
                s.resources
                    == vec!["arn:aws:ssm:us-east-1:123456789012:parameter/chaos/config".to_string()]
            }),
            _ => false,
        });
        assert!(scoped);
    }

    #[test]
    fn missing_target_role_fails() {
        let unit = unit();
        let registry = Registry::new();
        let deployment = DeploymentContext::new("1", "us-east-1")
            .with_param(PARAM_SSM_PARAMETER_NAME, "/chaos/config");
        let result = unit.materialize(&UnitContext::new(&unit, &registry, &deployment));
        assert!(matches!(
            result,
            Err(FisgraphError::MissingParameter(ref k)) if k == PARAM_TARGET_ROLE_NAME
        ));
    }
}

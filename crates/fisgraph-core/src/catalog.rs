//! # Fault Catalog
//!
//! The fault kinds the FIS application ships and the recipe that drafts each
//! experiment template.
//!
//! Every template carries the FIS role, one alarm stop condition and the
//! `Name`/`Stackname` tags. Recipes never fail: problems are recorded on the
//! draft and reported together by the validator.

use crate::primitives::*;
use crate::template::{
    pick_zone, ActionSpec, FaultParams, StopCondition, TargetDraft, TemplateDraft, Violation,
    ZoneSource,
};
use crate::{FisgraphError, ResourceRef};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// FAULT KIND
// =============================================================================

/// A fault the catalog knows how to template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FaultKind {
    StopInstances,
    CpuStressInstance,
    LatencyInjection,
    ApiInternalError,
    ApiThrottleError,
    ApiUnavailableError,
    NaclFault,
    TerminateAsg,
    AsgCpuStress,
    EksTerminateNodegroup,
    SecurityGroupFault,
    IamAccessDenied,
    LambdaFault,
    LambdaFaultAutomation,
}

impl FaultKind {
    /// Every kind, grouped by suite in deployment order.
    pub const ALL: [FaultKind; 14] = [
        Self::StopInstances,
        Self::CpuStressInstance,
        Self::LatencyInjection,
        Self::ApiInternalError,
        Self::ApiThrottleError,
        Self::ApiUnavailableError,
        Self::NaclFault,
        Self::TerminateAsg,
        Self::AsgCpuStress,
        Self::EksTerminateNodegroup,
        Self::SecurityGroupFault,
        Self::IamAccessDenied,
        Self::LambdaFault,
        Self::LambdaFaultAutomation,
    ];

    /// Kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopInstances => "stop-instances",
            Self::CpuStressInstance => "cpu-stress-instance",
            Self::LatencyInjection => "latency-injection",
            Self::ApiInternalError => "api-internal-error",
            Self::ApiThrottleError => "api-throttle-error",
            Self::ApiUnavailableError => "api-unavailable-error",
            Self::NaclFault => "nacl-fault",
            Self::TerminateAsg => "terminate-asg",
            Self::AsgCpuStress => "asg-cpu-stress",
            Self::EksTerminateNodegroup => "eks-terminate-nodegroup",
            Self::SecurityGroupFault => "security-group-fault",
            Self::IamAccessDenied => "iam-access-denied",
            Self::LambdaFault => "lambda-fault",
            Self::LambdaFaultAutomation => "lambda-fault-automation",
        }
    }

    /// Id of the experiment unit that owns this kind.
    #[must_use]
    pub fn suite(self) -> &'static str {
        match self {
            Self::StopInstances | Self::CpuStressInstance | Self::LatencyInjection => {
                UNIT_EC2_INSTANCES
            }
            Self::ApiInternalError | Self::ApiThrottleError | Self::ApiUnavailableError => {
                UNIT_EC2_CONTROL_PLANE
            }
            Self::NaclFault => UNIT_NACL,
            Self::TerminateAsg | Self::AsgCpuStress => UNIT_ASG,
            Self::EksTerminateNodegroup => UNIT_EKS,
            Self::SecurityGroupFault => UNIT_SECURITY_GROUP,
            Self::IamAccessDenied => UNIT_IAM_ACCESS,
            Self::LambdaFault | Self::LambdaFaultAutomation => UNIT_LAMBDA,
        }
    }

    /// Kinds owned by one suite.
    pub fn in_suite(suite: &str) -> impl Iterator<Item = FaultKind> + '_ {
        Self::ALL.into_iter().filter(move |k| k.suite() == suite)
    }

    /// Logical id of the generated template.
    #[must_use]
    pub fn logical_id(self) -> &'static str {
        match self {
            Self::StopInstances => "fis-template-stop-instances-in-vpc-az",
            Self::CpuStressInstance => "fis-template-CPU-stress-random-instances-in-vpc",
            Self::LatencyInjection => "fis-template-latency-injection-all-instances",
            Self::ApiInternalError => "fis-template-inject-internal-error",
            Self::ApiThrottleError => "fis-template-inject-throttle-error",
            Self::ApiUnavailableError => "fis-template-inject-unavailable-error",
            Self::NaclFault => "fis-template-inject-nacl-fault",
            Self::TerminateAsg => "fis-template-terminate-instances-in-asg-az",
            Self::AsgCpuStress => "fis-template-CPU-stress-instances-in-asg",
            Self::EksTerminateNodegroup => "fis-eks-terminate-node-group",
            Self::SecurityGroupFault => "fis-template-inject-secgroup-fault",
            Self::IamAccessDenied => "fis-template-inject-s3-access-denied",
            Self::LambdaFault => "fis-template-inject-lambda-fault",
            Self::LambdaFaultAutomation => "fis-template-inject-lambda-fault-automation",
        }
    }

    /// Template description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::StopInstances => "Stop and restart all tagged instances in AZ and VPC",
            Self::CpuStressInstance => "Runs CPU stress on random instance",
            Self::LatencyInjection => "Inject latency to particular domain",
            Self::ApiInternalError => "Inject EC2 API Internal Error on the target IAM role.",
            Self::ApiThrottleError => "Inject EC2 API Throttle Error on the target IAM role.",
            Self::ApiUnavailableError => "Inject EC2 API Unavailable Error on the target IAM role.",
            Self::NaclFault => {
                "Deny network traffic in subnets of a particular AZ. Rollback on Cancel or Failure."
            }
            Self::TerminateAsg => "Terminate all instances of ASG in random AZ",
            Self::AsgCpuStress => "Runs CPU stress on all instances of an ASG",
            Self::EksTerminateNodegroup => {
                "Terminate 50 per cent instances on the EKS target node group."
            }
            Self::SecurityGroupFault => {
                "Experiment to test response to a change in security group ingress rule (open SSH to 0.0.0.0/0)"
            }
            Self::IamAccessDenied => "Deny Access to an S3 bucket via an IAM role",
            Self::LambdaFault => "Inject faults into Lambda functions",
            Self::LambdaFaultAutomation => {
                "Inject faults into Lambda functions through an SSM automation"
            }
        }
    }

    /// Value of the `Name` tag.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::StopInstances => "Stop and restart tagged instances in AZ and VPC",
            Self::CpuStressInstance => "Stress CPU on random instance in VPC",
            Self::LatencyInjection => "Inject latency on all instances in VPC and random AZ",
            Self::ApiInternalError => "EC2 API Internal Error",
            Self::ApiThrottleError => "EC2 API Throttle Error",
            Self::ApiUnavailableError => "EC2 API Unavailable Error",
            Self::NaclFault => "Deny network traffic in subnets of a particular AZ",
            Self::TerminateAsg => "Terminate instances of ASG in random AZ",
            Self::AsgCpuStress => "CPU Stress to all instances of ASG",
            Self::EksTerminateNodegroup => {
                "Terminate 50 per cent instances on the EKS target node group"
            }
            Self::SecurityGroupFault => "Security Group ingress open SSH to all",
            Self::IamAccessDenied => "Deny Access to an S3 bucket",
            Self::LambdaFault => "Inject fault to Lambda functions",
            Self::LambdaFaultAutomation => "Inject fault to Lambda functions via SSM automation",
        }
    }

    /// Context parameters the recipe reads.
    #[must_use]
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::StopInstances
            | Self::CpuStressInstance
            | Self::LatencyInjection
            | Self::NaclFault => &[PARAM_VPC_ID],
            Self::ApiInternalError | Self::ApiThrottleError | Self::ApiUnavailableError => {
                &[PARAM_TARGET_ROLE_NAME]
            }
            Self::TerminateAsg | Self::AsgCpuStress => &[PARAM_ASG_NAME],
            Self::EksTerminateNodegroup => &[PARAM_EKS_CLUSTER_NAME],
            Self::SecurityGroupFault => &[PARAM_SECURITY_GROUP_ID],
            Self::IamAccessDenied => &[PARAM_TARGET_ROLE_NAME, PARAM_S3_BUCKET_TO_DENY],
            Self::LambdaFault | Self::LambdaFaultAutomation => &[PARAM_SSM_PARAMETER_NAME],
        }
    }

    /// Exports the recipe reads, with the unit that publishes each one.
    #[must_use]
    pub fn required_imports(self) -> Vec<ResourceRef> {
        let mut imports = vec![
            ResourceRef::new(UNIT_ROLE, EXPORT_FIS_ROLE_ARN),
            ResourceRef::new(UNIT_STOP_CONDITION, EXPORT_STOP_CONDITION_ARN),
        ];
        let ssm: &[&str] = match self {
            Self::NaclFault => &[EXPORT_NACL_DOC_NAME, EXPORT_NACL_ROLE_ARN],
            Self::SecurityGroupFault => &[EXPORT_SECGROUP_DOC_NAME, EXPORT_SECGROUP_ROLE_ARN],
            Self::IamAccessDenied => &[EXPORT_IAM_ACCESS_DOC_NAME, EXPORT_IAM_ACCESS_ROLE_ARN],
            Self::LambdaFaultAutomation => {
                &[EXPORT_PUT_PARAMETER_DOC_NAME, EXPORT_PUT_PARAMETER_ROLE_ARN]
            }
            _ => &[],
        };
        imports.extend(ssm.iter().map(|name| ResourceRef::new(UNIT_SSM_DOCS, *name)));
        imports
    }

    /// Whether the recipe targets one randomly chosen availability zone.
    #[must_use]
    pub fn uses_zone(self) -> bool {
        matches!(
            self,
            Self::StopInstances | Self::LatencyInjection | Self::NaclFault | Self::TerminateAsg
        )
    }

    /// Draft the template of this kind.
    #[must_use]
    pub fn draft(self, params: &FaultParams, zones: &dyn ZoneSource) -> TemplateDraft {
        let recipe = Recipe::new(self, params, zones);
        let draft = recipe.base();
        match self {
            Self::StopInstances => recipe.stop_instances(draft),
            Self::CpuStressInstance => recipe.cpu_stress_instance(draft),
            Self::LatencyInjection => recipe.latency_injection(draft),
            Self::ApiInternalError => recipe.api_fault(draft, "aws:fis:inject-api-internal-error"),
            Self::ApiThrottleError => recipe.api_fault(draft, "aws:fis:inject-api-throttle-error"),
            Self::ApiUnavailableError => {
                recipe.api_fault(draft, "aws:fis:inject-api-unavailable-error")
            }
            Self::NaclFault => recipe.nacl_fault(draft),
            Self::TerminateAsg => recipe.terminate_asg(draft),
            Self::AsgCpuStress => recipe.asg_cpu_stress(draft),
            Self::EksTerminateNodegroup => recipe.eks_terminate_nodegroup(draft),
            Self::SecurityGroupFault => recipe.security_group_fault(draft),
            Self::IamAccessDenied => recipe.iam_access_denied(draft),
            Self::LambdaFault => recipe.lambda_fault(draft),
            Self::LambdaFaultAutomation => recipe.lambda_fault_automation(draft),
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultKind {
    type Err = FisgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FisgraphError::UnknownFaultKind(s.to_string()))
    }
}

/// Name of the `s3-deny` managed policy attached by the IAM access fault.
#[must_use]
pub fn s3_deny_policy_name(params: &FaultParams) -> String {
    params.context.physical_name(UNIT_IAM_ACCESS, "s3-deny")
}

// =============================================================================
// RECIPES
// =============================================================================

const CPU_STRESS_DOCUMENT: &str = "AWSFIS-Run-CPU-Stress";
const LATENCY_DOCUMENT: &str = "AWSFIS-Run-Network-Latency-Sources";

const INSTANCE_TARGETS: &str = "instanceTargets";
const INSTANCE_ACTIONS: &str = "instanceActions";
const AUTOMATION_ACTION: &str = "ssmaAction";

const LAMBDA_CHAOS_ENABLED: &str = r#"{ "delay": 1000, "is_enabled": true, "error_code": 404, "exception_msg": "This is chaos", "rate": 1, "fault_type": "exception"}"#;
const LAMBDA_CHAOS_DISABLED: &str = r#"{ "delay": 1000, "is_enabled": false, "error_code": 404, "exception_msg": "This is chaos", "rate": 1, "fault_type": "exception"}"#;

/// Drafting state of one template.
struct Recipe<'a> {
    kind: FaultKind,
    params: &'a FaultParams,
    zones: &'a dyn ZoneSource,
    violations: Vec<Violation>,
}

impl<'a> Recipe<'a> {
    /// Check required parameters and imports up front.
    fn new(kind: FaultKind, params: &'a FaultParams, zones: &'a dyn ZoneSource) -> Self {
        let mut violations = Vec::new();
        for key in kind.required_params() {
            if params.context.param(key).is_none() {
                violations.push(Violation::MissingParameter((*key).to_string()));
            }
        }
        for reference in kind.required_imports() {
            if params.import(reference.output.as_str()).is_none() {
                violations.push(Violation::MissingImport(reference.output.as_str().to_string()));
            }
        }
        Self {
            kind,
            params,
            zones,
            violations,
        }
    }

    fn param(&self, key: &str) -> String {
        self.params.context.param(key).unwrap_or_default().to_string()
    }

    fn import(&self, name: &str) -> String {
        self.params.import(name).unwrap_or_default().to_string()
    }

    /// Pick the zone, or record why none could be picked.
    fn zone(&mut self) -> Option<String> {
        match pick_zone(self.zones, &self.params.context.availability_zones) {
            Ok(zone) => Some(zone.to_string()),
            Err(violation) => {
                self.violations.push(violation);
                None
            }
        }
    }

    fn base(&self) -> TemplateDraft {
        let mut draft = TemplateDraft {
            logical_id: self.kind.logical_id().to_string(),
            description: self.kind.description().to_string(),
            role_arn: self.import(EXPORT_FIS_ROLE_ARN),
            stop_conditions: vec![StopCondition {
                source: STOP_SOURCE_ALARM.to_string(),
                value: self.import(EXPORT_STOP_CONDITION_ARN),
            }],
            ..TemplateDraft::default()
        };
        draft
            .tags
            .insert("Name".to_string(), self.kind.display_name().to_string());
        draft.tags.insert(
            "Stackname".to_string(),
            format!("{}-{}", self.params.context.stack_name, self.kind.suite()),
        );
        draft
    }

    fn finish(self, mut draft: TemplateDraft) -> TemplateDraft {
        draft.violations.extend(self.violations);
        draft
    }

    // -------------------------------------------------------------------------
    // Shared building blocks
    // -------------------------------------------------------------------------

    /// Running `FIS-Ready` instances of the VPC.
    fn ready_instances(&self, selection_mode: &str) -> TargetDraft {
        TargetDraft::new("aws:ec2:instance", selection_mode)
            .tag(FIS_READY_TAG, "true")
            .filter("State.Name", vec!["running".to_string()])
            .filter("VpcId", non_blank(self.param(PARAM_VPC_ID)))
    }

    /// Running instances of the auto scaling group.
    fn asg_instances(&self) -> TargetDraft {
        TargetDraft::new("aws:ec2:instance", "ALL")
            .tag("aws:autoscaling:groupName", self.param(PARAM_ASG_NAME))
            .filter("State.Name", vec!["running".to_string()])
    }

    fn with_zone_filter(&mut self, target: TargetDraft) -> TargetDraft {
        let zone = self.zone();
        target.filter("Placement.AvailabilityZone", zone.into_iter().collect())
    }

    fn send_command(
        &self,
        description: &str,
        document: &str,
        parameters: String,
        duration: &str,
    ) -> ActionSpec {
        ActionSpec::new("aws:ssm:send-command")
            .describe(description)
            .param("documentArn", self.params.context.aws_document_arn(document))
            .param("documentParameters", parameters)
            .param("duration", duration)
            .target("Instances", INSTANCE_TARGETS)
    }

    fn cpu_stress(&self) -> ActionSpec {
        let parameters = json!({
            "DurationSeconds": "120",
            "InstallDependencies": "True",
            "CPU": "0",
        });
        self.send_command(
            "CPU stress via SSM",
            CPU_STRESS_DOCUMENT,
            parameters.to_string(),
            "PT2M",
        )
    }

    /// `aws:ssm:start-automation-execution` on a document this deployment owns.
    fn start_automation(
        &self,
        description: &str,
        document_export: &str,
        parameters: serde_json::Value,
        max_duration: &str,
    ) -> ActionSpec {
        let document_name = self.import(document_export);
        ActionSpec::new("aws:ssm:start-automation-execution")
            .describe(description)
            .param("documentArn", self.params.context.document_arn(&document_name))
            .param("documentParameters", parameters.to_string())
            .param("maxDuration", max_duration)
    }

    fn with_action(draft: &mut TemplateDraft, key: &str, action: ActionSpec) {
        draft.actions.insert(key.to_string(), action);
    }

    fn with_target(draft: &mut TemplateDraft, key: &str, target: TargetDraft) {
        draft.targets.insert(key.to_string(), target);
    }

    // -------------------------------------------------------------------------
    // EC2 instances
    // -------------------------------------------------------------------------

    fn stop_instances(mut self, mut draft: TemplateDraft) -> TemplateDraft {
        let target = self.ready_instances("ALL");
        let target = self.with_zone_filter(target);
        Self::with_target(&mut draft, INSTANCE_TARGETS, target);
        Self::with_action(
            &mut draft,
            INSTANCE_ACTIONS,
            ActionSpec::new("aws:ec2:stop-instances")
                .param("startInstancesAfterDuration", "PT5M")
                .target("Instances", INSTANCE_TARGETS),
        );
        self.finish(draft)
    }

    fn cpu_stress_instance(self, mut draft: TemplateDraft) -> TemplateDraft {
        Self::with_target(&mut draft, INSTANCE_TARGETS, self.ready_instances("COUNT(1)"));
        Self::with_action(&mut draft, INSTANCE_ACTIONS, self.cpu_stress());
        self.finish(draft)
    }

    fn latency_injection(mut self, mut draft: TemplateDraft) -> TemplateDraft {
        let target = self.ready_instances("ALL");
        let target = self.with_zone_filter(target);
        Self::with_target(&mut draft, INSTANCE_TARGETS, target);

        let parameters = json!({
            "DurationSeconds": "120",
            "Interface": "eth0",
            "DelayMilliseconds": "200",
            "JitterMilliseconds": "10",
            "Sources": "www.amazon.com",
            "InstallDependencies": "True",
        });
        let action = self.send_command(
            "Latency injection via SSM",
            LATENCY_DOCUMENT,
            parameters.to_string(),
            "PT3M",
        );
        Self::with_action(&mut draft, INSTANCE_ACTIONS, action);
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // EC2 control plane
    // -------------------------------------------------------------------------

    fn api_fault(self, mut draft: TemplateDraft, action_id: &str) -> TemplateDraft {
        let role_name = self.param(PARAM_TARGET_ROLE_NAME);
        let mut target = TargetDraft::new("aws:iam:role", "ALL");
        if !role_name.is_empty() {
            target = target.arn(self.params.context.role_arn(&role_name));
        }
        Self::with_target(&mut draft, "roleTargets", target);
        Self::with_action(
            &mut draft,
            "roleActions",
            ActionSpec::new(action_id)
                .describe("Defining the API operations and percentage of requests to fail")
                .param("service", "ec2")
                .param("operations", "DescribeInstances,DescribeVolumes")
                .param("percentage", "100")
                .param("duration", "PT2M")
                .target("Roles", "roleTargets"),
        );
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // Network ACL
    // -------------------------------------------------------------------------

    fn nacl_fault(mut self, mut draft: TemplateDraft) -> TemplateDraft {
        let zone = self.zone().unwrap_or_default();
        let parameters = json!({
            "AvailabilityZone": zone,
            "VPCId": self.param(PARAM_VPC_ID),
            "DurationMinutes": "PT1M",
            "AutomationAssumeRole": self.import(EXPORT_NACL_ROLE_ARN),
        });
        let action = self.start_automation(
            "Calling SSMA document to inject faults in the NACLS of a particular AZ.",
            EXPORT_NACL_DOC_NAME,
            parameters,
            "PT2M",
        );
        Self::with_action(&mut draft, AUTOMATION_ACTION, action);
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // Auto scaling group
    // -------------------------------------------------------------------------

    fn terminate_asg(mut self, mut draft: TemplateDraft) -> TemplateDraft {
        let target = self.asg_instances();
        let target = self.with_zone_filter(target);
        Self::with_target(&mut draft, INSTANCE_TARGETS, target);
        Self::with_action(
            &mut draft,
            INSTANCE_ACTIONS,
            ActionSpec::new("aws:ec2:terminate-instances").target("Instances", INSTANCE_TARGETS),
        );
        self.finish(draft)
    }

    fn asg_cpu_stress(self, mut draft: TemplateDraft) -> TemplateDraft {
        Self::with_target(&mut draft, INSTANCE_TARGETS, self.asg_instances());
        Self::with_action(&mut draft, INSTANCE_ACTIONS, self.cpu_stress());
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // EKS
    // -------------------------------------------------------------------------

    fn eks_terminate_nodegroup(self, mut draft: TemplateDraft) -> TemplateDraft {
        Self::with_target(
            &mut draft,
            "nodeGroupTarget",
            TargetDraft::new("aws:eks:nodegroup", "ALL").tag(
                "eksctl.cluster.k8s.io/v1alpha1/cluster-name",
                self.param(PARAM_EKS_CLUSTER_NAME),
            ),
        );
        Self::with_action(
            &mut draft,
            "nodeGroupActions",
            ActionSpec::new("aws:eks:terminate-nodegroup-instances")
                .param("instanceTerminationPercentage", "50")
                .target("Nodegroups", "nodeGroupTarget"),
        );
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // Security group / IAM access
    // -------------------------------------------------------------------------

    fn security_group_fault(self, mut draft: TemplateDraft) -> TemplateDraft {
        let parameters = json!({
            "DurationMinutes": "PT1M",
            "SecurityGroupId": self.param(PARAM_SECURITY_GROUP_ID),
            "AutomationAssumeRole": self.import(EXPORT_SECGROUP_ROLE_ARN),
        });
        let action = self.start_automation(
            "Calling SSMA document to inject faults in a particular security group (open SSH to 0.0.0.0/0)",
            EXPORT_SECGROUP_DOC_NAME,
            parameters,
            "PT5M",
        );
        Self::with_action(&mut draft, AUTOMATION_ACTION, action);
        self.finish(draft)
    }

    fn iam_access_denied(self, mut draft: TemplateDraft) -> TemplateDraft {
        let policy_arn = self
            .params
            .context
            .policy_arn(&s3_deny_policy_name(self.params));
        let parameters = json!({
            "DurationMinutes": "PT1M",
            "AutomationAssumeRole": self.import(EXPORT_IAM_ACCESS_ROLE_ARN),
            "AccessDenyPolicyArn": policy_arn,
            "TargetRoleName": self.param(PARAM_TARGET_ROLE_NAME),
        });
        let action = self.start_automation(
            "Deny Access to a S3 Resource Type for a Role.",
            EXPORT_IAM_ACCESS_DOC_NAME,
            parameters,
            "PT5M",
        );
        Self::with_action(&mut draft, AUTOMATION_ACTION, action);
        self.finish(draft)
    }

    // -------------------------------------------------------------------------
    // Lambda
    // -------------------------------------------------------------------------

    fn lambda_fault(self, mut draft: TemplateDraft) -> TemplateDraft {
        Self::with_action(
            &mut draft,
            "putParameterAction",
            ActionSpec::new("aws:ssm:put-parameter")
                .describe("Put config into parameter store")
                .param("duration", "PT10M")
                .param("name", self.param(PARAM_SSM_PARAMETER_NAME))
                .param("value", LAMBDA_CHAOS_ENABLED)
                .param("rollbackValue", LAMBDA_CHAOS_DISABLED),
        );
        self.finish(draft)
    }

    fn lambda_fault_automation(self, mut draft: TemplateDraft) -> TemplateDraft {
        let parameters = json!({
            "DurationMinutes": "PT1M",
            "AutomationAssumeRole": self.import(EXPORT_PUT_PARAMETER_ROLE_ARN),
            "ParameterName": self.param(PARAM_SSM_PARAMETER_NAME),
            "ParameterValue": LAMBDA_CHAOS_ENABLED,
            "RollbackValue": LAMBDA_CHAOS_DISABLED,
        });
        let action = self.start_automation(
            "Put config into parameter store to enable Lambda Chaos.",
            EXPORT_PUT_PARAMETER_DOC_NAME,
            parameters,
            "PT5M",
        );
        Self::with_action(&mut draft, AUTOMATION_ACTION, action);
        self.finish(draft)
    }
}

fn non_blank(value: String) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value]
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{finalize, FixedZone, SelectionMode};
    use crate::DeploymentContext;

    fn complete_params() -> FaultParams {
        let context = DeploymentContext::new("123456789012", "us-east-1")
            .with_zones(["us-east-1a", "us-east-1b", "us-east-1c"])
            .with_param(PARAM_VPC_ID, "vpc-1")
            .with_param(PARAM_ASG_NAME, "web-asg")
            .with_param(PARAM_TARGET_ROLE_NAME, "app-role")
            .with_param(PARAM_SECURITY_GROUP_ID, "sg-1")
            .with_param(PARAM_EKS_CLUSTER_NAME, "prod")
            .with_param(PARAM_SSM_PARAMETER_NAME, "/chaos/config")
            .with_param(PARAM_S3_BUCKET_TO_DENY, "data-bucket");
        let mut params = FaultParams::new(context);
        for kind in FaultKind::ALL {
            for reference in kind.required_imports() {
                let name = reference.output.as_str().to_string();
                params.imports.insert(name.clone(), format!("value-of-{}", name));
            }
        }
        params
    }

    #[test]
    fn names_round_trip() {
        for kind in FaultKind::ALL {
            assert_eq!(kind.as_str().parse::<FaultKind>().expect("parse"), kind);
        }
        assert!(matches!(
            "nope".parse::<FaultKind>(),
            Err(FisgraphError::UnknownFaultKind(_))
        ));
    }

    #[test]
    fn logical_ids_are_unique() {
        let ids: std::collections::BTreeSet<_> =
            FaultKind::ALL.iter().map(|k| k.logical_id()).collect();
        assert_eq!(ids.len(), FaultKind::ALL.len());
    }

    #[test]
    fn every_kind_assembles_against_complete_params() {
        let params = complete_params();
        for kind in FaultKind::ALL {
            let draft = kind.draft(&params, &FixedZone(1));
            let template = finalize(draft).expect(kind.as_str());
            assert_eq!(template.stop_conditions.len(), 1);
            assert_eq!(template.stop_conditions[0].source, STOP_SOURCE_ALARM);
            assert_eq!(template.role_arn, "value-of-FISIamRoleArn");
            assert_eq!(
                template.tags.get("Stackname").map(String::as_str),
                Some(format!("FIS-{}", kind.suite()).as_str())
            );
        }
    }

    #[test]
    fn suites_cover_every_kind() {
        let suites = [
            UNIT_EC2_INSTANCES,
            UNIT_EC2_CONTROL_PLANE,
            UNIT_NACL,
            UNIT_ASG,
            UNIT_EKS,
            UNIT_SECURITY_GROUP,
            UNIT_IAM_ACCESS,
            UNIT_LAMBDA,
        ];
        let total: usize = suites.iter().map(|s| FaultKind::in_suite(s).count()).sum();
        assert_eq!(total, FaultKind::ALL.len());
    }

    #[test]
    fn cpu_stress_uses_single_random_instance() {
        let template = finalize(FaultKind::CpuStressInstance.draft(&complete_params(), &FixedZone(0)))
            .expect("valid");
        let target = &template.targets[INSTANCE_TARGETS];
        assert_eq!(target.selection_mode, SelectionMode::Count(1));
        assert!(target.filters.iter().all(|f| f.path != "Placement.AvailabilityZone"));

        let action = &template.actions[INSTANCE_ACTIONS];
        assert_eq!(
            action.parameters["documentArn"],
            "arn:aws:ssm:us-east-1::document/AWSFIS-Run-CPU-Stress"
        );
        let doc: serde_json::Value =
            serde_json::from_str(&action.parameters["documentParameters"]).expect("json");
        assert_eq!(doc["DurationSeconds"], "120");
    }

    #[test]
    fn api_fault_targets_role_arn() {
        let template = finalize(FaultKind::ApiThrottleError.draft(&complete_params(), &FixedZone(0)))
            .expect("valid");
        let target = &template.targets["roleTargets"];
        assert_eq!(
            target.resource_arns,
            vec!["arn:aws:iam::123456789012:role/app-role".to_string()]
        );
        assert_eq!(
            template.actions["roleActions"].targets["Roles"],
            "roleTargets"
        );
    }

    #[test]
    fn nacl_fault_embeds_zone_and_imports() {
        let template = finalize(FaultKind::NaclFault.draft(&complete_params(), &FixedZone(2)))
            .expect("valid");
        assert!(template.targets.is_empty());
        let action = &template.actions[AUTOMATION_ACTION];
        assert_eq!(
            action.parameters["documentArn"],
            "arn:aws:ssm:us-east-1:123456789012:document/value-of-NaclSSMADocName"
        );
        let doc: serde_json::Value =
            serde_json::from_str(&action.parameters["documentParameters"]).expect("json");
        assert_eq!(doc["AvailabilityZone"], "us-east-1c");
        assert_eq!(doc["AutomationAssumeRole"], "value-of-SSMANaclRoleArn");
    }

    #[test]
    fn iam_access_references_deny_policy() {
        let params = complete_params();
        let template =
            finalize(FaultKind::IamAccessDenied.draft(&params, &FixedZone(0))).expect("valid");
        let doc: serde_json::Value = serde_json::from_str(
            &template.actions[AUTOMATION_ACTION].parameters["documentParameters"],
        )
        .expect("json");
        assert_eq!(
            doc["AccessDenyPolicyArn"],
            "arn:aws:iam::123456789012:policy/FIS-IamAccExp-s3-deny"
        );
    }

    #[test]
    fn missing_vpc_is_reported_once_as_parameter() {
        let mut params = complete_params();
        params.context.params.remove(PARAM_VPC_ID);
        let draft = FaultKind::CpuStressInstance.draft(&params, &FixedZone(0));
        assert_eq!(
            draft.violations,
            vec![Violation::MissingParameter(PARAM_VPC_ID.to_string())]
        );
    }
}

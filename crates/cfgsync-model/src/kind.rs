//! Entity kind catalogue
//!
//! Every configuration file maps to exactly one [`EntityKind`]. The order of
//! [`EntityKind::PROCESSING_ORDER`] is the dependency order between kinds:
//! anything a kind references appears earlier in the list.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Path rule for one kind
///
/// `expression` is matched against the path relative to the setup root and is
/// anchored at both ends when compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRule {
    /// Regular expression over the root-relative path
    pub expression: &'static str,
    /// Reject paths ending in `.yaml` (raw content stored next to its descriptor)
    pub excludes_yaml: bool,
}

impl PathRule {
    const fn yaml(expression: &'static str) -> Self {
        Self {
            expression,
            excludes_yaml: false,
        }
    }

    const fn content(expression: &'static str) -> Self {
        Self {
            expression,
            excludes_yaml: true,
        }
    }
}

/// Domain object represented by a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// Git connector used for configuration sync
    SourceRepoProvider,
    /// Account-wide default variables
    AccountDefaults,
    /// Account tag definitions
    Tag,
    /// Cloud provider connector
    CloudProvider,
    /// Artifact server connector
    ArtifactServer,
    /// Collaboration tool connector such as SMTP or Slack
    CollaborationProvider,
    /// Load balancer connector
    LoadBalancerProvider,
    /// Monitoring or verification connector
    VerificationProvider,
    /// Named set of notification recipients
    NotificationGroup,
    /// Account-level template library item
    GlobalTemplateLibrary,
    /// Application descriptor
    Application,
    /// Application-wide default variables
    ApplicationDefaults,
    /// Application-level template library item
    ApplicationTemplateLibrary,
    /// Service descriptor
    Service,
    /// Infrastructure provisioner
    Provisioner,
    /// Artifact source of a service
    ArtifactStream,
    /// Service command
    Command,
    /// Deployment specification of a service
    DeploymentSpecification,
    /// Raw content of a service config file
    ConfigFileContent,
    /// Descriptor of a service config file
    ConfigFile,
    /// Manifest descriptor of a service
    ApplicationManifest,
    /// File inside a service manifest
    ManifestFile,
    /// Service-level values override descriptor
    ValuesServiceOverride,
    /// Service-level values override file
    ManifestFileValuesServiceOverride,
    /// Environment descriptor
    Environment,
    /// Legacy infrastructure mapping
    InfraMapping,
    /// Continuous verification configuration
    CvConfiguration,
    /// Infrastructure definition
    InfraDefinition,
    /// Raw content of an environment config file override
    ConfigFileOverrideContent,
    /// Descriptor of an environment config file override
    ConfigFileOverride,
    /// Environment-level values override descriptor
    ValuesEnvOverride,
    /// Environment-level values override file
    ManifestFileValuesEnvOverride,
    /// Ordered deployment workflow
    Workflow,
    /// Pipeline of workflows and approvals
    Pipeline,
    /// Trigger that starts a workflow or pipeline
    Trigger,
    /// Deployment freeze and governance settings
    GovernanceConfig,
    /// Event subscription rule
    EventRule,
}

impl EntityKind {
    /// Global processing order
    ///
    /// Position `i` in this list has ordinal `i + 1`.
    pub const PROCESSING_ORDER: [EntityKind; 37] = [
        Self::SourceRepoProvider,
        Self::AccountDefaults,
        Self::Tag,
        Self::CloudProvider,
        Self::ArtifactServer,
        Self::CollaborationProvider,
        Self::LoadBalancerProvider,
        Self::VerificationProvider,
        Self::NotificationGroup,
        Self::GlobalTemplateLibrary,
        Self::Application,
        Self::ApplicationDefaults,
        Self::ApplicationTemplateLibrary,
        Self::Service,
        Self::Provisioner,
        Self::ArtifactStream,
        Self::Command,
        Self::DeploymentSpecification,
        Self::ConfigFileContent,
        Self::ConfigFile,
        Self::ApplicationManifest,
        Self::ManifestFile,
        Self::ValuesServiceOverride,
        Self::ManifestFileValuesServiceOverride,
        Self::Environment,
        Self::InfraMapping,
        Self::CvConfiguration,
        Self::InfraDefinition,
        Self::ConfigFileOverrideContent,
        Self::ConfigFileOverride,
        Self::ValuesEnvOverride,
        Self::ManifestFileValuesEnvOverride,
        Self::Workflow,
        Self::Pipeline,
        Self::Trigger,
        Self::GovernanceConfig,
        Self::EventRule,
    ];

    /// Path rule for this kind
    #[must_use]
    pub fn path_rule(self) -> PathRule {
        match self {
            Self::SourceRepoProvider => PathRule::yaml(r"Source Repo Provider/[^/]+\.yaml"),
            Self::AccountDefaults => PathRule::yaml(r"Defaults\.yaml"),
            Self::Tag => PathRule::yaml(r"Tags\.yaml"),
            Self::CloudProvider => PathRule::yaml(r"Cloud Providers/[^/]+\.yaml"),
            Self::ArtifactServer => PathRule::yaml(r"Artifact Servers/[^/]+\.yaml"),
            Self::CollaborationProvider => PathRule::yaml(r"Collaboration Providers/[^/]+\.yaml"),
            Self::LoadBalancerProvider => PathRule::yaml(r"Load Balancers/[^/]+\.yaml"),
            Self::VerificationProvider => PathRule::yaml(r"Verification Providers/[^/]+\.yaml"),
            Self::NotificationGroup => PathRule::yaml(r"Notification Groups/[^/]+\.yaml"),
            Self::GlobalTemplateLibrary => PathRule::yaml(r"Template Library/.+\.yaml"),
            Self::Application => PathRule::yaml(r"Applications/[^/]+/index\.yaml"),
            Self::ApplicationDefaults => PathRule::yaml(r"Applications/[^/]+/Defaults\.yaml"),
            Self::ApplicationTemplateLibrary => {
                PathRule::yaml(r"Applications/[^/]+/Template Library/.+\.yaml")
            }
            Self::Service => PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/index\.yaml"),
            Self::Provisioner => {
                PathRule::yaml(r"Applications/[^/]+/Infrastructure Provisioners/[^/]+\.yaml")
            }
            Self::ArtifactStream => {
                PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Artifact Servers/[^/]+\.yaml")
            }
            Self::Command => PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Commands/[^/]+\.yaml"),
            Self::DeploymentSpecification => PathRule::yaml(
                r"Applications/[^/]+/Services/[^/]+/Deployment Specifications/[^/]+\.yaml",
            ),
            Self::ConfigFileContent => {
                PathRule::content(r"Applications/[^/]+/Services/[^/]+/Config Files/.+")
            }
            Self::ConfigFile => PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Config Files/.+\.yaml"),
            Self::ApplicationManifest => {
                PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Manifests/Index\.yaml")
            }
            Self::ManifestFile => PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Manifests/Files/.+"),
            Self::ValuesServiceOverride => {
                PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Values/Index\.yaml")
            }
            Self::ManifestFileValuesServiceOverride => {
                PathRule::yaml(r"Applications/[^/]+/Services/[^/]+/Values/values\.yaml")
            }
            Self::Environment => PathRule::yaml(r"Applications/[^/]+/Environments/[^/]+/index\.yaml"),
            Self::InfraMapping => PathRule::yaml(
                r"Applications/[^/]+/Environments/[^/]+/Service Infrastructure/[^/]+\.yaml",
            ),
            Self::CvConfiguration => {
                PathRule::yaml(r"Applications/[^/]+/Environments/[^/]+/CV Configuration/[^/]+\.yaml")
            }
            Self::InfraDefinition => PathRule::yaml(
                r"Applications/[^/]+/Environments/[^/]+/Infrastructure Definitions/[^/]+\.yaml",
            ),
            Self::ConfigFileOverrideContent => {
                PathRule::content(r"Applications/[^/]+/Environments/[^/]+/Config Files/.+")
            }
            Self::ConfigFileOverride => {
                PathRule::yaml(r"Applications/[^/]+/Environments/[^/]+/Config Files/.+\.yaml")
            }
            Self::ValuesEnvOverride => {
                PathRule::yaml(r"Applications/[^/]+/Environments/[^/]+/Values/Index\.yaml")
            }
            Self::ManifestFileValuesEnvOverride => {
                PathRule::yaml(r"Applications/[^/]+/Environments/[^/]+/Values/values\.yaml")
            }
            Self::Workflow => PathRule::yaml(r"Applications/[^/]+/Workflows/[^/]+\.yaml"),
            Self::Pipeline => PathRule::yaml(r"Applications/[^/]+/Pipelines/[^/]+\.yaml"),
            Self::Trigger => PathRule::yaml(r"Applications/[^/]+/Triggers/[^/]+\.yaml"),
            Self::GovernanceConfig => PathRule::yaml(r"Governance/Deployment Governance\.yaml"),
            Self::EventRule => PathRule::yaml(r"Applications/[^/]+/Event Rules/[^/]+\.yaml"),
        }
    }

    /// Content is stored verbatim instead of being parsed as a document
    #[inline]
    #[must_use]
    pub fn is_raw_content(self) -> bool {
        matches!(
            self,
            Self::ConfigFileContent
                | Self::ConfigFileOverrideContent
                | Self::ManifestFile
                | Self::ManifestFileValuesServiceOverride
                | Self::ManifestFileValuesEnvOverride
        )
    }

    /// Singleton kinds whose files carry no entity identity of their own
    #[inline]
    #[must_use]
    pub fn skips_identity_check(self) -> bool {
        matches!(
            self,
            Self::Tag | Self::AccountDefaults | Self::ApplicationDefaults
        )
    }

    /// Recognized but no longer processed
    #[inline]
    #[must_use]
    pub fn is_deprecated(self) -> bool {
        matches!(self, Self::InfraMapping)
    }

    /// Stable uppercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceRepoProvider => "SOURCE_REPO_PROVIDER",
            Self::AccountDefaults => "ACCOUNT_DEFAULTS",
            Self::Tag => "TAG",
            Self::CloudProvider => "CLOUD_PROVIDER",
            Self::ArtifactServer => "ARTIFACT_SERVER",
            Self::CollaborationProvider => "COLLABORATION_PROVIDER",
            Self::LoadBalancerProvider => "LOAD_BALANCER_PROVIDER",
            Self::VerificationProvider => "VERIFICATION_PROVIDER",
            Self::NotificationGroup => "NOTIFICATION_GROUP",
            Self::GlobalTemplateLibrary => "GLOBAL_TEMPLATE_LIBRARY",
            Self::Application => "APPLICATION",
            Self::ApplicationDefaults => "APPLICATION_DEFAULTS",
            Self::ApplicationTemplateLibrary => "APPLICATION_TEMPLATE_LIBRARY",
            Self::Service => "SERVICE",
            Self::Provisioner => "PROVISIONER",
            Self::ArtifactStream => "ARTIFACT_STREAM",
            Self::Command => "COMMAND",
            Self::DeploymentSpecification => "DEPLOYMENT_SPECIFICATION",
            Self::ConfigFileContent => "CONFIG_FILE_CONTENT",
            Self::ConfigFile => "CONFIG_FILE",
            Self::ApplicationManifest => "APPLICATION_MANIFEST",
            Self::ManifestFile => "MANIFEST_FILE",
            Self::ValuesServiceOverride => "VALUES_SERVICE_OVERRIDE",
            Self::ManifestFileValuesServiceOverride => "MANIFEST_FILE_VALUES_SERVICE_OVERRIDE",
            Self::Environment => "ENVIRONMENT",
            Self::InfraMapping => "INFRA_MAPPING",
            Self::CvConfiguration => "CV_CONFIGURATION",
            Self::InfraDefinition => "INFRA_DEFINITION",
            Self::ConfigFileOverrideContent => "CONFIG_FILE_OVERRIDE_CONTENT",
            Self::ConfigFileOverride => "CONFIG_FILE_OVERRIDE",
            Self::ValuesEnvOverride => "VALUES_ENV_OVERRIDE",
            Self::ManifestFileValuesEnvOverride => "MANIFEST_FILE_VALUES_ENV_OVERRIDE",
            Self::Workflow => "WORKFLOW",
            Self::Pipeline => "PIPELINE",
            Self::Trigger => "TRIGGER",
            Self::GovernanceConfig => "GOVERNANCE_CONFIG",
            Self::EventRule => "EVENT_RULE",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn processing_order_lists_every_kind_once() {
        let unique: HashSet<_> = EntityKind::PROCESSING_ORDER.iter().collect();
        assert_eq!(unique.len(), EntityKind::PROCESSING_ORDER.len());
    }

    #[test]
    fn raw_content_rules_exclude_descriptors() {
        assert!(EntityKind::ConfigFileContent.path_rule().excludes_yaml);
        assert!(EntityKind::ConfigFileOverrideContent.path_rule().excludes_yaml);
        assert!(!EntityKind::ManifestFile.path_rule().excludes_yaml);
        assert!(!EntityKind::Service.path_rule().excludes_yaml);
    }

    #[test]
    fn identity_exempt_kinds() {
        assert!(EntityKind::Tag.skips_identity_check());
        assert!(EntityKind::AccountDefaults.skips_identity_check());
        assert!(!EntityKind::Service.skips_identity_check());
    }

    #[test]
    fn display_uses_stable_name() {
        assert_eq!(EntityKind::CloudProvider.to_string(), "CLOUD_PROVIDER");
        assert_eq!(EntityKind::EventRule.as_str(), "EVENT_RULE");
    }
}

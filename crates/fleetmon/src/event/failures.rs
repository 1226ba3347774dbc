//! Classification of cloud provider error codes into failure categories.

use serde::Serialize;

use crate::{FailedNodes, Map};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    IceFailures,
    VcpuLimitFailures,
    VolumeLimitFailures,
    CustomAmiErrors,
    IamPolicyErrors,
    OtherFailures,
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 6] = [
        FailureCategory::IceFailures,
        FailureCategory::VcpuLimitFailures,
        FailureCategory::VolumeLimitFailures,
        FailureCategory::CustomAmiErrors,
        FailureCategory::IamPolicyErrors,
        FailureCategory::OtherFailures,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::IceFailures => "ice-failures",
            FailureCategory::VcpuLimitFailures => "vcpu-limit-failures",
            FailureCategory::VolumeLimitFailures => "volume-limit-failures",
            FailureCategory::CustomAmiErrors => "custom-ami-errors",
            FailureCategory::IamPolicyErrors => "iam-policy-errors",
            FailureCategory::OtherFailures => "other-failures",
        }
    }
}

const FAILURE_CODES: &[(FailureCategory, &[&str])] = &[
    (
        FailureCategory::IceFailures,
        &[
            "InsufficientInstanceCapacity",
            "InsufficientHostCapacity",
            "InsufficientReservedInstanceCapacity",
            "MaxSpotInstanceCountExceeded",
            "Unsupported",
            "SpotMaxPriceTooLow",
        ],
    ),
    (FailureCategory::VcpuLimitFailures, &["VcpuLimitExceeded"]),
    (
        FailureCategory::VolumeLimitFailures,
        &["VolumeLimitExceeded", "InsufficientVolumeCapacity"],
    ),
    (FailureCategory::CustomAmiErrors, &["InvalidBlockDeviceMapping"]),
    (
        FailureCategory::IamPolicyErrors,
        &["UnauthorizedOperation", "AccessDeniedException"],
    ),
];

/// Maps a provider error code to its failure category.
/// Codes that are not known fall into [`FailureCategory::OtherFailures`].
pub fn classify(error_code: &str) -> FailureCategory {
    FAILURE_CODES
        .iter()
        .find(|(_, codes)| codes.contains(&error_code))
        .map(|(category, _)| *category)
        .unwrap_or(FailureCategory::OtherFailures)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureBucket {
    pub count: usize,
    pub errors: Map<String, Vec<String>>,
}

/// Failed nodes grouped by failure category and error code.
/// Every category is present, even when nothing failed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    total: usize,
    #[serde(flatten)]
    categories: Map<FailureCategory, FailureBucket>,
}

impl FailureDetail {
    pub fn build(failed_nodes: &FailedNodes) -> Self {
        let mut categories: Map<FailureCategory, FailureBucket> = FailureCategory::ALL
            .into_iter()
            .map(|category| (category, FailureBucket::default()))
            .collect();
        let mut total = 0;
        for (error_code, nodes) in failed_nodes {
            let bucket = categories.entry(classify(error_code)).or_default();
            bucket.count += nodes.len();
            bucket
                .errors
                .entry(error_code.clone())
                .or_default()
                .extend(nodes.iter().cloned());
            total += nodes.len();
        }
        Self { total, categories }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn bucket(&self, category: FailureCategory) -> &FailureBucket {
        &self.categories[&category]
    }
}

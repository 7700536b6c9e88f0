use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{CronJob, Job};
use kdash_core::{ComparableValue, PropertyName, ResourceKind};

use crate::{match_labels, ResourceObject};

/// `Complete`, `Failed`, `Running` or `Pending`, from the job's conditions
/// and active count.
pub fn job_status(job: &Job) -> &'static str {
    let Some(status) = job.status.as_ref() else { return "Pending" };
    let mut failed = false;
    for c in status.conditions.iter().flatten() {
        if c.status != "True" {
            continue;
        }
        match c.type_.as_str() {
            "Complete" => return "Complete",
            "Failed" => failed = true,
            _ => {}
        }
    }
    if failed {
        "Failed"
    } else if status.active.unwrap_or(0) > 0 {
        "Running"
    } else {
        "Pending"
    }
}

impl ResourceObject for Job {
    const RESOURCE_KIND: ResourceKind = ResourceKind::Job;

    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| s.selector.as_ref()).and_then(match_labels)
    }

    fn extra_property(&self, name: &str) -> Option<ComparableValue> {
        match name {
            PropertyName::STATUS => Some(ComparableValue::string(job_status(self))),
            _ => None,
        }
    }
}

// Cron jobs own jobs, not pods directly.
impl ResourceObject for CronJob {
    const RESOURCE_KIND: ResourceKind = ResourceKind::CronJob;
    const HAS_METRICS: bool = false;
}

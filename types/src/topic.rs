//! Queue topic naming.

/// Suffix appended to the application id to form the work topic.
const WORK_TOPIC_SUFFIX: &str = "-ledger-anchor";

/// The topic carrying record references for one deployment.
///
/// Scoping the topic by application id keeps independent deployments that
/// share a broker from cross-consuming each other's messages.
pub fn work_topic(app_id: &str) -> String {
    format!("{app_id}{WORK_TOPIC_SUFFIX}")
}

//! Detection of the batch cluster a job is running on.
//!
//! The engine only consumes a [`ClusterProfile`]; this module is the single place that reads the
//! scheduler environment to build one.

use qcrescue::engine::config::ClusterProfile;
use tracing::debug;

const HOPPER_QUEUE_MARKERS: [&str; 2] = ["hopque", "edique"];
const HOPPER_CPUS: usize = 24;
const HOPPER_EMPTY_INPUT_BACKOFF_SECS: u64 = 30 * 60;

/// Builds the profile from the process environment.
pub fn detect_from_env() -> ClusterProfile {
    detect(|key| std::env::var(key).ok())
}

/// Builds the profile from an arbitrary variable lookup.
pub fn detect<F>(lookup: F) -> ClusterProfile
where
    F: Fn(&str) -> Option<String>,
{
    let profile = if lookup("PBS_JOBID")
        .is_some_and(|id| HOPPER_QUEUE_MARKERS.iter().any(|marker| id.contains(marker)))
    {
        ClusterProfile::new(
            "hopper",
            HOPPER_CPUS,
            Some(HOPPER_EMPTY_INPUT_BACKOFF_SECS),
        )
    } else {
        match lookup("NERSC_HOST").as_deref() {
            Some("cori") => ClusterProfile::new("cori", 32, None),
            Some("edison") => ClusterProfile::new("edison", 24, None),
            _ => ClusterProfile::generic(),
        }
    };
    debug!(
        cluster = %profile.name,
        cpus = profile.assumed_cpus,
        "Detected cluster profile."
    );
    profile
}

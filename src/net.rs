use lazy_static::lazy_static;
use std::time::Duration;

lazy_static! {
    pub static ref UREQ_AGENT: ureq::Agent = {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(120)))
            .build();
        config.into()
    };

    /// Short-timeout agent used only for the connectivity probe.
    static ref PROBE_AGENT: ureq::Agent = {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(3)))
            .build();
        config.into()
    };
}

/// Check if an internet connection is available.
pub fn is_online() -> bool {
    PROBE_AGENT.head("https://www.google.com").call().is_ok()
}

use crate::commands::builtin::{value_of, values_of};
use clap::ArgMatches;
use log::debug;
use netconf_codec::capability::CapabilitySet;
use netconf_codec::session::Session;
use netconf_codec::{NETCONF_CANDIDATE_CAP, NETCONF_STARTUP_CAP};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inner: Arc<Config>,
}

#[derive(Debug)]
pub struct Config {
    pub args: ArgMatches,
    pub verbosity: u8,
    pub quiet: bool,
    pub session: Session,
}

impl CliConfig {
    pub fn new(args: ArgMatches) -> anyhow::Result<Self> {
        let verbosity = *value_of::<u8>("verbose", &args)?;
        let quiet = *value_of::<bool>("quiet", &args)?;
        let session_id = value_of::<String>("session-id", &args)?.clone();
        let capabilities = capabilities(values_of::<String>("capability", &args));
        debug!(
            "Session {} with {} capabilities",
            session_id,
            capabilities.len()
        );
        Ok(Self {
            inner: Arc::new(Config {
                verbosity,
                quiet,
                session: Session::new(session_id.as_str(), capabilities),
                args,
            }),
        })
    }
}

impl Config {
    pub fn capabilities(&self) -> &CapabilitySet {
        self.session.capabilities()
    }
}

fn capabilities(given: Vec<&String>) -> CapabilitySet {
    if given.is_empty() {
        let mut capabilities = CapabilitySet::base();
        capabilities.insert(NETCONF_CANDIDATE_CAP);
        capabilities.insert(NETCONF_STARTUP_CAP);
        return capabilities;
    }
    given
        .into_iter()
        .map(|capability| capability.trim())
        .filter(|capability| !capability.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netconf_codec::NETCONF_BASE_10_CAP;

    #[test]
    fn test_default_capabilities() {
        let capabilities = capabilities(Vec::new());
        assert!(capabilities.has_capability(NETCONF_BASE_10_CAP));
        assert!(capabilities.has_capability(NETCONF_CANDIDATE_CAP));
        assert!(capabilities.has_capability(NETCONF_STARTUP_CAP));
    }

    #[test]
    fn test_given_capabilities() {
        let given = vec![
            NETCONF_BASE_10_CAP.to_string(),
            " ".to_string(),
            NETCONF_BASE_10_CAP.to_string(),
        ];
        let capabilities = capabilities(given.iter().collect());
        assert_eq!(capabilities.len(), 1);
        assert!(!capabilities.has_capability(NETCONF_CANDIDATE_CAP));
    }
}

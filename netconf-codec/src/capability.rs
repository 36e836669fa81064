use crate::error::{CodecError, CodecResult};
use crate::operation::{Datastore, ErrorOption, Operation};
use crate::{
    NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP, NETCONF_CANDIDATE_CAP, NETCONF_ROLLBACK_ON_ERROR_CAP,
    NETCONF_STARTUP_CAP,
};

/// Capabilities advertised in a `<hello>`, kept in insertion order.
///
/// The set is owned by the session layer; the codec only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: Vec<String>,
}

impl CapabilitySet {
    pub fn new() -> CapabilitySet {
        CapabilitySet::default()
    }

    /// Base 1.0 and 1.1 only.
    pub fn base() -> CapabilitySet {
        [NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP]
            .into_iter()
            .collect()
    }

    /// Adds `capability` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, capability: impl Into<String>) -> bool {
        let capability = capability.into();
        if self.capabilities.contains(&capability) {
            return false;
        }
        self.capabilities.push(capability);
        true
    }

    /// Matches on the capability URI with any `?` query parameters removed.
    pub fn has_capability(&self, capability: &str) -> bool {
        let wanted = strip_parameters(capability);
        self.capabilities
            .iter()
            .any(|cap| strip_parameters(cap) == wanted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn supports_datastore(&self, datastore: Datastore) -> bool {
        match datastore {
            Datastore::Running => true,
            Datastore::Candidate => self.has_capability(NETCONF_CANDIDATE_CAP),
            Datastore::Startup => self.has_capability(NETCONF_STARTUP_CAP),
            Datastore::None => false,
        }
    }

    /// Checks the capability-dependent legality of `operation`.
    ///
    /// Encoders only enforce structural rules, so callers run this against the
    /// peer's capabilities before building a request.
    pub fn check(&self, operation: &Operation) -> CodecResult<()> {
        for datastore in operation.datastores() {
            if datastore != Datastore::None && !self.supports_datastore(datastore) {
                return Err(CodecError::UnsupportedCapability {
                    capability: required_capability(datastore).to_string(),
                });
            }
        }
        if let Operation::EditConfig(edit) = operation {
            if edit.error_option == Some(ErrorOption::RollbackOnError)
                && !self.has_capability(NETCONF_ROLLBACK_ON_ERROR_CAP)
            {
                return Err(CodecError::UnsupportedCapability {
                    capability: NETCONF_ROLLBACK_ON_ERROR_CAP.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = CapabilitySet::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

fn strip_parameters(capability: &str) -> &str {
    match capability.split_once('?') {
        Some((uri, _)) => uri,
        None => capability,
    }
}

fn required_capability(datastore: Datastore) -> &'static str {
    match datastore {
        Datastore::Candidate => NETCONF_CANDIDATE_CAP,
        Datastore::Startup => NETCONF_STARTUP_CAP,
        Datastore::Running | Datastore::None => NETCONF_BASE_10_CAP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::EditConfig;
    use crate::Fragment;

    #[test]
    fn test_insertion_order_and_dedup() {
        let mut caps = CapabilitySet::base();
        assert!(caps.insert(NETCONF_CANDIDATE_CAP));
        assert!(!caps.insert(NETCONF_BASE_10_CAP));
        let all: Vec<&str> = caps.iter().collect();
        assert_eq!(
            all,
            vec![NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP, NETCONF_CANDIDATE_CAP]
        );
    }

    #[test]
    fn test_capability_parameters_ignored() {
        let caps: CapabilitySet = ["urn:ietf:params:netconf:capability:startup:1.0?module=x"]
            .into_iter()
            .collect();
        assert!(caps.has_capability(NETCONF_STARTUP_CAP));
        assert!(caps.supports_datastore(Datastore::Startup));
        assert!(!caps.supports_datastore(Datastore::Candidate));
    }

    #[test]
    fn test_check_gates_datastores() {
        let caps = CapabilitySet::base();
        assert!(caps
            .check(&Operation::Lock {
                target: Datastore::Running
            })
            .is_ok());
        match caps.check(&Operation::Lock {
            target: Datastore::Candidate,
        }) {
            Err(CodecError::UnsupportedCapability { capability }) => {
                assert_eq!(capability, NETCONF_CANDIDATE_CAP)
            }
            other => panic!("expected UnsupportedCapability, got {:?}", other),
        }
    }

    #[test]
    fn test_check_gates_rollback_on_error() {
        let edit = Operation::EditConfig(EditConfig {
            target: Datastore::Running,
            default_operation: None,
            error_option: Some(ErrorOption::RollbackOnError),
            config: Fragment::parse("<top/>").unwrap(),
        });
        assert!(CapabilitySet::base().check(&edit).is_err());

        let mut caps = CapabilitySet::base();
        caps.insert(NETCONF_ROLLBACK_ON_ERROR_CAP);
        assert!(caps.check(&edit).is_ok());
    }
}

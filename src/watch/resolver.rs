use crate::api::ApiClient;
use crate::types::{Address, NodeDirectoryEntry};
use crate::watch::status::FetchError;

/// Remote half of identity resolution: the wallet's claim history carries the
/// node id it last claimed under.
pub trait ClaimLookup {
    fn claim_history_node_id(&self, address: &Address) -> Result<Option<String>, FetchError>;
}

impl ClaimLookup for ApiClient {
    fn claim_history_node_id(&self, address: &Address) -> Result<Option<String>, FetchError> {
        ApiClient::claim_history_node_id(self, address.as_str())
    }
}

/// Maps wallet addresses to node identities via the active-node directory,
/// falling back to claim history for wallets the directory has dropped.
///
/// Resolution is fail-soft: any failure, including the remote leg erroring
/// out, resolves to "no node" rather than an error the caller must handle.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    directory: Vec<NodeDirectoryEntry>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory wholesale with a fresh listing.
    pub fn install_directory(&mut self, entries: Vec<NodeDirectoryEntry>) {
        self.directory = entries;
    }

    pub fn directory(&self) -> &[NodeDirectoryEntry] {
        &self.directory
    }

    /// Resolve `address` to a node identity. The directory is consulted
    /// first; only a miss there goes to the network.
    pub fn resolve(&self, lookup: &dyn ClaimLookup, address: &Address) -> Option<String> {
        if let Some(entry) = self.directory.iter().find(|entry| {
            entry
                .address
                .as_deref()
                .is_some_and(|candidate| address.matches(candidate))
        }) {
            return Some(entry.node_id.clone());
        }

        lookup.claim_history_node_id(address).ok().flatten()
    }

    /// Reverse lookup for rendering: the wallet the directory lists for a
    /// node identity. Directory-only, no remote leg.
    pub fn address_of(&self, node_id: &str) -> Option<Address> {
        self.directory
            .iter()
            .find(|entry| entry.node_id == node_id)
            .and_then(|entry| entry.address.as_deref())
            .and_then(Address::parse)
    }
}

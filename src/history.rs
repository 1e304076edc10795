//! Invocation History Loading
//!
//! Converts raw (caller, function, count, success) call records into the
//! dense user map, function list and the boolean/integer matrices the rest
//! of the pipeline operates on.
//!
//! ## Rules
//!
//! - `"Contract Creation"` records and failed calls are discarded.
//! - Callers are lowercased; the first sighting of an address assigns the
//!   next unused dense user id.
//! - Records whose method name is unknown fall back to the 4-byte selector;
//!   a resolver may map selectors to names, unresolved selectors stay hex.
//! - Multiple records for the same (user, function) sum into the frequency
//!   matrix; the permission matrix is derived as `F > 0`.

use crate::interfaces::SelectorResolver;
use crate::matrix::{FrequencyMatrix, PermissionMatrix};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Synthetic record name assigned by block explorers to deployment
/// transactions. Never a permission.
pub const CONTRACT_CREATION: &str = "Contract Creation";

/// One observed caller→function aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Caller address, any casing
    pub caller: String,
    /// Resolved method name or hex selector
    pub function: String,
    /// Number of observed invocations
    pub count: u64,
    /// Whether the calls succeeded
    pub success: bool,
}

/// Success field of the crawler document: either a boolean or 0/1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum SuccessFlag {
    /// JSON boolean form
    Bool(bool),
    /// JSON integer form (0 or 1)
    Int(i64),
}

impl SuccessFlag {
    fn as_bool(self) -> bool {
        match self {
            SuccessFlag::Bool(b) => b,
            SuccessFlag::Int(i) => i == 1,
        }
    }
}

/// Transaction-history document as produced by the crawler
/// (`data.ethereum.smartContractCalls[*]`)
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryDocument {
    data: DocumentData,
}

#[derive(Debug, Clone, Deserialize)]
struct DocumentData {
    ethereum: EthereumSection,
}

#[derive(Debug, Clone, Deserialize)]
struct EthereumSection {
    #[serde(rename = "smartContractCalls")]
    smart_contract_calls: Vec<CallEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallEntry {
    caller: CallerField,
    count: u64,
    #[serde(rename = "smartContractMethod")]
    smart_contract_method: MethodField,
    success: SuccessFlag,
}

#[derive(Debug, Clone, Deserialize)]
struct CallerField {
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MethodField {
    name: Option<String>,
    #[serde(rename = "signatureHash")]
    signature_hash: Option<String>,
}

impl HistoryDocument {
    /// Parse a crawler document from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Flatten the document into call records, resolving selectors through
    /// `resolver`. Methods with a null name use the selector; selectors the
    /// resolver cannot map stay as their hex string.
    pub fn into_records(self, resolver: &dyn SelectorResolver) -> Vec<CallRecord> {
        self.data
            .ethereum
            .smart_contract_calls
            .into_iter()
            .map(|entry| {
                let function = match entry.smart_contract_method.name {
                    Some(name) => name,
                    None => {
                        let selector = normalize_selector(
                            entry.smart_contract_method.signature_hash.as_deref().unwrap_or(""),
                        );
                        resolver.resolve(&selector).unwrap_or(selector)
                    }
                };
                CallRecord {
                    caller: entry.caller.address,
                    function,
                    count: entry.count,
                    success: entry.success.as_bool(),
                }
            })
            .collect()
    }
}

/// Prefix a bare selector with `0x`
fn normalize_selector(selector: &str) -> String {
    if selector.is_empty() || selector.starts_with("0x") {
        selector.to_string()
    } else {
        format!("0x{selector}")
    }
}

/// Dense user-id assignment: `UserId ↔ lowercased address`
#[derive(Debug, Clone, Default)]
pub struct UserMap {
    ids: HashMap<String, usize>,
    addresses: Vec<String>,
}

impl UserMap {
    /// Create an empty map
    pub fn new() -> Self {
        UserMap::default()
    }

    /// Id for `address`, assigning the next unused id on first sight.
    /// Addresses are canonicalized by lowercasing.
    pub fn id_of(&mut self, address: &str) -> usize {
        let canonical = address.to_lowercase();
        if let Some(&id) = self.ids.get(&canonical) {
            return id;
        }
        let id = self.addresses.len();
        self.ids.insert(canonical.clone(), id);
        self.addresses.push(canonical);
        id
    }

    /// Look up an already-assigned id
    pub fn get(&self, address: &str) -> Option<usize> {
        self.ids.get(&address.to_lowercase()).copied()
    }

    /// Canonical address for a user id
    pub fn address(&self, id: usize) -> &str {
        &self.addresses[id]
    }

    /// Number of distinct users
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// True when no users have been assigned
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Loaded history: user map, function universe and both matrices
#[derive(Debug, Clone)]
pub struct History {
    /// Dense user-id assignment
    pub user_map: UserMap,
    /// Function identifiers in first-observed order
    pub functions: Vec<String>,
    /// Boolean user×function matrix
    pub permissions: PermissionMatrix,
    /// Integer user×function call-count matrix
    pub frequencies: FrequencyMatrix,
}

impl History {
    /// Build matrices from call records.
    ///
    /// Empty input yields empty matrices, not an error.
    pub fn load(records: impl IntoIterator<Item = CallRecord>) -> History {
        let mut user_map = UserMap::new();
        let mut functions: Vec<String> = Vec::new();
        let mut function_ids: HashMap<String, usize> = HashMap::new();
        let mut triples: Vec<(usize, usize, u64)> = Vec::new();

        for record in records {
            if record.function == CONTRACT_CREATION || !record.success {
                continue;
            }
            let user = user_map.id_of(&record.caller);
            let function = *function_ids.entry(record.function.clone()).or_insert_with(|| {
                functions.push(record.function.clone());
                functions.len() - 1
            });
            triples.push((user, function, record.count));
        }

        let mut frequencies = FrequencyMatrix::new(user_map.len(), functions.len());
        for (user, function, count) in triples {
            frequencies.add(user, function, count);
        }

        let mut permissions = PermissionMatrix::new(user_map.len(), functions.len());
        for user in 0..user_map.len() {
            for function in 0..functions.len() {
                if frequencies.get(user, function) > 0 {
                    permissions.set(user, function);
                }
            }
        }

        debug!(
            users = user_map.len(),
            functions = functions.len(),
            "loaded invocation history"
        );

        History {
            user_map,
            functions,
            permissions,
            frequencies,
        }
    }

    /// Distinct successful (caller, function) pairs
    pub fn unique_successful_pairs(&self) -> usize {
        (0..self.permissions.users())
            .map(|u| self.permissions.row(u).count())
            .sum()
    }
}

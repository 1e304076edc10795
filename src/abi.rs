//! Contract ABI Handling
//!
//! Parses a contract ABI JSON, computes 4-byte selectors for each function
//! signature and exposes a [`SelectorResolver`] so history records whose
//! method name is unknown can be mapped back to a human-readable name.

use crate::error::{MiningError, MiningResult};
use crate::interfaces::SelectorResolver;
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;

/// One entry of a contract ABI
#[derive(Debug, Clone, Deserialize)]
pub struct AbiEntry {
    /// Entry kind: "function", "event", "constructor", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Function or event name
    #[serde(default)]
    pub name: Option<String>,
    /// Input parameters
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    /// "view", "pure", "nonpayable" or "payable"
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
}

/// One ABI function parameter
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    /// Solidity type of the parameter
    #[serde(rename = "type")]
    pub kind: String,
}

/// Parsed contract ABI
#[derive(Debug, Clone)]
pub struct ContractAbi {
    entries: Vec<AbiEntry>,
}

impl ContractAbi {
    /// Parse an ABI from JSON text
    pub fn from_json(text: &str) -> MiningResult<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(text)
            .map_err(|e| MiningError::InputMalformed(format!("ABI: {e}")))?;
        Ok(ContractAbi { entries })
    }

    /// Names of public functions that can mutate state (not view/pure)
    pub fn mutable_functions(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == "function")
            .filter(|entry| {
                !matches!(
                    entry.state_mutability.as_deref(),
                    Some("view") | Some("pure")
                )
            })
            .filter_map(|entry| entry.name.clone())
            .collect()
    }

    /// Canonical signature `name(type1,type2,...)` for one entry
    fn signature(entry: &AbiEntry) -> Option<String> {
        let name = entry.name.as_deref()?;
        let params: Vec<&str> = entry.inputs.iter().map(|p| p.kind.as_str()).collect();
        Some(format!("{}({})", name, params.join(",")))
    }

    /// Selector → name mapping over all ABI functions
    pub fn selector_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == "function")
            .filter_map(|entry| {
                let sig = Self::signature(entry)?;
                let name = entry.name.clone()?;
                Some((selector(&sig), name))
            })
            .collect()
    }

    /// Resolver backed by this ABI's selector map
    pub fn resolver(&self) -> AbiResolver {
        AbiResolver {
            selectors: self.selector_map(),
        }
    }
}

/// 4-byte selector of a canonical signature, as `0x`-prefixed hex
pub fn selector(signature: &str) -> String {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = String::with_capacity(10);
    out.push_str("0x");
    for byte in &digest[..4] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// [`SelectorResolver`] backed by a contract ABI
#[derive(Debug, Clone)]
pub struct AbiResolver {
    selectors: HashMap<String, String>,
}

impl SelectorResolver for AbiResolver {
    fn resolve(&self, selector: &str) -> Option<String> {
        self.selectors.get(selector).cloned()
    }
}

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// feature flags advertised to the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Capability {
    /// remote activation via ASM_FEATURES
    AsmActivation,
    /// ip blocking data from ASM_DATA
    AsmIpBlocking,
    /// rules from ASM_DD
    AsmDdRules,
    /// exclusion filters via ASM
    AsmExclusions,
    AsmRequestBlocking,
    AsmResponseBlocking,
    /// user blocking data from ASM_DATA
    AsmUserBlocking,
    AsmCustomRules,
    /// custom status code or redirect when blocking
    AsmCustomBlockingResponse,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::AsmActivation,
        Capability::AsmIpBlocking,
        Capability::AsmDdRules,
        Capability::AsmExclusions,
        Capability::AsmRequestBlocking,
        Capability::AsmResponseBlocking,
        Capability::AsmUserBlocking,
        Capability::AsmCustomRules,
        Capability::AsmCustomBlockingResponse,
    ];

    /// bit position in the capability mask
    pub fn bit(&self) -> u32 {
        match self {
            Capability::AsmActivation => 1,
            Capability::AsmIpBlocking => 2,
            Capability::AsmDdRules => 3,
            Capability::AsmExclusions => 4,
            Capability::AsmRequestBlocking => 5,
            Capability::AsmResponseBlocking => 6,
            Capability::AsmUserBlocking => 7,
            Capability::AsmCustomRules => 8,
            Capability::AsmCustomBlockingResponse => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::AsmActivation => "asm_activation",
            Capability::AsmIpBlocking => "asm_ip_blocking",
            Capability::AsmDdRules => "asm_dd_rules",
            Capability::AsmExclusions => "asm_exclusions",
            Capability::AsmRequestBlocking => "asm_request_blocking",
            Capability::AsmResponseBlocking => "asm_response_blocking",
            Capability::AsmUserBlocking => "asm_user_blocking",
            Capability::AsmCustomRules => "asm_custom_rules",
            Capability::AsmCustomBlockingResponse => "asm_custom_blocking_response",
        }
    }

    /// capabilities enabled when nothing is configured
    pub fn defaults() -> Vec<Capability> {
        vec![
            Capability::AsmIpBlocking,
            Capability::AsmUserBlocking,
            Capability::AsmCustomRules,
            Capability::AsmExclusions,
            Capability::AsmRequestBlocking,
            Capability::AsmResponseBlocking,
            Capability::AsmDdRules,
        ]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownCapability(s.to_string()))
    }
}

impl TryFrom<String> for Capability {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// combined bit mask
pub fn mask(capabilities: &[Capability]) -> u64 {
    capabilities.iter().fold(0, |acc, c| acc | (1u64 << c.bit()))
}

/// mask as minimal big-endian bytes, base64 encoded
pub fn encode(capabilities: &[Capability]) -> String {
    let bytes = mask(capabilities).to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    BASE64.encode(&bytes[start..])
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token deployment flavor: a fresh OFT mint, or an adapter locking an
/// existing token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OftType {
    #[serde(rename = "OFT")]
    Oft,
    #[serde(rename = "OFTAdapter")]
    OftAdapter,
}

impl OftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OftType::Oft => "OFT",
            OftType::OftAdapter => "OFTAdapter",
        }
    }
}

impl fmt::Display for OftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message types carried by enforced options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MsgType {
    Send = 1,
    SendAndCall = 2,
}

impl MsgType {
    pub fn all() -> Vec<MsgType> {
        vec![MsgType::Send, MsgType::SendAndCall]
    }

    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// A token resolved for one chain: its flavor there, plus the pre-existing
/// token address when the flavor is an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub oft_type: OftType,
    /// Existing token locked by the adapter; None for fresh OFT mints
    pub token: Option<String>,
}

impl TokenInfo {
    /// Stable deployment name, the same on every chain for a given
    /// token and flavor
    pub fn deploy_name(&self) -> String {
        format!("{}{}", self.name, self.oft_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_name_is_stable() {
        let oft = TokenInfo {
            name: "Rocket".to_string(),
            oft_type: OftType::Oft,
            token: None,
        };
        assert_eq!(oft.deploy_name(), "RocketOFT");
        assert_eq!(oft.deploy_name(), oft.deploy_name());

        let adapter = TokenInfo {
            name: "Rocket".to_string(),
            oft_type: OftType::OftAdapter,
            token: Some("0x0b2c639c533813f4aa9d7837caf62653d097ff85".to_string()),
        };
        assert_eq!(adapter.deploy_name(), "RocketOFTAdapter");
    }

    #[test]
    fn test_msg_type_codes() {
        assert_eq!(MsgType::Send.as_u16(), 1);
        assert_eq!(MsgType::SendAndCall.as_u16(), 2);
        assert_eq!(MsgType::all().len(), 2);
    }

    #[test]
    fn test_oft_type_serde_names() {
        assert_eq!(serde_json::to_string(&OftType::Oft).unwrap(), "\"OFT\"");
        assert_eq!(
            serde_json::to_string(&OftType::OftAdapter).unwrap(),
            "\"OFTAdapter\""
        );
        let parsed: OftType = serde_json::from_str("\"OFTAdapter\"").unwrap();
        assert_eq!(parsed, OftType::OftAdapter);
    }
}

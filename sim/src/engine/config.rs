// Copyright (c) 2023 The Kaspa Ledger Developers

/// Order in which per-input signatures are returned
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
pub enum SignatureOrder {
    /// Input declaration order
    #[default]
    Declared,
    /// Reverse declaration order
    Reversed,
}

/// [Engine](super::Engine) configuration
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Application name
    pub name: String,
    /// Application version (major, minor, patch)
    pub version: [u8; 3],
    /// Maximum personal message length the device will display
    pub message_limit: usize,
    /// Signature emission order
    pub order: SignatureOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "Kaspa".to_string(),
            version: [1, 1, 0],
            message_limit: 200,
            order: SignatureOrder::Declared,
        }
    }
}

impl EngineConfig {
    /// Version string (`major.minor.patch`)
    pub fn version_string(&self) -> String {
        let [major, minor, patch] = self.version;
        format!("{major}.{minor}.{patch}")
    }
}

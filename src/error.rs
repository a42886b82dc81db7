use crate::model::Chain;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Signer error: {0}")]
    Sign(#[from] SignError),

    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised while resolving declarative configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config not found at {path}")]
    NotFound { path: String },

    #[error("Unknown token {name}, available: {available}")]
    UnknownToken { name: String, available: String },

    #[error("Missing config section: {0}")]
    MissingSection(String),

    #[error("Invalid config value at {path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

/// Errors raised while computing pending changes
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Unsupported chain: {0:?}")]
    UnsupportedChain(Chain),

    #[error("Wireable family mismatch: expected {expected:?}, got {actual:?}")]
    WireableChainMismatch {
        expected: crate::model::ChainFamily,
        actual: crate::model::ChainFamily,
    },

    #[error("Deployment not found: {reference} on {network}")]
    DeploymentNotFound { reference: String, network: String },

    #[error("Invalid address {address}: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Invalid enforced options blob: {0}")]
    InvalidOptions(String),

    #[error("Chain read failed on {chain:?}: {message}")]
    ChainReadFailed { chain: Chain, message: String },

    #[error("Account decode failed for {account}: {message}")]
    AccountDecodeFailed { account: String, message: String },
}

/// Errors raised while matching or deriving signing keys
#[derive(Error, Debug)]
pub enum SignError {
    #[error("Unknown signer {0}")]
    UnknownSigner(String),

    #[error("No key for alias {alias} on {stage:?} {family:?}")]
    MissingKey {
        stage: crate::model::Stage,
        family: crate::model::ChainFamily,
        alias: String,
    },

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Invalid mnemonic: {0}")]
    Mnemonic(String),
}

/// Errors raised while building, sending or confirming transactions
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Send failed on {chain:?}: {message}")]
    SendFailed { chain: Chain, message: String },

    #[error("Transaction simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Confirmation timeout for {0}")]
    ConfirmationTimeout(String),

    #[error("Transaction too large: {size} bytes, limit {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Lookup table not active: {0}")]
    LookupTableInactive(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(error: hex::FromHexError) -> Self {
        AppError::InvalidInput(format!("Hex decode error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(ConfigError::Environment(error.to_string()))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;

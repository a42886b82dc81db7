pub mod chain;
pub mod deployment;
pub mod token;

pub use chain::{Chain, ChainFamily, Eid, Network, Stage};
pub use deployment::{Deployment, DeploymentRegistry, StaticDeployments};
pub use token::{MsgType, OftType, TokenInfo};

mod env;
mod load;
mod parse;
mod types;

pub use types::{
    ActivationMode, AppConfig, NetworkKind, NetworkProfile, NodeBackendKind, NodeConfig,
    PlanConfig, WalletConfig,
};

pub use load::load_config;

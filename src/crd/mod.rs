//! Custom Resource Definitions (CRDs) for gameserver-operator.
//!
//! - `ComputeInstance`: mirror of a database-managed game server
//! - `ProxyInstance`: mirror of a database-managed proxy

mod compute_instance;
mod proxy_instance;
mod status;

pub use compute_instance::*;
pub use proxy_instance::*;
pub use status::*;

//! Shared types for the ledger transaction harness.
//!
//! Value objects only: amounts, intents, submission outcomes and the report
//! records written at the end of a run. Nothing here touches the network.

pub mod account;
pub mod amount;
pub mod intent;
pub mod network;
pub mod outcome;
pub mod report;

pub use account::*;
pub use amount::*;
pub use intent::*;
pub use network::*;
pub use outcome::*;
pub use report::*;

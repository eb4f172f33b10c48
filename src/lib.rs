pub mod capability;
pub mod config;
pub mod element;
pub mod error;
pub mod oracle;
#[cfg(feature = "threads")]
pub mod parallel;
pub mod portable;
pub mod registry;
pub mod workload;
pub mod xor;

pub use capability::{Capabilities, Capability};
pub use config::Config;
pub use element::{Element, ElementWidth};
pub use error::Error;
pub use registry::Registry;
pub use workload::{ParallelWorkload, SharedBuffer, Workload};
pub use xor::{Kind, Xor};

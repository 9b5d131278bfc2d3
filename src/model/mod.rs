pub mod directory;
pub mod records;
pub mod tree;

pub use directory::{DirectoryRole, DirectoryUser};
pub use records::{Broker, BrokerPatch, Config, Employer, EmployerPatch, Tpa, TpaPatch};
pub use tree::TreeError;

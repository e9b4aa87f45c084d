//! Pipeline registers, the issue unit, hazard detection and forwarding.

pub mod forwarding;
pub mod hazards;
pub mod issue;
pub mod latches;

pub use forwarding::{ForwardSource, ForwardingUnit};
pub use hazards::{DataHazardUnit, MemoryHazardUnit};
pub use issue::InstructionIssueUnit;
pub use latches::{ExMemRegister, IdExRegister, IfIdRegister, MemWbRegister, StageLine};

//! Metric builders: one per host resource family.
//!
//! Builders are invoked in a fixed order by the reporting cycle. Load and
//! memory degrade on their own; CPU and disk discard everything they gathered
//! as soon as one of their queries fails.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;

pub use cpu::CpuBuilder;
pub use disk::{DeviceFilter, DiskBuilder};
pub use load::LoadBuilder;
pub use memory::MemoryBuilder;

use crate::core::MetricBuilder;
use crate::host::HostIdentity;
use std::sync::Arc;

/// Returns the node builders in reporting order: load, CPU, memory, disk.
pub fn node_builders(identity: Arc<HostIdentity>, filter: DeviceFilter) -> Vec<Box<dyn MetricBuilder>> {
    vec![
        Box::new(LoadBuilder::new(identity.clone())),
        Box::new(CpuBuilder::new(identity.clone())),
        Box::new(MemoryBuilder::new(identity.clone())),
        Box::new(DiskBuilder::new(identity, filter)),
    ]
}

//! Budget allocation across scored instruments.

pub mod allocator;
pub mod concentration;

pub use allocator::{
    allocate, Allocation, AllocationConfig, AllocationError, AllocationMap, BudgetShortfall,
};
pub use concentration::Concentration;

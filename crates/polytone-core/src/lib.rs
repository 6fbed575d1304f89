pub mod allocator;
pub mod controller_map;
pub mod controls;
pub mod diagnostics;
pub mod processor;
pub mod startup;
pub mod tuning_store;

pub use allocator::*;
pub use controller_map::*;
pub use controls::*;
pub use diagnostics::*;
pub use processor::*;
pub use startup::*;
pub use tuning_store::*;

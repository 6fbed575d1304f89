pub mod control;
pub mod storage;
pub mod tuning;
pub mod types;
pub mod voice;

pub use control::*;
pub use storage::*;
pub use tuning::*;
pub use types::*;
pub use voice::*;

pub mod channel;
pub mod mts;

pub use channel::*;
pub use mts::*;

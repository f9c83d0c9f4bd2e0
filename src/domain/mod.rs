pub mod horizon;
pub mod plan;
pub mod vehicle;

pub use horizon::*;
pub use plan::*;
pub use vehicle::*;

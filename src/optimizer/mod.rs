pub mod builder;
pub mod diagnostics;
pub mod extract;
pub mod lp_format;
pub mod parameters;
pub mod planner;
pub mod program;
pub mod solver;

pub use builder::*;
pub use diagnostics::*;
pub use extract::*;
pub use parameters::*;
pub use planner::*;
pub use program::*;
pub use solver::*;

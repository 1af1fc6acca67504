// HTTP routes
pub mod artifacts;
pub mod health;
pub mod jobservice;
pub mod schedules;

pub use artifacts::*;
pub use health::*;
pub use jobservice::*;
pub use schedules::*;

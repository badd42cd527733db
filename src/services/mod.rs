pub mod payments;
pub mod sweeper;

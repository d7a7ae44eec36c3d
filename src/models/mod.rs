pub mod appointment;
pub mod enums;
pub mod payment;

pub use appointment::*;
pub use payment::*;

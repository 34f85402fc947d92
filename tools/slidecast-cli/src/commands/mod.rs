pub mod check;
pub mod convert;
pub mod probe;
pub mod segment;

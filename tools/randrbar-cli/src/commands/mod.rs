pub mod check;
pub mod monitors;

pub mod item;
pub mod raw;

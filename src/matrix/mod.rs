//! The in-memory matrix model: single elements, the owned row-major
//! partition with its iteration-order transform, and the symmetric wrapper.

pub mod element;
pub mod partition;
pub mod partition_sym;

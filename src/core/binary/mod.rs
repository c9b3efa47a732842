pub mod pe;

pub use pe::{inspect, inspect_reader, BinaryArch};

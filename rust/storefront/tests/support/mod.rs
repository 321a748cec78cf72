#![allow(dead_code, unused_imports)]

pub mod harness;
pub mod memory;

pub use harness::{memory_harness, read_json, with_postgres_harness};
pub use memory::MemoryStore;

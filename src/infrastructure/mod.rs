//! Port implementations. Only in-memory storage ships with the engine;
//! a relational backend plugs in behind the same traits.

pub mod in_memory;

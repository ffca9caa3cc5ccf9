//! Engine modules: translate configuration into an ordered plan of steps.
//!
//! The engine sits between configuration (what the operator wants) and
//! execution (which collaborator runs when). Plans are pure data; nothing in
//! here performs I/O.

pub mod plan;

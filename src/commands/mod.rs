//! Type-safe collaborator command modules.
//!
//! This module contains structs that implement `CommandArgs` for each external
//! tool a refresh step invokes. Each struct maps Rust fields to the exact argv
//! expected by the container runtime, the compose tool or `chown`.

pub mod image;
pub mod ownership;
pub mod stack;

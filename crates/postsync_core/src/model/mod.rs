//! Domain model for remote items and locally stored content.
//!
//! # Responsibility
//! - Define the ephemeral shapes received from the remote source.
//! - Define the local record/term/media shapes owned by the content store.
//!
//! # Invariants
//! - Remote items are never persisted directly; they are mapped into
//!   `NewRecord` before creation.
//! - Local identifiers are assigned by the store and never reused.
//!
//! # See also
//! - docs/architecture/sync-pipeline.md

pub mod record;
pub mod remote;

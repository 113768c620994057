//! Process plumbing for the container CLI.
//!
//! [`DockerClient`] is the only place a `docker` or `docker-compose` child
//! process is spawned. Higher layers (see [`crate::compose`]) build argument
//! lists and parse output; this module owns timeouts, cancellation and the
//! mapping of process failures onto [`DockerError`].

pub mod client;
pub mod error;

pub use client::DockerClient;
pub use error::DockerError;

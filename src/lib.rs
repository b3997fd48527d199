//! Spoditor - per-ordinal specialization of StatefulSet pods at admission time
//!
//! A StatefulSet stamps out identical replicas. Spoditor lets a single pod
//! template carry annotations such as
//! `ssarg.io/mount-volume_0-2: {"volumes": [...], "containers": [...]}` and
//! rewrites each replica's pod spec on admission so that replica `N` mounts
//! `my-config-N`, `my-secret-N`, and so on.
//!
//! # Architecture
//!
//! Data flows strictly downward through one admission request:
//!
//! ```text
//! Pod ──► identity (workload, ordinal)
//!     └─► annotation index ──► handler parse ──► qualifier gate ──► spec mutation
//! ```
//!
//! # Modules
//!
//! - [`identity`] - StatefulSet replica identity from the pod-name label
//! - [`annotation`] - `ssarg.io/` annotation collection and ordinal qualifiers
//! - [`mutation`] - Mutation handlers (volume-mount, env-mount, config-mount)
//! - [`pipeline`] - Orchestrates identity, collection and handlers for one pod
//! - [`webhook`] - Mutating admission webhook (axum) around the pipeline
//! - [`config`] - CLI / environment configuration for the webhook server
//! - [`crd`] - Placeholder Argumentor custom resource
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod annotation;
pub mod config;
pub mod crd;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod pipeline;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Wire Constants
// =============================================================================
// Annotation keys and labels are part of the contract with users' manifests;
// changing any of these breaks existing StatefulSets.

/// Prefix every recognized annotation key starts with
pub const ANNOTATION_PREFIX: &str = "ssarg.io/";

/// Separator between the mutation name and the ordinal qualifier in a key
///
/// Keys are split on the last occurrence, so names may contain it.
pub const QUALIFIER_SEPARATOR: char = '_';

/// Label the StatefulSet controller sets to the pod's stable name
pub const STATEFULSET_POD_NAME_LABEL: &str = "statefulset.kubernetes.io/pod-name";

// =============================================================================
// Default Server Configuration
// =============================================================================

/// Default address for the webhook HTTPS server
///
/// Port 9443 is the conventional webhook port and avoids requiring root.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9443";

/// Path the MutatingWebhookConfiguration must point at
pub const WEBHOOK_PATH: &str = "/mutate-v1-pod";

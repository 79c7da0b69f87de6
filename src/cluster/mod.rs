//! Cluster Manager Collaborator
//!
//! Membership and leader machinery live outside this crate. Tasks only need two
//! answers from the cluster: the local node name, and which task factory a given
//! node (or set of nodes) runs, so that compensation is built in a form the target
//! can decode.

pub mod manager;

pub use manager::{ClusterManager, StaticCluster};

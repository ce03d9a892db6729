//! Stories about running k3s clusters in Docker
//!
//! - `cluster_lifecycle`: create, wait, list, stop, start and delete a cluster
//! - `batch`: `--all` operations over several clusters
//!
//! Each test uses its own metadata root and cluster names. Stories run through
//! `TestEnv::run`, which deletes their clusters even when an assertion fails.

mod batch;
mod cluster_lifecycle;
mod helpers;

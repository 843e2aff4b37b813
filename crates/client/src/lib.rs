//! Client code for aide-memoire.
//!
//! This crate provides the network abstraction and the offline cache
//! controller that intercepts page requests.

pub mod controller;
pub mod fetch;

pub use controller::{
    ActivateReport, ControllerConfig, ControllerStatus, FetchOutcome, InstallReport, Lifecycle, OfflineController,
    ResponseSource,
};
pub use fetch::{CacheMode, Destination, FetchConfig, HttpNetwork, Network, Request, RequestMode};

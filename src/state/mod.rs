//! State module for tracking traversal progress
//!
//! Every catalog node moves through a small state machine while the crawler
//! works on it. See [`TraversalState`].

mod traversal_state;

pub use traversal_state::TraversalState;

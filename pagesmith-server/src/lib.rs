//! pagesmith-server: HTTP front end for the publish pipeline.

pub mod config;
pub mod server;
pub mod web;

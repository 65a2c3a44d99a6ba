// DNA Center intent API client modules
//
// Token-authenticated client for the read-only endpoints the reconciler
// needs: sites, site count, network devices and site membership. Every
// intent endpoint wraps its payload as `{ "response": ... }`.

pub mod auth;
pub mod client;
pub mod devices;
pub mod models;
pub mod sites;

pub use client::DnacClient;

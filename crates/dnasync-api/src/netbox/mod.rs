// NetBox REST API client
//
// Base path: /api/
// Auth: `Authorization: Token <token>` header

pub mod client;
pub mod models;

pub use client::NetBoxClient;

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod gates;
pub mod reconciliation;
pub mod session;
pub mod state;
pub mod workspace_service;

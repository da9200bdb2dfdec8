// Configuration
pub mod config;

// Records and their closed enums
pub mod camera;
pub mod incident;

// Real-time event envelope and fan-out
pub mod event;
pub mod hub;

// Frame analysis
pub mod analyzer;

// Persistence
pub mod store;

// Background incident production
pub mod generator;

// HTTP and WebSocket APIs
pub mod api;

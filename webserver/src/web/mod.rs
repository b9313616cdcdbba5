//! HTTP layer: request handlers for the CRUD API

pub mod handlers;

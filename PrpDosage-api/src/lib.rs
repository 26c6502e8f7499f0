// PrpDosage-api lib.rs
//
// HTTP surface of the PRP dosage planner: routes, handlers, request
// authorization and OpenAPI documentation.

// Public modules
pub mod api;
pub mod auth;
pub mod entities;
pub mod openapi;

// sketo: an access-control decision service speaking the ORY Keto ACP API.
//
// Policies and roles live in an embedded ordered key-value store
// (`sketo-store`); `exact`-flavor decisions are answered by a single index
// prefix scan, `glob`/`regex` decisions by a full document sweep through the
// pattern matchers (`sketo-match`). The HTTP surface, repository, decision
// engine and metric counters live here.
pub mod api;
pub mod app;
pub mod config;
pub mod counters;
pub mod engine;
pub mod model;
pub mod observability;
pub mod repo;

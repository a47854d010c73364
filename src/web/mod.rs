//! JSON API for administering an event.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080 against ./secret-santa.json
//! secret-santa serve
//!
//! # Custom store, port and policy
//! secret-santa --store event.json serve --port 3000 --policy uniform
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /api/participants` - List the roster
//! - `POST /api/participants` - Add a participant (`{"id", "pool", "accepted"}`)
//! - `POST /api/participants/{id}/accept` - Admit a participant
//! - `POST /api/participants/{id}/revoke` - Return a participant to pending
//! - `DELETE /api/participants/{id}` - Remove a participant
//! - `GET /api/participants/{id}/pairing` - A participant's giver and receiver
//! - `POST /api/match` - Draw and commit a new round (`?policy=uniform&seed=7`)
//! - `GET /api/pairings` - Every current giver -> receiver edge
//! - `POST /api/pairings/reset` - Clear every pairing
//! - `PUT /api/pools/{pool}/pairings` - Assign a pool by hand (`{"pairs": [...]}`)

pub mod server;

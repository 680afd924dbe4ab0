//! HTTP front end for the snowdrift ID generation engine.
//!
//! The engine itself knows nothing about wire formats; this crate extracts
//! the caller identity from the `User-Agent` header, negotiates one of the
//! three response encodings on `Accept`, and translates engine failures
//! into HTTP status classes.

pub mod server;

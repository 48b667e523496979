//! Module builder — ties the two traversal passes and built-in seeding
//! together. The public entry point lives in [`crate::driver`]; this module
//! only exposes the pieces each pass needs from the others (`ScopesByLoc`).

pub mod pass1;
pub mod pass2;
pub mod seed;

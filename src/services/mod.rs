//! # Services Module
//!
//! Domain computations that sit between the route handlers and the
//! database layer.

pub mod grocery_list;

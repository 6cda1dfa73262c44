//! # Authentication Module
//!
//! Magic-link authentication and cookie session handling: the payload
//! codec, link issuing/verification, the one-time nonce registry, the
//! session store, and the binder that turns a verified email into an
//! authenticated session.

pub mod binder;
pub mod codec;
pub mod magic_link;
pub mod middleware;
pub mod nonce;
pub mod session;

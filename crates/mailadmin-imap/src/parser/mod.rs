//! Response parsing.
//!
//! [`response`] classifies lines as they arrive; [`decode`] turns a
//! finished command's untagged lines into values.

pub mod decode;
pub mod response;

pub use response::{Completion, Reply, ResponseLine};

//! Config front-ends.

pub mod yaml;

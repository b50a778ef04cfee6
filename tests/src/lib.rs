//! End-to-end tests driving the compiler and runtime together.

#[cfg(test)]
mod corpus;
#[cfg(test)]
mod engine_properties;

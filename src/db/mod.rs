pub mod executor;
pub mod introspect;

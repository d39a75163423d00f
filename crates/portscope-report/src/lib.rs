pub mod csv;
pub mod json;
pub mod text;

#[cfg(test)]
pub(crate) mod fixtures;

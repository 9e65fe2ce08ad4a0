//! Report module - presenting and exporting training results

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;

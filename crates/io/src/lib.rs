// File I/O operations

pub mod cable;
pub mod csv;
pub mod error;
pub mod labels;
pub mod layout;
pub mod netlist;
pub mod registry;
pub mod swap;
pub mod table;
pub mod xlsx;

pub use error::IoError;
pub use registry::{InputKind, NetlistKind, Parsed, Registry};
pub use table::Table;

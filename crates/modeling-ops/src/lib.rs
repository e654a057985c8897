pub mod boolean;
pub mod chamfer;
pub mod extrude;
pub mod fillet;
pub mod primitive;
pub mod revolve;
pub mod types;

pub use boolean::{execute_boolean, execute_cut};
pub use chamfer::execute_chamfer;
pub use extrude::{build_extrude_request, execute_extrude};
pub use fillet::execute_fillet;
pub use primitive::execute_primitive;
pub use revolve::{build_revolve_request, execute_revolve};
pub use types::*;

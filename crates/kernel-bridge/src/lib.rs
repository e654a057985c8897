pub mod identity;
pub mod mock_kernel;
pub mod primitives;
pub mod traits;
pub mod types;

pub use mock_kernel::MockKernel;
pub use traits::*;
pub use types::*;

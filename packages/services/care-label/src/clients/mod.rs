pub mod appwrite;
pub mod storage;
pub mod functions;
pub mod databases;

pub use appwrite::*;
pub use storage::*;
pub use functions::*;
pub use databases::*;

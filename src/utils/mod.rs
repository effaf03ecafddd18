pub mod logging;
pub mod sync;
pub mod text;

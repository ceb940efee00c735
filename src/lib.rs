pub mod ir;
pub mod logging;

pub mod cmd;
pub mod observer;
pub mod style;
pub mod util;

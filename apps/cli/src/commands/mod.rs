//! 命令定义和实现

pub mod config;
pub mod inspect;
pub mod record;
pub mod replay;
pub mod sweep;

pub use config::ConfigCommand;
pub use inspect::InspectCommand;
pub use record::RecordCommand;
pub use replay::ReplayCommand;
pub use sweep::SweepCommand;

mod backup;
mod console;
mod lifecycle;
mod list;
mod logs;
mod status;

pub use backup::run_backup;
pub use console::run_command;
pub use lifecycle::{run_create, run_remove, run_start, run_stop};
pub use list::{run_list, run_ports};
pub use logs::run_logs;
pub use status::{run_players, run_status, run_usage};

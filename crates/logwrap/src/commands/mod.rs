//! Control-mode command implementations

pub mod get;
pub mod kill;
pub mod set;

use logwrap_ipc::ControlClient;
use std::path::Path;

pub(crate) fn client(work_dir: &Path) -> ControlClient {
    ControlClient::new(work_dir)
}

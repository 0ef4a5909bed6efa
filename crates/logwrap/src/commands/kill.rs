//! Kill command implementation

use anyhow::{bail, Result};
use logwrap_ipc::Request;
use std::path::Path;

pub async fn execute(work_dir: &Path) -> Result<()> {
    let client = super::client(work_dir);

    let response = client
        .send(&Request::Kill {
            work_dir: work_dir.to_path_buf(),
        })
        .await?;

    if response.is_ok() {
        println!("Termination signal sent");
        Ok(())
    } else {
        bail!("instance refused the kill request")
    }
}

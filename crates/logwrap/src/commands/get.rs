//! Get command implementation

use anyhow::{bail, Result};
use logwrap_ipc::Request;
use std::path::Path;

pub async fn execute(work_dir: &Path) -> Result<()> {
    let client = super::client(work_dir);

    let response = client
        .send(&Request::Get {
            work_dir: work_dir.to_path_buf(),
        })
        .await?;

    if !response.is_ok() {
        bail!("instance refused the query");
    }

    if let Some(max_size) = response.max_size {
        println!("max-size: {} bytes", max_size);
    }
    if let Some(logs) = response.logs {
        println!("max-files: {}", logs);
    }
    if let Some(duration) = response.duration {
        println!("max-age: {} ms", duration);
    }

    Ok(())
}

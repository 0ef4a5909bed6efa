//! Set command implementation

use anyhow::{bail, Result};
use logwrap_core::units;
use logwrap_ipc::Request;
use std::path::Path;

use crate::cli::SetArgs;

pub async fn execute(work_dir: &Path, args: SetArgs) -> Result<()> {
    if args.max_size.is_none()
        && args.duration.is_none()
        && args.logs.is_none()
        && args.check_interval.is_none()
        && args.zip.is_none()
    {
        bail!("nothing to set; pass at least one option");
    }

    let max_size = args.max_size.as_deref().map(units::parse_size).transpose()?;
    let duration = args
        .duration
        .as_deref()
        .map(units::parse_duration)
        .transpose()?
        .map(|d| d.as_millis() as u64);
    let check_interval = args
        .check_interval
        .as_deref()
        .map(units::parse_duration)
        .transpose()?
        .map(|d| d.as_millis() as u64);

    let client = super::client(work_dir);
    let response = client
        .send(&Request::Set {
            work_dir: work_dir.to_path_buf(),
            max_size,
            logs: args.logs,
            duration,
            check_interval,
            zip: args.zip,
        })
        .await?;

    if response.is_ok() {
        println!("Settings updated");
        Ok(())
    } else {
        bail!("instance refused the settings update")
    }
}

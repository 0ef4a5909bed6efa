//! Supervisor mode - spawn the child, capture its output, serve control requests

use logwrap_core::{Error, Result, RotationPolicy};
use logwrap_ipc::{ControlConnection, ControlServer, Request, Response};
use logwrap_logs::LogStream;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{error, info, warn};

pub struct SupervisorOptions {
    pub work_dir: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub out_file: String,
    pub err_file: Option<String>,
    /// Keep stderr out of the stdout stream (stderr stream only)
    pub err_only: bool,
    /// Echo captured output to the terminal
    pub screen: bool,
    pub policy: RotationPolicy,
}

/// Run the supervised child to completion and return its exit code.
pub async fn run(options: SupervisorOptions) -> Result<i32> {
    // Bind before spawning: an unbindable socket or unwritable working
    // directory must abort without starting the child.
    let server = ControlServer::bind(&options.work_dir).await?;

    let out = LogStream::open(&options.work_dir, &options.out_file, options.policy.clone())?;
    out.start_maintenance();

    let err = match &options.err_file {
        Some(name) => {
            let stream = LogStream::open(&options.work_dir, name, options.policy.clone())?;
            stream.start_maintenance();
            Some(stream)
        }
        None => None,
    };

    let mut child = Command::new(&options.command)
        .args(&options.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::SpawnFailed(format!("{}: {}", options.command, e)))?;

    let pid = child.id();
    info!("started {} (pid {:?})", options.command, pid);

    if let Some(stdout) = child.stdout.take() {
        let echo = options.screen.then_some(ScreenTarget::Stdout);
        tokio::spawn(pump(stdout, vec![out.clone()], echo));
    }

    if let Some(stderr) = child.stderr.take() {
        let mut targets = Vec::new();
        if !options.err_only {
            targets.push(out.clone());
        }
        if let Some(stream) = &err {
            targets.push(stream.clone());
        }
        let echo = options.screen.then_some(ScreenTarget::Stderr);
        tokio::spawn(pump(stderr, targets, echo));
    }

    let mut streams = vec![out.clone()];
    if let Some(stream) = &err {
        streams.push(stream.clone());
    }

    let work_dir = options.work_dir.clone();
    let control = tokio::spawn(async move {
        loop {
            match server.accept().await {
                Ok(conn) => {
                    let streams = streams.clone();
                    let work_dir = work_dir.clone();
                    tokio::spawn(handle_connection(conn, work_dir, streams, pid));
                }
                Err(e) => error!("failed to accept control connection: {}", e),
            }
        }
    });

    let status = child.wait().await?;
    let code = status.code().unwrap_or(1);
    info!("child exited with code {}", code);

    control.abort();
    out.close();
    if let Some(stream) = err {
        stream.close();
    }

    Ok(code)
}

async fn handle_connection(
    mut conn: ControlConnection,
    work_dir: PathBuf,
    streams: Vec<LogStream>,
    child_pid: Option<u32>,
) {
    loop {
        match conn.read_request().await {
            Ok(Some(request)) => {
                let (response, kill_child) = handle_request(&request, &work_dir, &streams);
                if kill_child {
                    terminate_child(child_pid);
                }
                if let Err(e) = conn.send_response(&response).await {
                    error!("failed to send control response: {}", e);
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("bad control request: {}", e);
                if conn.send_response(&Response::fail()).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Dispatch one control request against this instance's streams.
///
/// Returns the response plus whether the child should be signalled; the
/// signal is issued by the caller so a workDir mismatch can never reach
/// the child.
fn handle_request(
    request: &Request,
    work_dir: &Path,
    streams: &[LogStream],
) -> (Response, bool) {
    if request.work_dir() != work_dir {
        warn!(
            "workDir mismatch: ours is {}, request names {}",
            work_dir.display(),
            request.work_dir().display()
        );
        return (Response::fail(), false);
    }

    match request {
        Request::Kill { .. } => (Response::ok(), true),
        Request::Set {
            max_size,
            logs,
            duration,
            check_interval,
            zip,
            ..
        } => {
            // Zero sizes and intervals are invalid; reject before any
            // stream is touched so a bad request changes nothing.
            if *max_size == Some(0) || *duration == Some(0) || *check_interval == Some(0) {
                warn!("rejecting set request with zero policy value");
                return (Response::fail(), false);
            }
            for stream in streams {
                if let Some(bytes) = max_size {
                    stream.set_max_size(*bytes);
                }
                if let Some(count) = logs {
                    stream.set_max_files(*count);
                }
                if let Some(ms) = duration {
                    stream.set_max_age(Duration::from_millis(*ms));
                }
                if let Some(ms) = check_interval {
                    stream.set_maintenance_interval(Duration::from_millis(*ms));
                }
                if let Some(compress) = zip {
                    stream.set_compress(*compress);
                }
            }
            (Response::ok(), false)
        }
        Request::Get { .. } => match streams.first() {
            Some(stream) => {
                let policy = stream.policy();
                (
                    Response::policy(
                        policy.max_size_bytes,
                        policy.max_files,
                        policy.max_age.as_millis() as u64,
                    ),
                    false,
                )
            }
            None => (Response::fail(), false),
        },
    }
}

fn terminate_child(pid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            info!("sending SIGTERM to child {}", pid);
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!("failed to signal child {}: {}", pid, e);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

enum ScreenTarget {
    Stdout,
    Stderr,
}

/// Forward raw byte chunks from the child into the log streams.
async fn pump<R>(mut reader: R, streams: Vec<LogStream>, echo: Option<ScreenTarget>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = &buf[..n];
                for stream in &streams {
                    stream.write(chunk);
                }
                match echo {
                    Some(ScreenTarget::Stdout) => {
                        let _ = std::io::stdout().write_all(chunk);
                    }
                    Some(ScreenTarget::Stderr) => {
                        let _ = std::io::stderr().write_all(chunk);
                    }
                    None => {}
                }
            }
            Err(e) => {
                warn!("error reading child output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwrap_ipc::ResponseCode;
    use tempfile::TempDir;

    fn stream_in(dir: &Path, name: &str, policy: RotationPolicy) -> LogStream {
        LogStream::open(dir, name, policy).unwrap()
    }

    fn backup_count(dir: &Path, base: &str) -> usize {
        let prefix = format!("{}_", base);
        std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with(&prefix)
                    && (name.ends_with(".log") || name.ends_with(".log.gz"))
            })
            .count()
    }

    #[test]
    fn test_kill_with_mismatched_work_dir_fails_without_signalling() {
        let dir = TempDir::new().unwrap();
        let streams = vec![stream_in(dir.path(), "output.log", RotationPolicy::default())];

        let request = Request::Kill {
            work_dir: PathBuf::from("/somewhere/else"),
        };
        let (response, kill_child) = handle_request(&request, dir.path(), &streams);

        assert_eq!(response.code, ResponseCode::Fail);
        assert!(!kill_child);
    }

    #[test]
    fn test_kill_with_matching_work_dir_requests_signal() {
        let dir = TempDir::new().unwrap();
        let streams = vec![stream_in(dir.path(), "output.log", RotationPolicy::default())];

        let request = Request::Kill {
            work_dir: dir.path().to_path_buf(),
        };
        let (response, kill_child) = handle_request(&request, dir.path(), &streams);

        assert!(response.is_ok());
        assert!(kill_child);
    }

    #[test]
    fn test_set_is_a_partial_update() {
        let dir = TempDir::new().unwrap();
        let streams = vec![stream_in(dir.path(), "output.log", RotationPolicy::default())];
        let before = streams[0].policy();

        let request = Request::Set {
            work_dir: dir.path().to_path_buf(),
            max_size: Some(4096),
            logs: None,
            duration: None,
            check_interval: None,
            zip: None,
        };
        let (response, _) = handle_request(&request, dir.path(), &streams);
        assert!(response.is_ok());

        let after = streams[0].policy();
        assert_eq!(after.max_size_bytes, 4096);
        assert_eq!(after.max_files, before.max_files);
        assert_eq!(after.max_age, before.max_age);
        assert_eq!(after.compress, before.compress);
    }

    #[test]
    fn test_set_applies_to_every_stream() {
        let dir = TempDir::new().unwrap();
        let streams = vec![
            stream_in(dir.path(), "output.log", RotationPolicy::default()),
            stream_in(dir.path(), "error.log", RotationPolicy::default()),
        ];

        let request = Request::Set {
            work_dir: dir.path().to_path_buf(),
            max_size: None,
            logs: Some(7),
            duration: None,
            check_interval: None,
            zip: Some(true),
        };
        handle_request(&request, dir.path(), &streams);

        for stream in &streams {
            let policy = stream.policy();
            assert_eq!(policy.max_files, 7);
            assert!(policy.compress);
        }
    }

    #[test]
    fn test_set_rejects_zero_policy_values() {
        let dir = TempDir::new().unwrap();
        let streams = vec![stream_in(dir.path(), "output.log", RotationPolicy::default())];
        let before = streams[0].policy();

        for request in [
            Request::Set {
                work_dir: dir.path().to_path_buf(),
                max_size: Some(0),
                logs: None,
                duration: None,
                check_interval: None,
                zip: None,
            },
            Request::Set {
                work_dir: dir.path().to_path_buf(),
                max_size: Some(4096),
                logs: None,
                duration: Some(0),
                check_interval: None,
                zip: None,
            },
            Request::Set {
                work_dir: dir.path().to_path_buf(),
                max_size: None,
                logs: None,
                duration: None,
                check_interval: Some(0),
                zip: None,
            },
        ] {
            let (response, kill_child) = handle_request(&request, dir.path(), &streams);
            assert_eq!(response.code, ResponseCode::Fail);
            assert!(!kill_child);
        }

        // nothing was applied, not even the valid fields
        let after = streams[0].policy();
        assert_eq!(after.max_size_bytes, before.max_size_bytes);
        assert_eq!(after.max_age, before.max_age);
        assert_eq!(after.maintenance_interval, before.maintenance_interval);
    }

    #[tokio::test]
    async fn test_rejected_zero_interval_leaves_maintenance_running() {
        let dir = TempDir::new().unwrap();
        let policy = RotationPolicy {
            max_size_bytes: 1000,
            max_files: 1,
            maintenance_interval: Duration::from_millis(50),
            ..RotationPolicy::default()
        };
        let stream = stream_in(dir.path(), "output.log", policy);
        stream.start_maintenance();

        let streams = vec![stream.clone()];
        let request = Request::Set {
            work_dir: dir.path().to_path_buf(),
            max_size: None,
            logs: None,
            duration: None,
            check_interval: Some(0),
            zip: None,
        };
        let (response, _) = handle_request(&request, dir.path(), &streams);
        assert_eq!(response.code, ResponseCode::Fail);

        for generation in 0..3 {
            stream.write(format!("gen{}", generation).as_bytes());
            stream.rotate().unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        // the scheduler still evicts down to max_files
        assert_eq!(backup_count(dir.path(), "output"), 1);
        stream.close();
    }

    #[tokio::test]
    async fn test_malformed_request_still_gets_fail_response() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let dir = TempDir::new().unwrap();
        let server = logwrap_ipc::ControlServer::bind(dir.path()).await.unwrap();
        let socket_path = server.socket_path().to_path_buf();

        let streams = vec![stream_in(dir.path(), "output.log", RotationPolicy::default())];
        let work_dir = dir.path().to_path_buf();
        tokio::spawn(async move {
            let conn = server.accept().await.unwrap();
            handle_connection(conn, work_dir, streams, None).await;
        });

        let raw = tokio::net::UnixStream::connect(&socket_path).await.unwrap();
        let (read_half, mut write_half) = raw.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"not json\n").await.unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"code":"FAIL"}"#);

        // unknown command, same connection
        write_half
            .write_all(b"{\"cmd\":\"restart\",\"workDir\":\"/tmp\"}\n")
            .await
            .unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"code":"FAIL"}"#);

        // the connection survived both; a valid request still works
        let request = format!(
            "{{\"cmd\":\"get\",\"workDir\":\"{}\"}}\n",
            dir.path().display()
        );
        write_half.write_all(request.as_bytes()).await.unwrap();
        let line = lines.next_line().await.unwrap().unwrap();
        assert!(line.contains("\"code\":\"OK\""));
    }

    #[test]
    fn test_get_reports_the_primary_stream_policy() {
        let dir = TempDir::new().unwrap();
        let policy = RotationPolicy {
            max_size_bytes: 10240,
            max_files: 30,
            max_age: Duration::from_millis(2_592_000_000),
            ..RotationPolicy::default()
        };
        let streams = vec![stream_in(dir.path(), "output.log", policy)];

        let request = Request::Get {
            work_dir: dir.path().to_path_buf(),
        };
        let (response, kill_child) = handle_request(&request, dir.path(), &streams);

        assert!(response.is_ok());
        assert!(!kill_child);
        assert_eq!(response.max_size, Some(10240));
        assert_eq!(response.logs, Some(30));
        assert_eq!(response.duration, Some(2_592_000_000));
    }
}

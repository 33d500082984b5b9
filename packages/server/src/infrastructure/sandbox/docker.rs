//! Docker-backed sandbox.
//!
//! Every run gets a fresh scratch directory and a uniquely named container with
//! no network access. The docker CLI is driven through `tokio::process`, so the
//! host only needs a reachable docker daemon.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};
use uuid::Uuid;

use crate::domain::{ExecutionError, ExecutionOutput, Sandbox, SandboxImage};

/// Mount point of the scratch directory inside the container.
const SANDBOX_DIR: &str = "/sandbox";

/// Exit codes reserved by `docker run` for its own failures.
const DOCKER_RUN_FAILURE_CODES: [i32; 3] = [125, 126, 127];

/// Settings for [`DockerSandbox`].
#[derive(Debug, Clone)]
pub struct DockerSandboxConfig {
    /// Path or name of the docker CLI.
    pub docker_binary: String,
    /// Language tag -> runtime image.
    pub languages: HashMap<String, SandboxImage>,
    /// Value passed to `--memory`.
    pub memory_limit: String,
    /// Value passed to `--pids-limit`.
    pub pids_limit: u32,
    /// Cap applied to stdout and to stderr separately.
    pub max_output_bytes: usize,
    /// Parent directory for per-run scratch directories.
    pub scratch_root: PathBuf,
}

impl Default for DockerSandboxConfig {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            languages: default_languages(),
            memory_limit: "128m".to_string(),
            pids_limit: 64,
            max_output_bytes: 64 * 1024,
            scratch_root: std::env::temp_dir(),
        }
    }
}

/// Built-in language table.
pub fn default_languages() -> HashMap<String, SandboxImage> {
    let entries = [
        ("ruby", "ruby:3.3-alpine", "ruby", "main.rb"),
        ("python", "python:3.12-alpine", "python3", "main.py"),
        ("javascript", "node:20-alpine", "node", "main.js"),
    ];

    entries
        .into_iter()
        .map(|(language, image, interpreter, file_name)| {
            (
                language.to_string(),
                SandboxImage {
                    image: image.to_string(),
                    command: vec![interpreter.to_string()],
                    file_name: file_name.to_string(),
                },
            )
        })
        .collect()
}

/// Sandbox that runs each submission in a throwaway docker container.
pub struct DockerSandbox {
    config: DockerSandboxConfig,
}

impl DockerSandbox {
    pub fn new(config: DockerSandboxConfig) -> Self {
        Self { config }
    }

    /// Arguments for `docker run`.
    fn run_args(&self, image: &SandboxImage, container_name: &str, scratch: &Path) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--name".to_string(),
            container_name.to_string(),
            "--network".to_string(),
            "none".to_string(),
            "--memory".to_string(),
            self.config.memory_limit.clone(),
            "--pids-limit".to_string(),
            self.config.pids_limit.to_string(),
            "--volume".to_string(),
            format!("{}:{}:ro", scratch.display(), SANDBOX_DIR),
            "--workdir".to_string(),
            SANDBOX_DIR.to_string(),
            image.image.clone(),
        ];
        args.extend(image.command.iter().cloned());
        args.push(format!("{}/{}", SANDBOX_DIR, image.file_name));
        args
    }

    async fn run_container(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<ExecutionOutput, ExecutionError> {
        let mut child = Command::new(&self.config.docker_binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::Container(format!("failed to start docker: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::Internal("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionError::Internal("stderr was not captured".to_string()))?;
        let limit = self.config.max_output_bytes;

        let collect = async {
            let (out, err) =
                tokio::try_join!(read_bounded(stdout, limit), read_bounded(stderr, limit))?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((out, err, status))
        };
        let outcome = tokio::time::timeout(timeout, collect).await;

        match outcome {
            Ok(Ok((out, err, status))) => {
                if let Some(code) = status.code()
                    && DOCKER_RUN_FAILURE_CODES.contains(&code)
                {
                    return Err(ExecutionError::Container(format!(
                        "docker run exited with {}: {}",
                        code,
                        String::from_utf8_lossy(&err).trim()
                    )));
                }

                let mut output = String::from_utf8_lossy(&out).into_owned();
                output.push_str(&String::from_utf8_lossy(&err));
                Ok(ExecutionOutput { output })
            }
            Ok(Err(e)) => Err(ExecutionError::Io(e)),
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!("docker client already exited: {}", e);
                }
                Err(ExecutionError::Timeout(timeout))
            }
        }
    }

    async fn remove_container(&self, container_name: &str) {
        let result = Command::new(&self.config.docker_binary)
            .args(["rm", "-f", container_name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => {
                tracing::debug!("Removed container {}", container_name);
            }
            Ok(status) => {
                tracing::debug!("docker rm -f {} exited with {}", container_name, status);
            }
            Err(e) => {
                tracing::warn!("Failed to remove container {}: {}", container_name, e);
            }
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn resolve_image(&self, language: &str) -> Result<SandboxImage, ExecutionError> {
        self.config
            .languages
            .get(language)
            .cloned()
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(language.to_string()))
    }

    async fn run(
        &self,
        image: &SandboxImage,
        source: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionOutput, ExecutionError> {
        // Removed on drop, whichever way this function returns.
        let scratch = tempfile::Builder::new()
            .prefix("dojo-run-")
            .tempdir_in(&self.config.scratch_root)?;
        tokio::fs::write(scratch.path().join(&image.file_name), source).await?;

        let container_name = format!("dojo-run-{}", Uuid::new_v4());
        let args = self.run_args(image, &container_name, scratch.path());
        tracing::debug!("Starting container {} ({})", container_name, image.image);

        let result = self.run_container(&args, timeout).await;
        self.remove_container(&container_name).await;

        result
    }
}

/// Reads at most `limit` bytes and drains the rest so the writer never blocks.
async fn read_bounded<R>(mut reader: R, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(buf)
}

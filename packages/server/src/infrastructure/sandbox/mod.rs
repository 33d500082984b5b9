//! Sandboxed code execution.

mod docker;
mod executor;

pub use docker::{DockerSandbox, DockerSandboxConfig, default_languages};
pub use executor::{ExecutorConfig, SandboxExecutor};

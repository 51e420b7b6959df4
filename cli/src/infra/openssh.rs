//! OpenSSH transport: implements `Transport` on top of the system `ssh` and
//! `scp` binaries.
//!
//! A session is an SSH ControlMaster connection whose socket lives in a
//! private temporary directory. Commands and uploads multiplex over that
//! socket, and closing the session asks the master to exit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, LoginCommand, RemoteSession, Transport};
use crate::domain::{ConnectionDescriptor, ConnectionOptions, DriverConfig};
use crate::infra::command_runner::TokioCommandRunner;

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Extra time a probe may take on top of `ConnectTimeout` (auth, `true`).
const PROBE_GRACE: Duration = Duration::from_secs(5);

/// Which `ssh`-family binary the options are built for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Tool {
    Ssh,
    Scp,
}

impl Tool {
    fn program(self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Scp => "scp",
        }
    }

    fn port_flag(self) -> &'static str {
        match self {
            Self::Ssh => "-p",
            Self::Scp => "-P",
        }
    }
}

/// Options shared by every invocation for one connection.
fn common_args(options: &ConnectionOptions, connect_timeout: u64, tool: Tool) -> Vec<String> {
    let mut args = vec![
        "-o".to_string(),
        format!(
            "UserKnownHostsFile={}",
            options.user_known_hosts_file.display()
        ),
        "-o".to_string(),
        format!(
            "StrictHostKeyChecking={}",
            if options.strict_host_key_checking {
                "yes"
            } else {
                "no"
            }
        ),
        "-o".to_string(),
        format!("ConnectTimeout={connect_timeout}"),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
    ];
    if options.keys_only {
        args.push("-o".to_string());
        args.push("IdentitiesOnly=yes".to_string());
    }
    for key in &options.keys {
        args.push("-i".to_string());
        args.push(key.display().to_string());
    }
    if let Some(port) = options.port {
        args.push(tool.port_flag().to_string());
        args.push(port.to_string());
    }
    if let Some(forward) = options.forward_agent {
        args.push("-o".to_string());
        args.push(format!("ForwardAgent={}", if forward { "yes" } else { "no" }));
    }
    args
}

/// Environment variable `sshpass -e` reads the password from.
const SSHPASS_ENV: &str = "SSHPASS";

/// A fully built process call.
struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(&'static str, String)>,
}

/// Non-interactive invocation of `tool`: with a password the call goes
/// through `sshpass -e`, otherwise `BatchMode` keeps ssh from prompting.
/// The password is handed over in the environment, never on the command line.
fn invocation(tool: Tool, options: &ConnectionOptions, mut args: Vec<String>) -> Invocation {
    match &options.password {
        Some(password) => {
            let mut wrapped = vec!["-e".to_string(), tool.program().to_string()];
            wrapped.append(&mut args);
            Invocation {
                program: "sshpass".to_string(),
                args: wrapped,
                env: vec![(SSHPASS_ENV, password.clone())],
            }
        }
        None => {
            args.splice(0..0, ["-o".to_string(), "BatchMode=yes".to_string()]);
            Invocation {
                program: tool.program().to_string(),
                args,
                env: Vec::new(),
            }
        }
    }
}

fn stderr_text(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

async fn run_checked<R: CommandRunner>(
    runner: &R,
    invocation: Invocation,
    timeout: Option<Duration>,
) -> Result<std::process::Output> {
    let argv: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
    let env: Vec<(&str, &str)> = invocation
        .env
        .iter()
        .map(|(key, value)| (*key, value.as_str()))
        .collect();
    runner
        .run_with_env(&invocation.program, &argv, &env, timeout)
        .await
}

// ── Transport ────────────────────────────────────────────────────────────────

/// Production `Transport` backed by OpenSSH.
///
/// Generic over `R: CommandRunner` so tests can inject a recording runner.
pub struct OpenSshTransport<R: CommandRunner + Clone> {
    runner: R,
    connection_timeout: Duration,
    ready_timeout: Duration,
    retry_delay: Duration,
}

impl OpenSshTransport<TokioCommandRunner> {
    /// Transport configured from the driver's timeouts.
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(
            TokioCommandRunner::new(Duration::from_secs(config.command_timeout)),
            Duration::from_secs(config.connection_timeout),
            Duration::from_secs(config.ready_timeout),
        )
    }
}

impl<R: CommandRunner + Clone> OpenSshTransport<R> {
    pub fn new(runner: R, connection_timeout: Duration, ready_timeout: Duration) -> Self {
        Self {
            runner,
            connection_timeout,
            ready_timeout,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the pause between readiness probes.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn connect_secs(&self) -> u64 {
        self.connection_timeout.as_secs().max(1)
    }

    async fn probe(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        let mut args = common_args(&descriptor.options, self.connect_secs(), Tool::Ssh);
        args.extend([descriptor.target(), "--".to_string(), "true".to_string()]);
        let output = run_checked(
            &self.runner,
            invocation(Tool::Ssh, &descriptor.options, args),
            Some(self.connection_timeout + PROBE_GRACE),
        )
        .await?;
        anyhow::ensure!(output.status.success(), "{}", stderr_text(&output));
        Ok(())
    }
}

impl<R: CommandRunner + Clone> Transport for OpenSshTransport<R> {
    type Session = OpenSshSession<R>;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<OpenSshSession<R>> {
        let control_dir = tempfile::Builder::new()
            .prefix("kitchen-ssh-")
            .tempdir()
            .context("creating control socket directory")?;
        let session = OpenSshSession {
            runner: self.runner.clone(),
            target: descriptor.target(),
            options: descriptor.options.clone(),
            connect_secs: self.connect_secs(),
            control_dir,
        };

        let mut args = vec![
            "-M".to_string(),
            "-N".to_string(),
            "-f".to_string(),
            "-o".to_string(),
            "ControlPersist=yes".to_string(),
            "-S".to_string(),
            session.control_path().display().to_string(),
        ];
        args.extend(common_args(&session.options, session.connect_secs, Tool::Ssh));
        args.push(session.target.clone());

        let output = run_checked(
            &self.runner,
            invocation(Tool::Ssh, &session.options, args),
            Some(self.connection_timeout + PROBE_GRACE),
        )
        .await
        .with_context(|| format!("connecting to {}", session.target))?;
        if !output.status.success() {
            anyhow::bail!(
                "ssh connection to {} failed: {}",
                session.target,
                stderr_text(&output)
            );
        }
        session
            .options
            .logger
            .in_scope(|| tracing::debug!("session opened"));
        Ok(session)
    }

    async fn wait_until_ready(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.ready_timeout;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.probe(descriptor).await {
                Ok(()) => {
                    descriptor
                        .options
                        .logger
                        .in_scope(|| tracing::info!(attempt, "ssh is ready"));
                    return Ok(());
                }
                Err(e) => {
                    descriptor
                        .options
                        .logger
                        .in_scope(|| tracing::debug!(attempt, "ssh not ready: {e:#}"));
                    if tokio::time::Instant::now() >= deadline {
                        anyhow::bail!(
                            "timed out after {}s waiting for ssh on {}: {e:#}",
                            self.ready_timeout.as_secs(),
                            descriptor.target()
                        );
                    }
                }
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn login_command(&self, descriptor: &ConnectionDescriptor) -> LoginCommand {
        let mut args = common_args(&descriptor.options, self.connect_secs(), Tool::Ssh);
        args.push(descriptor.target());
        LoginCommand {
            program: Tool::Ssh.program().to_string(),
            args,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// An open ControlMaster connection.
pub struct OpenSshSession<R: CommandRunner> {
    runner: R,
    target: String,
    options: ConnectionOptions,
    connect_secs: u64,
    control_dir: tempfile::TempDir,
}

impl<R: CommandRunner> OpenSshSession<R> {
    fn control_path(&self) -> PathBuf {
        self.control_dir.path().join("control")
    }
}

impl<R: CommandRunner> RemoteSession for OpenSshSession<R> {
    async fn exec(&self, command: &str) -> Result<()> {
        let mut args = vec!["-S".to_string(), self.control_path().display().to_string()];
        args.extend(common_args(&self.options, self.connect_secs, Tool::Ssh));
        args.extend([self.target.clone(), "--".to_string(), command.to_string()]);

        let output = run_checked(&self.runner, invocation(Tool::Ssh, &self.options, args), None)
            .await
            .with_context(|| format!("running '{command}' on {}", self.target))?;

        self.options.logger.in_scope(|| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                tracing::debug!("{line}");
            }
        });
        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            anyhow::bail!(
                "'{command}' failed on {} (exit {code}): {}",
                self.target,
                stderr_text(&output)
            );
        }
        Ok(())
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> Result<()> {
        let mut args = vec![
            "-r".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path().display()),
        ];
        args.extend(common_args(&self.options, self.connect_secs, Tool::Scp));
        args.push(local.display().to_string());
        args.push(format!("{}:{remote_dir}", self.target));

        let output = run_checked(&self.runner, invocation(Tool::Scp, &self.options, args), None)
            .await
            .with_context(|| format!("uploading {}", local.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "upload of {} to {}:{remote_dir} failed: {}",
                local.display(),
                self.target,
                stderr_text(&output)
            );
        }
        self.options
            .logger
            .in_scope(|| tracing::debug!(local = %local.display(), remote_dir, "uploaded"));
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let control = self.control_path().display().to_string();
        let output = self
            .runner
            .run("ssh", &["-S", &control, "-O", "exit", &self.target])
            .await
            .context("stopping ssh control master")?;
        if !output.status.success() {
            self.options.logger.in_scope(|| {
                tracing::debug!("control master already gone: {}", stderr_text(&output));
            });
        }
        self.control_dir
            .close()
            .context("removing control socket directory")
    }
}

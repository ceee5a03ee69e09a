// ABOUTME: In-memory container host that answers runtime CLI lines like a docker daemon.
// ABOUTME: Serves as both a CommandTransport and, via FakeExecutor, a RemoteExecutor.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nonempty::NonEmpty;
use parking_lot::Mutex;

use hoist::config::DeploymentTarget;
use hoist::remote::{
    CancelFlag, CommandTransport, ExecutionError, ExecutionResult, RemoteCommand, RemoteExecutor,
    run_sequence,
};
use hoist::ssh::{self, CommandOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub image: String,
    pub running: bool,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, Container>,
    pulled: HashSet<String>,
    log: Vec<String>,
    check_failures: u32,
}

#[derive(Default)]
pub struct FakeHost {
    state: Mutex<State>,
    missing_images: HashSet<String>,
    broken_images: HashSet<String>,
    hanging_verb: Option<String>,
    cancel_after: Option<(String, CancelFlag)>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host already running `image` as `name`.
    pub fn running(name: &str, image: &str) -> Self {
        let host = Self::default();
        host.state.lock().containers.insert(
            name.to_string(),
            Container {
                image: image.to_string(),
                running: true,
            },
        );
        host
    }

    /// `pull` of `image` fails as if the registry does not have it.
    pub fn missing_image(mut self, image: &str) -> Self {
        self.missing_images.insert(image.to_string());
        self
    }

    /// `run` of `image` fails with exit code 125.
    pub fn broken_image(mut self, image: &str) -> Self {
        self.broken_images.insert(image.to_string());
        self
    }

    /// Commands with this runtime verb never finish.
    pub fn hang_on(mut self, verb: &str) -> Self {
        self.hanging_verb = Some(verb.to_string());
        self
    }

    /// Set `flag` right after the command with this verb completes.
    pub fn cancel_after(mut self, verb: &str, flag: CancelFlag) -> Self {
        self.cancel_after = Some((verb.to_string(), flag));
        self
    }

    /// The first `n` custom health checks fail.
    pub fn failing_checks(self, n: u32) -> Self {
        self.state.lock().check_failures = n;
        self
    }

    pub fn containers(&self) -> BTreeMap<String, Container> {
        self.state.lock().containers.clone()
    }

    pub fn running_containers(&self) -> Vec<(String, Container)> {
        self.state
            .lock()
            .containers
            .iter()
            .filter(|(_, c)| c.running)
            .map(|(n, c)| (n.clone(), c.clone()))
            .collect()
    }

    /// Every line executed, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    fn answer(&self, line: &str) -> CommandOutput {
        let mut state = self.state.lock();
        state.log.push(line.to_string());

        let argv = match shell_words::split(line) {
            Ok(argv) if !argv.is_empty() => argv,
            _ => return failed(2, "syntax error"),
        };

        if argv[0] == "test" {
            return running_check(&state, &argv);
        }
        if argv[0] != "docker" && argv[0] != "podman" {
            // A host-side health check command.
            if state.check_failures > 0 {
                state.check_failures -= 1;
                return failed(7, "curl: (7) Failed to connect to localhost port 5000");
            }
            return ok("");
        }

        let verb = argv.get(1).map(String::as_str).unwrap_or_default();
        let last = argv.last().cloned().unwrap_or_default();
        match verb {
            "pull" => {
                if self.missing_images.contains(&last) {
                    return failed(
                        1,
                        &format!("Error response from daemon: manifest for {} not found", last),
                    );
                }
                state.pulled.insert(last.clone());
                ok(&format!("Status: Downloaded newer image for {}", last))
            }
            "stop" => match state.containers.get_mut(&last) {
                Some(container) => {
                    container.running = false;
                    ok(&last)
                }
                None => no_such_container(&last),
            },
            "rm" => match state.containers.get(&last) {
                Some(c) if c.running => failed(
                    1,
                    &format!(
                        "Error response from daemon: cannot remove container {}: container is running",
                        last
                    ),
                ),
                Some(_) => {
                    state.containers.remove(&last);
                    ok(&last)
                }
                None => no_such_container(&last),
            },
            "run" => {
                let name = flag_value(&argv, "--name").unwrap_or_default();
                if state.containers.contains_key(&name) {
                    return failed(125, "Conflict. The container name is already in use");
                }
                if !state.pulled.contains(&last) {
                    return failed(125, &format!("Unable to find image '{}' locally", last));
                }
                if self.broken_images.contains(&last) {
                    return failed(
                        125,
                        "driver failed programming external connectivity: port is already allocated",
                    );
                }
                state.containers.insert(
                    name,
                    Container {
                        image: last,
                        running: true,
                    },
                );
                ok("3f4e1c2b9a")
            }
            other => failed(1, &format!("unknown command: {}", other)),
        }
    }
}

fn running_check(state: &State, argv: &[String]) -> CommandOutput {
    let inner = argv
        .get(1)
        .and_then(|s| s.strip_prefix("$("))
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|s| shell_words::split(s).ok())
        .unwrap_or_default();
    let running = inner
        .last()
        .and_then(|name| state.containers.get(name))
        .is_some_and(|c| c.running);
    if running { ok("") } else { failed(1, "") }
}

fn no_such_container(name: &str) -> CommandOutput {
    failed(1, &format!("Error response from daemon: No such container: {}", name))
}

fn flag_value(argv: &[String], flag: &str) -> Option<String> {
    let i = argv.iter().position(|a| a == flag)?;
    argv.get(i + 1).cloned()
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: format!("{}\n", stdout),
        stderr: String::new(),
    }
}

fn failed(code: u32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: format!("{}\n", stderr),
    }
}

fn verb_of(line: &str) -> Option<String> {
    shell_words::split(line).ok()?.get(1).cloned()
}

#[async_trait]
impl CommandTransport for FakeHost {
    async fn exec(&self, line: &str, timeout: Duration) -> ssh::Result<CommandOutput> {
        let verb = verb_of(line);
        if verb.is_some() && verb == self.hanging_verb {
            self.state.lock().log.push(line.to_string());
            return Err(ssh::Error::CommandTimeout(timeout));
        }

        let output = self.answer(line);

        if let Some((ref after, ref flag)) = self.cancel_after
            && verb.as_deref() == Some(after.as_str())
        {
            flag.cancel();
        }
        Ok(output)
    }
}

/// RemoteExecutor that runs sequences against a shared [`FakeHost`].
#[derive(Clone)]
pub struct FakeExecutor {
    host: Arc<FakeHost>,
    timeout: Duration,
    executions: Arc<AtomicU32>,
}

impl FakeExecutor {
    pub fn new(host: Arc<FakeHost>) -> Self {
        Self {
            host,
            timeout: Duration::from_secs(5),
            executions: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn host(&self) -> &FakeHost {
        &self.host
    }

    /// Sessions opened, one per execute call.
    pub fn executions(&self) -> u32 {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExecutor for FakeExecutor {
    async fn execute(
        &self,
        _target: &DeploymentTarget,
        commands: &NonEmpty<RemoteCommand>,
        cancel: &CancelFlag,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        run_sequence(self.host.as_ref(), commands, self.timeout, cancel).await
    }
}

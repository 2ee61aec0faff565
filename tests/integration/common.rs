use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use threecol::ResourceNames;
use threecol::config::NAMESPACE_ENV;
use threecol::shm::{NamedSemaphore, ShmSegment};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// How long any test waits for another process or thread before failing.
pub const DEADLINE: Duration = Duration::from_secs(20);

pub fn unique_namespace() -> String {
    format!(
        "threecol_it_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

pub fn names_for(namespace: &str) -> ResourceNames {
    ResourceNames::for_namespace(namespace).unwrap()
}

pub fn supervisor_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_threecol-supervisor"))
}

pub fn generator_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_threecol-generator"))
}

pub fn supervisor_command(namespace: &str) -> Command {
    let mut cmd = Command::new(supervisor_binary());
    cmd.env(NAMESPACE_ENV, namespace).env_remove("RUST_LOG");
    cmd
}

pub fn generator_command(namespace: &str) -> Command {
    let mut cmd = Command::new(generator_binary());
    cmd.env(NAMESPACE_ENV, namespace).env_remove("RUST_LOG");
    cmd
}

/// A supervisor process that has installed its signal handler.
pub struct RunningSupervisor {
    pub child: Child,
    /// Kept open so later log lines do not hit a closed pipe.
    pub _stderr: BufReader<ChildStderr>,
}

pub fn spawn_supervisor(namespace: &str) -> RunningSupervisor {
    let mut child = supervisor_command(namespace)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start supervisor");
    let mut stderr = BufReader::new(child.stderr.take().unwrap());

    let mut line = String::new();
    loop {
        line.clear();
        let read = stderr.read_line(&mut line).unwrap();
        assert!(read > 0, "supervisor exited before it was ready");
        if line.contains("waiting for generators") {
            break;
        }
    }
    RunningSupervisor {
        child,
        _stderr: stderr,
    }
}

/// Wait for a child to exit, killing it and failing the test on timeout.
pub fn wait_with_deadline(child: &mut Child, what: &str) -> std::process::ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if start.elapsed() > DEADLINE {
            let _ = child.kill();
            panic!("{} did not exit within {:?}", what, DEADLINE);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

pub fn assert_names_removed(names: &ResourceNames) {
    for name in [&names.used_slots, &names.free_slots, &names.mutex] {
        let err = NamedSemaphore::open(name).unwrap_err();
        assert!(err.is_not_found(), "{} still exists", name);
    }
    let err = ShmSegment::open(&names.shm, 1).unwrap_err();
    assert!(err.is_not_found(), "{} still exists", names.shm);
}

use std::io::Read;
use std::process::Stdio;

use crate::common::{
    assert_names_removed, generator_command, names_for, spawn_supervisor, supervisor_command,
    unique_namespace, wait_with_deadline,
};
use threecol::shm::NamedSemaphore;

#[test]
fn test_supervisor_rejects_positional_argument() {
    let ns = unique_namespace();
    let output = supervisor_command(&ns)
        .arg("extra")
        .output()
        .expect("failed to run supervisor");

    assert!(!output.status.success());
    // usage errors happen before anything is created
    let names = names_for(&ns);
    assert!(NamedSemaphore::open(&names.used_slots).unwrap_err().is_not_found());
}

#[test]
fn test_generator_requires_edges() {
    let output = generator_command(&unique_namespace())
        .output()
        .expect("failed to run generator");
    assert!(!output.status.success());
}

#[test]
fn test_generator_rejects_malformed_edge() {
    let output = generator_command(&unique_namespace())
        .args(["0-1", "1x2"])
        .output()
        .expect("failed to run generator");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[generator] error:"), "stderr: {}", stderr);
    assert!(stderr.contains("invalid edge '1x2'"), "stderr: {}", stderr);
}

#[test]
fn test_generator_without_supervisor_fails() {
    let output = generator_command(&unique_namespace())
        .args(["0-1", "1-2"])
        .output()
        .expect("failed to run generator");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[generator] error:"), "stderr: {}", stderr);
    assert!(stderr.contains("sem_open"), "stderr: {}", stderr);
}

#[test]
fn test_supervisor_stops_on_sigterm() {
    let ns = unique_namespace();
    let mut supervisor = spawn_supervisor(&ns);

    let pid = supervisor.child.id() as libc::pid_t;
    assert_eq!(unsafe { libc::kill(pid, libc::SIGTERM) }, 0);

    let status = wait_with_deadline(&mut supervisor.child, "supervisor");
    assert!(status.success());

    let mut stdout = String::new();
    supervisor
        .child
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut stdout)
        .unwrap();
    assert_eq!(
        stdout,
        "[supervisor] Best found solution: no solution received\n"
    );
    assert_names_removed(&names_for(&ns));
}

#[test]
fn test_second_supervisor_fails_while_first_runs() {
    let ns = unique_namespace();
    let mut first = spawn_supervisor(&ns);

    let output = supervisor_command(&ns)
        .output()
        .expect("failed to run supervisor");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[supervisor] error:"), "stderr: {}", stderr);

    // the failed one must not have removed the running one's names
    let names = names_for(&ns);
    assert!(NamedSemaphore::open(&names.used_slots).is_ok());

    let pid = first.child.id() as libc::pid_t;
    assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);
    assert!(wait_with_deadline(&mut first.child, "supervisor").success());
    assert_names_removed(&names);
}

#[test]
fn test_generators_find_coloring_of_triangle() {
    let ns = unique_namespace();
    let mut supervisor = spawn_supervisor(&ns);

    // One process only: a second one could start after the first already
    // found a coloring and the names are gone.
    let mut generator = generator_command(&ns)
        .args(["0-1", "1-2", "2-0", "--seed", "7"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start generator");

    let status = wait_with_deadline(&mut supervisor.child, "supervisor");
    assert!(status.success());
    assert!(wait_with_deadline(&mut generator, "generator").success());

    let mut stdout = String::new();
    supervisor
        .child
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut stdout)
        .unwrap();
    assert!(
        stdout.ends_with(
            "[supervisor] Best found solution: 0 edges\n\
             [supervisor] The graph is 3-colorable!\n"
        ),
        "stdout: {}",
        stdout
    );
    for line in stdout.lines().filter(|l| l.contains("Solution with")) {
        assert!(line.starts_with("[supervisor] Solution with "), "line: {}", line);
    }
    assert_names_removed(&names_for(&ns));
}

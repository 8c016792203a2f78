//! End-to-end CLI tests: write a `.va` fixture, run the `vanction` binary
//! against it, assert on stdout/exit code (§8 and §8.1).

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn vanction() -> Command {
    Command::cargo_bin("vanction").expect("binary builds")
}

fn write_script(dir: &TempDir, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).expect("write fixture");
    path
}

#[test]
fn hello_world_prints_greeting() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "hello.va", r#"func main() { System.print("Hello World!"); }"#);

    vanction().arg(&script).assert().success().stdout("Hello World!\n");
}

#[test]
fn fibonacci_by_recursion() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "fib.va",
        "func fib(n) { if n < 2 { return n; } return fib(n-1) + fib(n-2); } \
         func main() { System.print(fib(10)); }",
    );

    vanction().arg(&script).assert().success().stdout("55\n");
}

#[test]
fn for_in_over_an_array_with_a_custom_line_end() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "loop.va",
        r#"func main() { for (x in [1,2,3]) { System.print(x, end: ","); } }"#,
    );

    vanction().arg(&script).assert().success().stdout("1,2,3,");
}

#[test]
fn reassigning_an_immutable_binding_exits_nonzero_and_names_the_line() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "immut.va", "func main() { immut k = 7; k = 8; }");

    vanction()
        .arg(&script)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ImmutableError").and(predicate::str::contains(":1:")));
}

#[test]
fn try_catch_finally_prints_the_caught_message_then_runs_finally() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "try.va",
        r#"func main() {
  try { throw "bad"; }
  catch () as e { System.print(e["message"]); }
  finally { System.print("done"); }
}"#,
    );

    vanction().arg(&script).assert().success().stdout("bad\ndone\n");
}

#[test]
fn module_import_exposes_the_dotted_function_name() {
    let dir = TempDir::new().unwrap();
    write_script(&dir, "m.va", "func add(a, b) { return a + b; }");
    let script = write_script(
        &dir,
        "main.va",
        "import m;\nfunc main() { System.print(m.add(2, 3)); }",
    );

    vanction().arg(&script).assert().success().stdout("5\n");
}

#[test]
fn running_a_missing_file_exits_nonzero_with_a_clear_message() {
    vanction()
        .arg("does-not-exist.va")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

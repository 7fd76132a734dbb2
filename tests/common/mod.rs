//! Shared fixtures for CLI tests: a throw-away base directory with a fake
//! compiler that "compiles" shell-script sources by copying them.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Copies the first source to the `-o` target and makes it executable. Any
/// source containing `COMPILE_ERROR` makes the compile fail. Always leaves an
/// `out.s` in the working directory, like the real compiler.
const FAKE_COMPILER: &str = r#"#!/bin/sh
out=""
srcs=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -*) shift ;;
    *) srcs="$srcs $1"; shift ;;
  esac
done
echo "mov rax, 0" > out.s
for s in $srcs; do
  if grep -q COMPILE_ERROR "$s"; then
    echo "$s: error: does not compile"
    exit 1
  fi
done
set -- $srcs
cat "$1" > "$out"
chmod +x "$out"
"#;

pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            root: tempfile::tempdir().unwrap(),
        };
        fixture.executable("_test/speroc", FAKE_COMPILER);
        fixture
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn executable(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.file(rel, contents);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Writes `_test/<name>.spr`: a program printing `lines` and exiting with `code`.
    pub fn program(&self, name: &str, lines: &[&str], code: i32) {
        let mut body = String::from("#!/bin/sh\n");
        for line in lines {
            body.push_str(&format!("echo '{line}'\n"));
        }
        body.push_str(&format!("exit {code}\n"));
        self.file(&format!("_test/{name}.spr"), &body);
    }

    pub fn spec(&self, yaml: &str) {
        self.file("_test/tests.yaml", yaml);
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("conform").unwrap();
        cmd.current_dir(self.root.path()).env_remove("RUST_LOG");
        cmd
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

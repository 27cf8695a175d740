use std::fs;
use std::process::Command;

fn stagec() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stagec"))
}

#[test]
fn help_prints_usage_and_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = stagec()
        .arg("--help")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("--platform"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn invalid_flags_are_rejected_with_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = stagec().current_dir(dir.path()).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Usage"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn contradictory_flags_are_rejected_before_compilation() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.frag"), "void main() {}\n").unwrap();
    let output = stagec()
        .args([
            "--input", "a.frag",
            "--shader-bundle", "{}",
            "--sl", "out.sl",
            "--platform", "gl40",
        ])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!dir.path().join("out.sl").exists());
}

#[test]
fn compiles_a_shader_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("blur.frag"),
        "layout(binding = 0) uniform sampler2D albedo;\nvoid main() {}\n",
    )
    .unwrap();
    let output = stagec()
        .args([
            "--input", "blur.frag",
            "--sl", "blur.sl",
            "--spirv", "blur.asm",
            "--reflection-json", "blur.json",
            "--platform", "gl40",
            "--platform", "vk10",
        ])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("blur.sl").exists());
    assert!(dir.path().join("blur.asm").exists());
    assert!(dir.path().join("blur.json").exists());
}

#[test]
fn packs_runtime_stages_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blur.frag"), "void main() {}\n").unwrap();
    let output = stagec()
        .args([
            "--input", "blur.frag",
            "--sl", "blur.rsp",
            "--runtime-stage",
            "--platform", "gl40",
            "--platform", "mt",
        ])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let buf = fs::read(dir.path().join("blur.rsp")).unwrap();
    let pack = stagec::pack::StagePack::from_bytes(&buf).unwrap();
    assert_eq!(pack.len(), 2);
}

#[test]
fn a_failing_compile_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blur.frag"), "void not_main() {}\n").unwrap();
    let output = stagec()
        .args(["--input", "blur.frag", "--sl", "blur.sl", "--platform", "gl40"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!dir.path().join("blur.sl").exists());
}

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use stagec::bundle::Archive;
use stagec::compiler::error::Error as CompileError;
use stagec::compiler::{Compile, CompiledShader, Compiler, SourceOptions};
use stagec::driver;
use stagec::options::{Config, Job};
use stagec::pack::StagePack;
use stagec::shader::{BindingType, Stage, Target};

const PIXEL_SHADER: &str = "\
layout(binding = 0) uniform sampler2D albedo;
layout(std140, binding = 0) uniform Params {
    vec4 tint;
} params;

void main() {}
";

fn config(dir: &Path, input: &Path, stage: Stage, platforms: Vec<Target>) -> Config {
    Config {
        job: Job::Shader {
            input: input.to_path_buf(),
            stage,
        },
        sl: dir.join("out.sl"),
        spirv: None,
        reflection_json: None,
        reflection_header: None,
        reflection_cc: None,
        depfile: None,
        platforms,
        runtime_stage: false,
        json_format: false,
        entry_point: "main".into(),
        include_dirs: Vec::new(),
    }
}

fn write_shader(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn direct_mode_writes_one_set_of_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let mut config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40, Target::Vk10]);
    config.spirv = Some(dir.path().join("blur.asm"));
    config.reflection_json = Some(dir.path().join("blur.json"));
    config.reflection_header = Some(dir.path().join("blur_decl.rs"));
    config.reflection_cc = Some(dir.path().join("blur_table.rs"));
    config.depfile = Some(dir.path().join("blur.d"));
    driver::run(&config, &Compiler::new()).unwrap();

    // Exactly one native source file, for the first platform of the list.
    let sl = fs::read_to_string(dir.path().join("out.sl")).unwrap();
    assert!(sl.starts_with("#version 400 core"));
    let asm = fs::read_to_string(dir.path().join("blur.asm")).unwrap();
    assert!(asm.contains("void main()"));
    assert!(!asm.contains("#version"));
    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("blur.json")).unwrap()).unwrap();
    assert_eq!(json["shader"], "blur");
    assert_eq!(json["entry_point"], "main");
    assert_eq!(json["bindings"].as_array().unwrap().len(), 2);
    let decls = fs::read_to_string(dir.path().join("blur_decl.rs")).unwrap();
    assert!(decls.contains("pub const ALBEDO_REGISTER: u8 = 0;"));
    let table = fs::read_to_string(dir.path().join("blur_table.rs")).unwrap();
    assert!(table.contains("blur_decl.rs"));
    assert!(table.contains("(\"albedo\", \"texture\", 0),"));
    let depfile = fs::read_to_string(dir.path().join("blur.d")).unwrap();
    assert!(depfile.starts_with(&format!("{}:", dir.path().join("out.sl").display())));
    assert!(depfile.contains("blur.frag"));
}

#[test]
fn optional_artifacts_are_skipped_when_unset() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40]);
    driver::run(&config, &Compiler::new()).unwrap();
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|v| v.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"blur.frag".into()));
    assert!(names.contains(&"out.sl".into()));
}

#[test]
fn shared_artifacts_do_not_depend_on_platform_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);

    let run = |tag: &str, platforms: Vec<Target>| {
        let sub = dir.path().join(tag);
        fs::create_dir(&sub).unwrap();
        let mut config = config(&sub, &input, Stage::Pixel, platforms);
        config.spirv = Some(sub.join("blur.asm"));
        config.reflection_json = Some(sub.join("blur.json"));
        config.reflection_header = Some(sub.join("blur_decl.rs"));
        config.reflection_cc = Some(sub.join("blur_table.rs"));
        driver::run(&config, &Compiler::new()).unwrap();
        sub
    };
    let a = run("ab", vec![Target::Gl40, Target::Vk10]);
    let b = run("ba", vec![Target::Vk10, Target::Gl40]);
    for name in ["blur.asm", "blur_decl.rs", "blur_table.rs"] {
        assert_eq!(fs::read(a.join(name)).unwrap(), fs::read(b.join(name)).unwrap(), "{}", name);
    }
    // The reflection JSON and the native source name the target that
    // produced them; everything else about them matches by construction.
}

#[test]
fn runtime_stage_json_contains_one_record_per_platform() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let mut config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40, Target::Vk10]);
    config.runtime_stage = true;
    config.json_format = true;
    driver::run(&config, &Compiler::new()).unwrap();
    let buf = fs::read(dir.path().join("out.sl")).unwrap();
    let pack = StagePack::from_json(&buf).unwrap();
    assert_eq!(pack.len(), 2);
    for target in [Target::Gl40, Target::Vk10] {
        let stage = pack.get(target).unwrap();
        assert_eq!(stage.shader_name, "blur");
        assert_eq!(stage.entry_point, "main");
        assert_eq!(stage.stage, Stage::Pixel);
        assert_eq!(stage.bindings.len(), 2);
        assert_eq!(stage.bindings[0].name, "albedo");
        assert_eq!(stage.bindings[0].ty, BindingType::Texture);
    }
    // No direct artifacts in this mode.
    assert!(!dir.path().join("blur.asm").exists());
}

#[test]
fn runtime_stage_binary_decodes_and_is_world_readable() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let mut config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40]);
    config.runtime_stage = true;
    driver::run(&config, &Compiler::new()).unwrap();
    let path = dir.path().join("out.sl");
    let pack = StagePack::from_bytes(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(pack.len(), 1);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

#[test]
fn runtime_stage_failure_on_second_platform_writes_no_pack() {
    let dir = tempfile::tempdir().unwrap();
    let source = format!("#pragma targets(gl40)\n{}", PIXEL_SHADER);
    let input = write_shader(dir.path(), "blur.frag", &source);
    let mut config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40, Target::Vk10]);
    config.runtime_stage = true;
    let err = driver::run(&config, &Compiler::new()).unwrap_err();
    assert!(matches!(
        err,
        driver::Error::Compile {
            target: Target::Vk10,
            error: CompileError::UnsupportedTarget(Target::Vk10),
        }
    ));
    assert!(!dir.path().join("out.sl").exists());
}

struct ScriptedCompiler {
    fail_on: Option<Target>,
    calls: RefCell<Vec<Target>>,
}

impl ScriptedCompiler {
    fn new(fail_on: Option<Target>) -> ScriptedCompiler {
        ScriptedCompiler {
            fail_on,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Compile for ScriptedCompiler {
    fn compile(
        &self,
        _source: &[u8],
        _source_path: &Path,
        options: &SourceOptions,
    ) -> Result<CompiledShader, CompileError> {
        self.calls.borrow_mut().push(options.target);
        if self.fail_on == Some(options.target) {
            return Err(CompileError::MissingEntryPoint(options.entry_point.clone()));
        }
        Ok(CompiledShader {
            stage: options.stage,
            entry_point: options.entry_point.clone(),
            assembly: "void main() {}\n".into(),
            native_source: "void main() {}\n".into(),
            byte_code: vec![0x1],
            includes: Vec::new(),
        })
    }
}

#[test]
fn compilation_fails_fast_in_configuration_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let platforms = vec![Target::Gl40, Target::Vk10, Target::Mt, Target::Dx11];
    let mut config = config(dir.path(), &input, Stage::Pixel, platforms);
    config.runtime_stage = true;
    let backend = ScriptedCompiler::new(Some(Target::Mt));
    let err = driver::run(&config, &backend).unwrap_err();
    assert!(matches!(err, driver::Error::Compile { target: Target::Mt, .. }));
    // The failing platform is attempted last; nothing after it runs.
    assert_eq!(*backend.calls.borrow(), vec![Target::Gl40, Target::Vk10, Target::Mt]);
    assert!(!dir.path().join("out.sl").exists());
}

#[test]
fn all_platforms_compile_in_configuration_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let platforms = vec![Target::Dx11, Target::Gl40, Target::Vk10];
    let mut config = config(dir.path(), &input, Stage::Pixel, platforms.clone());
    config.runtime_stage = true;
    let backend = ScriptedCompiler::new(None);
    driver::run(&config, &backend).unwrap();
    assert_eq!(*backend.calls.borrow(), platforms);
    let pack = StagePack::from_bytes(&fs::read(dir.path().join("out.sl")).unwrap()).unwrap();
    assert_eq!(pack.len(), 3);
}

#[test]
fn missing_input_file_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        dir.path(),
        &dir.path().join("nope.frag"),
        Stage::Pixel,
        vec![Target::Gl40],
    );
    let err = driver::run(&config, &Compiler::new()).unwrap_err();
    assert!(matches!(err, driver::Error::Input { .. }));
}

#[test]
fn includes_are_resolved_and_tracked_in_the_depfile() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("common.inc"), "float common() { return 1.0; }\n").unwrap();
    let source = format!("#include \"common.inc\"\n{}", PIXEL_SHADER);
    let input = write_shader(dir.path(), "blur.frag", &source);
    let mut config = config(dir.path(), &input, Stage::Pixel, vec![Target::Gl40]);
    config.depfile = Some(dir.path().join("blur.d"));
    driver::run(&config, &Compiler::new()).unwrap();
    let sl = fs::read_to_string(dir.path().join("out.sl")).unwrap();
    assert!(sl.contains("float common()"));
    let depfile = fs::read_to_string(dir.path().join("blur.d")).unwrap();
    assert!(depfile.contains("blur.frag"));
    assert!(depfile.contains("common.inc"));
}

#[test]
fn bundle_mode_compiles_every_named_shader() {
    let dir = tempfile::tempdir().unwrap();
    let blur = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let fullscreen = write_shader(dir.path(), "fullscreen.vert", "void main() {}\n");
    let spec = serde_json::json!({
        "blur": { "file": blur },
        "fullscreen": { "file": fullscreen },
    });
    let config = Config {
        job: Job::Bundle {
            spec: spec.to_string(),
        },
        sl: dir.path().join("bundle.rsb"),
        spirv: None,
        reflection_json: None,
        reflection_header: None,
        reflection_cc: None,
        depfile: None,
        platforms: vec![Target::Gl40, Target::Vk10],
        runtime_stage: false,
        json_format: false,
        entry_point: "main".into(),
        include_dirs: Vec::new(),
    };
    driver::run(&config, &Compiler::new()).unwrap();
    let archive = Archive::from_bytes(&fs::read(dir.path().join("bundle.rsb")).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);
    let blur = archive.get("blur").unwrap();
    assert_eq!(blur.len(), 2);
    assert_eq!(blur.get(Target::Gl40).unwrap().stage, Stage::Pixel);
    let fullscreen = archive.get("fullscreen").unwrap();
    assert_eq!(fullscreen.get(Target::Vk10).unwrap().stage, Stage::Vertex);
}

#[test]
fn bundle_member_failure_aborts_the_whole_archive() {
    let dir = tempfile::tempdir().unwrap();
    let blur = write_shader(dir.path(), "blur.frag", PIXEL_SHADER);
    let broken = write_shader(dir.path(), "broken.frag", "void not_main() {}\n");
    let spec = serde_json::json!({
        "blur": { "file": blur },
        "broken": { "file": broken },
    });
    let config = Config {
        job: Job::Bundle {
            spec: spec.to_string(),
        },
        sl: dir.path().join("bundle.rsb"),
        spirv: None,
        reflection_json: None,
        reflection_header: None,
        reflection_cc: None,
        depfile: None,
        platforms: vec![Target::Gl40],
        runtime_stage: false,
        json_format: false,
        entry_point: "main".into(),
        include_dirs: Vec::new(),
    };
    let err = driver::run(&config, &Compiler::new()).unwrap_err();
    assert!(matches!(err, driver::Error::Compile { .. }));
    assert!(!dir.path().join("bundle.rsb").exists());
}

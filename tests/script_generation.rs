// tests/script_generation.rs
//
// Job file -> script on disk, the way the `script` subcommand does it.
// Run only these: cargo test --test script_generation

use std::fs;

use mumax_scripter::job::Job;
use mumax_scripter::ScripterError;

fn job_toml(project: &str, name: &str) -> String {
    format!(
        r#"
        project_dir = "{project}"

        [params]
        name = "{name}"
        h = 50
        D = 800
        axes_ratio = 2.0
        stray_fields = true

        [[operation]]
        type = "static"
        field = [0, 0, 1000]
        relax = true

        [[operation]]
        type = "sweep"
        axis = "x"
        start_mag = "-x"
        start = 0
        end = 100
        step = 10
        "#
    )
}

#[test]
fn job_writes_script_and_params_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = dir.path().join("switch.toml");
    fs::write(&job_path, job_toml(".", "switch")).unwrap();

    // project_dir is relative to the job file
    let job = Job::load(&job_path).unwrap();
    let first = job.write().unwrap();
    assert_eq!(first.name, "switch");
    assert_eq!(first.path, dir.path().join("switch.mx3"));
    assert_eq!(first.output_dir(), dir.path().join("switch.out"));
    assert!(dir.path().join("switch.params.json").is_file());

    let text = fs::read_to_string(&first.path).unwrap();
    let stat = text.find("/* Static field */").unwrap();
    let start = text
        .find("/* Starting condition: fully magnetized in -x-direction */")
        .unwrap();
    let sweep = text.find("/* Field sweep in x-direction */").unwrap();
    assert!(stat < start && start < sweep);
    assert!(text.contains("B_ext = vector(0/1000,0/1000,1000/1000)\n"));
    assert!(text.contains("m.SetRegion(1, uniform(-1,0,0))\n"));
    assert!(text.contains("save(B_demag)"));
    assert!(text.contains("for B=0e-3; B<=100e-3; B+=10e-3{\n"));

    // second write of the same job gets a suffix
    let second = job.write().unwrap();
    assert_eq!(second.name, "switch2");
    assert!(dir.path().join("switch2.mx3").is_file());
    assert!(dir.path().join("switch2.params.json").is_file());

    let params: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("switch.params.json")).unwrap())
            .unwrap();
    assert_eq!(params["name"], "switch");
    assert_eq!(params["stray_fields"], true);
}

#[test]
fn missing_project_directory_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = dir.path().join("job.toml");
    fs::write(&job_path, job_toml("does-not-exist", "x")).unwrap();
    let err = Job::load(&job_path).unwrap().write().unwrap_err();
    assert!(matches!(err, ScripterError::Config(_)));
}

#[test]
fn bad_operations_fail_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let raw = format!(
        r#"
        project_dir = "{}"
        [[operation]]
        type = "sweep"
        axis = "x"
        start = 50
        end = 50
        "#,
        dir.path().display().to_string().replace('\\', "/")
    );
    let err = Job::from_toml_str(&raw).unwrap().write().unwrap_err();
    assert!(matches!(err, ScripterError::InvalidArgument(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

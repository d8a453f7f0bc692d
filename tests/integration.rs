use std::{env, fs, path::PathBuf, process::Command};

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[simulation]\n"
        + "days = 10\n"
        + "seed = 42\n"
        + "workers = 4\n"
        + "max_contacts_per_hour = 2\n"
        + "\n"
        + "[population]\n"
        + "size = 400\n"
        + "household_size = 2.4\n"
        + "employees_per_workplace = 25\n"
        + "pupils_per_school = 150\n"
        + "employment_rate = 0.75\n"
        + "age_distribution = [ 0.1, 0.1, 0.13, 0.13, 0.13, 0.13, 0.12, 0.1, 0.06,]\n"
        + "food_buy_interval = [ 2, 6,]\n"
        + "hardware_buy_interval = [ 10, 30,]\n"
        + "buy_compliance = [ 0.1, 0.3,]\n"
        + "acceptance_factor = [ 0.2, 0.9,]\n"
        + "\n"
        + "[[diseases]]\n"
        + "name = \"covid19\"\n"
        + "incubation_period = [ 1, 14,]\n"
        + "days_infectious = 10\n"
        + "disease_duration = [ 15, 70,]\n"
        + "mortality_by_age = [ 0.0, 0.0014, 0.0012, 0.002, 0.0038, 0.0098, 0.0298, 0.0794, 0.1734,]\n"
        + "days_till_death = [ 14, 56,]\n"
        + "spread_factor = [ 0.0, 0.5,]\n"
        + "test_accuracy = 0.981\n"
        + "symptoms_development = [ 0.55, 0.85,]\n"
        + "\n"
        + "[seeding]\n"
        + "disease = \"covid19\"\n"
        + "n_infected = 8\n"
        + "\n"
        + "[[containment.events]]\n"
        + "day = 4\n"
        + "measure = \"work_from_home\"\n"
        + "\n"
        + "[[containment.events]]\n"
        + "day = 6\n"
        + "measure = \"shops\"\n"
        + "\n"
        + "[testing]\n"
        + "daily_test_prob = 0.3\n"
        + "\n"
        + "[output]\n"
        + "days_per_report = 5\n";

    fs::write(&config_path, config_contents).expect("failed to write config file");

    fn run_bin(args: &[&str]) {
        let bin = PathBuf::from(env!("CARGO_BIN_EXE_outbreak"));

        let output = Command::new(bin)
            .args(args)
            .output()
            .expect("failed to execute command");

        let stdout_str =
            std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
        let stderr_str =
            std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

        assert!(
            output.status.success(),
            "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
        );
    }

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    assert!(test_dir.join("run-0000").join("trajectory.msgpack").is_file());
    assert!(test_dir.join("run-0001").join("trajectory.msgpack").is_file());

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    let results = fs::read_to_string(test_dir.join("run-0000").join("results.toml"))
        .expect("failed to read results");
    assert!(results.contains("final_day = 9"), "results:\n{results}");
    assert!(results.contains("population = 400"), "results:\n{results}");

    // Both runs share a seed.
    let other = fs::read_to_string(test_dir.join("run-0001").join("results.toml"))
        .expect("failed to read results");
    assert_eq!(results, other);

    run_bin(&["--sim-dir", test_dir_str, "clean"]);

    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("run-0001").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("invalid_config_fails");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), "[simulation]\ndays = 0\n")
        .expect("failed to write config file");

    let output = Command::new(env!("CARGO_BIN_EXE_outbreak"))
        .args(["--sim-dir", test_dir.to_str().expect("non UTF-8 path"), "create"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}

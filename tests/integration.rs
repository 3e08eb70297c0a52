use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> bool {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_infodemic"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    if !output.status.success() {
        let stdout_str = String::from_utf8_lossy(&output.stdout);
        let stderr_str = String::from_utf8_lossy(&output.stderr);
        eprintln!("failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n");
    }
    output.status.success()
}

fn config_contents(stop_early: bool, max_time: usize) -> String {
    String::new()
        + "[model]\n"
        + "beta = 0.3\n"
        + "phi = 3\n"
        + "eta = 0.4\n"
        + "gamma_a = 5\n"
        + "gamma_s = 7\n"
        + "psi_1 = 0.8\n"
        + "psi_2 = 0.9\n"
        + "psi_3 = 1.0\n"
        + "chi_f = 20\n"
        + "chi_p = 10\n"
        + "mask_s_reduce_factor = 0.15\n"
        + "mask_i_reduce_factor = 0.6\n"
        + "mask_si_reduce_factor = 0.84\n"
        + "social_distance_reduce_factor = 0.33\n"
        + "lambda = 0.05\n"
        + "ideas_reject = 0.25\n"
        + "personality_reject = 0.25\n"
        + "vaccinate_delta_time = 30\n"
        + "\n"
        + "[init]\n"
        + "topology = { kind = \"random\", n_agents = 80, n_epi_edges = 800, n_social_edges = 1200 }\n"
        + "initial_infected = 0.1\n"
        + "n_virtual = 4\n"
        + "virtual_ideas = [ 0.0, 0.0, 0.0,]\n"
        + "virtual_reach = 12\n"
        + "\n"
        + "[run]\n"
        + &format!("max_time = {max_time}\n")
        + &format!("stop_early = {stop_early}\n")
        + "n_workers = 4\n"
        + "seed = 1234\n"
        + "steps_per_save = 16\n"
        + "\n"
        + "[policy]\n"
        + "kind = \"mask_mandate\"\n"
        + "start = 10\n"
        + "end = 30\n"
}

fn prepare_dir(name: &str, config: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), config).expect("failed to write config file");
    test_dir
}

#[test]
fn basic_workflow() {
    let max_time = 60;
    let test_dir = prepare_dir("basic_workflow", &config_contents(false, max_time));
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "create"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]));
    assert!(run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]));
    assert!(!run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "7"]));

    assert!(run_bin(&["--sim-dir", test_dir_str, "analyze"]));

    for run_idx in 0..2 {
        let run_dir = test_dir.join(format!("run-{run_idx:04}"));
        let history: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(run_dir.join("history.json")).expect("failed to read history"),
        )
        .expect("failed to parse history");

        let state_counts = history["state_counts"].as_array().expect("missing state counts");
        assert_eq!(state_counts.len(), max_time + 1);
        for counts in state_counts {
            let counts = counts.as_array().expect("counts are not an array");
            assert_eq!(counts.len(), 7);
            let total: u64 = counts.iter().filter_map(|count| count.as_u64()).sum();
            assert_eq!(total, 80);
        }
        assert_eq!(history["idea_mean"].as_array().map(Vec::len), Some(max_time + 1));

        assert!(run_dir.join("results.json").is_file());
    }

    assert!(run_bin(&["--sim-dir", test_dir_str, "clean"]));
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_is_rejected() {
    let config = config_contents(true, 20).replace("psi_1 = 0.8", "psi_1 = 0.95");
    let test_dir = prepare_dir("invalid_config", &config);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "create"]));

    fs::remove_dir_all(&test_dir).ok();
}

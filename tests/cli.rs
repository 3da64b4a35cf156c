//! Drives the culicidae binary against an on-disk store

use culicidae_test::TestEnvironment;
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

struct CliHarness {
    env: TestEnvironment,
}

impl CliHarness {
    fn new() -> Self {
        let env = TestEnvironment::new().unwrap();
        culicidae_core::save_config(env.root().join("config.toml"), &env.catalog_config()).unwrap();
        Self { env }
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_logged(args, "error")
    }

    fn run_logged(&self, args: &[&str], level: &str) -> Output {
        Command::new(env!("CARGO_BIN_EXE_culicidae"))
            .arg("--config")
            .arg(self.env.root().join("config.toml"))
            .args(args)
            .env("CULICIDAE_HOME", self.env.root())
            .env("CULICIDAE_LOG", level)
            .output()
            .unwrap()
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn import(&self) {
        let seeds = self.env.write_seed_files().unwrap();
        let stats = self.json(&["import", path_arg(&seeds)]);
        assert_eq!(stats["species"], 5);
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_queries_before_import_fail_with_cache_error() {
    let cli = CliHarness::new();
    let output = cli.run(&["species", "list"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_reference_queries() {
    let cli = CliHarness::new();
    cli.import();

    let page = cli.json(&["species", "list", "--term", "aedes"]);
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"][0]["id"], "aedes-aegypti");

    let page = cli.json(&["species", "list", "--term", "aedes", "--region", "antarctica"]);
    assert_eq!(page["count"], 0);

    let page = cli.json(&["species", "list", "--limit", "2", "--offset", "1"]);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);
    assert_eq!(page["next"]["offset"], 3);
    assert_eq!(page["previous"]["offset"], 0);

    let similar = cli.json(&["species", "similar", "aedes-aegypti", "--limit", "1"]);
    assert_eq!(similar["results"][0]["id"], "aedes-albopictus");

    let detail = cli.json(&["species", "show", "aedes-aegypti", "--lang", "ru"]);
    assert_eq!(detail["common_name"], "Желтолихорадочный комар");
    assert_eq!(detail["diseases"].as_array().unwrap().len(), 3);

    let regions = cli.json(&["regions", "at", "40.7128", "-74.0060"]);
    assert_eq!(regions[0]["id"], "new-york");

    let facets = cli.json(&["facets", "--lang", "xx"]);
    assert_eq!(facets["locale"], "en");

    let missing = cli.run(&["species", "show", "culex-nowhere"]);
    assert_eq!(missing.status.code(), Some(3));
}

#[test]
fn test_observation_review_flow() {
    let cli = CliHarness::new();
    cli.import();

    let image = cli.env.root().join("specimen.jpg");
    std::fs::write(&image, culicidae_test::jpeg_bytes(64, 48)).unwrap();

    // No predictor endpoint is configured
    let outcome = cli.json(&[
        "observe",
        path_arg(&image),
        "--lat",
        "40.7128",
        "--lon",
        "-74.0060",
    ]);
    let id = outcome["observation"]["id"].as_str().unwrap().to_string();
    assert_eq!(outcome["observation"]["species_id"], Value::Null);
    assert_eq!(outcome["observation"]["needs_review"], true);
    assert_eq!(outcome["observation"]["prediction_status"]["status"], "unavailable");

    let pending = cli.json(&["observations", "list", "--needs-review"]);
    assert_eq!(pending["count"], 1);

    let reviewed = cli.json(&["observations", "review", &id, "--species", "aedes-aegypti"]);
    assert_eq!(reviewed["needs_review"], false);
    assert_eq!(reviewed["prediction_status"]["status"], "manual");

    let found = cli.json(&["observations", "bbox", "40", "-75", "41", "-73"]);
    assert_eq!(found[0]["id"], id.as_str());

    let in_region = cli.json(&["observations", "region", "new-york", "--within", "40,-75,41,-73"]);
    assert_eq!(in_region.as_array().unwrap().len(), 1);

    let inverted = cli.run(&["observations", "bbox", "41", "-75", "40", "-73"]);
    assert_eq!(inverted.status.code(), Some(2));

    let bad = cli.run(&["observe", path_arg(&image), "--lat", "95", "--lon", "0"]);
    assert_eq!(bad.status.code(), Some(2));
    assert_eq!(cli.env.observation_dirs().unwrap().len(), 1);
}

#[test]
fn test_json_logs_stay_off_stdout() {
    let cli = CliHarness::new();
    cli.import();

    let image = cli.env.root().join("specimen.jpg");
    std::fs::write(&image, culicidae_test::jpeg_bytes(32, 32)).unwrap();

    // The missing predictor logs a warning while the command prints JSON
    let output = cli.run_logged(
        &[
            "--log-json",
            "observe",
            path_arg(&image),
            "--lat",
            "40.7128",
            "--lon",
            "-74.0060",
        ],
        "warn",
    );
    assert!(output.status.success());

    let outcome: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["observation"]["needs_review"], true);

    let logs: Vec<Value> = String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(logs.iter().any(|line| line["level"] == "WARN"));
}

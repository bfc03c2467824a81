use assert_cmd::{cargo, Command};
use predicates::str;
use rstest::rstest;

#[cfg(windows)]
const BINARY_NAME: &str = "giant.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "giant";

#[test]
fn no_subcommand_prints_usage_and_exits_2() {
	Command::new(cargo::cargo_bin!())
		.assert()
		.failure()
		.code(2)
		.stdout(str::is_empty())
		.stderr(str::contains(format!("Usage: {BINARY_NAME} [OPTIONS] <COMMAND>")));
}

#[test]
fn version_flag_reports_the_package_version() {
	Command::new(cargo::cargo_bin!())
		.arg("-V")
		.assert()
		.success()
		.stdout(str::starts_with(format!("{BINARY_NAME} ")));
}

#[test]
fn version_subcommand_succeeds() {
	Command::new(cargo::cargo_bin!())
		.arg("version")
		.assert()
		.success()
		.stdout(str::contains(BINARY_NAME));
}

#[test]
fn version_subcommand_json_flag_emits_json() {
	Command::new(cargo::cargo_bin!())
		.args(["version", "--json"])
		.assert()
		.success()
		.stdout(str::contains("\"version\""));
}

#[rstest]
#[case("run")]
#[case("benchmark")]
#[case("check-data")]
#[case("download")]
#[case("visualize")]
fn subcommands_with_no_args_print_usage_and_exit_2(#[case] sub_command: &str) {
	Command::new(cargo::cargo_bin!())
		.arg(sub_command)
		.assert()
		.failure()
		.code(2)
		.stderr(str::contains(format!("Usage: {BINARY_NAME} {sub_command}")));
}

#[test]
fn check_data_underscore_alias_is_accepted() {
	Command::new(cargo::cargo_bin!())
		.arg("check_data")
		.assert()
		.failure()
		.code(2)
		.stderr(str::contains(format!("Usage: {BINARY_NAME} check-data")));
}

#[test]
fn check_data_reports_a_missing_csv_as_a_runtime_error() {
	Command::new(cargo::cargo_bin!())
		.args(["check-data", "/no/such.csv", "/no/such/wsi-root"])
		.assert()
		.failure()
		.code(1);
}

#[test]
fn run_rejects_an_unknown_config_path() {
	Command::new(cargo::cargo_bin!())
		.args(["run", "slide.png", "what organ is this?", "--config", "/no/such/config.json"])
		.assert()
		.failure()
		.code(1)
		.stderr(str::contains("config"));
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Command running in `dir` with none of the tool's variables inherited
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("contractkit").unwrap();
    cmd.current_dir(dir)
        .env_remove("PRIVATE_KEY")
        .env_remove("INFURA_API_KEY")
        .env_remove("CONTRACTKIT_ACCOUNTS")
        .env_remove("CONTRACTKIT_NETWORK")
        .env_remove("CONTRACTKIT_CONFIG")
        .env("RUST_LOG", "off");
    cmd
}

fn write_profile(dir: &Path, url: &str) {
    fs::write(
        dir.join("contractkit.toml"),
        format!("[networks.localhost]\nurl = \"{}\"\n", url),
    )
    .unwrap();
}

#[test]
fn tasks_lists_builtin_tasks() {
    let temp = TempDir::new().unwrap();
    cli(temp.path())
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("Prints the list of accounts"))
        .stdout(predicate::str::contains("blockNumber"))
        .stdout(predicate::str::contains("Prints the current block number"));
}

#[test]
fn config_json_is_redacted() {
    let temp = TempDir::new().unwrap();
    let output = cli(temp.path())
        .args(["config", "--json"])
        .env("PRIVATE_KEY", KEY)
        .env("INFURA_API_KEY", "project-secret")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains(KEY));
    assert!(!stdout.contains("project-secret"));

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["networks"]["mainnet"]["chainId"], 1);
    assert_eq!(value["networks"]["goerli"]["chainId"], 5);
    assert_eq!(value["solidity"]["settings"]["optimizer"]["enabled"], true);
    assert_eq!(value["solidity"]["settings"]["optimizer"]["runs"], 200);
    assert_eq!(value["paths"]["deploy"], "scripts");
}

#[test]
fn dotenv_file_is_loaded() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env"), format!("PRIVATE_KEY={}\n", KEY)).unwrap();

    cli(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 private key"))
        .stdout(predicate::str::contains(KEY).not());
}

#[test]
fn forced_private_key_without_env_fails() {
    let temp = TempDir::new().unwrap();
    cli(temp.path())
        .arg("config")
        .env("CONTRACTKIT_ACCOUNTS", "private-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PRIVATE_KEY"));
}

#[test]
fn unknown_network_fails() {
    let temp = TempDir::new().unwrap();
    cli(temp.path())
        .args(["--network", "ropsten", "blockNumber"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown network: ropsten"));
}

#[test]
fn block_number_against_node() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3039"}"#)
        .create();

    let temp = TempDir::new().unwrap();
    write_profile(temp.path(), &server.url());

    cli(temp.path())
        .arg("blockNumber")
        .assert()
        .success()
        .stdout("Current block number: 12345\n");
    mock.assert();
}

#[test]
fn accounts_against_node() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"jsonrpc":"2.0","id":1,"result":["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266","0x70997970c51812dc3a010c7d01b50e0d17dc79c8"]}"#,
        )
        .create();

    let temp = TempDir::new().unwrap();
    write_profile(temp.path(), &server.url());

    cli(temp.path())
        .arg("accounts")
        .assert()
        .success()
        .stdout("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n0x70997970C51812dc3A010C7d01b50e0d17dc79C8\n");
}

#[test]
fn provider_failure_exits_non_zero() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/")
        .with_status(500)
        .with_body("internal error")
        .create();

    let temp = TempDir::new().unwrap();
    write_profile(temp.path(), &server.url());

    cli(temp.path())
        .arg("blockNumber")
        .assert()
        .failure()
        .stderr(predicate::str::contains("task 'blockNumber' failed"));
}

#[test]
fn tasks_listed_without_loading_config() {
    let temp = TempDir::new().unwrap();
    cli(temp.path())
        .arg("tasks")
        .env("CONTRACTKIT_ACCOUNTS", "private-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("blockNumber"));
}

#[test]
fn explicit_profile_path_is_used() {
    let temp = TempDir::new().unwrap();
    let profiles = TempDir::new().unwrap();
    let path = profiles.path().join("networks.toml");
    fs::write(&path, "[default]\nnetwork = \"goerli\"\n").unwrap();

    let output = cli(temp.path())
        .args(["config", "--json"])
        .env("CONTRACTKIT_CONFIG", &path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["defaultNetwork"], "goerli");
}

#[test]
fn explicit_profile_path_missing_fails() {
    let temp = TempDir::new().unwrap();
    cli(temp.path())
        .arg("config")
        .env("CONTRACTKIT_CONFIG", temp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile file not found"));
}

#[test]
fn empty_profile_path_falls_back_to_default_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("contractkit.toml"),
        "[default]\nnetwork = \"mainnet\"\n",
    )
    .unwrap();

    let output = cli(temp.path())
        .args(["config", "--json"])
        .env("CONTRACTKIT_CONFIG", "")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["defaultNetwork"], "mainnet");
}

use anyhow::Result;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn coderag_command(root: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("coderag")?;
    cmd.env_remove("OPENAI_API_KEY")
        .env("RUST_LOG", "error")
        .arg("--offline")
        .arg("--path")
        .arg(root);
    Ok(cmd)
}

fn write_project(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("src"))?;
    fs::write(
        root.join("src/config.go"),
        "package config\n\n\
func parseConfig(path string) (*Config, error) {\n\
\tdata, err := os.ReadFile(path)\n\
\tif err != nil {\n\
\t\treturn nil, err\n\
\t}\n\
\treturn decodeConfig(data)\n\
}\n",
    )?;
    fs::write(
        root.join("src/server.py"),
        "def serve(port):\n    listener = bind_socket(port)\n    return listener.accept_forever()\n",
    )?;
    fs::write(
        root.join("coderag.toml"),
        "[indexer.chunker]\nmin_chunk_tokens = 5\n",
    )?;
    Ok(())
}

#[test]
fn index_search_and_context() -> Result<()> {
    let project = TempDir::new()?;
    write_project(project.path())?;

    coderag_command(project.path())?
        .arg("index")
        .assert()
        .success()
        .stdout(contains("Indexed 2 files"));
    assert!(project.path().join(".coderag/vectors.json").is_file());

    coderag_command(project.path())?
        .args(["search", "parseConfig", "--mode", "keyword"])
        .assert()
        .success()
        .stdout(contains("src/config.go"))
        .stdout(contains("parseConfig"));

    coderag_command(project.path())?
        .args(["context", "parseConfig", "--max-tokens", "2000"])
        .assert()
        .success()
        .stdout(contains("## Relevant Code Context"))
        .stdout(contains("### File: src/config.go"));

    coderag_command(project.path())?
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Ready"));

    Ok(())
}

#[test]
fn search_requires_an_index() -> Result<()> {
    let project = TempDir::new()?;
    write_project(project.path())?;

    coderag_command(project.path())?
        .args(["search", "parseConfig"])
        .assert()
        .failure()
        .stderr(contains("coderag index"));

    Ok(())
}

#[test]
fn clear_removes_the_index() -> Result<()> {
    let project = TempDir::new()?;
    write_project(project.path())?;

    coderag_command(project.path())?.arg("index").assert().success();
    coderag_command(project.path())?
        .arg("clear")
        .assert()
        .success()
        .stdout(contains("Index cleared"));
    coderag_command(project.path())?
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Not indexed"));

    Ok(())
}

#[test]
fn rejects_missing_project_root() -> Result<()> {
    let project = TempDir::new()?;
    let missing = project.path().join("missing");

    coderag_command(&missing)?
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("is not a directory"));

    Ok(())
}

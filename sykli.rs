//! Sykli CI pipeline for kafka-writer
//!
//! Run locally: sykli run
//! Or: cargo run --bin sykli --features sykli -- --emit | sykli run -

use sykli::{Condition, Pipeline, Template};

fn main() {
    let mut p = Pipeline::new();

    // === RESOURCES ===
    let src = p.dir(".");
    let cargo_registry = p.cache("cargo-registry");
    let cargo_git = p.cache("cargo-git");
    let target_cache = p.cache("target");

    // === TEMPLATE ===
    let rust = Template::new()
        .container("rust:1.85")
        .mount_dir(&src, "/src")
        .mount_cache(&cargo_registry, "/usr/local/cargo/registry")
        .mount_cache(&cargo_git, "/usr/local/cargo/git")
        .mount_cache(&target_cache, "/src/target")
        .workdir("/src");

    // === TASKS ===

    let _ = p
        .task("test")
        .from(&rust)
        .run("cargo test")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("lint")
        .from(&rust)
        .run("cargo clippy --all-targets -- -D warnings")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("fmt")
        .from(&rust)
        .run("cargo fmt -- --check")
        .inputs(&["**/*.rs"]);

    let _ = p
        .task("build")
        .from(&rust)
        .run("cargo build --release --bin kafka-writer")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"])
        .output("binary", "target/release/kafka-writer")
        .after(&["test", "lint", "fmt"]);

    // Smoke test against a single-node broker; push events only
    let _ = p
        .task("broker-test")
        .container("ghcr.io/sykli/kind-runner:latest")
        .mount(&src, "/src")
        .workdir("/src")
        .run(
            r#"#!/bin/bash
set -e

docker run -d --name kafka-ci -p 9092:9092 apache/kafka:3.8.0
for i in $(seq 1 30); do
  docker exec kafka-ci /opt/kafka/bin/kafka-topics.sh --bootstrap-server localhost:9092 \
    --create --if-not-exists --topic health-events --partitions 3 && break
  sleep 2
done

RUST_LOG=info ./target/release/kafka-writer 2>&1 | tee /tmp/writer-log.txt &
WRITER_PID=$!
sleep 2

curl -fsS http://localhost:8080/health_check | grep -q '"status":"ok"'

STATUS=$(curl -s -o /dev/null -w '%{http_code}' 'http://localhost:8080/kafka_write?message=ci-smoke')
if [ "$STATUS" != "200" ]; then
  echo "ERROR: kafka_write returned $STATUS"
  cat /tmp/writer-log.txt
  exit 1
fi

STATUS=$(curl -s -o /dev/null -w '%{http_code}' 'http://localhost:8080/kafka_write')
if [ "$STATUS" != "400" ]; then
  echo "ERROR: missing message should return 400, got $STATUS"
  exit 1
fi

kill -INT $WRITER_PID
wait $WRITER_PID || true
grep -q "shut down gracefully" /tmp/writer-log.txt

echo "Broker smoke test passed"

docker rm -f kafka-ci || true
"#,
        )
        .input_from("build", "binary", "/src/target/release/kafka-writer")
        .when_cond(Condition::event("push").or(Condition::negate(Condition::branch("*"))))
        .timeout(600);

    p.emit();
}

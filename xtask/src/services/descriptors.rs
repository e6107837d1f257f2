//! Consistency checks between the hosting descriptors and the workspace.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub(crate) const RENDER_FILE: &str = "render.yaml";
pub(crate) const VERCEL_FILE: &str = "vercel.json";

const SERVER_PACKAGE: &str = "qpay-server";
const ENTRY_POINT: &str = "apps/server/src/main.rs";
const HEALTH_PATH: &str = "/health";
const CATCH_ALL: &str = "/(.*)";

/// The parts of a Render blueprint the service relies on.
#[derive(Debug, Deserialize)]
struct Blueprint {
    #[serde(default)]
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Service {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    build_command: Option<String>,
    start_command: Option<String>,
    health_check_path: Option<String>,
    #[serde(default)]
    env_vars: Vec<EnvVar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvVar {
    key: String,
    from_service: Option<FromService>,
}

#[derive(Debug, Deserialize)]
struct FromService {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    property: Option<String>,
}

fn is_redis(kind: &str) -> bool {
    matches!(kind, "keyvalue" | "redis")
}

fn builds_server(command: &str) -> bool {
    command.split_whitespace().collect::<Vec<_>>().windows(2).any(|w| w == ["-p", SERVER_PACKAGE])
}

/// Problems found in `render.yaml`; empty when the blueprint is usable.
///
/// # Errors
/// Returns an error if the file is not a YAML blueprint.
pub(crate) fn check_render(content: &str) -> Result<Vec<String>> {
    let blueprint: Blueprint =
        serde_yaml::from_str(content).context("render.yaml is not a valid blueprint")?;
    let mut problems = Vec::new();

    let web = blueprint.services.iter().find(|s| s.kind == "web");

    if !web.and_then(|s| s.build_command.as_deref()).is_some_and(builds_server) {
        problems.push(format!("buildCommand must build `-p {SERVER_PACKAGE}`"));
    }
    if !web.and_then(|s| s.start_command.as_deref()).is_some_and(|c| c.contains(SERVER_PACKAGE)) {
        problems.push(format!("startCommand must start the {SERVER_PACKAGE} binary"));
    }
    if web.and_then(|s| s.health_check_path.as_deref()) != Some(HEALTH_PATH) {
        problems.push(format!("healthCheckPath must be {HEALTH_PATH}"));
    }

    let redis: Vec<&str> = blueprint
        .services
        .iter()
        .filter(|s| is_redis(&s.kind))
        .filter_map(|s| s.name.as_deref())
        .collect();
    if redis.is_empty() {
        problems.push("no Redis (keyvalue) instance is provisioned".to_owned());
    }

    let wired = web
        .into_iter()
        .flat_map(|s| &s.env_vars)
        .filter(|var| var.key == "REDIS_URL")
        .filter_map(|var| var.from_service.as_ref())
        .any(|from| {
            is_redis(&from.kind)
                && redis.contains(&from.name.as_str())
                && from.property.as_deref() == Some("connectionString")
        });
    if !wired {
        problems.push("REDIS_URL must be wired from the Redis instance".to_owned());
    }

    Ok(problems)
}

/// Problems found in `vercel.json`; empty when every request reaches the server entry point.
///
/// # Errors
/// Returns an error if the file is not JSON.
pub(crate) fn check_vercel(content: &str, root: &Path) -> Result<Vec<String>> {
    let doc: Value = serde_json::from_str(content).context("vercel.json is not valid JSON")?;
    let mut problems = Vec::new();

    let builds_entry = doc["builds"]
        .as_array()
        .is_some_and(|builds| builds.iter().any(|b| b["src"].as_str() == Some(ENTRY_POINT)));
    if !builds_entry {
        problems.push(format!("builds must compile {ENTRY_POINT}"));
    }

    let routes = doc["routes"].as_array().map(Vec::as_slice).unwrap_or_default();
    if !routes.iter().any(|r| r["src"].as_str() == Some(CATCH_ALL)) {
        problems.push(format!("a catch-all route `{CATCH_ALL}` is required"));
    }
    for dest in routes.iter().filter_map(|r| r["dest"].as_str()) {
        if !root.join(dest.trim_start_matches('/')).is_file() {
            problems.push(format!("route destination {dest} does not exist"));
        }
    }

    Ok(problems)
}

/// Reads and checks both descriptors under `root`.
///
/// # Errors
/// Returns an error if a descriptor is missing, unreadable or unparsable.
pub(crate) fn check_all(root: &Path) -> Result<Vec<String>> {
    let render = fs::read_to_string(root.join(RENDER_FILE))
        .with_context(|| format!("Failed to read {RENDER_FILE}"))?;
    let vercel = fs::read_to_string(root.join(VERCEL_FILE))
        .with_context(|| format!("Failed to read {VERCEL_FILE}"))?;

    let mut problems: Vec<String> =
        check_render(&render)?.into_iter().map(|p| format!("{RENDER_FILE}: {p}")).collect();
    problems.extend(check_vercel(&vercel, root)?.into_iter().map(|p| format!("{VERCEL_FILE}: {p}")));
    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDER_OK: &str = r"
services:
  - type: web
    name: qpay-server
    runtime: rust
    buildCommand: cargo build --release --locked -p qpay-server
    startCommand: ./target/release/qpay-server
    healthCheckPath: /health
    envVars:
      - key: REDIS_URL
        fromService:
          type: keyvalue
          name: qpay-redis
          property: connectionString
  - type: keyvalue
    name: qpay-redis
    ipAllowList: []
";

    #[test]
    fn complete_blueprint_passes() {
        assert!(check_render(RENDER_OK).unwrap().is_empty());
    }

    #[test]
    fn quoted_values_are_accepted() {
        let quoted = RENDER_OK.replace("healthCheckPath: /health", r#"healthCheckPath: "/health""#);
        assert!(check_render(&quoted).unwrap().is_empty());
    }

    #[test]
    fn redis_url_must_come_from_the_redis_service() {
        let literal = RENDER_OK.replace(
            r"      - key: REDIS_URL
        fromService:
          type: keyvalue
          name: qpay-redis
          property: connectionString",
            r"      - key: REDIS_URL
        value: redis://localhost:6379
      - key: OTHER_URL
        fromService:
          type: keyvalue
          name: qpay-redis
          property: connectionString",
        );
        assert_eq!(check_render(&literal).unwrap(), ["REDIS_URL must be wired from the Redis instance"]);

        let elsewhere = RENDER_OK.replace("name: qpay-redis\n          property", "name: other-redis\n          property");
        assert_eq!(check_render(&elsewhere).unwrap(), ["REDIS_URL must be wired from the Redis instance"]);
    }

    #[test]
    fn build_flag_must_name_the_server_package() {
        let other = RENDER_OK.replace("-p qpay-server", "-p qpay-server-tools");
        assert_eq!(check_render(&other).unwrap(), ["buildCommand must build `-p qpay-server`"]);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(check_render("services: [").is_err());
    }

    #[test]
    fn blueprint_without_redis_is_reported() {
        let web_only = r"
services:
  - type: web
    name: qpay-server
    buildCommand: cargo build --release -p qpay-server
    startCommand: ./target/release/qpay-server
    healthCheckPath: /health
";
        let problems = check_render(web_only).unwrap();
        assert_eq!(problems.len(), 2, "{problems:?}");
    }

    #[test]
    fn wrong_health_path_is_reported() {
        let problems = check_render(&RENDER_OK.replace("/health", "/")).unwrap();
        assert_eq!(problems, ["healthCheckPath must be /health"]);
    }

    #[test]
    fn vercel_routes_must_reach_existing_entry_point() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
        let good = format!(
            r#"{{"builds":[{{"src":"{ENTRY_POINT}","use":"vercel-rust"}}],"routes":[{{"src":"/(.*)","dest":"/{ENTRY_POINT}"}}]}}"#
        );
        assert!(check_vercel(&good, root).unwrap().is_empty());

        let bad = r#"{"routes":[{"src":"/api/(.*)","dest":"/api/missing.rs"}]}"#;
        assert_eq!(check_vercel(bad, root).unwrap().len(), 3);

        assert!(check_vercel("not json", root).is_err());
    }
}

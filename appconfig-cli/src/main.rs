use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use serde::Deserialize;

use appconfig_core::differ::{Diff, diff};
use appconfig_core::provider::Provider;
use appconfig_core::resource::{Resource, ResourceId, State, Value};
use appconfig_core::schema::ResourceSchema;
use appconfig_provider::features::{decode_filters, encode_filters};
use appconfig_provider::ids::ConfigurationStoreId;
use appconfig_provider::schemas;
use appconfig_provider::{AppConfigProvider, ProviderConfig};

#[derive(Parser)]
#[command(name = "appconfig")]
#[command(about = "Azure App Configuration provider tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a feature flag client filter array and print its canonical form
    Filters {
        /// Path to a JSON file holding the `client_filters` array
        file: PathBuf,
    },
    /// Resolve the data-plane endpoint of a configuration store
    Endpoint {
        /// Configuration store ID
        store_id: String,

        /// Resolve a replica's endpoint instead
        #[arg(long)]
        replica: Option<String>,
    },
    /// Find the configuration store behind a data-plane endpoint
    Lookup {
        /// Endpoint URL, e.g. https://example.azconfig.io
        endpoint: String,
    },
    /// Read a resource and print its attributes
    Read {
        /// Resource type, e.g. app_configuration
        resource_type: String,

        /// Provider identifier (ARM ID or nested item URL)
        identifier: String,
    },
    /// Validate a resources file against the provider schemas
    Validate {
        /// Path to the resources JSON file
        #[arg(default_value = "resources.json")]
        file: PathBuf,
    },
    /// Show what would change to reach the desired resources
    Plan {
        /// Path to the resources JSON file
        #[arg(default_value = "resources.json")]
        file: PathBuf,
    },
}

/// One entry of a resources file
#[derive(Debug, Deserialize)]
struct ResourceEntry {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    /// Provider identifier of the existing resource, if any
    identifier: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResourcesFile {
    resources: Vec<ResourceEntry>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Filters { file } => run_filters(&file),
        Commands::Endpoint { store_id, replica } => {
            run_endpoint(&store_id, replica.as_deref()).await
        }
        Commands::Lookup { endpoint } => run_lookup(&endpoint).await,
        Commands::Read {
            resource_type,
            identifier,
        } => run_read(&resource_type, &identifier).await,
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn get_provider() -> Result<AppConfigProvider, String> {
    let config = ProviderConfig::from_env().map_err(|e| e.to_string())?;
    AppConfigProvider::new(config).map_err(|e| e.to_string())
}

fn get_schemas() -> HashMap<String, ResourceSchema> {
    let mut all_schemas = HashMap::new();
    for schema in schemas::all_schemas() {
        all_schemas.insert(schema.resource_type.clone(), schema);
    }
    all_schemas
}

fn render_filters(content: &str) -> Result<String, String> {
    let raw: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {}", e))?;
    let filters = decode_filters(&raw).map_err(|e| e.to_string())?;
    let encoded = encode_filters(&filters).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&encoded).map_err(|e| e.to_string())
}

fn run_filters(file: &Path) -> Result<(), String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    println!("{}", render_filters(&content)?);
    Ok(())
}

async fn run_endpoint(store_id: &str, replica: Option<&str>) -> Result<(), String> {
    let store_id = ConfigurationStoreId::parse_insensitively(store_id).map_err(|e| e.to_string())?;
    let provider = get_provider()?;

    match provider
        .resolver()
        .endpoint_for_store(&store_id, replica)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(endpoint) => println!("{}", endpoint),
        None => {
            return Err(format!(
                "replica {:?} of {} was not found",
                replica.unwrap_or_default(),
                store_id
            ));
        }
    }
    Ok(())
}

async fn run_lookup(endpoint: &str) -> Result<(), String> {
    let provider = get_provider()?;
    let details = provider
        .resolver()
        .details_from_endpoint(endpoint)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no configuration store found for {}", endpoint))?;

    println!("{} {}", "Store:".bold(), details.configuration_store_id);
    if let Some(replica) = &details.replica_name {
        println!("{} {}", "Replica:".bold(), replica);
    }
    println!("{} {}", "Endpoint:".bold(), details.data_plane_endpoint);
    Ok(())
}

async fn run_read(resource_type: &str, identifier: &str) -> Result<(), String> {
    let provider = get_provider()?;
    let id = ResourceId::new(resource_type, "cli");
    let state = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        println!("{}", "Resource does not exist.".yellow());
        return Ok(());
    }
    print_attributes(&state.attributes, "  ");
    Ok(())
}

/// `null` anywhere in an attribute has no attribute value
fn contains_null(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.iter().any(contains_null),
        serde_json::Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

fn load_resources(file: &Path) -> Result<Vec<(Resource, Option<String>)>, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let parsed: ResourcesFile =
        serde_json::from_str(&content).map_err(|e| format!("Parse error: {}", e))?;

    let mut entries = Vec::with_capacity(parsed.resources.len());
    for entry in parsed.resources {
        let mut resource = Resource::new(entry.resource_type, entry.name);
        for (key, value) in &entry.attributes {
            let converted = if contains_null(value) {
                None
            } else {
                Value::from_json(value)
            };
            let value = converted.ok_or_else(|| {
                format!(
                    "Parse error: {}: attribute '{}' has unsupported value {}",
                    resource.id, key, value
                )
            })?;
            resource.attributes.insert(key.clone(), value);
        }
        debug!(
            "loaded {} with {} attributes",
            resource.id,
            resource.attributes.len()
        );
        entries.push((resource, entry.identifier));
    }
    Ok(entries)
}

fn validate_resources(resources: &[Resource]) -> Result<(), String> {
    let schemas = get_schemas();
    let mut all_errors = Vec::new();

    for resource in resources {
        match schemas.get(&resource.id.resource_type) {
            Some(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", resource.id, error));
                    }
                }
            }
            None => all_errors.push(format!(
                "{}: unknown resource type {}",
                resource.id, resource.id.resource_type
            )),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

fn run_validate(file: &Path) -> Result<(), String> {
    let entries = load_resources(file)?;
    let resources: Vec<Resource> = entries.into_iter().map(|(r, _)| r).collect();
    validate_resources(&resources)?;
    println!(
        "{}",
        format!("Configuration is valid ({} resources).", resources.len()).green()
    );
    Ok(())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let entries = load_resources(file)?;
    let resources: Vec<Resource> = entries.iter().map(|(r, _)| r.clone()).collect();
    validate_resources(&resources)?;

    let provider = get_provider()?;
    let schemas = get_schemas();
    let mut diffs = Vec::new();
    for (resource, identifier) in &entries {
        info!(
            "reading current state of {} ({})",
            resource.id,
            identifier.as_deref().unwrap_or("new")
        );
        let current: State = provider
            .read(&resource.id, identifier.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        if let Some(schema) = schemas.get(&resource.id.resource_type) {
            diffs.push(diff(resource, &current, schema));
        }
    }

    print_plan(&diffs);
    Ok(())
}

fn print_plan(diffs: &[Diff]) {
    if !diffs.iter().any(Diff::is_change) {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let mut counts = [0usize; 4];
    for d in diffs {
        match d {
            Diff::Create(resource) => {
                counts[0] += 1;
                println!("  {} {}", "+".green().bold(), resource.id);
                print_attributes(&resource.attributes, "      ");
            }
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => {
                counts[1] += 1;
                println!("  {} {}", "~".yellow().bold(), id);
                print_changes(changed_attributes, from, to);
            }
            Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => {
                counts[2] += 1;
                println!("  {} {}", "-/+".magenta().bold(), id);
                print_changes(changed_attributes, from, to);
            }
            Diff::Delete(id) => {
                counts[3] += 1;
                println!("  {} {}", "-".red().bold(), id);
            }
            Diff::NoChange(_) => {}
        }
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        counts[0].to_string().green(),
        counts[1].to_string().yellow(),
        counts[2].to_string().magenta(),
        counts[3].to_string().red()
    );
}

fn print_changes(changed: &[String], from: &State, to: &Resource) {
    for name in changed {
        let old = from
            .attributes
            .get(name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        let new = to
            .attributes
            .get(name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        println!("      {}: {} → {}", name, old.red(), new.green());
    }
}

fn print_attributes(attributes: &HashMap<String, Value>, indent: &str) {
    let mut keys: Vec<_> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        if key.starts_with('_') {
            continue;
        }
        println!("{}{}: {}", indent, key, format_value(&attributes[key]));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn render_filters_canonicalizes_names() {
        let output =
            render_filters(r#"[{"name":"microsoft.percentage","parameters":{"value":50}}]"#)
                .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["name"], "Microsoft.Percentage");
        assert_eq!(parsed[0]["parameters"]["Value"].as_f64(), Some(50.0));
    }

    #[test]
    fn render_filters_reports_unknown_filter() {
        let err = render_filters(r#"[{"name":"Custom.Filter"}]"#).unwrap_err();
        assert!(err.contains("Custom.Filter"));
    }

    #[test]
    fn load_and_validate_resources_file() {
        let file = write_temp(
            r#"{
                "resources": [
                    {
                        "type": "app_configuration",
                        "name": "main",
                        "attributes": {
                            "name": "main-store",
                            "resource_group_name": "rg",
                            "location": "westeurope",
                            "soft_delete_retention_days": 3
                        }
                    },
                    {
                        "type": "app_configuration_feature",
                        "name": "beta",
                        "identifier": "https://main-store.azconfig.io/kv/.appconfig.featureflag%2Fbeta",
                        "attributes": {
                            "configuration_store_id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AppConfiguration/configurationStores/main-store",
                            "name": "beta",
                            "percentage_filter_value": 12.5
                        }
                    }
                ]
            }"#,
        );

        let entries = load_resources(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, None);
        assert!(entries[1].1.is_some());
        assert_eq!(
            entries[0].0.get_int("soft_delete_retention_days"),
            Some(3)
        );

        let resources: Vec<_> = entries.into_iter().map(|(r, _)| r).collect();
        assert!(validate_resources(&resources).is_ok());
    }

    #[test]
    fn load_rejects_unsupported_attribute_values() {
        let file = write_temp(
            r#"{
                "resources": [
                    {
                        "type": "app_configuration",
                        "name": "main",
                        "attributes": {"name": "main-store", "tags": null}
                    }
                ]
            }"#,
        );
        let err = load_resources(file.path()).unwrap_err();
        assert!(err.contains("app_configuration.main"));
        assert!(err.contains("'tags'"));

        let nested = write_temp(
            r#"{
                "resources": [
                    {
                        "type": "app_configuration_feature",
                        "name": "beta",
                        "attributes": {"targeting_filter": [{"users": ["alice", null]}]}
                    }
                ]
            }"#,
        );
        let err = load_resources(nested.path()).unwrap_err();
        assert!(err.contains("'targeting_filter'"));
    }

    #[test]
    fn validate_reports_every_error() {
        let resources = vec![
            Resource::new("app_configuration", "main")
                .with_attribute("name", Value::String("abc".to_string())),
            Resource::new("app_service", "web"),
        ];
        let err = validate_resources(&resources).unwrap_err();
        assert!(err.contains("app_configuration.main"));
        assert!(err.contains("unknown resource type app_service"));
    }

    #[test]
    fn format_value_sorts_maps() {
        let value = Value::Map(HashMap::from([
            ("b".to_string(), Value::Int(2)),
            ("a".to_string(), Value::Bool(true)),
        ]));
        assert_eq!(format_value(&value), "{a: true, b: 2}");
    }
}

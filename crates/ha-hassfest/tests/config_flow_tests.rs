//! End-to-end tests for the config flow plugin
//!
//! Each test lays out a miniature core checkout in a temporary directory and
//! runs the plugin against it the way the command line does.

use ha_hassfest::config_flow::{CONFIG_FLOWS_FILE, CONFIG_FLOWS_V2_FILE};
use ha_hassfest::{
    Action, Config, ConfigFlowPlugin, HassfestError, Integration, Plugin, Severity, COMPONENTS_DIR,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXPECTED_FLOWS: &str = r#""""Automatically generated by hassfest.

To update, run python3 -m script.hassfest
"""

FLOWS = {
    "integration": [
        "acme_cloud",
        "foo",
        "hue",
    ],
    "helper": [
        "derivative",
    ],
}
"#;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn add_integration(root: &Path, domain: &str, manifest: Value, config_flow: Option<&str>) {
    let dir = root.join(COMPONENTS_DIR).join(domain);
    write_file(&dir.join("manifest.json"), &manifest.to_string());
    write_file(&dir.join("__init__.py"), "");
    if let Some(source) = config_flow {
        write_file(&dir.join("config_flow.py"), source);
    }
}

/// A core checkout with up to date generated files
fn setup_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    add_integration(
        root,
        "foo",
        json!({"domain": "foo", "name": "Foo", "config_flow": true}),
        Some("async def async_step_user(self, user_input=None):\n    pass\n"),
    );
    add_integration(
        root,
        "hue",
        json!({"domain": "hue", "name": "Philips Hue", "config_flow": true, "integration_type": "hub"}),
        Some(
            "async def async_step_zeroconf(self, discovery_info):\n    await self.async_set_unique_id(discovery_info.properties['id'])\n",
        ),
    );
    add_integration(
        root,
        "derivative",
        json!({"domain": "derivative", "name": "Derivative sensor", "config_flow": true, "integration_type": "helper"}),
        Some("class ConfigFlowHandler(SchemaConfigFlowHandler):\n    pass\n"),
    );
    write_file(
        &root.join(COMPONENTS_DIR).join("derivative/strings.json"),
        r#"{"title": "Derivative sensor"}"#,
    );
    add_integration(
        root,
        "acme_cloud",
        json!({"domain": "acme_cloud", "name": "Acme Cloud", "config_flow": true, "integration_type": "service"}),
        Some("async def async_step_user(self, user_input=None):\n    pass\n"),
    );
    add_integration(
        root,
        "sun",
        json!({"domain": "sun", "name": "Sun", "integration_type": "service"}),
        None,
    );

    write_file(
        &root.join("homeassistant/brands/acme.json"),
        r#"{"domain": "acme", "name": "Acme", "integrations": ["acme_cloud"], "iot_standards": ["zigbee"]}"#,
    );

    write_file(
        &root.join("homeassistant/generated").join(CONFIG_FLOWS_FILE),
        EXPECTED_FLOWS,
    );
    write_file(
        &root.join("homeassistant/generated").join(CONFIG_FLOWS_V2_FILE),
        &format!("{}\n", expected_v2()),
    );

    dir
}

fn expected_v2() -> String {
    r#"{
  "integration": {
    "acme": {
      "name": "Acme",
      "integrations": {
        "acme_cloud": {
          "name": "Acme Cloud"
        }
      },
      "iot_standards": [
        "zigbee"
      ]
    },
    "foo": {
      "name": "Foo"
    },
    "hue": {
      "name": "Philips Hue"
    }
  },
  "helper": {
    "derivative": {
      "name": "Derivative sensor",
      "translated_name": true
    }
  }
}"#
    .to_string()
}

fn run_validate(config: &mut Config) -> ha_hassfest::HassfestResult<()> {
    let integrations = Integration::load_dir(&config.root().join(COMPONENTS_DIR), config)?;
    ConfigFlowPlugin::default().validate(&integrations, config)
}

#[test]
fn test_up_to_date_repo_is_clean() {
    let dir = setup_repo();
    let mut config = Config::new(dir.path(), Action::Validate);

    run_validate(&mut config).unwrap();

    assert!(
        config.diagnostics().is_empty(),
        "unexpected diagnostics: {:?}",
        config.diagnostics()
    );
    assert_eq!(config.cached("config_flow"), Some(EXPECTED_FLOWS));
}

#[test]
fn test_crlf_checkout_is_up_to_date() {
    let dir = setup_repo();
    let generated = dir.path().join("homeassistant/generated");
    write_file(
        &generated.join(CONFIG_FLOWS_FILE),
        &EXPECTED_FLOWS.replace('\n', "\r\n"),
    );
    write_file(
        &generated.join(CONFIG_FLOWS_V2_FILE),
        &format!("{}\n", expected_v2()).replace('\n', "\r\n"),
    );
    let mut config = Config::new(dir.path(), Action::Validate);

    run_validate(&mut config).unwrap();

    assert!(config.errors().next().is_none());
}

#[test]
fn test_v2_json_matches_expected_structure() {
    let dir = setup_repo();
    let mut config = Config::new(dir.path(), Action::Validate);

    run_validate(&mut config).unwrap();

    let v2: Value = serde_json::from_str(config.cached("config_flow_v2").unwrap()).unwrap();
    assert!(v2["integration"].get("acme_cloud").is_none());
    assert_eq!(
        v2["integration"]["acme"]["integrations"]["acme_cloud"]["name"],
        "Acme Cloud"
    );
    assert!(v2["integration"].get("sun").is_none());
}

#[test]
fn test_stale_files_are_fixable_errors() {
    let dir = setup_repo();
    let generated = dir.path().join("homeassistant/generated");
    write_file(
        &generated.join(CONFIG_FLOWS_FILE),
        &EXPECTED_FLOWS.replace("\"foo\"", "\"fo0\""),
    );
    write_file(&generated.join(CONFIG_FLOWS_V2_FILE), &expected_v2());

    let mut config = Config::new(dir.path(), Action::Validate);
    run_validate(&mut config).unwrap();

    let errors: Vec<_> = config.errors().collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.fixable && e.plugin == "config_flow"));
    assert_eq!(
        errors[0].message,
        "File config_flows.py is not up to date. Run python3 -m script.hassfest"
    );
    assert_eq!(
        errors[1].message,
        "File config_flows_v2.json is not up to date. Run python3 -m script.hassfest"
    );
}

#[test]
fn test_generate_fixes_stale_files() {
    let dir = setup_repo();
    let generated = dir.path().join("homeassistant/generated");
    write_file(&generated.join(CONFIG_FLOWS_FILE), "");
    write_file(&generated.join(CONFIG_FLOWS_V2_FILE), "{}\n");

    let plugin = ConfigFlowPlugin::default();
    let mut config = Config::new(dir.path(), Action::Generate);
    let integrations =
        Integration::load_dir(&config.root().join(COMPONENTS_DIR), &mut config).unwrap();
    plugin.validate(&integrations, &mut config).unwrap();
    assert_eq!(config.errors().count(), 2);
    plugin.generate(&integrations, &mut config).unwrap();

    assert_eq!(
        fs::read_to_string(generated.join(CONFIG_FLOWS_FILE)).unwrap(),
        EXPECTED_FLOWS
    );
    assert_eq!(
        fs::read_to_string(generated.join(CONFIG_FLOWS_V2_FILE)).unwrap(),
        format!("{}\n", expected_v2())
    );

    let mut rerun = Config::new(dir.path(), Action::Validate);
    run_validate(&mut rerun).unwrap();
    assert!(rerun.diagnostics().is_empty());
}

#[test]
fn test_generation_is_deterministic() {
    let dir = setup_repo();

    let mut first = Config::new(dir.path(), Action::Validate);
    run_validate(&mut first).unwrap();
    let mut second = Config::new(dir.path(), Action::Validate);
    run_validate(&mut second).unwrap();

    assert_eq!(first.cached("config_flow"), second.cached("config_flow"));
    assert_eq!(first.cached("config_flow_v2"), second.cached("config_flow_v2"));
}

#[test]
fn test_discoverable_flow_without_unique_id() {
    let dir = setup_repo();
    add_integration(
        dir.path(),
        "lamp",
        json!({"domain": "lamp", "name": "Lamp", "config_flow": true}),
        Some("async def async_step_dhcp(self, discovery_info):\n    return self.async_create_entry(title='x', data={})\n"),
    );

    let mut config = Config::new(dir.path(), Action::Validate);
    run_validate(&mut config).unwrap();

    let unique_id: Vec<_> = config
        .diagnostics()
        .iter()
        .filter(|d| d.domain.as_deref() == Some("lamp"))
        .collect();
    assert_eq!(unique_id.len(), 1);
    assert_eq!(unique_id[0].severity, Severity::Error);
    assert_eq!(
        unique_id[0].message,
        "Config flows that are discoverable need to set a unique ID"
    );
}

#[test]
fn test_restricted_run_warns_and_skips_drift_check() {
    let dir = setup_repo();
    add_integration(
        dir.path(),
        "lamp",
        json!({"domain": "lamp", "name": "Lamp", "config_flow": true}),
        Some("async def async_step_usb(self, discovery_info):\n    pass\n"),
    );
    // Stale on disk, but a restricted run must not notice
    fs::remove_file(
        dir.path()
            .join("homeassistant/generated")
            .join(CONFIG_FLOWS_V2_FILE),
    )
    .unwrap();

    let lamp = dir.path().join(COMPONENTS_DIR).join("lamp");
    let mut config =
        Config::new(dir.path(), Action::Validate).with_specific_integrations(vec![lamp.clone()]);
    let integrations = Integration::load_paths(&[lamp], &mut config).unwrap();
    ConfigFlowPlugin::default()
        .validate(&integrations, &mut config)
        .unwrap();

    assert_eq!(config.errors().count(), 0);
    let warnings: Vec<_> = config.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert!(config.cached("config_flow").is_some());
    assert!(config.cached("config_flow_v2").is_none());
}

#[test]
fn test_missing_generated_file_aborts() {
    let dir = setup_repo();
    fs::remove_file(
        dir.path()
            .join("homeassistant/generated")
            .join(CONFIG_FLOWS_FILE),
    )
    .unwrap();

    let mut config = Config::new(dir.path(), Action::Validate);
    let result = run_validate(&mut config);

    assert!(matches!(result, Err(HassfestError::ReadFile { .. })));
}

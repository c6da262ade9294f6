use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SOUNDS_JSON: &str = "sounds.json";

const DEFAULT_SOUND: &str = "default";
const DEFAULT_SNOOZE_MINUTES: u8 = 5;

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Chime",
                "defaultSound": DEFAULT_SOUND,
                "snoozeMinutes": DEFAULT_SNOOZE_MINUTES,
                "seedStarterAlarms": true
            }),
        ),
        (
            SOUNDS_JSON,
            serde_json::json!({
                "schema": 1,
                "sounds": ["default", "chime", "radar", "beacon", "crystal"]
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_default_sound(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("defaultSound")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SOUND)
        .to_string())
}

pub fn read_snooze_minutes(config_dir: &Path) -> Result<u8, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let minutes = app
        .get("snoozeMinutes")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(u64::from(DEFAULT_SNOOZE_MINUTES));
    u8::try_from(minutes)
        .map_err(|_| InfraError::InvalidConfig(format!("snoozeMinutes {minutes} out of range")))
}

pub fn read_seed_starter_alarms(config_dir: &Path) -> Result<bool, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get("seedStarterAlarms")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true))
}

pub fn read_sound_ids(config_dir: &Path) -> Result<Vec<String>, InfraError> {
    let sounds = read_config(&config_dir.join(SOUNDS_JSON))?;
    Ok(sounds
        .get("sounds")
        .and_then(serde_json::Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default())
}

//! Persisted client settings (`~/.config/riskscan/config.json`).

use std::io::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub backend_url: Option<String>,
}

impl ClientSettings {
    fn normalize(&mut self) {
        self.backend_url = self.backend_url.as_ref().map(|s| s.trim().to_string());
        if matches!(self.backend_url.as_deref(), Some(s) if s.is_empty()) {
            self.backend_url = None;
        }
    }
}

fn xdg_config_home() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(dir);
        if dir.as_os_str().is_empty() {
            anyhow::bail!("XDG_CONFIG_HOME is set but empty");
        }
        return Ok(dir);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
    let home = PathBuf::from(home);
    if home.as_os_str().is_empty() {
        anyhow::bail!("HOME is set but empty");
    }
    Ok(home.join(".config"))
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_home()?.join("riskscan").join("config.json"))
}

pub fn load_settings() -> anyhow::Result<Option<ClientSettings>> {
    let path = settings_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    let mut settings: ClientSettings = serde_json::from_str(&raw)?;
    settings.normalize();
    Ok(Some(settings))
}

pub fn save_settings(settings: &ClientSettings) -> anyhow::Result<()> {
    let path = settings_path()?;
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid settings path: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let mut settings = settings.clone();
    settings.normalize();

    let json = serde_json::to_string_pretty(&settings)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(tmp, path)?;
    Ok(())
}

/// Load settings, prompting for them on first run when interactive.
pub fn ensure_settings(interactive: bool) -> anyhow::Result<Option<ClientSettings>> {
    match load_settings() {
        Ok(Some(settings)) => return Ok(Some(settings)),
        Ok(None) => {}
        Err(err) => {
            if !interactive {
                return Err(err);
            }
            eprintln!("warning: failed to read settings (will recreate): {err:#}");
        }
    }
    if !interactive {
        return Ok(None);
    }

    let settings = prompt_settings()?;
    save_settings(&settings)?;
    Ok(Some(settings))
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    let mut out = std::io::stdout();
    out.write_all(prompt.as_bytes())?;
    out.flush()?;

    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn prompt_settings() -> anyhow::Result<ClientSettings> {
    let path = settings_path()?;
    println!("First-run setup (saved to {}).", path.display());
    println!("Press ENTER to use the built-in default backend.");

    let backend_url = loop {
        let v = prompt_line("Backend URL (http…): ")?;
        if v.is_empty() || v.starts_with("http") {
            break v;
        }
        println!("Invalid URL: expected an http(s) URL (or leave empty).");
    };

    let mut settings = ClientSettings {
        backend_url: Some(backend_url),
    };
    settings.normalize();
    Ok(settings)
}

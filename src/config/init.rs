// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates hoist.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ImageReference;

use super::{CONFIG_FILENAME, Config, CredentialsHandle};

pub fn init_config(dir: &Path, image: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(i) = image {
        config.image = ImageReference::parse(i).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let target = &config.target;
    let ports = target
        .ports
        .iter()
        .map(|p| format!("    - \"{}\"", p))
        .collect::<Vec<_>>()
        .join("\n");
    let (username, password_env) = match &config.registry {
        Some(r) => (
            r.username.as_str(),
            match &r.password {
                CredentialsHandle::Env(var) => var.as_str(),
                _ => "DOCKERHUB_TOKEN",
            },
        ),
        None => ("myuser", "DOCKERHUB_TOKEN"),
    };

    format!(
        r#"image: {image}

build:
  context: .
  dockerfile: Dockerfile
  entrypoint: app.py
  manifest: requirements.txt

registry:
  username: {username}
  password:
    env: {password_env}

target:
  host: {user}@{host}
  container: {container}
  ports:
{ports}
  # credentials: agent            # or: {{ key_file: ~/.ssh/deploy.pem }}
  # SSH host key verification (default: false for security)
  # trust_first_connection: true

healthcheck:
  cmd: "curl -fsS http://localhost:5000/"
  retries: 5
  interval: 2s

deploy:
  max_publish_retries: 3
  remote_command_timeout_seconds: 300
  rollback_on_failure: true
"#,
        image = config.image,
        username = username,
        password_env = password_env,
        user = target.user.as_deref().unwrap_or("ubuntu"),
        host = target.host,
        container = target.container,
        ports = ports,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_template_parses() {
        let yaml = generate_template_yaml(&Config::template());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.image.reference(), "myuser/flask-app:latest");
        assert_eq!(config.target.user.as_deref(), Some("ubuntu"));
        assert_eq!(config.target.ports.len(), 1);
        assert_eq!(
            config.registry.unwrap().password,
            CredentialsHandle::Env("DOCKERHUB_TOKEN".to_string())
        );
    }
}

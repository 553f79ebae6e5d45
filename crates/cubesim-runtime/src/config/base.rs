use super::{launch::LaunchConfig, matmul::MatmulConfig};
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static CUBESIM_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for CubeSim, combining launch and matmul settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration of kernel launches.
    #[serde(default)]
    pub launch: LaunchConfig,

    /// Configuration of the matmul engine.
    #[serde(default)]
    pub matmul: MatmulConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `cubesim.toml` or `CubeSim.toml` in the
    /// current directory or its parents. If no file is found, a default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock; clients read it once when created.
    pub fn get() -> Arc<Self> {
        let mut state = CUBESIM_GLOBAL_CONFIG.lock();
        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = Arc::new(Self::from_current_dir().override_from_env());
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`. Attempting
    /// to set the configuration after it has been initialized will cause a panic.
    pub fn set(config: Self) {
        let mut state = CUBESIM_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        use super::{launch::LaunchLogLevel, matmul::MatmulLogLevel};

        if let Ok(val) = std::env::var("CUBESIM_DEBUG_LOG") {
            self.launch.logger.level = LaunchLogLevel::Full;
            self.matmul.logger.level = MatmulLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.launch.logger.stdout = true;
                    self.matmul.logger.stdout = true;
                }
                "stderr" => {
                    self.launch.logger.stderr = true;
                    self.matmul.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/cubesim.log";
                    self.launch.logger.file = Some(file_path.into());
                    self.matmul.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.launch.logger.level = LaunchLogLevel::Disabled;
                    self.matmul.logger.level = MatmulLogLevel::Disabled;
                }
                file_path => {
                    self.launch.logger.file = Some(file_path.into());
                    self.matmul.logger.file = Some(file_path.into());
                }
            }
        };

        if let Ok(val) = std::env::var("CUBESIM_MAX_CONCURRENT_CUBES") {
            match val.parse::<u32>() {
                Ok(value) => self.launch.max_concurrent_cubes = Some(value),
                Err(_) => log::warn!("Ignoring invalid CUBESIM_MAX_CONCURRENT_CUBES={val}"),
            }
        }

        if let Ok(val) = std::env::var("CUBESIM_COPY_WORKERS") {
            match val.parse::<u32>() {
                Ok(value) if value > 0 => self.launch.copy_workers = value,
                _ => log::warn!("Ignoring invalid CUBESIM_COPY_WORKERS={val}"),
            }
        }

        self
    }

    // Loads configuration from `cubesim.toml` or `CubeSim.toml` in the current directory or its parents.
    //
    // Traverses up the directory tree until a valid configuration file is found or the root is reached.
    // Returns a default configuration if no file is found.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            if let Ok(content) = Self::from_file_path(dir.join("cubesim.toml")) {
                return content;
            }

            if let Ok(content) = Self::from_file_path(dir.join("CubeSim.toml")) {
                return content;
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match toml::from_str(&content) {
            Ok(val) => val,
            Err(err) => panic!("The file provided doesn't have the right format => {err:?}"),
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExecutionMode;
    use crate::config::launch::LaunchLogLevel;

    #[test]
    fn parses_partial_toml() {
        let content = r#"
            [launch]
            max_concurrent_cubes = 3
            execution_mode = "unchecked"

            [launch.logger]
            stdout = true
            level = "basic"
        "#;
        let config: GlobalConfig = toml::from_str(content).unwrap();

        assert_eq!(config.launch.max_concurrent_cubes(), 3);
        assert_eq!(config.launch.copy_workers, 2);
        assert_eq!(config.launch.execution_mode, ExecutionMode::Unchecked);
        assert!(config.launch.logger.stdout);
        assert!(matches!(config.launch.logger.level, LaunchLogLevel::Basic));
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_wave_size() {
        // SAFETY: serialized with the other tests touching the environment.
        unsafe { std::env::set_var("CUBESIM_MAX_CONCURRENT_CUBES", "5") };
        let config = GlobalConfig::default().override_from_env();
        unsafe { std::env::remove_var("CUBESIM_MAX_CONCURRENT_CUBES") };

        assert_eq!(config.launch.max_concurrent_cubes, Some(5));
    }

    #[test]
    #[serial_test::serial]
    fn invalid_copy_workers_are_ignored() {
        unsafe { std::env::set_var("CUBESIM_COPY_WORKERS", "0") };
        let config = GlobalConfig::default().override_from_env();
        unsafe { std::env::remove_var("CUBESIM_COPY_WORKERS") };

        assert_eq!(config.launch.copy_workers, 2);
    }
}

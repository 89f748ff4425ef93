//! Companion service-script provisioning
//!
//! On start-up the module drops a fixed boot script into the root
//! manager's `service.d` directory. The step is idempotent: the directory
//! may already exist and the file is rewritten from scratch every time.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::domain::ModuleError;

pub const SERVICE_DIR: &str = "/data/adb/service.d";
pub const SERVICE_FILE: &str = "service.sh";
pub const SERVICE_CONTENTS: &str = "echo \"success\"\n";
pub const SERVICE_MODE: u32 = 0o777;

/// A fixed script to place at `dir/file_name`
#[derive(Debug, Clone)]
pub struct ServiceScript {
    pub dir: PathBuf,
    pub file_name: String,
    pub contents: String,
    pub mode: u32,
}

impl Default for ServiceScript {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(SERVICE_DIR),
            file_name: SERVICE_FILE.to_string(),
            contents: SERVICE_CONTENTS.to_string(),
            mode: SERVICE_MODE,
        }
    }
}

impl ServiceScript {
    /// Default script placed under a different directory
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Create the directory if needed and (re)write the script.
    ///
    /// # Errors
    /// Returns [`ModuleError::ProvisioningFailure`] naming the path that failed
    pub fn ensure(&self) -> Result<PathBuf, ModuleError> {
        fs::create_dir_all(&self.dir).map_err(|source| {
            error!(
                "Failed to create directory: {}, error: {source}",
                self.dir.display()
            );
            ModuleError::ProvisioningFailure {
                path: self.dir.clone(),
                source,
            }
        })?;

        let path = self.path();
        write_script(&path, self.contents.as_bytes(), self.mode).map_err(|source| {
            error!("Failed to write file: {}, error: {source}", path.display());
            ModuleError::ProvisioningFailure {
                path: path.clone(),
                source,
            }
        })?;

        info!("Service file written to {}", path.display());
        Ok(path)
    }
}

fn write_script(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;

    // The open mode only applies on creation and is masked by umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_layout() {
        let script = ServiceScript::default();
        assert_eq!(
            script.path(),
            PathBuf::from("/data/adb/service.d/service.sh")
        );
        assert_eq!(script.contents, "echo \"success\"\n");
    }

    #[test]
    fn test_ensure_creates_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let script = ServiceScript::in_dir(tmp.path().join("adb/service.d"));

        let path = script.ensure().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), SERVICE_CONTENTS);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, SERVICE_MODE);
        }
    }

    #[test]
    fn test_ensure_is_idempotent_and_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        let script = ServiceScript::in_dir(tmp.path());
        fs::write(script.path(), "a much longer previous script body\n").unwrap();

        script.ensure().unwrap();
        script.ensure().unwrap();
        assert_eq!(fs::read_to_string(script.path()).unwrap(), SERVICE_CONTENTS);
    }

    #[test]
    fn test_ensure_reports_failing_path() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let script = ServiceScript::in_dir(blocker.join("service.d"));
        match script.ensure() {
            Err(ModuleError::ProvisioningFailure { path, .. }) => {
                assert_eq!(path, blocker.join("service.d"));
            }
            other => panic!("expected provisioning failure, got {other:?}"),
        }
    }
}

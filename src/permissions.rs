//! Best-effort check of the OS camera permission
//!
//! Used to tell a refused camera apart from a missing one when the native
//! backend fails to open a device.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Nothing conclusive (no device, or the OS asks at open time)
    NotDetermined,
    /// Blocked by system policy
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
}

pub fn check_permission() -> PermissionStatus {
    check_permission_detailed().status
}

pub fn check_permission_detailed() -> PermissionInfo {
    #[cfg(target_os = "linux")]
    {
        check_permission_linux()
    }

    #[cfg(target_os = "windows")]
    {
        check_permission_windows()
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "Camera permission is requested when the stream opens".to_string(),
        }
    }
}

#[cfg(target_os = "windows")]
fn check_permission_windows() -> PermissionInfo {
    // Privacy settings hide devices from enumeration when access is off.
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(devices) if !devices.is_empty() => PermissionInfo {
            status: PermissionStatus::Granted,
            message: "Camera access granted via Windows Privacy settings".to_string(),
        },
        Ok(_) => PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No cameras found - access may be disabled in Privacy settings".to_string(),
        },
        Err(e) => PermissionInfo {
            status: PermissionStatus::Denied,
            message: format!("Camera access denied: {}", e),
        },
    }
}

#[cfg(target_os = "linux")]
fn check_permission_linux() -> PermissionInfo {
    use std::path::Path;

    let Some(device) = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .find(|path| Path::new(path).exists())
    else {
        return PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No video devices found at /dev/video*".to_string(),
        };
    };

    if let Err(e) = std::fs::File::open(&device) {
        return match e.kind() {
            std::io::ErrorKind::PermissionDenied => PermissionInfo {
                status: PermissionStatus::Denied,
                message: format!(
                    "Cannot open {} - add the user to the video group: sudo usermod -a -G video $USER",
                    device
                ),
            },
            _ => PermissionInfo {
                status: PermissionStatus::NotDetermined,
                message: format!("Cannot open {}: {}", device, e),
            },
        };
    }

    PermissionInfo {
        status: PermissionStatus::Granted,
        message: format!("Camera device {} is readable", device),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(PermissionStatus::Granted.to_string(), "granted");
        assert_eq!(PermissionStatus::NotDetermined.to_string(), "not_determined");
    }

    #[test]
    fn test_check_is_consistent() {
        let first = check_permission();
        assert_eq!(check_permission(), first);
    }

    #[test]
    fn test_detailed_has_message() {
        assert!(!check_permission_detailed().message.is_empty());
    }
}

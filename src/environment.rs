//! Environment classification
//!
//! Detects which phase of the installation the host is currently in by
//! inspecting live host signals. Classification is computed fresh on every
//! invocation and never cached.
//!
//! # Design
//!
//! - **Priority order**: the chroot check runs first. A live-media marker can
//!   coincidentally be present inside a chroot built from live media, so a
//!   positive chroot signal always wins.
//! - **Ambiguity is surfaced, not guessed**: an indeterminate chroot signal
//!   (unmounted `/proc`, containers) classifies as [`Environment::Unknown`]
//!   and the operator is directed to manual mode. Wrong automatic guesses
//!   during an OS installation can destroy data.
//! - **No globals**: every path inspected comes from an explicit
//!   [`HostProbe`], so classification is testable against a fixture tree.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Kernel command line markers that identify Arch installation media.
const LIVE_CMDLINE_MARKERS: &[&str] = &["archisobasedir", "archisolabel="];

/// Classified execution context of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    /// Booted from the Arch installation media
    LiveMedia,
    /// Inside an arch-chroot into the target root
    Chroot,
    /// Booted into the installed system, no desktop session manager yet
    InstalledNoDesktop,
    /// Booted into the installed system with a desktop session manager
    InstalledWithDesktop,
    /// Signals were ambiguous or contradictory
    Unknown,
}

impl Environment {
    /// Position of this environment in the installation phase progression.
    ///
    /// `None` for [`Environment::Unknown`], which has no place in the order.
    pub const fn phase_rank(self) -> Option<u8> {
        match self {
            Self::LiveMedia => Some(0),
            Self::Chroot => Some(1),
            Self::InstalledNoDesktop => Some(2),
            Self::InstalledWithDesktop => Some(3),
            Self::Unknown => None,
        }
    }

    /// Returns true unless the environment is [`Environment::Unknown`].
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Paths inspected during classification.
///
/// The defaults point at the real host; tests substitute a fixture tree.
#[derive(Debug, Clone)]
pub struct HostProbe {
    /// Root filesystem of this process
    pub own_root: PathBuf,
    /// Root filesystem of the init process, `/proc/1/root`
    pub init_root: PathBuf,
    /// Kernel command line, `/proc/cmdline`
    pub cmdline: PathBuf,
    /// Release marker of an installed system, `/etc/arch-release`
    pub release_marker: PathBuf,
    /// Registered desktop session-manager unit
    pub display_manager_unit: PathBuf,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self {
            own_root: PathBuf::from("/"),
            init_root: PathBuf::from("/proc/1/root"),
            cmdline: PathBuf::from("/proc/cmdline"),
            release_marker: PathBuf::from("/etc/arch-release"),
            display_manager_unit: PathBuf::from("/etc/systemd/system/display-manager.service"),
        }
    }
}

/// Raw facts gathered from a [`HostProbe`].
///
/// `in_chroot` is tri-state: comparing the device/inode of `/` against
/// `/proc/1/root` is indeterminate when either path cannot be stat'ed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostSignals {
    /// Whether this process's root differs from the init process's root
    pub in_chroot: Option<bool>,
    /// Kernel command line carries a live-installation-media marker
    pub live_media: bool,
    /// The release marker file exists
    pub release_marker: bool,
    /// A desktop session-manager unit is registered
    pub desktop_unit: bool,
}

impl HostSignals {
    /// Gather signals from the host. Read-only; mutates nothing.
    pub fn gather(probe: &HostProbe) -> Self {
        Self {
            in_chroot: detect_chroot(&probe.own_root, &probe.init_root),
            live_media: detect_live_media(&probe.cmdline),
            release_marker: probe.release_marker.exists(),
            desktop_unit: probe.display_manager_unit.exists(),
        }
    }
}

/// Classify the environment from gathered signals.
///
/// Pure function of its input. The check order is load-bearing: chroot
/// first, then live media, then the installed-system markers.
pub fn classify(signals: &HostSignals) -> Environment {
    match signals.in_chroot {
        Some(true) => Environment::Chroot,
        Some(false) => {
            if signals.live_media {
                Environment::LiveMedia
            } else if signals.release_marker && signals.desktop_unit {
                Environment::InstalledWithDesktop
            } else if signals.release_marker {
                Environment::InstalledNoDesktop
            } else {
                Environment::Unknown
            }
        }
        None => Environment::Unknown,
    }
}

/// Gather signals and classify in one call.
pub fn detect(probe: &HostProbe) -> Environment {
    let signals = HostSignals::gather(probe);
    let environment = classify(&signals);
    tracing::info!(?signals, %environment, "host classification");
    environment
}

/// Compare the device/inode of this process's root against the init
/// process's root. A mismatch means we are inside a chroot.
///
/// Returns `None` when either path cannot be stat'ed (e.g. `/proc` is not
/// mounted, or the caller lacks permission to resolve `/proc/1/root`).
fn detect_chroot(own_root: &Path, init_root: &Path) -> Option<bool> {
    let own = fs::metadata(own_root).ok()?;
    let init = fs::metadata(init_root).ok()?;
    Some(own.dev() != init.dev() || own.ino() != init.ino())
}

/// Check the kernel command line for an installation-media marker.
///
/// An unreadable command line reads as "no marker": the chroot tri-state
/// already covers hosts where `/proc` is absent.
fn detect_live_media(cmdline: &Path) -> bool {
    fs::read_to_string(cmdline)
        .map(|content| LIVE_CMDLINE_MARKERS.iter().any(|m| content.contains(m)))
        .unwrap_or(false)
}

// ============================================================================
// Firmware detection
// ============================================================================

/// Detected firmware mode of the system.
///
/// Determined by checking for the existence of `/sys/firmware/efi`.
/// The step scripts' bootloader behavior differs by firmware, so the
/// status report shows the operator what the orchestrator saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FirmwareMode {
    #[strum(serialize = "UEFI")]
    Uefi,
    #[strum(serialize = "BIOS")]
    Bios,
}

impl FirmwareMode {
    /// Returns true if the system booted in UEFI mode.
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }

    /// Returns true if the system booted in legacy BIOS mode.
    pub fn is_bios(self) -> bool {
        matches!(self, Self::Bios)
    }
}

/// Detect firmware mode by checking for the EFI sysfs directory.
///
/// The Linux kernel exposes `/sys/firmware/efi` only when booted in UEFI
/// mode. This is the canonical detection method used by systemd,
/// grub-install, etc.
pub fn detect_firmware_mode() -> FirmwareMode {
    if Path::new("/sys/firmware/efi").exists() {
        tracing::debug!("UEFI firmware detected (/sys/firmware/efi exists)");
        FirmwareMode::Uefi
    } else {
        tracing::debug!("BIOS firmware detected (/sys/firmware/efi not found)");
        FirmwareMode::Bios
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(
        in_chroot: Option<bool>,
        live_media: bool,
        release_marker: bool,
        desktop_unit: bool,
    ) -> HostSignals {
        HostSignals {
            in_chroot,
            live_media,
            release_marker,
            desktop_unit,
        }
    }

    #[test]
    fn test_chroot_wins_over_live_media() {
        // Live-media marker present inside a chroot built from live media
        let s = signals(Some(true), true, true, false);
        assert_eq!(classify(&s), Environment::Chroot);
    }

    #[test]
    fn test_live_media_classification() {
        let s = signals(Some(false), true, false, false);
        assert_eq!(classify(&s), Environment::LiveMedia);
    }

    #[test]
    fn test_installed_with_desktop() {
        let s = signals(Some(false), false, true, true);
        assert_eq!(classify(&s), Environment::InstalledWithDesktop);
    }

    #[test]
    fn test_installed_without_desktop() {
        let s = signals(Some(false), false, true, false);
        assert_eq!(classify(&s), Environment::InstalledNoDesktop);
    }

    #[test]
    fn test_no_signals_is_unknown() {
        let s = signals(Some(false), false, false, false);
        assert_eq!(classify(&s), Environment::Unknown);
    }

    #[test]
    fn test_indeterminate_chroot_is_unknown() {
        // Even with a live-media marker present, an indeterminate chroot
        // signal must not produce a guess
        let s = signals(None, true, true, true);
        assert_eq!(classify(&s), Environment::Unknown);
    }

    #[test]
    fn test_desktop_unit_without_release_marker_is_unknown() {
        let s = signals(Some(false), false, false, true);
        assert_eq!(classify(&s), Environment::Unknown);
    }

    #[test]
    fn test_environment_display_round_trip() {
        for env in [
            Environment::LiveMedia,
            Environment::Chroot,
            Environment::InstalledNoDesktop,
            Environment::InstalledWithDesktop,
            Environment::Unknown,
        ] {
            let s = env.to_string();
            let parsed: Environment = s.parse().expect("should parse");
            assert_eq!(env, parsed);
        }
        assert_eq!(Environment::LiveMedia.to_string(), "live-media");
        assert_eq!(
            Environment::InstalledNoDesktop.to_string(),
            "installed-no-desktop"
        );
    }

    #[test]
    fn test_phase_rank_ordering() {
        assert!(
            Environment::LiveMedia.phase_rank() < Environment::Chroot.phase_rank()
                && Environment::Chroot.phase_rank()
                    < Environment::InstalledNoDesktop.phase_rank()
                && Environment::InstalledNoDesktop.phase_rank()
                    < Environment::InstalledWithDesktop.phase_rank()
        );
        assert_eq!(Environment::Unknown.phase_rank(), None);
        assert!(!Environment::Unknown.is_known());
    }

    #[test]
    fn test_gather_against_fixture_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        std::fs::write(root.join("cmdline"), "BOOT_IMAGE=/arch/boot/x86_64/vmlinuz-linux archisobasedir=arch archisolabel=ARCH_202608").unwrap();
        std::fs::write(root.join("arch-release"), "").unwrap();

        let probe = HostProbe {
            own_root: root.to_path_buf(),
            // Same directory: dev/inode match, so not a chroot
            init_root: root.to_path_buf(),
            cmdline: root.join("cmdline"),
            release_marker: root.join("arch-release"),
            display_manager_unit: root.join("display-manager.service"),
        };

        let s = HostSignals::gather(&probe);
        assert_eq!(s.in_chroot, Some(false));
        assert!(s.live_media);
        assert!(s.release_marker);
        assert!(!s.desktop_unit);
        // Live marker wins over the release marker once chroot is ruled out
        assert_eq!(classify(&s), Environment::LiveMedia);
    }

    #[test]
    fn test_gather_with_missing_init_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        let probe = HostProbe {
            own_root: root.to_path_buf(),
            init_root: root.join("does-not-exist"),
            cmdline: root.join("cmdline"),
            release_marker: root.join("arch-release"),
            display_manager_unit: root.join("display-manager.service"),
        };

        let s = HostSignals::gather(&probe);
        assert_eq!(s.in_chroot, None);
        assert_eq!(classify(&s), Environment::Unknown);
    }

    #[test]
    fn test_gather_detects_distinct_roots() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");

        let probe = HostProbe {
            own_root: a.path().to_path_buf(),
            init_root: b.path().to_path_buf(),
            cmdline: a.path().join("cmdline"),
            release_marker: a.path().join("arch-release"),
            display_manager_unit: a.path().join("display-manager.service"),
        };

        // Two distinct directories never share an inode
        let s = HostSignals::gather(&probe);
        assert_eq!(s.in_chroot, Some(true));
        assert_eq!(classify(&s), Environment::Chroot);
    }

    #[test]
    fn test_firmware_mode_display() {
        assert_eq!(FirmwareMode::Uefi.to_string(), "UEFI");
        assert_eq!(FirmwareMode::Bios.to_string(), "BIOS");
    }

    #[test]
    fn test_firmware_mode_predicates() {
        assert!(FirmwareMode::Uefi.is_uefi());
        assert!(!FirmwareMode::Uefi.is_bios());
        assert!(FirmwareMode::Bios.is_bios());
        assert!(!FirmwareMode::Bios.is_uefi());
    }

    #[test]
    fn test_detect_firmware_mode_runs() {
        // Runs on any system; just verify it returns a valid variant
        let mode = detect_firmware_mode();
        assert!(mode.is_uefi() || mode.is_bios());
    }
}

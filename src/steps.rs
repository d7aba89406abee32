//! The installation step table
//!
//! Defines the total order of installation steps as a static table. Each
//! step names the environments it may run in, the privilege level it
//! requires, and the external script that implements it. The table is the
//! single source of truth for ordinals; the resolver and the progress store
//! both dispatch off it instead of scattered conditionals.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::environment::Environment;

/// Identifier of one discrete, externally-implemented installation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    /// Partition the target disk and pacstrap the base system
    BaseInstall,
    /// Configure the system inside the chroot
    SystemSetup,
    /// First-boot configuration on the installed system
    PostInstall,
    /// Build and install the AUR helper (must not run as root)
    AurHelper,
    /// Desktop environment / window manager installation
    DesktopSetup,
}

impl StepId {
    /// The step's definition in the static table.
    pub fn definition(self) -> &'static StepDefinition {
        // The table covers every variant
        STEPS
            .iter()
            .find(|s| s.id == self)
            .unwrap_or_else(|| unreachable!("step table is missing {self}"))
    }

    /// Fixed position of this step within the installation sequence.
    pub fn ordinal(self) -> u8 {
        self.definition().ordinal
    }
}

/// Privilege level a step must run under.
///
/// Running a step under the wrong privilege is a hard failure, not a
/// warning: makepkg refuses to run as root, and pacstrap refuses not to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    Root,
    User,
}

impl Privilege {
    /// Returns true for [`Privilege::Root`].
    pub fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Privilege level of the current process, from the effective UID.
pub fn current_privilege() -> Privilege {
    if nix::unistd::Uid::effective().is_root() {
        Privilege::Root
    } else {
        Privilege::User
    }
}

/// One entry of the step table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    /// Step identifier
    pub id: StepId,
    /// 1-based position in the total installation order
    pub ordinal: u8,
    /// Environments this step may run in
    pub environments: &'static [Environment],
    /// Privilege level the step's script requires
    pub privilege: Privilege,
    /// File name of the implementing script, relative to the script dir
    pub script: &'static str,
    /// One-line description shown in menus and the status report
    pub summary: &'static str,
}

impl StepDefinition {
    /// Returns true if this step may run in the given environment.
    pub fn admissible_in(&self, environment: Environment) -> bool {
        self.environments.contains(&environment)
    }

    /// Earliest phase this step belongs to, for mismatch detection.
    pub fn phase_rank(&self) -> u8 {
        self.environments
            .iter()
            .filter_map(|e| e.phase_rank())
            .min()
            .unwrap_or(u8::MAX)
    }
}

/// The total installation order. Static, not user-mutable at runtime.
pub const STEPS: &[StepDefinition] = &[
    StepDefinition {
        id: StepId::BaseInstall,
        ordinal: 1,
        environments: &[Environment::LiveMedia],
        privilege: Privilege::Root,
        script: "base-install.sh",
        summary: "Partition the target disk and pacstrap the base system",
    },
    StepDefinition {
        id: StepId::SystemSetup,
        ordinal: 2,
        environments: &[Environment::Chroot],
        privilege: Privilege::Root,
        script: "system-setup.sh",
        summary: "Configure locale, users and the bootloader inside the chroot",
    },
    StepDefinition {
        id: StepId::PostInstall,
        ordinal: 3,
        environments: &[Environment::InstalledNoDesktop],
        privilege: Privilege::Root,
        script: "post-install.sh",
        summary: "Enable networking, services and the firewall on first boot",
    },
    StepDefinition {
        id: StepId::AurHelper,
        ordinal: 4,
        environments: &[Environment::InstalledNoDesktop],
        privilege: Privilege::User,
        script: "aur-helper.sh",
        summary: "Build and install the AUR helper",
    },
    StepDefinition {
        id: StepId::DesktopSetup,
        ordinal: 5,
        environments: &[Environment::InstalledNoDesktop],
        privilege: Privilege::User,
        script: "desktop-setup.sh",
        summary: "Install the desktop environment and deploy dotfiles",
    },
];

/// Number of defined steps.
pub fn step_count() -> u8 {
    STEPS.len() as u8
}

/// Look up a step by its ordinal, 1-based.
pub fn step_by_ordinal(ordinal: u8) -> Option<&'static StepDefinition> {
    STEPS.iter().find(|s| s.ordinal == ordinal)
}

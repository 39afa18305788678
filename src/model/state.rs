//! Closed lifecycle-state enumerations reported by the provider.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
            /// State string not recognised by this build.
            #[serde(other)]
            Unknown,
        }

        impl $name {
            /// Provider spelling of the state.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Unknown => "UNKNOWN",
                }
            }

            /// Parses the provider spelling; unrecognised values map to
            /// `Unknown`.
            #[must_use]
            pub fn from_api(value: &str) -> Self {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($text => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

state_enum! {
    /// Lifecycle of a backup or replica.
    BackupState {
        /// Being produced (replicas report `PROVISIONING`/`ACTIVATING`).
        Creating => "CREATING",
        /// Usable as a restore source.
        Available => "AVAILABLE",
        /// Production failed.
        Faulty => "FAULTY",
        /// Being removed after expiry or deletion.
        Terminating => "TERMINATING",
        /// Removed.
        Terminated => "TERMINATED",
    }
}

impl BackupState {
    /// `true` for `TERMINATING` and `TERMINATED`.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }
}

state_enum! {
    /// Lifecycle of a boot or block volume.
    VolumeState {
        /// Volume is being allocated.
        Provisioning => "PROVISIONING",
        /// Volume is being hydrated from a backup or replica.
        Restoring => "RESTORING",
        /// Ready for attachment.
        Available => "AVAILABLE",
        /// Creation failed.
        Faulty => "FAULTY",
        /// Being deleted.
        Terminating => "TERMINATING",
        /// Deleted.
        Terminated => "TERMINATED",
    }
}

state_enum! {
    /// Lifecycle of a compute instance.
    InstanceState {
        /// Being migrated between hosts.
        Moving => "MOVING",
        /// Being launched.
        Provisioning => "PROVISIONING",
        /// Guest is running.
        Running => "RUNNING",
        /// Power-on in progress.
        Starting => "STARTING",
        /// Power-off in progress.
        Stopping => "STOPPING",
        /// Powered off.
        Stopped => "STOPPED",
        /// A custom image is being captured.
        CreatingImage => "CREATING_IMAGE",
        /// Being deleted.
        Terminating => "TERMINATING",
        /// Deleted.
        Terminated => "TERMINATED",
    }
}

state_enum! {
    /// Lifecycle of a volume attachment.
    AttachmentState {
        /// Attach in progress.
        Attaching => "ATTACHING",
        /// Attached and visible to the instance.
        Attached => "ATTACHED",
        /// Detach in progress.
        Detaching => "DETACHING",
        /// No longer attached.
        Detached => "DETACHED",
    }
}

/// A resource whose lifecycle state can be polled.
pub trait Lifecycle {
    /// State enumeration reported for the resource.
    type State: Copy + Eq + fmt::Display + fmt::Debug + Send;

    /// Provider identifier of the resource.
    fn resource_id(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> Self::State;
}

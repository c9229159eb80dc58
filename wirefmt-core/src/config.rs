//! Process-wide codec configuration
//!
//! The only shared state in the workspace: the byte order the IPv4 codec uses
//! for `total_len` and the flags/fragment-offset word. It is written at most
//! once and read without locking afterwards.

use std::sync::OnceLock;

use tracing::debug;

use crate::error::{Error, Result};
use crate::wire::ByteOrderPolicy;

static GLOBAL: OnceLock<CodecConfig> = OnceLock::new();

/// Configuration threaded into the codecs that have platform-dependent fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecConfig {
    /// Order of IPv4 `total_len` and flags/fragment-offset on the wire
    pub ipv4_order: ByteOrderPolicy,
}

impl CodecConfig {
    /// Configuration with every field in network order
    pub const NETWORK: CodecConfig = CodecConfig {
        ipv4_order: ByteOrderPolicy::Network,
    };

    /// Configuration matching the raw-socket conventions of the build target.
    ///
    /// BSD-derived stacks hand raw IPv4 headers to user space with
    /// `total_len` and the fragment word in host order.
    pub const fn for_target() -> CodecConfig {
        if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "dragonfly",
            target_os = "netbsd"
        )) {
            CodecConfig {
                ipv4_order: ByteOrderPolicy::Native,
            }
        } else {
            CodecConfig::NETWORK
        }
    }

    /// Install `self` as the process-wide configuration.
    ///
    /// Fails if a configuration was already installed or already read.
    pub fn install(self) -> Result<()> {
        GLOBAL.set(self).map_err(|_| {
            Error::invalid_construction("codec configuration already initialised")
        })?;
        debug!(ipv4_order = ?self.ipv4_order, "Installed codec configuration");
        Ok(())
    }

    /// The process-wide configuration, computed from the target on first use
    /// when nothing was installed.
    pub fn global() -> &'static CodecConfig {
        GLOBAL.get_or_init(CodecConfig::for_target)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Configuration for `oltd`.

use std::path::PathBuf;

use common::logging::LogFormat;
use common::network::MacAddr;

use crate::types::OltdError;
use crate::types::OltdResult;

/// Run-time settings, built from the command line.
#[derive(Debug)]
pub struct Config {
    /// If set, where the log should be written.  If not set, the log goes
    /// to stdout.
    pub log_file: Option<String>,

    /// Output log info in unstructured text or json?
    pub log_format: LogFormat,

    /// OS name of the raw-Ethernet interface facing the OLT.
    pub interface_name: String,

    /// Source MAC placed in every outbound frame.
    pub src_mac: MacAddr,

    /// MAC address of the OLT to adopt at startup, if any.
    pub olt_mac: Option<MacAddr>,

    /// Wrap management frames in the outer S-tag, and strip it on receive.
    pub vlan_mode: bool,

    /// Directory holding the ONU status ledger and the operator command
    /// file.
    pub state_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_file: None,
            log_format: LogFormat::Json,
            interface_name: "eth0".to_string(),
            src_mac: MacAddr::ZERO,
            olt_mac: None,
            vlan_mode: true,
            state_dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

// Use the command-line arguments to update the run-time config.
fn update_from_cli(opts: &crate::Opt, config: &mut Config) -> OltdResult<()> {
    if let Some(log_file) = &opts.log_file {
        config.log_file = Some(log_file.to_string());
    }

    if let Some(log_format) = opts.log_format {
        config.log_format = log_format;
    }

    config.interface_name = opts.interface_name.to_string();

    config.src_mac = opts
        .src_mac
        .ok_or_else(|| OltdError::Other("src_mac must be set".to_string()))?;

    config.olt_mac = opts.olt_mac;
    config.vlan_mode = !opts.no_vlan;

    if let Some(dir) = &opts.state_dir {
        config.state_dir = PathBuf::from(dir);
    }

    Ok(())
}

/// Build a Config from the defaults plus whatever the command line
/// overrides.
pub(crate) fn build_config(opts: &crate::Opt) -> OltdResult<Config> {
    let mut config = Config::default();
    update_from_cli(opts, &mut config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opt;

    #[test]
    fn test_updates() {
        let opts = Opt {
            interface_name: "pon0".to_string(),
            src_mac: Some(MacAddr::new(0, 0, 0, 0, 0, 1)),
            no_vlan: true,
            state_dir: Some("/var/lib/oltd".to_string()),
            ..Opt::default()
        };
        let config = build_config(&opts).unwrap();
        assert_eq!(config.interface_name, "pon0");
        assert!(!config.vlan_mode);
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/oltd"));
    }

    #[test]
    fn test_src_mac_required() {
        let opts = Opt::default();
        assert!(build_config(&opts).is_err());
    }
}

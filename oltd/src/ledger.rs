// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The durable ONU status ledger: a JSON file mapping ONU identity to
//! administrative state, polled once a second so an operator (or another
//! process) can request an ONU reset by flipping its reboot flag.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use slog::debug;
use slog::error;
use slog::info;
use tokio::time::interval;

use crate::types::OltdResult;
use crate::Adapter;

const LEDGER_FILE: &str = "onu_list.json";
const POLL_PERIOD: Duration = Duration::from_secs(1);

/// The reboot-flag value that triggers a reset.
const REBOOT_REQUESTED: &str = "reboot";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OnuStatus {
    pub id: String,
    pub admin_state: String,
    pub ope_state: String,
    pub con_state: String,
    pub mac_addr: String,
    pub reboot_state: String,
}

/// Handle on the ledger file.  All writes are full-file overwrites;
/// reads tolerate the file not existing yet.
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(state_dir: &Path) -> Ledger {
        Ledger {
            path: state_dir.join(LEDGER_FILE),
        }
    }

    pub fn read(&self) -> OltdResult<Vec<OnuStatus>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write(&self, list: &[OnuStatus]) -> OltdResult<()> {
        let bytes = serde_json::to_vec(list)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    pub fn add(&self, status: &OnuStatus) -> OltdResult<()> {
        let mut list = self.read()?;
        list.push(status.clone());
        self.write(&list)
    }

    pub fn update(&self, status: &OnuStatus) -> OltdResult<()> {
        let mut list = self.read()?;
        for entry in list.iter_mut() {
            if entry.id == status.id {
                *entry = status.clone();
            }
        }
        self.write(&list)
    }

    pub fn remove(&self, id: &str) -> OltdResult<()> {
        let list: Vec<OnuStatus> = self
            .read()?
            .into_iter()
            .filter(|entry| entry.id != id)
            .collect();
        self.write(&list)
    }

    pub fn find_by_id(&self, id: &str) -> OltdResult<Option<OnuStatus>> {
        Ok(self.read()?.into_iter().find(|entry| entry.id == id))
    }

    pub fn find_by_mac(&self, mac: &str) -> OltdResult<Option<OnuStatus>> {
        Ok(self.read()?.into_iter().find(|entry| entry.mac_addr == mac))
    }
}

/// Poll the ledger and run the reset sequence for any ONU whose reboot
/// flag is raised.  The flag is cleared before the reset is attempted so a
/// slow ONU cannot be reset twice.
pub(crate) async fn watch(adapter: Arc<Adapter>) {
    let log = adapter.log.new(slog::o!("unit" => "onu_ledger"));
    let mut ticker = interval(POLL_PERIOD);
    loop {
        ticker.tick().await;

        let mut list = match adapter.ledger.read() {
            Ok(l) => l,
            Err(e) => {
                debug!(log, "ledger unreadable: {e}");
                continue;
            }
        };

        let mut dirty = false;
        for entry in list.iter_mut() {
            if entry.reboot_state != REBOOT_REQUESTED {
                continue;
            }
            entry.reboot_state = String::new();
            dirty = true;

            let Ok(mac) = entry.mac_addr.parse() else {
                error!(log, "bad MAC in ledger"; "id" => &entry.id);
                continue;
            };
            let Some(dev) = adapter.devices.get_by_mac(mac) else {
                debug!(log, "reboot requested for unknown ONU";
                    "id" => &entry.id);
                continue;
            };
            info!(log, "resetting ONU"; "id" => &entry.id);
            if let Err(e) = adapter.reset_onu(&dev).await {
                error!(log, "ONU reset failed"; "id" => &entry.id,
                    "error" => %e);
            }
        }

        if dirty {
            if let Err(e) = adapter.ledger.write(&list) {
                error!(log, "failed to rewrite ledger: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_ledger(name: &str) -> Ledger {
        let dir = std::env::temp_dir()
            .join(format!("oltd-ledger-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        Ledger::new(&dir)
    }

    fn status(id: &str, mac: &str) -> OnuStatus {
        OnuStatus {
            id: id.to_string(),
            admin_state: "ENABLED".to_string(),
            ope_state: "ACTIVE".to_string(),
            con_state: "REACHABLE".to_string(),
            mac_addr: mac.to_string(),
            reboot_state: String::new(),
        }
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let ledger = scratch_ledger("missing");
        assert_eq!(ledger.read().unwrap(), Vec::new());
    }

    #[test]
    fn test_add_update_remove() {
        let ledger = scratch_ledger("crud");
        ledger.write(&[]).unwrap();

        ledger.add(&status("onu-1", "00:11:22:33:44:55")).unwrap();
        ledger.add(&status("onu-2", "00:11:22:33:44:66")).unwrap();
        assert_eq!(ledger.read().unwrap().len(), 2);

        // Lookup matches on equality of the ID.
        let found = ledger.find_by_id("onu-2").unwrap().unwrap();
        assert_eq!(found.mac_addr, "00:11:22:33:44:66");
        assert!(ledger.find_by_id("onu-3").unwrap().is_none());

        let mut changed = status("onu-1", "00:11:22:33:44:55");
        changed.reboot_state = REBOOT_REQUESTED.to_string();
        ledger.update(&changed).unwrap();
        let found = ledger.find_by_id("onu-1").unwrap().unwrap();
        assert_eq!(found.reboot_state, REBOOT_REQUESTED);

        ledger.remove("onu-1").unwrap();
        assert_eq!(ledger.read().unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_mac() {
        let ledger = scratch_ledger("mac");
        ledger.write(&[status("onu-1", "00:11:22:33:44:55")]).unwrap();
        assert!(ledger
            .find_by_mac("00:11:22:33:44:55")
            .unwrap()
            .is_some());
        assert!(ledger.find_by_mac("ff:ff:ff:ff:ff:ff").unwrap().is_none());
    }

    #[test]
    fn test_field_names_on_disk() {
        let ledger = scratch_ledger("fields");
        ledger.write(&[status("onu-1", "00:11:22:33:44:55")]).unwrap();
        let raw =
            std::fs::read_to_string(ledger.path.as_path()).unwrap();
        for field in [
            "\"id\"",
            "\"admin_state\"",
            "\"ope_state\"",
            "\"con_state\"",
            "\"mac_addr\"",
            "\"reboot_state\"",
        ] {
            assert!(raw.contains(field), "missing {field} in {raw}");
        }
    }
}

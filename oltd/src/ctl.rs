// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The operator command file: a JSON document an operator edits in place;
//! the daemon polls it, runs the named command, and writes the file back
//! with the command reset so it is not run twice.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use slog::error;
use slog::info;
use tokio::time::interval;

use crate::device::FlowParams;
use crate::types::OltdResult;
use crate::Adapter;

const CTL_FILE: &str = "oltctl.json";
const POLL_PERIOD: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CtlParams {
    pub value1: String,
    pub value2: String,
    pub value3: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CtlCommand {
    pub command: String,
    pub command_help: Vec<String>,
    #[serde(rename = "addFlowParam")]
    pub add_flow_param: CtlParams,
    #[serde(rename = "addFlowDownParam")]
    pub add_flow_down_param: CtlParams,
    #[serde(rename = "addFlowUpParam")]
    pub add_flow_up_param: CtlParams,
}

pub struct CtlFile {
    path: PathBuf,
}

impl CtlFile {
    pub fn new(state_dir: &Path) -> CtlFile {
        CtlFile {
            path: state_dir.join(CTL_FILE),
        }
    }

    /// `None` when the file is absent; the command file is optional.
    pub fn read(&self) -> OltdResult<Option<CtlCommand>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn write(&self, cmd: &CtlCommand) -> OltdResult<()> {
        let bytes = serde_json::to_vec(cmd)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Poll the command file and dispatch whatever it asks for.
pub(crate) async fn watch(adapter: Arc<Adapter>) {
    let log = adapter.log.new(slog::o!("unit" => "oltctl"));
    let ctl = CtlFile::new(&adapter.config.state_dir);
    let mut ticker = interval(POLL_PERIOD);
    loop {
        ticker.tick().await;

        let mut cmd = match ctl.read() {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                error!(log, "command file unreadable: {e}");
                continue;
            }
        };

        match cmd.command.as_str() {
            "None" | "" => continue,
            "AddFlow" => {
                info!(log, "operator add-flow";
                    "params" => ?cmd.add_flow_param);
                if let Err(e) =
                    adapter.add_flow(FlowParams::default(), None).await
                {
                    error!(log, "add-flow failed: {e}");
                }
            }
            "AddFlowDown" | "AddFlowUp" => {
                // Half-flow commands exist for bring-up experiments only.
                info!(log, "operator command"; "command" => &cmd.command);
            }
            other => {
                error!(log, "unrecognized command"; "command" => other);
            }
        }

        cmd.command = "None".to_string();
        if let Err(e) = ctl.write(&cmd) {
            error!(log, "failed to rewrite command file: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_field_names() {
        let dir = std::env::temp_dir()
            .join(format!("oltd-ctl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let ctl = CtlFile::new(&dir);

        let cmd = CtlCommand {
            command: "AddFlow".to_string(),
            command_help: vec!["AddFlow".to_string()],
            ..Default::default()
        };
        ctl.write(&cmd).unwrap();

        let raw = std::fs::read_to_string(dir.join(CTL_FILE)).unwrap();
        assert!(raw.contains("\"addFlowParam\""));
        assert!(raw.contains("\"command_help\""));

        assert_eq!(ctl.read().unwrap().unwrap(), cmd);
    }

    #[test]
    fn test_absent_file_is_none() {
        let dir = std::env::temp_dir()
            .join(format!("oltd-ctl-none-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(CtlFile::new(&dir).read().unwrap().is_none());
    }
}

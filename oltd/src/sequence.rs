// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The sequencer: every externally visible operation is a fixed script of
//! request/response exchanges with the OLT.  Outputs of one exchange feed
//! inputs of the next; the device record is only mutated once the step
//! that produced the data has been acked.  A timed-out step aborts its
//! sequence, but state already committed stays, and the tear-down path is
//! written to cope with whatever partial state it finds.

use std::sync::Arc;

use slog::debug;
use slog::info;
use slog::warn;

use l2oam::action::ActionCreate;
use l2oam::action::ActionCreateReply;
use l2oam::action::ActionType;
use l2oam::action::{action_delete, ingress_port, CaptureProtocols};
use l2oam::discovery::DiscoveryHello;
use l2oam::discovery::DiscoverySolicit;
use l2oam::eth;
use l2oam::switching::{
    default_outlet, inlet_delete_ds, inlet_delete_us, inlet_entry_ds,
    inlet_entry_us,
};
use l2oam::toam::GetRequest;
use l2oam::toam::GetResponse;
use l2oam::toam::SetRequest;
use l2oam::toam::SetResponse;
use l2oam::traffic::{
    best_effort_rate, guaranteed_rate, priority, traffic_binding,
    ReferenceTableReply,
};
use l2oam::ObjectContext;

use crate::device::ActionSlot;
use crate::device::Device;
use crate::device::FlowParams;
use crate::types::OltdError;
use crate::types::OltdResult;
use crate::Adapter;

/// Identity populated by the discovery sequence, handed upward.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    pub vendor: String,
    pub model: String,
    pub hardware_version: String,
    pub firmware_version: String,
    pub device_id: String,
    pub serial_number: String,
    pub pon_ports: u32,
    pub technology: String,
}

impl Adapter {
    /// Send one management PDU to a device and await its response.
    pub(crate) async fn toam_exchange(
        &self,
        dev: &Device,
        payload: Vec<u8>,
        step: &'static str,
    ) -> OltdResult<Vec<u8>> {
        let frame = self.assemble(dev.mac, eth::ETHERTYPE_L2OAM, &payload);
        dev.exchange(&self.tx, frame, step).await
    }

    async fn get_reply(
        &self,
        dev: &Device,
        req: GetRequest,
        step: &'static str,
    ) -> OltdResult<GetResponse> {
        let raw = self.toam_exchange(dev, req.encode(), step).await?;
        Ok(GetResponse::parse(&raw)?)
    }

    async fn get_string(
        &self,
        dev: &Device,
        req: GetRequest,
        step: &'static str,
    ) -> OltdResult<String> {
        Ok(self.get_reply(dev, req, step).await?.element_string()?)
    }

    /// Send a Set-family PDU and require a clean result code.
    async fn set_ack(
        &self,
        dev: &Device,
        payload: Vec<u8>,
        step: &'static str,
    ) -> OltdResult<SetResponse> {
        let raw = self.toam_exchange(dev, payload, step).await?;
        let resp = SetResponse::parse(&raw)?;
        if !resp.ok() {
            return Err(OltdError::ProtocolReject {
                step,
                code: resp.result_code,
            });
        }
        Ok(resp)
    }

    async fn create_action(
        &self,
        dev: &Device,
        action_type: ActionType,
        step: &'static str,
    ) -> OltdResult<ActionCreateReply> {
        let req = ActionCreate {
            tag: self.tags.next(),
            action_type,
        };
        let raw = self.toam_exchange(dev, req.encode(), step).await?;
        Ok(ActionCreateReply::parse(&raw)?)
    }

    /// Discover the OLT and read out its identity.  The record is marked
    /// active only once every identity read has succeeded.
    pub async fn get_device_info(&self) -> OltdResult<DeviceInfo> {
        let olt = self.olt()?;

        let solicit = DiscoverySolicit::new().encode();
        let frame = eth::frame(
            olt.mac,
            self.config.src_mac,
            eth::ETHERTYPE_DISCOVERY,
            &solicit,
        );
        let raw = olt
            .exchange(&self.tx, frame, "discovery-solicit")
            .await?;
        let hello = DiscoveryHello::parse(&raw)?;
        debug!(self.log, "discovery hello";
            "network" => hello.network_id());

        let vendor = self
            .get_string(&olt, GetRequest::vendor_name(self.tags.next()),
                "vendor-name")
            .await?;
        let model = self
            .get_string(&olt, GetRequest::module_number(self.tags.next()),
                "module-number")
            .await?;
        let hardware = self
            .get_string(&olt, GetRequest::manufacturer(self.tags.next()),
                "manufacturer")
            .await?;
        let firmware = self
            .get_reply(&olt, GetRequest::firmware_version(self.tags.next()),
                "firmware-version")
            .await?
            .running_firmware_version()?;
        let mac = self
            .get_reply(&olt, GetRequest::mac_address(self.tags.next()),
                "mac-address")
            .await?
            .element_mac()?;
        let serial = self
            .get_string(&olt, GetRequest::serial_number(self.tags.next()),
                "serial-number")
            .await?;

        let info = DeviceInfo {
            vendor: vendor.clone(),
            model: model.clone(),
            hardware_version: hardware.clone(),
            firmware_version: firmware.clone(),
            device_id: mac.to_string(),
            serial_number: serial.clone(),
            pon_ports: 1,
            technology: "EPON".to_string(),
        };

        let mut state = olt.state.lock().unwrap();
        state.vendor = vendor;
        state.model = model;
        state.hardware = hardware;
        state.firmware = firmware;
        state.serial = serial;
        state.active = true;
        drop(state);

        info!(self.log, "discovered OLT"; "device" => &olt.id,
            "info" => ?info);
        Ok(info)
    }

    /// Enable the OLT and arm the two protocol-filter actions that steer
    /// autonomous traffic at us.
    pub async fn enable_indication(&self) -> OltdResult<()> {
        let olt = self.olt()?;

        self.set_ack(&olt, SetRequest::hbtx_period(self.tags.next())
            .encode(), "hbtx-period")
            .await?;
        self.set_ack(&olt, SetRequest::hbtx_template(self.tags.next())
            .encode(), "hbtx-template")
            .await?;
        let pon_mode = self
            .get_string(&olt, GetRequest::pon_mode(self.tags.next()),
                "pon-mode")
            .await?;
        debug!(self.log, "pon mode"; "mode" => &pon_mode);
        self.set_ack(&olt, SetRequest::mpcp_sync(self.tags.next())
            .encode(), "mpcp-sync")
            .await?;
        self.set_ack(&olt, SetRequest::admin_state(self.tags.next(), true)
            .encode(), "admin-state-up")
            .await?;

        let pon_action = self
            .create_action(&olt, ActionType::ProtocolFilter,
                "create-pon-filter")
            .await?;
        let pon_id = pon_action.created.instance;
        self.set_ack(&olt, ingress_port(self.tags.next(), pon_id, true)
            .encode(), "ingress-port-pon")
            .await?;
        self.set_ack(&olt, CaptureProtocols {
            tag: self.tags.next(),
            action_id: pon_id,
        }
        .encode(), "capture-protocols-pon")
            .await?;

        let eth_action = self
            .create_action(&olt, ActionType::ProtocolFilter,
                "create-eth-filter")
            .await?;
        let eth_id = eth_action.created.instance;
        self.set_ack(&olt, ingress_port(self.tags.next(), eth_id, false)
            .encode(), "ingress-port-eth")
            .await?;
        self.set_ack(&olt, CaptureProtocols {
            tag: self.tags.next(),
            action_id: eth_id,
        }
        .encode(), "capture-protocols-eth")
            .await?;

        {
            let mut state = olt.state.lock().unwrap();
            state.action_ids.insert(ActionSlot::PonPort, pon_id);
            state.action_ids.insert(ActionSlot::EthPort, eth_id);
        }

        self.set_ack(&olt, SetRequest::admin_state(self.tags.next(), false)
            .encode(), "admin-state-down")
            .await?;
        olt.state.lock().unwrap().autonomous = true;

        info!(self.log, "indications enabled"; "device" => &olt.id,
            "pon_action" => pon_id, "eth_action" => eth_id);
        Ok(())
    }

    /// Provision subscriber QoS for one ONU (or every registered one):
    /// read its traffic-control references, bind them to the session's
    /// profile pair, and on the first call set the profile's rates.
    pub async fn add_flow(
        &self,
        params: FlowParams,
        onu_id: Option<&str>,
    ) -> OltdResult<()> {
        let olt = self.olt()?;

        let targets = match onu_id {
            Some(id) => vec![self
                .devices
                .get_by_id(id)
                .ok_or_else(|| OltdError::NoSuchDevice(id.to_string()))?],
            None => self.devices.onus(),
        };

        for onu in targets {
            let instance = {
                let state = onu.state.lock().unwrap();
                if !state.link_up {
                    debug!(self.log, "skipping down link";
                        "device" => &onu.id);
                    continue;
                }
                match state.onu_instance {
                    Some(i) => i,
                    None => {
                        debug!(self.log, "skipping unregistered ONU";
                            "device" => &onu.id);
                        continue;
                    }
                }
            };
            let onu_oc = ObjectContext::onu_link(instance);

            let raw = self
                .toam_exchange(
                    &olt,
                    GetRequest::reference_table(self.tags.next(), onu_oc)
                        .encode(),
                    "reference-table",
                )
                .await?;
            let refs = ReferenceTableReply::parse(&raw)?;
            onu.state.lock().unwrap().references =
                Some((refs.downstream, refs.upstream));

            let existing = olt.state.lock().unwrap().profiles;
            let (down_profile, up_profile, first) = match existing {
                Some((d, u)) => (d, u, false),
                None => {
                    let down = self
                        .create_action(&olt, ActionType::TrafficProfile,
                            "create-down-profile")
                        .await?
                        .created;
                    let up = self
                        .create_action(&olt, ActionType::TrafficProfile,
                            "create-up-profile")
                        .await?
                        .created;
                    olt.state.lock().unwrap().profiles = Some((down, up));
                    (down, up, true)
                }
            };

            self.set_ack(
                &olt,
                traffic_binding(self.tags.next(), refs.downstream,
                    down_profile)
                .encode(),
                "traffic-control-down",
            )
            .await?;
            self.set_ack(
                &olt,
                traffic_binding(self.tags.next(), refs.upstream, up_profile)
                    .encode(),
                "traffic-control-up",
            )
            .await?;

            if first {
                self.set_ack(&olt, priority(self.tags.next(), down_profile)
                    .encode(), "priority")
                    .await?;
                self.set_ack(
                    &olt,
                    guaranteed_rate(self.tags.next(), &params.cir,
                        down_profile)
                    .encode(),
                    "guaranteed-rate-down",
                )
                .await?;
                self.set_ack(
                    &olt,
                    guaranteed_rate(self.tags.next(), &params.cir,
                        up_profile)
                    .encode(),
                    "guaranteed-rate-up",
                )
                .await?;
                self.set_ack(
                    &olt,
                    best_effort_rate(self.tags.next(), &params.pir,
                        down_profile)
                    .encode(),
                    "best-effort-rate-down",
                )
                .await?;
                self.set_ack(
                    &olt,
                    best_effort_rate(self.tags.next(), &params.pir,
                        up_profile)
                    .encode(),
                    "best-effort-rate-up",
                )
                .await?;
            }

            info!(self.log, "flow provisioned"; "device" => &onu.id);
        }

        olt.state.lock().unwrap().flow = Some(params);
        Ok(())
    }

    /// Install the switching-domain entries carrying one ONU's traffic.
    /// The domain and its downstream inlet are created once per session;
    /// later calls only add the per-ONU outlet and upstream inlet.  An ONU
    /// that never registered is skipped silently.
    pub async fn add_flow_to_device(
        &self,
        params: FlowParams,
        onu_id: &str,
    ) -> OltdResult<()> {
        let olt = self.olt()?;
        let onu = self
            .devices
            .get_by_id(onu_id)
            .ok_or_else(|| OltdError::NoSuchDevice(onu_id.to_string()))?;
        let Some(instance) = onu.state.lock().unwrap().onu_instance else {
            debug!(self.log, "unregistered ONU, nothing to do";
                "device" => onu_id);
            return Ok(());
        };
        let onu_oc = ObjectContext::onu_link(instance);

        let existing = olt.state.lock().unwrap().switching_domain;
        let (domain, params) = match existing {
            Some(oc) => {
                let params = olt
                    .state
                    .lock()
                    .unwrap()
                    .flow
                    .clone()
                    .unwrap_or(params);
                (oc, params)
            }
            None => {
                let domain = self
                    .create_action(&olt, ActionType::SwitchingDomain,
                        "create-switching-domain")
                    .await?
                    .created;
                self.set_ack(
                    &olt,
                    inlet_entry_ds(self.tags.next(), domain, &params.tpid,
                        &params.vid)
                    .encode(),
                    "inlet-entry-ds",
                )
                .await?;
                let mut state = olt.state.lock().unwrap();
                state.switching_domain = Some(domain);
                state.flow = Some(params.clone());
                state.flow_added = true;
                drop(state);
                (domain, params)
            }
        };

        self.set_ack(
            &olt,
            default_outlet(self.tags.next(), domain, onu_oc).encode(),
            "default-outlet",
        )
        .await?;
        self.set_ack(
            &olt,
            inlet_entry_us(self.tags.next(), domain, &params.tpid,
                &params.vid, onu_oc)
            .encode(),
            "inlet-entry-us",
        )
        .await?;

        onu.state.lock().unwrap().flow_added = true;
        info!(self.log, "flow installed"; "device" => &onu.id);
        Ok(())
    }

    /// Add a flow for one ONU, tearing down and re-adding existing flows
    /// first so the domain ends up carrying the union of previously
    /// flowed ONUs and the new target.
    pub async fn add_flow_to_device_all(
        &self,
        params: FlowParams,
        onu_id: &str,
    ) -> OltdResult<()> {
        let olt = self.olt()?;
        let onu = self
            .devices
            .get_by_id(onu_id)
            .ok_or_else(|| OltdError::NoSuchDevice(onu_id.to_string()))?;

        if olt.state.lock().unwrap().switching_domain.is_none() {
            return self.add_flow_to_device(params, onu_id).await;
        }

        let mut targets: Vec<String> = self
            .devices
            .onus()
            .into_iter()
            .filter(|d| d.state.lock().unwrap().flow_added)
            .map(|d| d.id.clone())
            .collect();
        if !targets.contains(&onu.id) {
            targets.push(onu.id.clone());
        }

        self.remove_flow_from_device().await?;
        for id in targets {
            self.add_flow_to_device(params.clone(), &id).await?;
        }
        Ok(())
    }

    /// Tear the switching domain back out: per-ONU upstream inlets first,
    /// then the downstream inlet and the domain itself.
    pub(crate) async fn remove_flow_from_device(&self) -> OltdResult<()> {
        let olt = self.olt()?;
        let Some(flow) = olt.state.lock().unwrap().flow.clone() else {
            warn!(self.log, "no flow parameters recorded, nothing to remove");
            return Ok(());
        };
        let Some(domain) = olt.state.lock().unwrap().switching_domain
        else {
            return Ok(());
        };

        for onu in self.devices.onus() {
            let (flow_added, instance) = {
                let state = onu.state.lock().unwrap();
                (state.flow_added, state.onu_instance)
            };
            let (true, Some(instance)) = (flow_added, instance) else {
                continue;
            };
            if let Err(e) = self
                .set_ack(
                    &olt,
                    inlet_delete_us(
                        self.tags.next(),
                        domain,
                        &flow.tpid,
                        &flow.vid,
                        ObjectContext::onu_link(instance),
                    )
                    .encode(),
                    "inlet-delete-us",
                )
                .await
            {
                warn!(self.log, "upstream inlet removal failed";
                    "device" => &onu.id, "error" => %e);
            }
            onu.state.lock().unwrap().flow_added = false;
        }

        if olt.state.lock().unwrap().flow_added {
            self.set_ack(
                &olt,
                inlet_delete_ds(self.tags.next(), domain, &flow.tpid,
                    &flow.vid)
                .encode(),
                "inlet-delete-ds",
            )
            .await?;
            self.set_ack(
                &olt,
                action_delete(self.tags.next(), domain).encode(),
                "action-delete-stream",
            )
            .await?;
            let mut state = olt.state.lock().unwrap();
            state.switching_domain = None;
            state.flow_added = false;
        }
        Ok(())
    }

    // Restore each ONU's traffic-control references and delete the
    // session's profile pair.
    async fn remove_traffic_profiles(&self) -> OltdResult<()> {
        let olt = self.olt()?;
        let Some((down_profile, up_profile)) =
            olt.state.lock().unwrap().profiles
        else {
            return Ok(());
        };

        for onu in self.devices.onus() {
            let Some((down_ref, up_ref)) =
                onu.state.lock().unwrap().references
            else {
                continue;
            };
            for (control, profile, step) in [
                (down_ref, down_profile, "restore-traffic-profile-down"),
                (up_ref, up_profile, "restore-traffic-profile-up"),
            ] {
                if let Err(e) = self
                    .set_ack(
                        &olt,
                        traffic_binding(self.tags.next(), control, profile)
                            .encode(),
                        step,
                    )
                    .await
                {
                    warn!(self.log, "traffic profile restore failed";
                        "device" => &onu.id, "error" => %e);
                }
            }
            onu.state.lock().unwrap().references = None;
        }

        for (profile, step) in [
            (down_profile, "delete-down-profile"),
            (up_profile, "delete-up-profile"),
        ] {
            if let Err(e) = self
                .set_ack(
                    &olt,
                    action_delete(self.tags.next(), profile).encode(),
                    step,
                )
                .await
            {
                warn!(self.log, "profile delete failed"; "error" => %e);
            }
        }
        olt.state.lock().unwrap().profiles = None;
        Ok(())
    }

    // Delete the per-ONU link objects the OLT created at registration.
    async fn child_devices_lost(&self) -> OltdResult<()> {
        let olt = self.olt()?;
        for onu in self.devices.onus() {
            let Some(instance) = onu.state.lock().unwrap().onu_instance
            else {
                continue;
            };
            if let Err(e) = self
                .set_ack(
                    &olt,
                    action_delete(
                        self.tags.next(),
                        ObjectContext::onu_link(instance),
                    )
                    .encode(),
                    "delete-onu-link",
                )
                .await
            {
                warn!(self.log, "ONU link delete failed";
                    "device" => &onu.id, "error" => %e);
            }
            onu.state.lock().unwrap().link_up = false;
        }
        Ok(())
    }

    /// Full tear-down: flows, profiles, ONU links, filter actions, and
    /// finally hand administrative control back.  Steps that fail are
    /// logged and skipped; the sequence keeps going so a partially
    /// provisioned device still ends up clean.
    pub async fn disable_device(&self) -> OltdResult<()> {
        let olt = self.olt()?;
        olt.state.lock().unwrap().autonomous = false;

        if let Err(e) = self.remove_flow_from_device().await {
            warn!(self.log, "flow removal failed"; "error" => %e);
        }
        if let Err(e) = self.remove_traffic_profiles().await {
            warn!(self.log, "profile removal failed"; "error" => %e);
        }
        if let Err(e) = self.child_devices_lost().await {
            warn!(self.log, "child cleanup failed"; "error" => %e);
        }

        let action_ids = {
            let mut state = olt.state.lock().unwrap();
            std::mem::take(&mut state.action_ids)
        };
        for (slot, id) in action_ids {
            if let Err(e) = self
                .set_ack(
                    &olt,
                    action_delete(
                        self.tags.next(),
                        ObjectContext::protocol_filter(id),
                    )
                    .encode(),
                    "delete-protocol-filter",
                )
                .await
            {
                warn!(self.log, "filter delete failed"; "slot" => ?slot,
                    "error" => %e);
            }
        }

        self.set_ack(&olt, SetRequest::admin_state(self.tags.next(), true)
            .encode(), "admin-state-up")
            .await?;
        self.set_ack(&olt, SetRequest::management_lock(self.tags.next())
            .encode(), "management-lock")
            .await?;

        olt.state.lock().unwrap().active = false;
        info!(self.log, "device disabled"; "device" => &olt.id);
        Ok(())
    }

    /// Disable, then ask the OLT to reset itself.
    pub async fn reboot_device(&self) -> OltdResult<()> {
        self.disable_device().await?;
        let olt = self.olt()?;
        self.set_ack(&olt, SetRequest::action_reset(self.tags.next())
            .encode(), "action-reset")
            .await?;
        info!(self.log, "device rebooting"; "device" => &olt.id);
        Ok(())
    }

    /// Drop the OLT and everything behind it.  The registry entry is only
    /// removed once the device has acknowledged being handed back.
    pub async fn delete_device(&self) -> OltdResult<()> {
        let olt = self.olt()?;
        olt.state.lock().unwrap().autonomous = false;
        self.set_ack(&olt, SetRequest::admin_state(self.tags.next(), true)
            .encode(), "admin-state-up")
            .await?;
        self.devices.delete_all();
        info!(self.log, "device deleted"; "device" => &olt.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use crate::test_fixture;
    use std::sync::Mutex as StdMutex;

    // A canned OLT: answers creates with fresh object contexts and acks
    // everything else, recording each management payload it saw.
    fn spawn_responder(
        adapter: Arc<Adapter>,
        mut sent: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Arc<StdMutex<Vec<Vec<u8>>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let record = seen.clone();
        tokio::spawn(async move {
            let mut next_instance = 0x60u32;
            while let Some(frame) = sent.recv().await {
                let eth = l2oam::eth::EthFrame::parse(&frame)
                    .unwrap()
                    .strip_stag()
                    .unwrap();
                let dev = match adapter.devices.get_by_mac(eth.dst) {
                    Some(d) => d,
                    None => continue,
                };
                let payload = eth.payload;
                record.lock().unwrap().push(payload.clone());

                // Keepalives get no scripted answer.
                if payload[3] == l2oam::CODE_INFO {
                    continue;
                }
                let reply = match (payload[24], payload[25], payload[26]) {
                    // Generic/Action Create: echo back a fresh object.
                    (0x6e, 0x70, 0x01) => {
                        let ot = &payload[29..32];
                        let otype =
                            ((ot[1] as u16) << 8) | ot[2] as u16;
                        next_instance += 1;
                        ActionCreateReply::frame(
                            0,
                            ObjectContext {
                                branch: ot[0],
                                otype,
                                length: 4,
                                instance: next_instance,
                            },
                        )
                    }
                    // PON Link/Traffic Control Reference Table.
                    (0x01, 0x00, 0x07) => ReferenceTableReply::frame(
                        0,
                        ObjectContext::onu_link(1),
                        ObjectContext::traffic_control(0xd1),
                        ObjectContext::traffic_control(0xd2),
                    ),
                    // Everything else acks as a Set response.
                    (vc_branch, hi, lo) => l2oam::toam::SetResponse {
                        tag: 0,
                        oc: ObjectContext::DEVICE,
                        vc_branch,
                        vc_leaf: ((hi as u16) << 8) | lo as u16,
                        result_code: 0,
                    }
                    .encode(),
                };
                dev.deliver_response(reply);
            }
        });
        seen
    }

    fn onu_with_instance(
        adapter: &Adapter,
        mac: common::network::MacAddr,
        id: &str,
        instance: u32,
    ) {
        let (dev, _) = adapter.devices.insert(mac, id, DeviceKind::Onu);
        let mut state = dev.state.lock().unwrap();
        state.onu_instance = Some(instance);
        state.link_up = true;
    }

    fn is_request(payload: &[u8], branch: u8, leaf: u16) -> bool {
        payload.len() > 26
            && payload[3] == l2oam::CODE_ORG_SPECIFIC
            && payload[24] == branch
            && ((payload[25] as u16) << 8 | payload[26] as u16) == leaf
    }

    #[tokio::test]
    async fn test_add_flow_to_device_is_idempotent_across_onus() {
        let (adapter, sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        onu_with_instance(
            &adapter,
            common::network::MacAddr::new(2, 0, 0, 0, 0, 2),
            "onu-a",
            1,
        );
        onu_with_instance(
            &adapter,
            common::network::MacAddr::new(2, 0, 0, 0, 0, 3),
            "onu-b",
            2,
        );
        let seen = spawn_responder(adapter.clone(), sent);

        adapter
            .add_flow_to_device(FlowParams::default(), "onu-a")
            .await
            .unwrap();
        adapter
            .add_flow_to_device(FlowParams::default(), "onu-b")
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let creates = seen
            .iter()
            .filter(|p| is_request(p, 0x6e, 0x7001))
            .count();
        let ds_inlets = seen
            .iter()
            .filter(|p| {
                is_request(p, 0x5d, 0x7001) && p[29] == 0x0c && p[30] == 0x0e
            })
            .count();
        let us_inlets = seen
            .iter()
            .filter(|p| {
                is_request(p, 0x5d, 0x7001) && p[29] == 0x0c && p[30] == 0x00
            })
            .count();
        let outlets = seen
            .iter()
            .filter(|p| is_request(p, 0x5d, 0x0003))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(ds_inlets, 1);
        assert_eq!(us_inlets, 2);
        assert_eq!(outlets, 2);

        let olt = adapter.devices.get_by_id("olt-1").unwrap();
        assert!(olt.state.lock().unwrap().flow_added);
        assert!(olt.state.lock().unwrap().switching_domain.is_some());
        for id in ["onu-a", "onu-b"] {
            let onu = adapter.devices.get_by_id(id).unwrap();
            assert!(onu.state.lock().unwrap().flow_added, "{id}");
        }
    }

    #[tokio::test]
    async fn test_add_flow_skips_unregistered_onu() {
        let (adapter, sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        let (onu, _) = adapter.devices.insert(
            common::network::MacAddr::new(2, 0, 0, 0, 0, 2),
            "onu-a",
            DeviceKind::Onu,
        );
        let seen = spawn_responder(adapter.clone(), sent);

        adapter
            .add_flow_to_device(FlowParams::default(), "onu-a")
            .await
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert!(!onu.state.lock().unwrap().flow_added);
    }

    #[tokio::test]
    async fn test_enable_indication_captures_action_ids() {
        let (adapter, sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        let _seen = spawn_responder(adapter.clone(), sent);

        adapter.enable_indication().await.unwrap();

        let olt = adapter.devices.get_by_id("olt-1").unwrap();
        let state = olt.state.lock().unwrap();
        assert!(state.autonomous);
        let pon = state.action_ids[&ActionSlot::PonPort];
        let eth = state.action_ids[&ActionSlot::EthPort];
        assert_ne!(pon, eth);
    }

    #[tokio::test]
    async fn test_add_flow_first_call_sets_rates() {
        let (adapter, sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        onu_with_instance(
            &adapter,
            common::network::MacAddr::new(2, 0, 0, 0, 0, 2),
            "onu-a",
            1,
        );
        onu_with_instance(
            &adapter,
            common::network::MacAddr::new(2, 0, 0, 0, 0, 3),
            "onu-b",
            2,
        );
        let seen = spawn_responder(adapter.clone(), sent);

        adapter.add_flow(FlowParams::default(), None).await.unwrap();

        let seen = seen.lock().unwrap();
        // Two profile creates, one priority, two guaranteed, two best
        // effort, regardless of how many ONUs were provisioned.
        let creates = seen
            .iter()
            .filter(|p| is_request(p, 0x6e, 0x7001))
            .count();
        assert_eq!(creates, 2);
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x7f, 0x000a)).count(),
            1
        );
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x7f, 0x0006)).count(),
            2
        );
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x7f, 0x0008)).count(),
            2
        );
        // One reference-table read and two bindings per ONU.
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x01, 0x0007)).count(),
            2
        );
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x7c, 0x0002)).count(),
            4
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_vendor_unset() {
        let (adapter, _sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        let (olt, _) =
            adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);

        let err = adapter
            .get_string(
                &olt,
                GetRequest::vendor_name(adapter.tags.next()),
                "vendor-name",
            )
            .await
            .unwrap_err();
        match err {
            OltdError::Timeout { step, .. } => {
                assert_eq!(step, "vendor-name")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(olt.state.lock().unwrap().vendor, "");
    }

    #[tokio::test]
    async fn test_disable_reverses_partial_state() {
        let (adapter, sent) = test_fixture();
        let olt_mac = common::network::MacAddr::new(2, 0, 0, 0, 0, 1);
        adapter.devices.insert(olt_mac, "olt-1", DeviceKind::Olt);
        onu_with_instance(
            &adapter,
            common::network::MacAddr::new(2, 0, 0, 0, 0, 2),
            "onu-a",
            1,
        );
        let seen = spawn_responder(adapter.clone(), sent);

        adapter.enable_indication().await.unwrap();
        adapter.add_flow(FlowParams::default(), None).await.unwrap();
        adapter
            .add_flow_to_device(FlowParams::default(), "onu-a")
            .await
            .unwrap();
        adapter.disable_device().await.unwrap();

        let olt = adapter.devices.get_by_id("olt-1").unwrap();
        let state = olt.state.lock().unwrap();
        assert!(!state.flow_added);
        assert!(state.switching_domain.is_none());
        assert!(state.profiles.is_none());
        assert!(state.action_ids.is_empty());
        assert!(!state.active);
        drop(state);

        let seen = seen.lock().unwrap();
        // Upstream then downstream inlet deletes, then the domain delete.
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x5d, 0x7002)).count(),
            2
        );
        assert_eq!(
            seen.iter().filter(|p| is_request(p, 0x6e, 0x7002)).count(),
            // stream + 2 profiles + onu link + 2 filters
            6
        );
        // The sequence ends with the device handed back and locked.
        assert!(is_request(&seen[seen.len() - 2], 0xde, 0x0001));
        assert!(is_request(&seen[seen.len() - 1], 0xde, 0x002e));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! The ONU provisioning scripts.  Once a flow reaches an ONU, the mount
//! sequence walks the variant's literal PDU table step by step; the reset
//! script is a single literal.

use slog::debug;
use slog::info;

use l2oam::onu;
use l2oam::PackageVariant;

use crate::device::Device;
use crate::device::FlowParams;
use crate::types::OltdError;
use crate::types::OltdResult;
use crate::Adapter;

impl Adapter {
    async fn onu_step(
        &self,
        onu_dev: &Device,
        payload: Vec<u8>,
        step: &'static str,
    ) -> OltdResult<Vec<u8>> {
        debug!(self.log, "mount step"; "device" => &onu_dev.id,
            "step" => step);
        self.toam_exchange(onu_dev, payload, step).await
    }

    /// Run the variant-specific provisioning script against one ONU.
    pub async fn mount_onu(&self, onu_id: &str) -> OltdResult<()> {
        let onu_dev = self
            .devices
            .get_by_id(onu_id)
            .ok_or_else(|| OltdError::NoSuchDevice(onu_id.to_string()))?;
        if onu_dev.state.lock().unwrap().onu_instance.is_none() {
            return Err(OltdError::PreconditionUnmet(format!(
                "{onu_id} has not registered"
            )));
        }
        let variant = onu_dev
            .state
            .lock()
            .unwrap()
            .variant
            .unwrap_or(PackageVariant::B);
        let inner_tpid = {
            let olt_flow = self
                .olt()
                .ok()
                .and_then(|olt| olt.state.lock().unwrap().flow.clone());
            olt_flow.unwrap_or_default().inner_tpid
        };

        self.onu_step(&onu_dev, onu::fec_mode(variant).to_vec(),
            "fec-mode")
            .await?;

        let mut i = 1;
        while let Some(frame) = onu::encryption_mode(variant, i) {
            self.onu_step(&onu_dev, frame.to_vec(), "encryption-mode")
                .await?;
            i += 1;
        }

        let mut i = 1;
        while let Some(frame) = onu::dyn_learning_mode(variant, i) {
            self.onu_step(&onu_dev, frame.to_vec(), "dyn-learning-mode")
                .await?;
            i += 1;
        }

        let reply = self
            .onu_step(&onu_dev, onu::system_info(variant).to_vec(),
                "system-info")
            .await?;
        if let Some(serial) = onu::serial_number(variant, &reply) {
            let mut state = onu_dev.state.lock().unwrap();
            state.serial = serial;
            if let Some(vendor) = onu::manufacturer(variant, &reply) {
                state.vendor = vendor.to_string();
            }
        }

        self.onu_step(
            &onu_dev,
            onu::optical_rx_power(variant).to_vec(),
            "optical-rx-power",
        )
        .await?;
        self.onu_step(&onu_dev, onu::unip_info(variant).to_vec(),
            "unip-info")
            .await?;
        self.onu_step(
            &onu_dev,
            onu::unip_link_mode(variant).to_vec(),
            "unip-link-mode",
        )
        .await?;

        let mut i = 1;
        while let Some(frame) = onu::vlan_tag_filter(variant, i, &inner_tpid)
        {
            self.onu_step(&onu_dev, frame, "vlan-tag-filter").await?;
            i += 1;
        }

        let mut i = 1;
        while let Some(frame) = onu::priority_queue_count(variant, i) {
            self.onu_step(&onu_dev, frame.to_vec(),
                "priority-queue-count")
                .await?;
            i += 1;
        }

        self.onu_step(
            &onu_dev,
            onu::traffic_enable(variant).to_vec(),
            "traffic-enable",
        )
        .await?;

        onu_dev.state.lock().unwrap().active = true;
        info!(self.log, "ONU mounted"; "device" => onu_id,
            "variant" => ?variant);
        Ok(())
    }

    /// Install a flow for an ONU and, once that sticks, run its mount
    /// sequence.
    pub async fn add_flow_and_mount(
        &self,
        params: FlowParams,
        onu_id: &str,
    ) -> OltdResult<()> {
        self.add_flow_to_device_all(params, onu_id).await?;
        self.mount_onu(onu_id).await
    }

    /// Ask one ONU to reset itself.
    pub async fn reset_onu(&self, onu_dev: &Device) -> OltdResult<()> {
        let variant = onu_dev
            .state
            .lock()
            .unwrap()
            .variant
            .unwrap_or(PackageVariant::B);
        self.toam_exchange(
            onu_dev,
            onu::reset(variant).to_vec(),
            "reset-onu",
        )
        .await?;
        info!(self.log, "ONU reset"; "device" => &onu_dev.id);
        Ok(())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! OLT-management ("TOAM") PDUs.  Every shape shares a 24-byte prefix:
//! the slow-protocol OAM header, the vendor OUI, a management opcode, a
//! correlation tag, and an object context.  Bodies are keyed by a
//! (branch, leaf) pair.
//!
//! The dialect's length accounting is quirky but fixed: Get requests are
//! always 29 bytes and Set-family requests are
//! `22 + ct.length + oc.length + vc.length`, both of which leave a single
//! zero byte after the end marker.  The encoders reproduce that exactly;
//! byte-for-byte fidelity with the deployed OLT firmware matters more than
//! tidiness here.

use bytes::BufMut;
use bytes::BytesMut;

use common::network::MacAddr;

use crate::parse_error;
use crate::pbuf::ParseBuffer;
use crate::FrameError;
use crate::FrameResult;
use crate::ObjectContext;
use crate::CODE_ORG_SPECIFIC;
use crate::CT_BRANCH;
use crate::CT_TYPE;
use crate::FLAGS_INFO_FINAL;
use crate::LENGTH_EMPTY;
use crate::OPCODE_OAM;
use crate::OUI;
use crate::TOMI_GET;
use crate::TOMI_SET;

/// The fields common to every full-form TOAM PDU.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ToamHeader {
    pub tomi_opcode: u8,
    pub tag: u32,
    pub oc: ObjectContext,
}

impl ToamHeader {
    pub const LEN: usize = 24;

    pub(crate) fn set(tag: u32, oc: ObjectContext) -> ToamHeader {
        ToamHeader {
            tomi_opcode: TOMI_SET,
            tag,
            oc,
        }
    }

    pub(crate) fn put(&self, v: &mut BytesMut) {
        v.put_u8(OPCODE_OAM);
        v.put_u16(FLAGS_INFO_FINAL);
        v.put_u8(CODE_ORG_SPECIFIC);
        v.put_slice(&OUI);
        v.put_u8(self.tomi_opcode);
        v.put_u8(CT_BRANCH);
        v.put_u16(CT_TYPE);
        v.put_u8(4);
        v.put_u32(self.tag);
        self.oc.put(v);
    }

    pub(crate) fn parse(pb: &mut ParseBuffer) -> FrameResult<ToamHeader> {
        let opcode = pb.get_u8()?;
        let _flags = pb.get_u16()?;
        let code = pb.get_u8()?;
        if opcode != OPCODE_OAM || code != CODE_ORG_SPECIFIC {
            return Err(parse_error(pb, "not an org-specific OAM PDU"));
        }
        let _oui = pb.get_bytes(3)?;
        let tomi_opcode = pb.get_u8()?;
        let ct_branch = pb.get_u8()?;
        let ct_type = pb.get_u16()?;
        if ct_branch != CT_BRANCH || ct_type != CT_TYPE {
            return Err(parse_error(pb, "missing correlation tag"));
        }
        let _ct_len = pb.get_u8()?;
        let tag = pb.get_u32()?;
        let oc = ObjectContext::parse(pb)?;
        Ok(ToamHeader {
            tomi_opcode,
            tag,
            oc,
        })
    }
}

/// A TOAM Get request: header, a variable descriptor, an end marker.
/// Always 29 bytes on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GetRequest {
    pub tag: u32,
    pub oc: ObjectContext,
    pub vd_branch: u8,
    pub vd_leaf: u16,
}

impl GetRequest {
    pub const WIRE_LEN: usize = 29;

    fn new(
        tag: u32,
        oc: ObjectContext,
        vd_branch: u8,
        vd_leaf: u16,
    ) -> GetRequest {
        GetRequest {
            tag,
            oc,
            vd_branch,
            vd_leaf,
        }
    }

    /// Device/Vendor Name
    pub fn vendor_name(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x0009)
    }

    /// Device/Module Number
    pub fn module_number(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x000a)
    }

    /// Device/Manufacturer Info
    pub fn manufacturer(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x0006)
    }

    /// Device/Running Firmware Version
    pub fn firmware_version(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x001b)
    }

    /// Device/Vendor Serial Number
    pub fn serial_number(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x0012)
    }

    /// Device/PON Mode
    pub fn pon_mode(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x0002)
    }

    /// PON Port/MAC Address
    pub fn mac_address(tag: u32) -> GetRequest {
        Self::new(tag, ObjectContext::PON_PORT, 0x07, 0x0004)
    }

    /// PON Link/Traffic Control Reference Table, addressed at an ONU link.
    pub fn reference_table(tag: u32, oc: ObjectContext) -> GetRequest {
        Self::new(tag, oc, 0x01, 0x0007)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::with_capacity(Self::WIRE_LEN);
        ToamHeader {
            tomi_opcode: TOMI_GET,
            tag: self.tag,
            oc: self.oc,
        }
        .put(&mut v);
        v.put_u8(self.vd_branch);
        v.put_u16(self.vd_leaf);
        v.put_u8(0x00);
        v.resize(Self::WIRE_LEN, 0);
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<GetRequest> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vd_branch = pb.get_u8()?;
        let vd_leaf = pb.get_u16()?;
        Ok(GetRequest {
            tag: hdr.tag,
            oc: hdr.oc,
            vd_branch,
            vd_leaf,
        })
    }
}

/// A TOAM Get response (also the envelope of autonomous events): the common
/// 28-byte prefix followed by a leaf-specific element-content body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetResponse {
    pub tomi_opcode: u8,
    pub tag: u32,
    pub oc: ObjectContext,
    pub vc_branch: u8,
    pub vc_leaf: u16,
    pub vc_length: u8,
    pub body: Vec<u8>,
}

impl GetResponse {
    pub const PREFIX_LEN: usize = 28;

    pub fn parse(data: &[u8]) -> FrameResult<GetResponse> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vc_branch = pb.get_u8()?;
        let vc_leaf = pb.get_u16()?;
        let vc_length = pb.get_u8()?;
        let body = pb.get_bytes(pb.bytes_left())?;
        Ok(GetResponse {
            tomi_opcode: hdr.tomi_opcode,
            tag: hdr.tag,
            oc: hdr.oc,
            vc_branch,
            vc_leaf,
            vc_length,
            body,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::new();
        ToamHeader {
            tomi_opcode: self.tomi_opcode,
            tag: self.tag,
            oc: self.oc,
        }
        .put(&mut v);
        v.put_u8(self.vc_branch);
        v.put_u16(self.vc_leaf);
        v.put_u8(self.vc_length);
        v.put_slice(&self.body);
        v.to_vec()
    }

    /// The single {length, bytes} element-content record most replies carry.
    pub fn element(&self) -> FrameResult<Vec<u8>> {
        let mut pb = ParseBuffer::new_from_slice(&self.body);
        let len = pb.get_u8()? as usize;
        pb.get_bytes(len)
    }

    pub fn element_string(&self) -> FrameResult<String> {
        Ok(String::from_utf8_lossy(&self.element()?).into_owned())
    }

    /// Firmware-version replies carry five length-value records; the second
    /// is the running version string.
    pub fn running_firmware_version(&self) -> FrameResult<String> {
        let mut pb = ParseBuffer::new_from_slice(&self.body);
        let mut records = Vec::new();
        for _ in 0..5 {
            let len = pb.get_u8()? as usize;
            records.push(pb.get_bytes(len)?);
        }
        Ok(String::from_utf8_lossy(&records[1]).into_owned())
    }

    /// A MAC-address reply, formatted the way device IDs are shown upward.
    pub fn element_mac(&self) -> FrameResult<MacAddr> {
        let ec = self.element()?;
        if ec.len() < 6 {
            return Err(FrameError::Malformed {
                reason: "short MAC element".to_string(),
                offset: Self::PREFIX_LEN,
            });
        }
        Ok(MacAddr::from_slice(&ec))
    }
}

/// One element-content record inside a Set request.  The wire form is a
/// length byte followed by that many bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EcEntry(pub Vec<u8>);

impl EcEntry {
    fn wire_len(&self) -> usize {
        1 + self.0.len()
    }
}

/// A TOAM Set request.  `ec: None` encodes the 0x80 "no element content"
/// sentinel in the variable-container length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetRequest {
    pub tag: u32,
    pub oc: ObjectContext,
    pub vc_branch: u8,
    pub vc_leaf: u16,
    pub ec: Option<Vec<EcEntry>>,
}

impl SetRequest {
    fn new(
        tag: u32,
        oc: ObjectContext,
        vc_branch: u8,
        vc_leaf: u16,
        ec: Option<Vec<EcEntry>>,
    ) -> SetRequest {
        SetRequest {
            tag,
            oc,
            vc_branch,
            vc_leaf,
            ec,
        }
    }

    /// OAM/HBTx Period
    pub fn hbtx_period(tag: u32) -> SetRequest {
        Self::new(
            tag,
            ObjectContext::PON_PORT,
            0x0a,
            0x0002,
            Some(vec![EcEntry(vec![0x03, 0xe8])]),
        )
    }

    /// OAM/HBTx Template
    pub fn hbtx_template(tag: u32) -> SetRequest {
        Self::new(
            tag,
            ObjectContext::PON_PORT,
            0x0a,
            0x0003,
            Some(vec![EcEntry(vec![
                0x01, 0x80, 0xc2, 0x00, 0x00, 0x02, 0xe8, 0xb4, 0x70, 0x70,
                0x04, 0x07, 0x88, 0x09, 0x03, 0x00, 0x50, 0x00, 0x01, 0x10,
                0x01, 0x00, 0x00, 0x00, 0x1b, 0x04, 0xb0, 0x2a, 0xea, 0x15,
                0x00, 0x00, 0x00, 0x23,
            ])]),
        )
    }

    /// MPCP/Sync Time
    pub fn mpcp_sync(tag: u32) -> SetRequest {
        Self::new(
            tag,
            ObjectContext::PON_PORT,
            0xcc,
            0x0007,
            Some(vec![EcEntry(vec![0x01])]),
        )
    }

    /// Device/Admin State
    pub fn admin_state(tag: u32, up: bool) -> SetRequest {
        let state = if up { 0x01 } else { 0x02 };
        Self::new(
            tag,
            ObjectContext::DEVICE,
            0xde,
            0x0001,
            Some(vec![EcEntry(vec![state])]),
        )
    }

    /// Device/Management Lock
    pub fn management_lock(tag: u32) -> SetRequest {
        Self::new(
            tag,
            ObjectContext::DEVICE,
            0xde,
            0x002e,
            Some(vec![EcEntry(vec![0x00]), EcEntry(vec![0x02])]),
        )
    }

    /// Device/Action Reset
    pub fn action_reset(tag: u32) -> SetRequest {
        Self::new(tag, ObjectContext::DEVICE, 0xde, 0x7001, None)
    }

    /// The encoded variable-container length, 0x80 when no EC follows.
    pub fn vc_length(&self) -> u8 {
        match &self.ec {
            None => LENGTH_EMPTY,
            Some(entries) => {
                entries.iter().map(|e| e.wire_len()).sum::<usize>() as u8
            }
        }
    }

    /// On-wire size, per the dialect's Set length rule.  One zero byte
    /// trails the end marker.
    pub fn wire_len(&self) -> usize {
        let vc = match &self.ec {
            None => 0,
            Some(_) => self.vc_length() as usize,
        };
        22 + self.oc.length as usize + 4 + vc
    }

    pub fn encode(&self) -> Vec<u8> {
        let total = self.wire_len();
        let mut v = BytesMut::with_capacity(total);
        ToamHeader {
            tomi_opcode: TOMI_SET,
            tag: self.tag,
            oc: self.oc,
        }
        .put(&mut v);
        v.put_u8(self.vc_branch);
        v.put_u16(self.vc_leaf);
        v.put_u8(self.vc_length());
        if let Some(entries) = &self.ec {
            for e in entries {
                v.put_u8(e.0.len() as u8);
                v.put_slice(&e.0);
            }
        }
        v.put_u8(0x00);
        v.resize(total, 0);
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<SetRequest> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vc_branch = pb.get_u8()?;
        let vc_leaf = pb.get_u16()?;
        let vc_length = pb.get_u8()?;
        let ec = if vc_length == LENGTH_EMPTY {
            None
        } else {
            let mut entries = Vec::new();
            let mut left = vc_length as usize;
            while left > 0 {
                let len = pb.get_u8()? as usize;
                if len + 1 > left {
                    return Err(parse_error(&pb, "EC record overruns Vc"));
                }
                entries.push(EcEntry(pb.get_bytes(len)?));
                left -= len + 1;
            }
            Some(entries)
        };
        Ok(SetRequest {
            tag: hdr.tag,
            oc: hdr.oc,
            vc_branch,
            vc_leaf,
            ec,
        })
    }
}

/// A TOAM Set response: the variable container carries a one-byte result
/// code instead of a length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SetResponse {
    pub tag: u32,
    pub oc: ObjectContext,
    pub vc_branch: u8,
    pub vc_leaf: u16,
    pub result_code: u8,
}

impl SetResponse {
    pub fn parse(data: &[u8]) -> FrameResult<SetResponse> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vc_branch = pb.get_u8()?;
        let vc_leaf = pb.get_u16()?;
        let result_code = pb.get_u8()?;
        Ok(SetResponse {
            tag: hdr.tag,
            oc: hdr.oc,
            vc_branch,
            vc_leaf,
            result_code,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::new();
        ToamHeader {
            tomi_opcode: TOMI_SET,
            tag: self.tag,
            oc: self.oc,
        }
        .put(&mut v);
        v.put_u8(self.vc_branch);
        v.put_u16(self.vc_leaf);
        v.put_u8(self.result_code);
        v.put_u8(0x00);
        v.to_vec()
    }

    pub fn ok(&self) -> bool {
        self.result_code == 0
    }
}

/// An unsolicited TOAM frame.  The envelope is a Get response; the element
/// content names the event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AutonomousEvent {
    pub resp: GetResponse,
    pub ec: Vec<u8>,
}

impl AutonomousEvent {
    pub fn parse(data: &[u8]) -> FrameResult<AutonomousEvent> {
        let resp = GetResponse::parse(data)?;
        let ec = resp.element()?;
        Ok(AutonomousEvent { resp, ec })
    }

    /// ONU registration events are the one autonomous shape acted on: the
    /// OLT names a new PON link and the ONU behind it.
    pub fn is_registration(&self) -> bool {
        self.resp.vc_branch == 0x01 && self.resp.vc_leaf == 0x0009
    }

    /// Element content of a registration event: the assigned link instance
    /// followed by the ONU's MAC address.
    pub fn registration(&self) -> FrameResult<(u32, MacAddr)> {
        let mut pb = ParseBuffer::new_from_slice(&self.ec);
        let instance = pb.get_u32()?;
        let mac = pb.get_mac()?;
        Ok((instance, mac))
    }

    /// Build a registration event frame (canned peer traffic for tests).
    pub fn registration_frame(instance: u32, mac: MacAddr) -> Vec<u8> {
        let mut ec = Vec::new();
        ec.extend_from_slice(&instance.to_be_bytes());
        ec.extend_from_slice(&mac.to_vec());
        let mut body = vec![ec.len() as u8];
        body.extend_from_slice(&ec);
        body.push(0x00);
        GetResponse {
            tomi_opcode: crate::TOMI_EVENT,
            tag: 0,
            oc: ObjectContext::onu_link(instance),
            vc_branch: 0x01,
            vc_leaf: 0x0009,
            vc_length: (ec.len() + 1) as u8,
            body,
        }
        .encode()
    }
}

/// A Set request whose element content is a single embedded object context
/// (an "EC-OC" record).  Ingress-port selection, traffic-control binding,
/// and default-outlet assignment all share this shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EcOcSetRequest {
    pub tag: u32,
    pub oc: ObjectContext,
    pub vc_branch: u8,
    pub vc_leaf: u16,
    pub ec_oc: ObjectContext,
}

impl EcOcSetRequest {
    pub const WIRE_LEN: usize = 38;

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::with_capacity(Self::WIRE_LEN);
        ToamHeader {
            tomi_opcode: TOMI_SET,
            tag: self.tag,
            oc: self.oc,
        }
        .put(&mut v);
        v.put_u8(self.vc_branch);
        v.put_u16(self.vc_leaf);
        v.put_u8(9);
        v.put_u8(8);
        self.ec_oc.put(&mut v);
        v.put_u8(0x00);
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<EcOcSetRequest> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vc_branch = pb.get_u8()?;
        let vc_leaf = pb.get_u16()?;
        let _vc_length = pb.get_u8()?;
        let _ec_len = pb.get_u8()?;
        let ec_oc = ObjectContext::parse(&mut pb)?;
        Ok(EcOcSetRequest {
            tag: hdr.tag,
            oc: hdr.oc,
            vc_branch,
            vc_leaf,
            ec_oc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_get_request_wire_form() {
        let req = GetRequest::vendor_name(0x5c1f6a61);
        let v = req.encode();
        assert_eq!(v.len(), GetRequest::WIRE_LEN);
        assert_eq!(&v[0..4], hex!("03 00 50 fe"));
        assert_eq!(&v[4..7], hex!("2a ea 15"));
        assert_eq!(v[7], 0x01);
        assert_eq!(&v[8..16], hex!("0c 0c 7a 04 5c 1f 6a 61"));
        assert_eq!(&v[16..24], hex!("0c 0d ce 04 00 00 00 00"));
        assert_eq!(&v[24..27], hex!("de 00 09"));
        assert_eq!(&v[27..29], hex!("00 00"));
    }

    #[test]
    fn test_get_request_roundtrip() {
        let req = GetRequest::reference_table(7, ObjectContext::onu_link(2));
        assert_eq!(GetRequest::parse(&req.encode()).unwrap(), req);
    }

    #[test]
    fn test_action_reset_wire_form() {
        let v = SetRequest::action_reset(0).encode();
        assert_eq!(
            v,
            hex!(
                "03 00 50 fe 2a ea 15 03"
                "0c 0c 7a 04 00 00 00 00"
                "0c 0d ce 04 00 00 00 00"
                "de 70 01 80 00 00"
            )
        );
    }

    #[test]
    fn test_set_length_rule() {
        // Vc length must equal the EC records that follow it, and the wire
        // length is 22 + ct + oc + vc with a zero byte after the end marker.
        let req = SetRequest::hbtx_period(1);
        assert_eq!(req.vc_length(), 3);
        let v = req.encode();
        assert_eq!(v.len(), 33);
        assert_eq!(&v[24..28], hex!("0a 00 02 03"));
        assert_eq!(&v[28..31], hex!("02 03 e8"));
        assert_eq!(&v[31..33], hex!("00 00"));
    }

    #[test]
    fn test_management_lock_ec_list() {
        let req = SetRequest::management_lock(1);
        assert_eq!(req.vc_length(), 4);
        let v = req.encode();
        assert_eq!(v.len(), 34);
        assert_eq!(&v[24..32], hex!("de 00 2e 04 01 00 01 02"));
    }

    #[test]
    fn test_set_request_roundtrip() {
        for req in [
            SetRequest::hbtx_period(3),
            SetRequest::hbtx_template(4),
            SetRequest::management_lock(5),
            SetRequest::action_reset(6),
            SetRequest::admin_state(7, true),
            SetRequest::admin_state(8, false),
            SetRequest::mpcp_sync(9),
        ] {
            assert_eq!(SetRequest::parse(&req.encode()).unwrap(), req);
        }
    }

    #[test]
    fn test_set_response_roundtrip() {
        let resp = SetResponse {
            tag: 0x5c1f6a70,
            oc: ObjectContext::DEVICE,
            vc_branch: 0xde,
            vc_leaf: 0x0001,
            result_code: 0,
        };
        let parsed = SetResponse::parse(&resp.encode()).unwrap();
        assert_eq!(parsed, resp);
        assert!(parsed.ok());
    }

    #[test]
    fn test_set_response_reject() {
        let resp = SetResponse {
            tag: 1,
            oc: ObjectContext::DEVICE,
            vc_branch: 0xde,
            vc_leaf: 0x002e,
            result_code: 0x06,
        };
        assert!(!SetResponse::parse(&resp.encode()).unwrap().ok());
    }

    #[test]
    fn test_get_response_element() {
        let resp = GetResponse {
            tomi_opcode: TOMI_GET,
            tag: 9,
            oc: ObjectContext::DEVICE,
            vc_branch: 0xde,
            vc_leaf: 0x0009,
            vc_length: 6,
            body: {
                let mut b = vec![5u8];
                b.extend_from_slice(b"Tibit");
                b.push(0x00);
                b
            },
        };
        let parsed = GetResponse::parse(&resp.encode()).unwrap();
        assert_eq!(parsed, resp);
        assert_eq!(parsed.element_string().unwrap(), "Tibit");
    }

    #[test]
    fn test_firmware_version_records() {
        let mut body = Vec::new();
        for rec in [&b"ak"[..], &b"2.1.7"[..], b"bs", b"rn", b"bd"] {
            body.push(rec.len() as u8);
            body.extend_from_slice(rec);
        }
        body.push(0x00);
        let resp = GetResponse {
            tomi_opcode: TOMI_GET,
            tag: 2,
            oc: ObjectContext::DEVICE,
            vc_branch: 0xde,
            vc_leaf: 0x001b,
            vc_length: body.len() as u8,
            body,
        };
        assert_eq!(resp.running_firmware_version().unwrap(), "2.1.7");
    }

    #[test]
    fn test_registration_event() {
        let mac = MacAddr::new(0x00, 0x07, 0x43, 0x6c, 0xf0, 0xd7);
        let frame = AutonomousEvent::registration_frame(3, mac);
        let ev = AutonomousEvent::parse(&frame).unwrap();
        assert!(ev.is_registration());
        assert_eq!(ev.registration().unwrap(), (3, mac));
    }

    #[test]
    fn test_non_registration_event() {
        let resp = GetResponse {
            tomi_opcode: crate::TOMI_EVENT,
            tag: 0,
            oc: ObjectContext::DEVICE,
            vc_branch: 0xde,
            vc_leaf: 0x0021,
            vc_length: 2,
            body: vec![1, 0xff, 0x00],
        };
        let ev = AutonomousEvent::parse(&resp.encode()).unwrap();
        assert!(!ev.is_registration());
    }

    #[test]
    fn test_malformed_prefix() {
        assert!(GetResponse::parse(&hex!("04 00 50 fe 2a ea 15")).is_err());
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Generic action objects: creation, deletion, and the protocol-filter
//! configuration that hangs off them.

use bytes::BufMut;
use bytes::BytesMut;

use crate::pbuf::ParseBuffer;
use crate::toam::EcOcSetRequest;
use crate::toam::SetRequest;
use crate::toam::ToamHeader;
use crate::FrameResult;
use crate::ObjectContext;

/// The object kinds an Action Create can instantiate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionType {
    ProtocolFilter,
    TrafficProfile,
    SwitchingDomain,
}

impl ActionType {
    /// The three-byte object-type record carried in the create request.
    pub fn object_type(&self) -> [u8; 3] {
        match self {
            ActionType::ProtocolFilter => [0x0c, 0x0c, 0xff],
            ActionType::TrafficProfile => [0x0c, 0x07, 0x0f],
            ActionType::SwitchingDomain => [0x0c, 0x02, 0x5d],
        }
    }

    /// The object context branch/type a created instance lives under.
    pub fn context(&self, instance: u32) -> ObjectContext {
        let ot = self.object_type();
        ObjectContext {
            branch: ot[0],
            otype: ((ot[1] as u16) << 8) | ot[2] as u16,
            length: 4,
            instance,
        }
    }
}

/// Generic/Action Create.  The response names the created object.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionCreate {
    pub tag: u32,
    pub action_type: ActionType,
}

impl ActionCreate {
    pub const WIRE_LEN: usize = 33;

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::with_capacity(Self::WIRE_LEN);
        ToamHeader::set(self.tag, ObjectContext::DEVICE).put(&mut v);
        v.put_u8(0x6e);
        v.put_u16(0x7001);
        v.put_u8(4);
        v.put_u8(3);
        v.put_slice(&self.action_type.object_type());
        v.put_u8(0x00);
        v.to_vec()
    }
}

/// Reply to Generic/Action Create: an embedded object context for the new
/// instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionCreateReply {
    pub tag: u32,
    pub created: ObjectContext,
}

impl ActionCreateReply {
    pub fn parse(data: &[u8]) -> FrameResult<ActionCreateReply> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let _vc_branch = pb.get_u8()?;
        let _vc_leaf = pb.get_u16()?;
        let _vc_length = pb.get_u8()?;
        let _ob_len = pb.get_u8()?;
        let created = ObjectContext::parse(&mut pb)?;
        Ok(ActionCreateReply {
            tag: hdr.tag,
            created,
        })
    }

    /// Canned reply used when exercising the sequencer without an OLT.
    pub fn frame(tag: u32, created: ObjectContext) -> Vec<u8> {
        let mut v = BytesMut::new();
        ToamHeader::set(tag, ObjectContext::DEVICE).put(&mut v);
        v.put_u8(0x6e);
        v.put_u16(0x7001);
        v.put_u8(9);
        v.put_u8(8);
        created.put(&mut v);
        v.put_u8(0x00);
        v.to_vec()
    }

    /// The created instance as network-order bytes, as later requests
    /// carry it.
    pub fn instance_bytes(&self) -> [u8; 4] {
        self.created.instance_bytes()
    }
}

/// Generic/Action Delete addressed at any created object.
pub fn action_delete(tag: u32, target: ObjectContext) -> SetRequest {
    SetRequest {
        tag,
        oc: target,
        vc_branch: 0x6e,
        vc_leaf: 0x7002,
        ec: None,
    }
}

/// Protocol Filter/Ingress Port: point a filter action at the PON port or
/// the Ethernet uplink port.
pub fn ingress_port(tag: u32, action_id: u32, pon: bool) -> EcOcSetRequest {
    let port_type = if pon { 0x0007 } else { 0x0e07 };
    EcOcSetRequest {
        tag,
        oc: ObjectContext::protocol_filter(action_id),
        vc_branch: 0xcf,
        vc_leaf: 0x0002,
        ec_oc: ObjectContext {
            branch: 0x0c,
            otype: port_type,
            length: 4,
            instance: 0,
        },
    }
}

/// Protocol Filter/Capture Protocols: one {protocol, action} pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CaptureProtocols {
    pub tag: u32,
    pub action_id: u32,
}

impl CaptureProtocols {
    pub const WIRE_LEN: usize = 34;

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::with_capacity(Self::WIRE_LEN);
        ToamHeader::set(
            self.tag,
            ObjectContext::protocol_filter(self.action_id),
        )
        .put(&mut v);
        v.put_u8(0xcf);
        v.put_u16(0x0003);
        v.put_u8(5);
        v.put_u8(4);
        v.put_u8(1);
        v.put_u8(0x01);
        v.put_u8(1);
        v.put_u8(0x01);
        v.put_u8(0x00);
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_action_create_wire_form() {
        let v = ActionCreate {
            tag: 0x5c1f6a61,
            action_type: ActionType::TrafficProfile,
        }
        .encode();
        assert_eq!(v.len(), ActionCreate::WIRE_LEN);
        assert_eq!(&v[24..28], hex!("6e 70 01 04"));
        assert_eq!(&v[28..32], hex!("03 0c 07 0f"));
        assert_eq!(v[32], 0x00);
    }

    #[test]
    fn test_action_create_reply_roundtrip() {
        let created = ActionType::TrafficProfile.context(0x00000001);
        let frame = ActionCreateReply::frame(12, created);
        let reply = ActionCreateReply::parse(&frame).unwrap();
        assert_eq!(reply.created, created);
        assert_eq!(reply.instance_bytes(), [0, 0, 0, 1]);
    }

    #[test]
    fn test_action_delete_has_no_body() {
        let req = action_delete(3, ActionType::ProtocolFilter.context(9));
        assert_eq!(req.vc_length(), crate::LENGTH_EMPTY);
        let v = req.encode();
        assert_eq!(v.len(), 30);
        assert_eq!(&v[16..24], hex!("0c 0c ff 04 00 00 00 09"));
        assert_eq!(&v[24..28], hex!("6e 70 02 80"));
    }

    #[test]
    fn test_ingress_port_targets() {
        let pon = ingress_port(1, 0x11, true).encode();
        assert_eq!(pon.len(), 38);
        assert_eq!(&pon[24..28], hex!("cf 00 02 09"));
        assert_eq!(&pon[28..33], hex!("08 0c 00 07 04"));

        let eth = ingress_port(1, 0x11, false).encode();
        assert_eq!(&eth[28..33], hex!("08 0c 0e 07 04"));
    }

    #[test]
    fn test_capture_protocols_wire_form() {
        let v = CaptureProtocols {
            tag: 5,
            action_id: 0x22,
        }
        .encode();
        assert_eq!(v.len(), CaptureProtocols::WIRE_LEN);
        assert_eq!(&v[24..33], hex!("cf 00 03 05 04 01 01 01 01"));
        assert_eq!(v[33], 0x00);
    }
}

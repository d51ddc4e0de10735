// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Traffic-control and traffic-profile objects: the per-link reference
//! table, binding a profile to a control, and the QoS parameters carried
//! by a profile.

use bytes::BufMut;
use bytes::BytesMut;

use crate::pbuf::ParseBuffer;
use crate::toam::EcEntry;
use crate::toam::EcOcSetRequest;
use crate::toam::SetRequest;
use crate::toam::ToamHeader;
use crate::FrameResult;
use crate::ObjectContext;

/// Reply to PON Link/Traffic Control Reference Table: one reference object
/// context per direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReferenceTableReply {
    pub tag: u32,
    pub oc: ObjectContext,
    pub downstream: ObjectContext,
    pub upstream: ObjectContext,
}

impl ReferenceTableReply {
    pub fn parse(data: &[u8]) -> FrameResult<ReferenceTableReply> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let _vc_branch = pb.get_u8()?;
        let _vc_leaf = pb.get_u16()?;
        let _vc_length = pb.get_u8()?;
        let _down_len = pb.get_u8()?;
        let downstream = ObjectContext::parse(&mut pb)?;
        let _up_len = pb.get_u8()?;
        let upstream = ObjectContext::parse(&mut pb)?;
        Ok(ReferenceTableReply {
            tag: hdr.tag,
            oc: hdr.oc,
            downstream,
            upstream,
        })
    }

    /// Canned reply used when exercising the sequencer without an OLT.
    pub fn frame(
        tag: u32,
        oc: ObjectContext,
        downstream: ObjectContext,
        upstream: ObjectContext,
    ) -> Vec<u8> {
        let mut v = BytesMut::new();
        ToamHeader::set(tag, oc).put(&mut v);
        v.put_u8(0x01);
        v.put_u16(0x0007);
        v.put_u8(18);
        v.put_u8(8);
        downstream.put(&mut v);
        v.put_u8(8);
        upstream.put(&mut v);
        v.put_u8(0x00);
        v.to_vec()
    }
}

/// Traffic Control/Traffic Profile: bind a profile object to one direction's
/// traffic control reference.
pub fn traffic_binding(
    tag: u32,
    control: ObjectContext,
    profile: ObjectContext,
) -> EcOcSetRequest {
    EcOcSetRequest {
        tag,
        oc: control,
        vc_branch: 0x7c,
        vc_leaf: 0x0002,
        ec_oc: profile,
    }
}

/// Traffic Profile/Priority
pub fn priority(tag: u32, profile: ObjectContext) -> SetRequest {
    SetRequest {
        tag,
        oc: profile,
        vc_branch: 0x7f,
        vc_leaf: 0x000a,
        ec: Some(vec![EcEntry(vec![0x04])]),
    }
}

/// Traffic Profile/Guaranteed Rate
pub fn guaranteed_rate(
    tag: u32,
    cir: &[u8],
    profile: ObjectContext,
) -> SetRequest {
    SetRequest {
        tag,
        oc: profile,
        vc_branch: 0x7f,
        vc_leaf: 0x0006,
        ec: Some(vec![EcEntry(cir.to_vec())]),
    }
}

/// Traffic Profile/Best Effort Rate
pub fn best_effort_rate(
    tag: u32,
    pir: &[u8],
    profile: ObjectContext,
) -> SetRequest {
    SetRequest {
        tag,
        oc: profile,
        vc_branch: 0x7f,
        vc_leaf: 0x0008,
        ec: Some(vec![EcEntry(pir.to_vec())]),
    }
}

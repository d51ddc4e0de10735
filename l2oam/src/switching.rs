// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! L2 switching domain programming: inlet entries matching an outer tag and
//! applying pop/set/push operations, and the default outlet for a domain.

use bytes::BufMut;
use bytes::BytesMut;

use crate::parse_error;
use crate::pbuf::ParseBuffer;
use crate::toam::EcOcSetRequest;
use crate::toam::ToamHeader;
use crate::FrameResult;
use crate::ObjectContext;
use crate::LENGTH_EMPTY;

/// A TPID/VID pair inside a tag list.  Either half may be empty, encoded
/// with the 0x80 sentinel length and no bytes at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TpidVid {
    pub tpid: Option<Vec<u8>>,
    pub vid: Option<Vec<u8>>,
}

impl TpidVid {
    pub fn new(tpid: &[u8], vid: &[u8]) -> TpidVid {
        TpidVid {
            tpid: Some(tpid.to_vec()),
            vid: Some(vid.to_vec()),
        }
    }

    /// Match/operate on a VID with no TPID.
    pub fn vid_only(vid: &[u8]) -> TpidVid {
        TpidVid {
            tpid: None,
            vid: Some(vid.to_vec()),
        }
    }

    pub fn empty() -> TpidVid {
        TpidVid::default()
    }

    fn half_len(half: &Option<Vec<u8>>) -> usize {
        match half {
            None => 1,
            Some(v) => 1 + v.len(),
        }
    }

    /// The value of the entry's leading length byte: the bytes that follow
    /// it.
    fn declared_len(&self) -> usize {
        Self::half_len(&self.tpid) + Self::half_len(&self.vid)
    }

    /// Total encoded size including the leading length byte.
    fn wire_len(&self) -> usize {
        1 + self.declared_len()
    }

    fn put(&self, v: &mut BytesMut) {
        v.put_u8(self.declared_len() as u8);
        for half in [&self.tpid, &self.vid] {
            match half {
                None => v.put_u8(LENGTH_EMPTY),
                Some(bytes) => {
                    v.put_u8(bytes.len() as u8);
                    v.put_slice(bytes);
                }
            }
        }
    }

    fn parse(pb: &mut ParseBuffer) -> FrameResult<TpidVid> {
        let declared = pb.get_u8()? as usize;
        let start = pb.offset();
        let mut halves = [None, None];
        for half in halves.iter_mut() {
            let len = pb.get_u8()?;
            if len != LENGTH_EMPTY {
                *half = Some(pb.get_bytes(len as usize)?);
            }
        }
        if pb.offset() - start != declared {
            return Err(parse_error(pb, "tag entry length mismatch"));
        }
        let [tpid, vid] = halves;
        Ok(TpidVid { tpid, vid })
    }
}

/// The direction-independent inlet-entry request: a source object, a
/// tag-match list, a pop count, and set/push operation lists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwitchingDomainRequest {
    pub tag: u32,
    pub oc: ObjectContext,
    /// 0x7001 adds an entry, 0x7002 deletes one.
    pub vc_leaf: u16,
    pub source_branch: u8,
    pub source_type: u16,
    pub source_instance: u8,
    pub tag_match: Vec<TpidVid>,
    pub pop: u8,
    pub tag_op_set: Vec<TpidVid>,
    pub tag_op_push: Vec<TpidVid>,
}

fn list_len(list: &[TpidVid]) -> usize {
    list.iter().map(|e| e.wire_len()).sum()
}

impl SwitchingDomainRequest {
    /// Source-object and list lengths, everything after the Vc header.
    pub fn vc_length(&self) -> u8 {
        let body = 6
            + 1
            + list_len(&self.tag_match)
            + 2
            + 1
            + list_len(&self.tag_op_set)
            + 1
            + list_len(&self.tag_op_push);
        body as u8
    }

    pub fn wire_len(&self) -> usize {
        22 + self.oc.length as usize + 4 + self.vc_length() as usize
    }

    pub fn encode(&self) -> Vec<u8> {
        let total = self.wire_len();
        let mut v = BytesMut::with_capacity(total);
        ToamHeader::set(self.tag, self.oc).put(&mut v);
        v.put_u8(0x5d);
        v.put_u16(self.vc_leaf);
        v.put_u8(self.vc_length());
        // Source object: one-byte instance form.
        v.put_u8(5);
        v.put_u8(self.source_branch);
        v.put_u16(self.source_type);
        v.put_u8(1);
        v.put_u8(self.source_instance);
        v.put_u8(list_len(&self.tag_match) as u8);
        for e in &self.tag_match {
            e.put(&mut v);
        }
        v.put_u8(1);
        v.put_u8(self.pop);
        v.put_u8(list_len(&self.tag_op_set) as u8);
        for e in &self.tag_op_set {
            e.put(&mut v);
        }
        v.put_u8(list_len(&self.tag_op_push) as u8);
        for e in &self.tag_op_push {
            e.put(&mut v);
        }
        v.put_u8(0x00);
        v.resize(total, 0);
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<SwitchingDomainRequest> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let hdr = ToamHeader::parse(&mut pb)?;
        let vc_branch = pb.get_u8()?;
        if vc_branch != 0x5d {
            return Err(parse_error(&pb, "not a switching-domain request"));
        }
        let vc_leaf = pb.get_u16()?;
        let _vc_length = pb.get_u8()?;
        let _so_len = pb.get_u8()?;
        let source_branch = pb.get_u8()?;
        let source_type = pb.get_u16()?;
        let _so_val_len = pb.get_u8()?;
        let source_instance = pb.get_u8()?;
        let tag_match = Self::parse_list(&mut pb)?;
        let _pop_len = pb.get_u8()?;
        let pop = pb.get_u8()?;
        let tag_op_set = Self::parse_list(&mut pb)?;
        let tag_op_push = Self::parse_list(&mut pb)?;
        Ok(SwitchingDomainRequest {
            tag: hdr.tag,
            oc: hdr.oc,
            vc_leaf,
            source_branch,
            source_type,
            source_instance,
            tag_match,
            pop,
            tag_op_set,
            tag_op_push,
        })
    }

    fn parse_list(pb: &mut ParseBuffer) -> FrameResult<Vec<TpidVid>> {
        let mut left = pb.get_u8()? as usize;
        let mut list = Vec::new();
        while left > 0 {
            let entry = TpidVid::parse(pb)?;
            let used = entry.wire_len();
            if used > left {
                return Err(parse_error(pb, "tag list overrun"));
            }
            left -= used;
            list.push(entry);
        }
        Ok(list)
    }
}

/// Downstream inlet entry: match the outer tag arriving on the Ethernet
/// port, pop it.
pub fn inlet_entry_ds(
    tag: u32,
    oc: ObjectContext,
    tpid: &[u8],
    vid: &[u8],
) -> SwitchingDomainRequest {
    SwitchingDomainRequest {
        tag,
        oc,
        vc_leaf: 0x7001,
        source_branch: 0x0c,
        source_type: 0x0eca,
        source_instance: 0x00,
        tag_match: vec![TpidVid::new(tpid, vid), TpidVid::empty()],
        pop: 0x01,
        tag_op_set: vec![TpidVid::empty()],
        tag_op_push: vec![TpidVid::empty()],
    }
}

/// Upstream inlet entry: traffic from one ONU link gets the outer tag
/// pushed.
pub fn inlet_entry_us(
    tag: u32,
    oc: ObjectContext,
    tpid: &[u8],
    vid: &[u8],
    onu: ObjectContext,
) -> SwitchingDomainRequest {
    SwitchingDomainRequest {
        tag,
        oc,
        vc_leaf: 0x7001,
        source_branch: 0x0c,
        source_type: 0x0011,
        source_instance: onu.instance as u8,
        tag_match: vec![TpidVid::vid_only(&[0x00]), TpidVid::empty()],
        pop: 0x00,
        tag_op_set: vec![TpidVid::empty()],
        tag_op_push: vec![TpidVid::new(tpid, vid)],
    }
}

/// Delete the downstream inlet entry added by `inlet_entry_ds`.
pub fn inlet_delete_ds(
    tag: u32,
    oc: ObjectContext,
    tpid: &[u8],
    vid: &[u8],
) -> SwitchingDomainRequest {
    SwitchingDomainRequest {
        tag,
        oc,
        vc_leaf: 0x7002,
        source_branch: 0x0c,
        source_type: 0x0eca,
        source_instance: 0x00,
        tag_match: vec![TpidVid::new(tpid, vid), TpidVid::empty()],
        pop: 0x01,
        tag_op_set: vec![TpidVid::empty()],
        tag_op_push: vec![TpidVid::empty()],
    }
}

/// Delete the upstream inlet entry added by `inlet_entry_us`.
pub fn inlet_delete_us(
    tag: u32,
    oc: ObjectContext,
    tpid: &[u8],
    vid: &[u8],
    onu: ObjectContext,
) -> SwitchingDomainRequest {
    SwitchingDomainRequest {
        tag,
        oc,
        vc_leaf: 0x7002,
        source_branch: 0x0c,
        source_type: 0x0011,
        source_instance: onu.instance as u8,
        tag_match: vec![TpidVid::vid_only(&[0x00]), TpidVid::empty()],
        pop: 0x00,
        tag_op_set: vec![TpidVid::empty()],
        tag_op_push: vec![TpidVid::new(tpid, vid)],
    }
}

/// L2 Switching Domain/Default Outlet: downstream traffic with no better
/// match goes to this ONU link.
pub fn default_outlet(
    tag: u32,
    oc: ObjectContext,
    onu: ObjectContext,
) -> EcOcSetRequest {
    EcOcSetRequest {
        tag,
        oc,
        vc_branch: 0x5d,
        vc_leaf: 0x0003,
        ec_oc: ObjectContext {
            branch: 0x0c,
            otype: 0x0011,
            length: 4,
            instance: onu.instance,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn domain() -> ObjectContext {
        ObjectContext {
            branch: 0x0c,
            otype: 0x025d,
            length: 4,
            instance: 1,
        }
    }

    #[test]
    fn test_ds_entry_lengths() {
        let req =
            inlet_entry_ds(1, domain(), &hex!("88 a8"), &hex!("00 64"));
        // Source object (6), match list (1+10), pop (2), set (1+3),
        // push (1+3).
        assert_eq!(req.vc_length(), 27);
        let v = req.encode();
        assert_eq!(v.len(), 57);
        // Vc header, then the source object for the Ethernet-side inlet.
        assert_eq!(&v[24..28], hex!("5d 70 01 1b"));
        assert_eq!(&v[28..34], hex!("05 0c 0e ca 01 00"));
        // Tag match list: the outer tag entry then an empty entry.
        assert_eq!(&v[34..45], hex!("0a 06 02 88 a8 02 00 64 02 80 80"));
        // Pop one tag; set and push lists are empty entries.
        assert_eq!(&v[45..55], hex!("01 01 03 02 80 80 03 02 80 80"));
        assert_eq!(&v[55..57], hex!("00 00"));
    }

    #[test]
    fn test_us_entry_lengths() {
        let req = inlet_entry_us(
            2,
            domain(),
            &hex!("88 a8"),
            &hex!("00 64"),
            ObjectContext::onu_link(3),
        );
        assert_eq!(req.vc_length(), 28);
        let v = req.encode();
        assert_eq!(v.len(), 58);
        assert_eq!(&v[28..34], hex!("05 0c 00 11 01 03"));
        // Push list carries the outer tag.
        assert_eq!(&v[48..58], hex!("07 06 02 88 a8 02 00 64 00 00"));
    }

    #[test]
    fn test_roundtrip_all_directions() {
        let onu = ObjectContext::onu_link(2);
        for req in [
            inlet_entry_ds(1, domain(), &hex!("88 a8"), &hex!("00 64")),
            inlet_entry_us(2, domain(), &hex!("88 a8"), &hex!("00 64"), onu),
            inlet_delete_ds(3, domain(), &hex!("88 a8"), &hex!("00 64")),
            inlet_delete_us(4, domain(), &hex!("88 a8"), &hex!("00 64"), onu),
        ] {
            let parsed =
                SwitchingDomainRequest::parse(&req.encode()).unwrap();
            assert_eq!(parsed, req);
        }
    }

    #[test]
    fn test_empty_tpid_emits_no_bytes() {
        let mut v = BytesMut::new();
        TpidVid::vid_only(&[0x00]).put(&mut v);
        assert_eq!(&v[..], hex!("03 80 01 00"));

        let mut v = BytesMut::new();
        TpidVid::empty().put(&mut v);
        assert_eq!(&v[..], hex!("02 80 80"));
    }

    #[test]
    fn test_default_outlet_layout() {
        let v = default_outlet(7, domain(), ObjectContext::onu_link(5))
            .encode();
        assert_eq!(v.len(), 38);
        assert_eq!(&v[24..28], hex!("5d 00 03 09"));
        assert_eq!(&v[28..37], hex!("08 0c 00 11 04 00 00 00 05"));
    }
}

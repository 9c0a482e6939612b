use std::convert::TryFrom;
use std::net::Ipv4Addr;

use roflcore::ds::actions::{Action, ActionList};
use roflcore::ds::flow_instructions::Instruction;
use roflcore::ds::flow_match::Match;
use roflcore::ds::flow_mod::{FlowMod, FlowModCommand};
use roflcore::ds::group_mod::{Bucket, BucketList, GroupId, GroupMod, GroupModCommand, GroupType};
use roflcore::ds::multipart::{BucketCounter, GroupStats, MultipartReply, MultipartRequest};
use roflcore::ds::oxm::{OfbMatchFields, OxmEntry};
use roflcore::ds::ports::PortNumber;
use roflcore::ds::{OfMsg, OfPayload, Pack, Version};

fn web_traffic(version: Version) -> Match {
    let mut mmatch = Match::new(version).unwrap();
    mmatch.set_in_port(3).unwrap();
    mmatch.set_eth_type(0x0800).unwrap();
    mmatch.set_ip_proto(6).unwrap();
    mmatch
        .set_ipv4_src_masked(Ipv4Addr::new(192, 168, 0, 0), Ipv4Addr::new(255, 255, 255, 0))
        .unwrap();
    mmatch.set_tcp_dst(80).unwrap();
    mmatch
}

#[test]
fn flow_mod_message_round_trip() {
    let _ = simple_logger::init();
    let mut flow_mod = FlowMod::new(FlowModCommand::Add, web_traffic(Version::V1_3));
    flow_mod.priority = 100;
    flow_mod.instructions.push(Instruction::ApplyActions(ActionList::from(vec![
        Action::SetField(OxmEntry::basic(OfbMatchFields::IpDscp, &10u8).unwrap()),
        Action::output(PortNumber::NormalPort(4)),
    ])));
    let msg = OfMsg::generate(Version::V1_3, 12, OfPayload::FlowMod(flow_mod)).unwrap();
    let bytes = msg.to_bytes().unwrap();
    assert_eq!(msg.length(), bytes.len());
    assert_eq!(bytes.len(), *msg.header().length() as usize);
    assert_eq!(msg, OfMsg::try_from(&bytes[..]).unwrap());
}

#[test]
fn match_survives_of10_translation() {
    let oxm = web_traffic(Version::V1_3);
    let of10 = oxm.to_version(Version::V1_0).unwrap();
    let bytes = of10.to_bytes().unwrap();
    assert_eq!(40, bytes.len());
    let back = Match::unpack(Version::V1_0, &bytes[..])
        .unwrap()
        .to_version(Version::V1_3)
        .unwrap();
    assert_eq!(oxm, back);
    assert_eq!(Some(80), back.get_tcp_dst().unwrap());
}

#[test]
fn of10_rejects_newer_fields() {
    let mut mmatch = Match::new(Version::V1_3).unwrap();
    mmatch.set_mpls_label(7).unwrap();
    assert!(mmatch.to_version(Version::V1_0).is_err());
}

#[test]
fn group_mod_message_round_trip() {
    let mut buckets = BucketList::new();
    buckets.push(Bucket::unwatched(
        1,
        ActionList::from(vec![Action::output(PortNumber::NormalPort(1))]),
    ));
    buckets.push(Bucket::unwatched(2, ActionList::new()));
    buckets.push(Bucket::new(
        3,
        2,
        GroupId::Any as u32,
        ActionList::from(vec![Action::PushVlan(0x8100), Action::output(PortNumber::NormalPort(2))]),
    ));
    for version in &[Version::V1_2, Version::V1_3] {
        let group_mod = GroupMod::new(GroupModCommand::Add, GroupType::Select, 5)
            .with_buckets(buckets.clone());
        let msg = OfMsg::generate(*version, 1, OfPayload::GroupMod(group_mod)).unwrap();
        let bytes = msg.to_bytes().unwrap();
        let from = OfMsg::try_from(&bytes[..]).unwrap();
        match from.payload() {
            OfPayload::GroupMod(decoded) => {
                assert_eq!(3, decoded.buckets().len());
                assert!(decoded.buckets().get(1).unwrap().actions().is_empty());
                assert_eq!(&buckets, decoded.buckets());
            }
            other => panic!("expected GROUP_MOD, got {:?}", other),
        }
    }
}

#[test]
fn group_stats_exchange() {
    let request = MultipartRequest::group_stats(Version::V1_3, GroupId::All as u32);
    let msg = OfMsg::generate(Version::V1_3, 8, OfPayload::MultipartRequest(request)).unwrap();
    let bytes = msg.to_bytes().unwrap();
    assert_eq!(8 + 8 + 8, bytes.len());
    assert_eq!(msg, OfMsg::try_from(&bytes[..]).unwrap());

    for version in &[Version::V1_2, Version::V1_3] {
        let mut busy = GroupStats::new(5, 1, 100, 6400)
            .with_bucket_stats(vec![BucketCounter::new(60, 3840), BucketCounter::new(40, 2560)]);
        if *version == Version::V1_3 {
            busy = busy.with_duration(10, 500);
        }
        let stats = vec![busy, GroupStats::new(6, 0, 0, 0)];
        let reply = MultipartReply::group_stats(*version, stats);
        let msg = OfMsg::generate(*version, 8, OfPayload::MultipartReply(reply)).unwrap();
        let bytes = msg.to_bytes().unwrap();
        assert_eq!(msg, OfMsg::try_from(&bytes[..]).unwrap());
    }
}

//! Every reply a slave puts on the wire decodes on the master side.

use labibus_codec::RequestKind;
use labibus_master::{encode_request, Reply, ReplyCodec};
use labibus_slave::sim::SimHal;
use labibus_slave::Slave;
use proptest::prelude::*;

/// Run one request through a slave and decode what it transmits.
fn exchange(slave: &Slave<SimHal>, device_id: u8, kind: RequestKind) -> Option<Reply> {
    let request = encode_request(device_id, kind);
    slave.handle_frame(&request[..request.len() - 1]);
    let wire = slave.hal().take_wire();
    if wire.is_empty() {
        return None;
    }
    let mut codec = ReplyCodec::new();
    codec.push(&wire);
    let reply = codec.decode().unwrap();
    assert_eq!(codec.buffered_len(), 0);
    reply
}

proptest! {
    #[test]
    fn test_discovery_fields_survive(
        id in 0u8..=0x7f,
        interval in any::<u16>(),
        description in "[ -~]{1,40}",
        unit in "[ -~]{0,10}",
    ) {
        let slave = Slave::new(SimHal::new().without_event_log());
        slave.configure(id, interval, description.clone(), unit.clone()).unwrap();
        match exchange(&slave, id, RequestKind::Discover) {
            Some(Reply::Discovery(d)) => {
                prop_assert_eq!(d.device_id, id);
                prop_assert_eq!(d.poll_interval, interval);
                prop_assert_eq!(d.description, description);
                prop_assert_eq!(d.unit, unit);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn test_poll_value_survives(id in 0u8..=0x7f, value in -1.0e6f32..1.0e6f32) {
        let slave = Slave::new(SimHal::new().without_event_log());
        slave.configure(id, 10, "sensor", "").unwrap();
        slave.set_value(id, value);
        match exchange(&slave, id, RequestKind::Poll) {
            Some(Reply::Poll(p)) => {
                prop_assert_eq!(p.device_id, id);
                prop_assert_eq!(p.text, format!("{:.6}", value));
                prop_assert!((p.value - value).abs() <= 1.0e-3_f32.max(value.abs() * 1.0e-6));
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
        prop_assert!(exchange(&slave, id, RequestKind::Poll).is_none());
    }
}

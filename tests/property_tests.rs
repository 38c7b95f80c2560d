use proptest::prelude::*;
use tncore::{Event, Flags, Session, VecSink};

fn collect_data(events: &[Event]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        if let Event::Data(bytes) = event {
            out.extend_from_slice(bytes);
        }
    }
    out
}

proptest! {
    /// `send_data` followed by `recv` on a fresh peer always recovers
    /// the original bytes, regardless of how many `0xFF` bytes it contains.
    #[test]
    fn escape_round_trips_arbitrary_payloads(payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut sender = Session::new(Flags::default(), None);
        let mut send_sink = VecSink::default();
        sender.send_data(&payload, &mut send_sink);
        let wire: Vec<u8> = send_sink.0.into_iter().flat_map(|e| match e {
            Event::Send(bytes) => bytes,
            _ => Vec::new(),
        }).collect();

        let mut receiver = Session::new(Flags::default(), None);
        let mut recv_sink = VecSink::default();
        receiver.recv(&mut recv_sink, &wire);
        prop_assert_eq!(collect_data(&recv_sink.0), payload);
    }

    /// Splitting the same wire bytes across arbitrarily many `recv` calls
    /// must not change what's decoded, as long as an `IAC` escape pair isn't
    /// torn apart mid-pair (the state machine already handles that case —
    /// this property isolates the "non-adversarial" chunking a real
    /// transport produces).
    #[test]
    fn chunking_does_not_change_decoded_data(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        cut in 0usize..256,
    ) {
        let mut sender = Session::new(Flags::default(), None);
        let mut send_sink = VecSink::default();
        sender.send_data(&payload, &mut send_sink);
        let wire: Vec<u8> = send_sink.0.into_iter().flat_map(|e| match e {
            Event::Send(bytes) => bytes,
            _ => Vec::new(),
        }).collect();
        let cut = cut.min(wire.len());

        let mut whole = Session::new(Flags::default(), None);
        let mut whole_sink = VecSink::default();
        whole.recv(&mut whole_sink, &wire);

        let mut chunked = Session::new(Flags::default(), None);
        let mut chunked_sink = VecSink::default();
        chunked.recv(&mut chunked_sink, &wire[..cut]);
        chunked.recv(&mut chunked_sink, &wire[cut..]);

        prop_assert_eq!(collect_data(&whole_sink.0), collect_data(&chunked_sink.0));
    }

    /// Data containing no `0xFF` byte at all passes through completely
    /// unescaped and untouched.
    #[test]
    fn iac_free_payloads_pass_through_unchanged(
        payload in prop::collection::vec(0u8..255, 0..256)
    ) {
        let mut session = Session::new(Flags::default(), None);
        let mut sink = VecSink::default();
        session.recv(&mut sink, &payload);
        prop_assert_eq!(collect_data(&sink.0), payload);
    }
}

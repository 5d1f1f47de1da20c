fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use medialink_protocol::messages::{
        LibraryScanProgress, MediaChanged, PingPayload, PlaybackSeek, PlayerSeekRequest,
    };
    use medialink_protocol::{ClientMessage, Frame, MessageType, Notification, NotificationType};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Loads a fixture as the raw text frame a socket would carry.
    fn load_frame(name: &str) -> String {
        load_fixture(name).to_string()
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        // Parse from text: `RawValue` payloads cannot be read from a `Value`.
        let parsed: T = serde_json::from_str(&load_frame(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
    }

    /// Roundtrips only the `payload` member of a fixture.
    fn payload_roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let payload = load_fixture(name)["payload"].clone();
        let parsed: T = serde_json::from_value(payload.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize payload of {name}: {e}"));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), payload, "{name}");
    }

    fn classify_notification(name: &str) -> Notification {
        match Frame::classify(&load_frame(name)) {
            Frame::Notification(n) => n,
            other => panic!("{name} should classify as a notification, got {other:?}"),
        }
    }

    // --- Outbound messages ---

    #[test]
    fn fixture_ping() {
        roundtrip_test::<ClientMessage>("ping.json");
        payload_roundtrip_test::<PingPayload>("ping.json");
    }

    #[test]
    fn fixture_player_seek() {
        roundtrip_test::<ClientMessage>("player_seek.json");
        payload_roundtrip_test::<PlayerSeekRequest>("player_seek.json");
    }

    #[test]
    fn built_ping_matches_fixture_shape() {
        let built: serde_json::Value =
            serde_json::from_str(&ClientMessage::ping().unwrap().to_json().unwrap()).unwrap();
        let fixture = load_fixture("ping.json");

        assert_eq!(built["message_type"], fixture["message_type"]);
        let keys = |v: &serde_json::Value| -> Vec<String> {
            v["payload"].as_object().unwrap().keys().cloned().collect()
        };
        assert_eq!(keys(&built), keys(&fixture));
        assert!(built["payload"]["timestamp"].is_i64());
    }

    #[test]
    fn built_seek_matches_fixture() {
        let request = PlayerSeekRequest {
            media_id: "m-1042".into(),
            position_ms: 754_000,
        };
        let built = ClientMessage::player_seek(&request).unwrap();
        assert_eq!(built.message_type, MessageType::PlayerSeek);
        assert_eq!(
            serde_json::to_value(&built).unwrap(),
            load_fixture("player_seek.json")
        );
    }

    // --- Inbound notifications ---

    #[test]
    fn fixture_notification_scan_progress() {
        roundtrip_test::<Notification>("notification_scan_progress.json");
        payload_roundtrip_test::<LibraryScanProgress>("notification_scan_progress.json");

        let n = classify_notification("notification_scan_progress.json");
        assert_eq!(n.kind(), NotificationType::LibraryScanProgress);
        let progress: LibraryScanProgress = n.parse_payload().unwrap();
        assert_eq!(progress.ratio(), Some(0.25));
    }

    #[test]
    fn fixture_notification_media_added() {
        roundtrip_test::<Notification>("notification_media_added.json");
        payload_roundtrip_test::<MediaChanged>("notification_media_added.json");
        assert_eq!(
            classify_notification("notification_media_added.json").kind(),
            NotificationType::MediaAdded
        );
    }

    #[test]
    fn fixture_notification_playback_seek() {
        roundtrip_test::<Notification>("notification_playback_seek.json");
        payload_roundtrip_test::<PlaybackSeek>("notification_playback_seek.json");
    }

    #[test]
    fn extra_envelope_fields_are_ignored() {
        let n = classify_notification("notification_extra_fields.json");
        assert_eq!(n.notification_type, "media_removed");
        let media: MediaChanged = n.parse_payload().unwrap();
        assert_eq!(media.media_id, "s-7");
        assert_eq!(media.title, None);
    }

    #[test]
    fn unknown_kinds_keep_their_wire_name() {
        let n = classify_notification("notification_unknown_kind.json");
        assert_eq!(n.kind(), NotificationType::Unknown);
        assert_eq!(n.notification_type, "server_restarting");
        assert!(n.payload.is_null());
    }

    #[test]
    fn outbound_frames_are_not_notifications() {
        for name in ["ping.json", "player_seek.json"] {
            assert!(
                matches!(Frame::classify(&load_frame(name)), Frame::Unrecognized(_)),
                "{name}"
            );
        }
    }
}

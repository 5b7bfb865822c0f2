//! Redelivery tests: the existence check on the derived audio key is the
//! only guard against duplicate conversions.

use std::collections::BTreeMap;
use std::sync::Mutex;

use note_speech_lambda::adapters::object_store::{ObjectLookup, ObjectMetadata, ObjectStore};
use note_speech_lambda::adapters::speech::{SpeechRequest, SpeechSynthesizer};
use note_speech_lambda::config::ConverterConfig;
use note_speech_lambda::handlers::convert::{handle_conversion_event, ConversionOutcome};
use note_speech_lambda::runtime::contract::{ConversionStatus, SkipReason};
use serde_json::{json, Value};

#[derive(Default)]
struct SharedStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    writes: Mutex<Vec<(String, Vec<u8>)>>,
}

impl SharedStore {
    fn seed(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert(key.to_string(), body.to_vec());
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("poisoned mutex").get(key).cloned()
    }

    fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().expect("poisoned mutex").clone()
    }
}

impl ObjectStore for SharedStore {
    fn head_object(&self, _bucket: &str, key: &str) -> ObjectLookup<ObjectMetadata> {
        match self.get(key) {
            Some(_) => ObjectLookup::Found(ObjectMetadata::default()),
            None => ObjectLookup::NotFound,
        }
    }

    fn get_object(&self, _bucket: &str, key: &str) -> ObjectLookup<Vec<u8>> {
        match self.get(key) {
            Some(body) => ObjectLookup::Found(body),
            None => ObjectLookup::NotFound,
        }
    }

    fn put_object(
        &self,
        _bucket: &str,
        key: &str,
        body: &[u8],
        _content_type: &str,
    ) -> Result<(), String> {
        self.writes
            .lock()
            .expect("poisoned mutex")
            .push((key.to_string(), body.to_vec()));
        self.seed(key, body);
        Ok(())
    }
}

struct EchoSynthesizer;

impl SpeechSynthesizer for EchoSynthesizer {
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, String> {
        Ok(format!("{}:{}", request.voice, request.text).into_bytes())
    }
}

fn notification(key: &str) -> Value {
    json!({
        "Records": [
            {
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "notes-bucket"},
                    "object": {"key": key, "size": 5}
                }
            }
        ]
    })
}

#[test]
fn sequential_redelivery_converts_once() {
    let store = SharedStore::default();
    store.seed("notes/files/todo.txt", b"milk");
    let config = ConverterConfig::default();
    let payload = notification("notes/files/todo.txt");

    let outcomes: Vec<ConversionOutcome> = (0..3)
        .map(|_| {
            handle_conversion_event(&payload, &config, &store, &EchoSynthesizer)
                .expect("each delivery succeeds")
        })
        .collect();

    assert_eq!(outcomes[0].report().status, ConversionStatus::Success);
    for outcome in &outcomes[1..] {
        assert_eq!(
            outcome,
            &ConversionOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
                audio_key: Some("audio/files/todo.mp3".to_string()),
            }
        );
    }
    assert_eq!(
        store.writes(),
        vec![("audio/files/todo.mp3".to_string(), b"Joanna:milk".to_vec())]
    );
}

#[test]
fn overlapping_deliveries_leave_identical_audio() {
    let store = SharedStore::default();
    store.seed("notes/plan.txt", b"ship it");
    let config = ConverterConfig::default();
    let payload = notification("notes/plan.txt");

    let (payload, config, store) = (&payload, &config, &store);

    let outcomes: Vec<ConversionOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    handle_conversion_event(payload, config, store, &EchoSynthesizer)
                        .expect("delivery succeeds")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .collect()
    });

    let converted = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ConversionOutcome::Converted { .. }))
        .count();
    let writes = store.writes();

    assert!(converted >= 1);
    assert_eq!(writes.len(), converted);
    assert!(writes
        .iter()
        .all(|(key, body)| key == "audio/plan.mp3" && body == b"Joanna:ship it"));
    assert_eq!(store.get("audio/plan.mp3"), Some(b"Joanna:ship it".to_vec()));
}

#[test]
fn unrelated_objects_never_reach_storage() {
    let store = SharedStore::default();
    let config = ConverterConfig::default();

    for key in ["images/cat.png", "audio/file.mp3", "note.txt"] {
        let outcome =
            handle_conversion_event(&notification(key), &config, &store, &EchoSynthesizer)
                .expect("out of scope keys are skipped");
        assert_eq!(outcome.report().reason.as_deref(), Some("scope mismatch"));
    }
    assert!(store.writes().is_empty());
}

#[test]
fn spaced_note_name_converts_once_across_redeliveries() {
    let store = SharedStore::default();
    store.seed("notes/files/weekly plan.txt", b"agenda");
    let config = ConverterConfig::default();
    let payload = notification("notes/files/weekly+plan.txt");

    for _ in 0..2 {
        handle_conversion_event(&payload, &config, &store, &EchoSynthesizer)
            .expect("spaced key converts");
    }

    assert_eq!(
        store.writes(),
        vec![(
            "audio/files/weekly plan.mp3".to_string(),
            b"Joanna:agenda".to_vec()
        )]
    );
}

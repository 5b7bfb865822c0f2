pub use note_speech_core::{contract, storage_keys, trigger};

//! Persisting fitted tokenizers as JSON.
//!
//! The on-disk layout is the six-map [`TokenizerState`] plus a variant tag,
//! which is everything either tokenizer needs to reconstruct itself.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UbpeError};
use crate::tokenizer::TokenizerState;

/// Which encoder variant produced a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Greedy encoder.
    Classic,
    /// Top-N weighted DP encoder.
    Universal,
}

/// A persisted model: the tokenizer state tagged with its variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile<S> {
    /// Encoder variant the state belongs to.
    pub variant: Variant,
    /// The fitted tokenizer state.
    pub state: TokenizerState<S>,
}

/// Serialises a model to a JSON string.
pub fn model_json<S: Serialize>(model: &ModelFile<S>, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(model)?)
    } else {
        Ok(serde_json::to_string(model)?)
    }
}

/// Persists a model as JSON at `path`.
pub fn save_model<S: Serialize, P: AsRef<Path>>(
    model: &ModelFile<S>,
    path: P,
    pretty: bool,
) -> Result<()> {
    let json = model_json(model, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| UbpeError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Loads a model from a JSON file at `path`.
pub fn load_model<S: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<ModelFile<S>> {
    let json = fs::read_to_string(path.as_ref())
        .map_err(|err| UbpeError::io(err, Some(path.as_ref().to_path_buf())))?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_state() -> TokenizerState<u8> {
        TokenizerState {
            n_tokens: 4,
            alphabet_size: 2,
            alphabet: vec![(0u8, 0), (1u8, 1)],
            inverse_alphabet: vec![(0, 0u8), (1, 1u8)],
            forward_mapper: vec![(vec![0, 1], 2)],
            backward_mapper: vec![(2, vec![0, 1])],
            token_weights: vec![(2, 0.75)],
        }
    }

    #[test]
    fn model_round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        let model = ModelFile {
            variant: Variant::Universal,
            state: sample_state(),
        };
        save_model(&model, &path, true).expect("save");
        let back: ModelFile<u8> = load_model(&path).expect("load");
        assert_eq!(back.variant, Variant::Universal);
        assert_eq!(back.state, model.state);
    }

    #[test]
    fn sequence_keyed_maps_survive_json() {
        let model = ModelFile {
            variant: Variant::Classic,
            state: sample_state(),
        };
        let json = model_json(&model, false).expect("serialize");
        assert!(json.contains("\"classic\""));
        let back: ModelFile<u8> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.state.forward_mapper, vec![(vec![0, 1], 2)]);
    }

    #[test]
    fn load_reports_missing_files_with_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let err = load_model::<u8, _>(&path).expect_err("missing file must fail");
        assert!(matches!(err, UbpeError::Io { path: Some(_), .. }));
    }
}

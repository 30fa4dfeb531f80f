// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Pictura credit service.
//!
//! This crate provides the error type, domain records, and adapter traits
//! shared by every other crate in the workspace. Storage, generation, and
//! identity adapters implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PicturaError;
pub use types::{
    AdapterType, BalanceSnapshot, GenerationParams, HealthStatus, ProcessedSession,
    PromptHistoryRecord, UserIdentity, WitnessedCredit,
};

pub use traits::{
    AtomicCreditStore, BalanceStore, GenerationBackend, HistoryStore, IdentityProvider,
    PluginAdapter, SessionLog,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AspectRatio, Megapixels, OutputFormat};

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Generation,
            AdapterType::Payment,
            AdapterType::Identity,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = PicturaError::balance_not_found("user-42");
        assert_eq!(err.to_string(), "balance not found: user-42");
    }

    #[test]
    fn generation_params_defaults_match_form_defaults() {
        let params: GenerationParams =
            serde_json::from_str(r#"{"prompt": "a lighthouse at dusk"}"#).unwrap();
        assert_eq!(params, GenerationParams::new("a lighthouse at dusk"));
        assert_eq!(params.aspect_ratio, AspectRatio::Square);
        assert_eq!(params.num_outputs, 1);
        assert!(params.go_fast);
        assert_eq!(params.megapixels, Megapixels::One);
        assert_eq!(params.output_format, OutputFormat::Webp);
        assert_eq!(params.output_quality, 80);
        assert_eq!(params.num_inference_steps, 4);
        assert!(!params.disable_safety_checker);
    }

    #[test]
    fn generation_params_serialize_backend_field_names() {
        let mut params = GenerationParams::new("neon city");
        params.aspect_ratio = AspectRatio::Widescreen;
        params.megapixels = Megapixels::Quarter;
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["aspect_ratio"], "16:9");
        assert_eq!(json["megapixels"], "0.25");
        assert_eq!(json["output_format"], "webp");
        assert!(json.get("seed").is_none(), "unset seed is omitted");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut params = GenerationParams::new("ok");
        assert!(params.validate().is_ok());

        params.num_outputs = 5;
        assert!(matches!(
            params.validate(),
            Err(PicturaError::InvalidRequest(_))
        ));

        params.num_outputs = 2;
        params.num_inference_steps = 0;
        assert!(params.validate().is_err());

        params.num_inference_steps = 4;
        params.output_quality = 101;
        assert!(params.validate().is_err());

        let blank = GenerationParams::new("   ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn unknown_aspect_ratio_is_rejected() {
        let result: Result<GenerationParams, _> =
            serde_json::from_str(r#"{"prompt": "x", "aspect_ratio": "7:3"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _balance(_: &dyn BalanceStore) {}
        fn _sessions(_: &dyn SessionLog) {}
        fn _history(_: &dyn HistoryStore) {}
        fn _atomic(_: &dyn AtomicCreditStore) {}
        fn _backend(_: &dyn GenerationBackend) {}
        fn _identity(_: &dyn IdentityProvider) {}
    }
}
